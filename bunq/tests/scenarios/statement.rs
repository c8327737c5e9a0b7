// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::mock::*;
use http::Method;
use pretty_assertions::assert_eq;
use reqbunq_core::{ErrorKind, Result};
use serde_json::json;

const EXPORT: &str = "/v1/user/1234/monetary-account/5/export-statement/9";

#[tokio::test]
async fn test_download_completed_statement() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::GET,
        EXPORT,
        200,
        json!({"Response": [{"ExportStatement": {
            "id": 9,
            "status": "COMPLETED",
            "statement_format": "CSV",
            "content_type": "text/csv",
            "download_url": format!("{ENDPOINT}/download/9")
        }}]}),
    );
    mock.reply(Method::GET, "/download/9", 200, "date,amount\n2024-01-01,1.00\n");
    let client = client(&mock);

    let statement = client.download_statement(Some(USER_ID), 5, 9).await?;
    assert_eq!(statement.statement_id, 9);
    assert_eq!(statement.format.as_deref(), Some("CSV"));
    assert_eq!(statement.content_type, "text/csv");
    assert_eq!(statement.download_url, format!("{ENDPOINT}/download/9"));
    assert_eq!(&statement.data[..], b"date,amount\n2024-01-01,1.00\n");

    let download = &mock.requests_to(Method::GET, "/download/9")[0];
    assert!(download.header("x-bunq-client-authentication").is_none());
    assert!(download.header("x-bunq-client-signature").is_none());
    assert!(download.header("user-agent").is_some());
    Ok(())
}

#[tokio::test]
async fn test_statement_not_ready() {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::GET,
        EXPORT,
        200,
        json!({"Response": [{"ExportStatement": {"id": 9, "status": "PENDING"}}]}),
    );
    let client = client(&mock);

    let err = client
        .download_statement(Some(USER_ID), 5, 9)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(
        err.message(),
        "Statement 9 is not ready for download. Status: PENDING"
    );
    assert_eq!(mock.count(Method::GET, "/download/9"), 0);
}

#[tokio::test]
async fn test_statement_not_found() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, EXPORT, 200, json!({"Response": []}));
    let client = client(&mock);

    let err = client
        .download_statement(Some(USER_ID), 5, 9)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Statement 9 not found");
}

#[tokio::test]
async fn test_download_failure() {
    let mock = MockBunq::new();
    mock.reply(Method::GET, "/download/9", 404, "");
    let client = client(&mock);

    let err = client
        .download(&format!("{ENDPOINT}/download/9"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(err.status(), Some(http::StatusCode::NOT_FOUND));
}
