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
use bytes::Bytes;
use http::Method;
use pretty_assertions::assert_eq;
use reqbunq_core::{ErrorKind, Result};
use serde_json::json;

const ATTACHMENT: &str = "/v1/user/1234/attachment-public";
const UPLOAD: &str = "/upload/attachment-77";

fn attachment_created() -> serde_json::Value {
    json!({"Response": [{"AttachmentPublic": {
        "uuid": "attachment-77",
        "attachment": {"urls": {"public": format!("{ENDPOINT}{UPLOAD}")}}
    }}]})
}

#[tokio::test]
async fn test_upload_attachment() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::POST, ATTACHMENT, 200, attachment_created());
    mock.reply(Method::PUT, UPLOAD, 200, "");
    let client = client(&mock);

    // Not valid UTF-8, so any re-encoding of the payload would show.
    let data = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe]);
    let resp = client
        .upload_attachment(Some(USER_ID), "receipt", "image/png", data.clone())
        .await?;
    assert_eq!(resp, attachment_created());

    let metadata = &mock.requests_to(Method::POST, ATTACHMENT)[0];
    assert!(metadata.has_valid_signature());
    assert_eq!(
        metadata.json(),
        json!({"description": "receipt", "content_type": "image/png"})
    );

    let uploads = mock.requests_to(Method::PUT, UPLOAD);
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.raw, data);
    assert_eq!(upload.header("content-type"), Some("image/png"));
    assert_eq!(upload.header("content-length"), Some("7"));
    assert!(upload.header("x-bunq-client-authentication").is_none());
    assert!(upload.header("x-bunq-client-signature").is_none());

    let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
    let post = paths.iter().position(|p| p == ATTACHMENT).unwrap();
    let put = paths.iter().position(|p| p == UPLOAD).unwrap();
    assert!(post < put);
    Ok(())
}

#[tokio::test]
async fn test_upload_attachment_without_url() {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        ATTACHMENT,
        200,
        json!({"Response": [{"Id": {"id": 77}}]}),
    );
    let client = client(&mock);

    let err = client
        .upload_attachment(Some(USER_ID), "receipt", "image/png", Bytes::from("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert_eq!(mock.count(Method::PUT, UPLOAD), 0);
}

#[tokio::test]
async fn test_upload_failure() {
    let mock = MockBunq::new();
    mock.reply(Method::PUT, UPLOAD, 403, "");
    let client = client(&mock);

    let err = client
        .upload(&format!("{ENDPOINT}{UPLOAD}"), "text/plain", Bytes::from("x"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(http::StatusCode::FORBIDDEN));
}
