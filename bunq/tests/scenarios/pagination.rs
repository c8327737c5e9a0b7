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
use reqbunq::{item_id, ApiRequest, Client, StaticCredentialProvider};
use reqbunq_core::Result;
use serde_json::{json, Value};

const PAYMENTS: &str = "/v1/user/1234/monetary-account/5/payment";

fn page(ids: &[u64]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({"Payment": {"id": id}})).collect();
    json!({"Response": items, "Pagination": {"older_url": null}})
}

fn paging_client(mock: &MockBunq, page_size: usize) -> Client {
    Client::new(
        mock.context(),
        config().with_page_size(page_size),
        StaticCredentialProvider::with_credential(fresh_credential()),
    )
}

#[tokio::test]
async fn test_request_all_follows_older_id() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[5, 4]));
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[3, 2]));
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[1]));
    let client = paging_client(&mock, 2);

    let items = client
        .request_all(ApiRequest::get("/user/1234/monetary-account/5/payment"))
        .await?;
    let ids: Vec<u64> = items.iter().filter_map(item_id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);

    let queries: Vec<Vec<(String, String)>> = mock
        .requests_to(Method::GET, PAYMENTS)
        .iter()
        .map(|r| r.query_pairs())
        .collect();
    let pair = |k: &str, v: &str| (k.to_string(), v.to_string());
    assert_eq!(
        queries,
        vec![
            vec![pair("count", "2")],
            vec![pair("count", "2"), pair("older_id", "4")],
            vec![pair("count", "2"), pair("older_id", "2")],
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_request_all_stops_on_exact_multiple() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[4, 3]));
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[2, 1]));
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[]));
    let client = paging_client(&mock, 2);

    let items = client
        .request_all(ApiRequest::get("/user/1234/monetary-account/5/payment"))
        .await?;
    assert_eq!(items.len(), 4);
    assert_eq!(mock.count(Method::GET, PAYMENTS), 3);
    Ok(())
}

#[tokio::test]
async fn test_request_all_keeps_explicit_count() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[9, 8]));
    let client = paging_client(&mock, 50);

    let items = client
        .request_all(ApiRequest::get("/user/1234/monetary-account/5/payment").with_query("count", 3))
        .await?;
    assert_eq!(items.len(), 2);

    let calls = mock.requests_to(Method::GET, PAYMENTS);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query.as_deref(), Some("count=3"));
    Ok(())
}

#[tokio::test]
async fn test_request_all_surfaces_page_errors() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 200, page(&[2, 1]));
    mock.reply_json(
        Method::GET,
        PAYMENTS,
        500,
        json!({"Error": [{"error_description": "Something went wrong"}]}),
    );
    let client = paging_client(&mock, 2);

    let result = client
        .request_all(ApiRequest::get("/user/1234/monetary-account/5/payment"))
        .await;
    assert!(result.is_err());
}
