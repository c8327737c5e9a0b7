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
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use reqbunq::{ApiRequest, RetryPolicy};
use reqbunq_core::{ErrorKind, Result};
use serde_json::json;

const PAYMENTS: &str = "/v1/user/1234/monetary-account/5/payment";

fn payments() -> ApiRequest {
    ApiRequest::get("/user/1234/monetary-account/5/payment")
}

fn expired() -> serde_json::Value {
    json!({"Error": [{"error_description": "Insufficient authorisation."}]})
}

#[tokio::test]
async fn test_expired_session_is_refreshed_once() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 401, expired());
    mock.reply_json(
        Method::GET,
        PAYMENTS,
        200,
        json!({"Response": [{"Payment": {"id": 1}}]}),
    );
    let client = client(&mock);

    let resp = client.request(payments()).await?;
    assert_eq!(resp["Response"][0]["Payment"]["id"], 1);

    assert_eq!(mock.count(Method::POST, "/v1/installation"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/device-server"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);

    let calls = mock.requests_to(Method::GET, PAYMENTS);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].header("x-bunq-client-authentication"), Some("session-1"));
    assert_eq!(calls[1].header("x-bunq-client-authentication"), Some("session-2"));
    assert!(calls[1].has_valid_signature());
    assert_ne!(
        calls[0].header("x-bunq-client-request-id"),
        calls[1].header("x-bunq-client-request-id")
    );
    Ok(())
}

#[tokio::test]
async fn test_second_expiry_is_surfaced() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 401, expired());
    mock.reply_json(Method::GET, PAYMENTS, 401, expired());
    mock.reply_json(Method::GET, PAYMENTS, 200, json!({"Response": []}));
    let client = client(&mock);

    let err = client.request(payments()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialExpired);
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.endpoint(), Some("/user/1234/monetary-account/5/payment"));

    assert_eq!(mock.count(Method::GET, PAYMENTS), 2);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);
}

#[tokio::test]
async fn test_session_error_text_triggers_refresh() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::GET,
        PAYMENTS,
        400,
        json!({"Error": [{"error_description": "User session is invalid."}]}),
    );
    mock.reply_json(Method::GET, PAYMENTS, 200, json!({"Response": []}));
    let client = client(&mock);

    client.request(payments()).await?;
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);
    Ok(())
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::GET,
        PAYMENTS,
        400,
        json!({"Error": [{
            "error_description": "Insufficient balance",
            "error_description_translated": "Not enough money"
        }]}),
    );
    mock.reply_json(Method::GET, PAYMENTS, 403, json!({"Error": []}));
    let client = client(&mock);

    let err = client.request(payments()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        err.message(),
        "Not enough money (endpoint: /user/1234/monetary-account/5/payment)"
    );

    let err = client.request(payments()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialDenied);
    assert_eq!(err.message(), "bunq API request failed with status 403");

    assert_eq!(mock.count(Method::GET, PAYMENTS), 2);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 1);
}

#[tokio::test]
async fn test_transport_errors_are_wrapped() {
    let mock = MockBunq::new();
    mock.fail(Method::GET, PAYMENTS);
    let client = client(&mock);

    let err = client.request(payments()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert_eq!(err.status(), None);
    assert_eq!(err.endpoint(), Some("/user/1234/monetary-account/5/payment"));
    assert_eq!(mock.count(Method::GET, PAYMENTS), 1);
}

#[tokio::test]
async fn test_disabled_retry_policy() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, PAYMENTS, 401, expired());
    let client = client(&mock).with_retry_policy(RetryPolicy::disabled());

    let err = client.request(payments()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialExpired);
    assert_eq!(mock.count(Method::GET, PAYMENTS), 1);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 1);
}

#[tokio::test]
async fn test_signed_request_carries_body_and_query() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        PAYMENTS,
        200,
        json!({"Response": [{"Id": {"id": 99}}]}),
    );
    let client = client(&mock);

    let body = json!({
        "amount": {"value": "1.00", "currency": "EUR"},
        "counterparty_alias": {"type": "IBAN", "value": "NL00BUNQ0000000000", "name": "Test"},
        "description": "Coffee"
    });
    let resp = client
        .request(
            ApiRequest::post("/user/1234/monetary-account/5/payment")
                .with_body(body.clone())
                .with_query("count", 10),
        )
        .await?;
    assert_eq!(resp["Response"][0]["Id"]["id"], 99);

    let call = &mock.requests_to(Method::POST, PAYMENTS)[0];
    assert_eq!(call.json(), body);
    assert_eq!(call.query.as_deref(), Some("count=10"));
    assert_eq!(call.header("content-type"), Some("application/json"));
    assert_eq!(call.header("cache-control"), Some("no-cache"));
    assert_eq!(call.header("x-bunq-language"), Some("en_US"));
    assert_eq!(call.header("x-bunq-region"), Some("nl_NL"));
    assert_eq!(call.header("x-bunq-geolocation"), Some("0 0 0 0 000"));
    assert!(call.has_valid_signature());
    Ok(())
}
