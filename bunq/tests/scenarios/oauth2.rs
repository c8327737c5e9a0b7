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
use reqbunq::{ApiRequest, Client, Environment, OAuth2Config, Token};
use reqbunq_core::{ErrorKind, Result};
use serde_json::json;

fn oauth2() -> OAuth2Config {
    OAuth2Config::new(
        Environment::Sandbox,
        "client",
        "secret",
        "https://app.example.com/callback",
    )
    .with_endpoint(ENDPOINT)
}

fn oauth2_client(mock: &MockBunq, token: Token) -> Client {
    Client::with_oauth2(mock.context(), config(), oauth2(), token)
}

#[tokio::test]
async fn test_bearer_requests_are_not_signed() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    let client = oauth2_client(&mock, Token::bearer("access"));

    client.request(ApiRequest::get("/user")).await?;

    let calls = mock.requests();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].header("authorization"), Some("Bearer access"));
    assert!(calls[0].header("x-bunq-client-signature").is_none());
    assert!(calls[0].header("x-bunq-client-authentication").is_none());
    assert!(calls[0].header("x-bunq-client-request-id").is_some());
    assert_eq!(client.user_id().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_refreshes_token_once() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, "/v1/user", 401, json!({"Error": []}));
    mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    mock.reply_json(
        Method::POST,
        "/v1/oauth/token",
        200,
        json!({"access_token": "new", "token_type": "bearer", "expires_in": 3600}),
    );
    let token = Token {
        refresh_token: Some("refresh".to_string()),
        ..Token::bearer("old")
    };
    let client = oauth2_client(&mock, token);

    client.request(ApiRequest::get("/user")).await?;

    let calls = mock.requests_to(Method::GET, "/v1/user");
    assert_eq!(calls[0].header("authorization"), Some("Bearer old"));
    assert_eq!(calls[1].header("authorization"), Some("Bearer new"));

    let grant = &mock.requests_to(Method::POST, "/v1/oauth/token")[0];
    assert_eq!(
        grant.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        grant.body,
        "grant_type=refresh_token&refresh_token=refresh&client_id=client&client_secret=secret"
    );

    let token = client.oauth2_token().await.expect("oauth2 client");
    assert_eq!(token.access_token, "new");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
    assert!(token.expires_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, "/v1/user", 401, json!({"Error": []}));
    let client = oauth2_client(&mock, Token::bearer("old"));

    let err = client.request(ApiRequest::get("/user")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialExpired);
    assert_eq!(mock.count(Method::GET, "/v1/user"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/oauth/token"), 0);
}

#[tokio::test]
async fn test_exchange_code() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        "/v1/oauth/token",
        200,
        json!({"access_token": "access", "refresh_token": "refresh"}),
    );

    let token = oauth2().exchange_code(&mock.context(), "the-code").await?;
    assert_eq!(token.access_token, "access");
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(token.expires_at, None);

    let grant = &mock.requests()[0];
    assert_eq!(
        grant.body,
        "grant_type=authorization_code&code=the-code&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback&client_id=client&client_secret=secret"
    );
    Ok(())
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        "/v1/oauth/token",
        400,
        json!({"Error": [{"error_description": "Invalid grant"}]}),
    );

    let err = oauth2()
        .exchange_code(&mock.context(), "stale")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(err.endpoint(), Some("/oauth/token"));
}
