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
use reqbunq::{ApiRequest, ContextFileCredentialProvider, SessionState};
use reqbunq_core::Result;
use reqbunq_file_read_tokio::TokioFileRead;
use serde_json::json;
use std::io::Write;

#[tokio::test]
async fn test_bootstrap_runs_handshake_in_order() -> Result<()> {
    let mock = MockBunq::new();
    let client = client(&mock);

    assert_eq!(client.user_id().await?, Some(USER_ID));

    let paths: Vec<String> = mock.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec!["/v1/installation", "/v1/device-server", "/v1/session-server"]
    );

    let installation = &mock.requests_to(Method::POST, "/v1/installation")[0];
    assert!(installation.header("x-bunq-client-authentication").is_none());
    assert!(installation.header("x-bunq-client-signature").is_none());
    assert_eq!(
        installation.json()["client_public_key"]
            .as_str()
            .map(str::trim),
        Some(PUBLIC_KEY.trim())
    );

    let device = &mock.requests_to(Method::POST, "/v1/device-server")[0];
    assert_eq!(
        device.header("x-bunq-client-authentication"),
        Some(INSTALLATION_TOKEN)
    );
    assert_eq!(
        device.json(),
        json!({"description": "reqbunq-tests", "secret": API_KEY})
    );
    assert!(device.has_valid_signature());

    let session = &mock.requests_to(Method::POST, "/v1/session-server")[0];
    assert_eq!(session.json(), json!({"secret": API_KEY}));
    assert!(session.has_valid_signature());
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_twice_does_not_repeat_handshake() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    let client = client(&mock);

    client.request(ApiRequest::get("/user")).await?;
    client.request(ApiRequest::get("/user")).await?;
    client.session_manager().await?.ready().await?;

    assert_eq!(mock.count(Method::POST, "/v1/installation"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/device-server"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 1);

    for req in mock.requests_to(Method::GET, "/v1/user") {
        assert_eq!(req.header("x-bunq-client-authentication"), Some("session-1"));
        assert!(req.has_valid_signature());
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_bootstrap() -> Result<()> {
    let mock = MockBunq::new();
    for _ in 0..4 {
        mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    }
    let client = client(&mock);

    let (a, b, c, d) = tokio::join!(
        client.request(ApiRequest::get("/user")),
        client.request(ApiRequest::get("/user")),
        client.request(ApiRequest::get("/user")),
        client.request(ApiRequest::get("/user")),
    );
    a?;
    b?;
    c?;
    d?;

    assert_eq!(mock.count(Method::POST, "/v1/installation"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/device-server"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 1);
    assert_eq!(mock.count(Method::GET, "/v1/user"), 4);
    Ok(())
}

#[tokio::test]
async fn test_failed_session_keeps_earlier_steps() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        "/v1/session-server",
        500,
        json!({"Error": [{"error_description": "Temporarily unavailable"}]}),
    );
    let client = client(&mock);

    assert!(client.user_id().await.is_err());
    let manager = client.session_manager().await?;
    assert!(matches!(
        *manager.state().await,
        SessionState::DeviceRegistered { .. }
    ));

    assert_eq!(client.user_id().await?, Some(USER_ID));
    assert_eq!(mock.count(Method::POST, "/v1/installation"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/device-server"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_resumes_without_handshake() -> Result<()> {
    let mock = MockBunq::new();
    let client = client(&mock);
    client.user_id().await?;

    let snapshot = client.session_manager().await?.snapshot().await;
    assert_eq!(snapshot.api_key, API_KEY);
    assert_eq!(snapshot.installation_token.as_deref(), Some(INSTALLATION_TOKEN));
    assert_eq!(snapshot.device_id, Some(DEVICE_ID));
    assert_eq!(snapshot.session_token.as_deref(), Some("session-1"));
    assert_eq!(snapshot.user_id, Some(USER_ID));

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(snapshot.to_json()?.as_bytes())
        .expect("write context");

    let resumed_mock = MockBunq::new();
    resumed_mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    let resumed = reqbunq::Client::new(
        resumed_mock.context().with_file_read(TokioFileRead),
        config(),
        ContextFileCredentialProvider::new().with_path(file.path().to_string_lossy()),
    );

    resumed.request(ApiRequest::get("/user")).await?;
    assert_eq!(resumed.user_id().await?, Some(USER_ID));

    let paths: Vec<String> = resumed_mock.requests().iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec!["/v1/user"]);
    let req = &resumed_mock.requests()[0];
    assert_eq!(req.header("x-bunq-client-authentication"), Some("session-1"));
    assert!(req.has_valid_signature());
    Ok(())
}

#[tokio::test]
async fn test_clear_starts_over() -> Result<()> {
    let mock = MockBunq::new();
    let client = client_with(
        &mock,
        reqbunq::Credential {
            installation_token: Some(INSTALLATION_TOKEN.to_string()),
            device_description: Some("reqbunq-tests".to_string()),
            session_token: Some("persisted".to_string()),
            ..fresh_credential()
        },
    );

    let manager = client.session_manager().await?;
    assert!(manager.state().await.is_active());

    manager.clear().await;
    assert!(matches!(*manager.state().await, SessionState::Uninitialized));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_refresh_replaces_session_once() -> Result<()> {
    let mock = MockBunq::new();
    let client = client(&mock);
    let manager = client.session_manager().await?;

    let first = manager.ready().await?;
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 1);

    let (a, b, c) = tokio::join!(
        manager.refresh(first.generation),
        manager.refresh(first.generation),
        manager.refresh(first.generation),
    );
    let (a, b, c) = (a?, b?, c?);

    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);
    assert_ne!(a.generation, first.generation);
    assert_eq!(a.generation, b.generation);
    assert_eq!(b.generation, c.generation);

    // A caller still holding the old generation reuses the new session.
    let late = manager.refresh(first.generation).await?;
    assert_eq!(late.generation, a.generation);
    assert_eq!(mock.count(Method::POST, "/v1/session-server"), 2);
    assert_eq!(mock.count(Method::POST, "/v1/installation"), 1);
    assert_eq!(mock.count(Method::POST, "/v1/device-server"), 1);

    mock.reply_json(Method::GET, "/v1/user", 200, json!({"Response": []}));
    client.request(ApiRequest::get("/user")).await?;
    let user = &mock.requests_to(Method::GET, "/v1/user")[0];
    assert_eq!(user.header("x-bunq-client-authentication"), Some("session-2"));
    Ok(())
}
