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
use reqbunq::{Notification, NotificationFilter, WebhookSubscription};
use reqbunq_core::{ErrorKind, Result};
use serde_json::json;

const FILTERS: &str = "/v1/user/1234/monetary-account/5/notification-filter-url";
const TARGET: &str = "https://hooks.example.com/bunq";

fn subscription() -> WebhookSubscription {
    WebhookSubscription::new(Some(USER_ID), 5, TARGET)
}

fn registered() -> serde_json::Value {
    json!({"Response": [
        {"NotificationFilterUrl": {"id": 6, "notification_target": "https://other.example.com"}},
        {"NotificationFilterUrl": {"id": 7, "notification_target": TARGET}}
    ]})
}

#[tokio::test]
async fn test_check_exists() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, FILTERS, 200, registered());
    mock.reply_json(Method::GET, FILTERS, 200, json!({"Response": []}));
    mock.reply_json(Method::GET, FILTERS, 500, json!({}));
    let client = client(&mock);

    assert!(subscription().check_exists(&client).await);
    assert!(!subscription().check_exists(&client).await);
    assert!(!subscription().check_exists(&client).await);
}

#[tokio::test]
async fn test_create() -> Result<()> {
    let mock = MockBunq::new();
    mock.reply_json(Method::POST, FILTERS, 200, json!({"Response": [{"Id": {"id": 8}}]}));
    let client = client(&mock);

    let events = vec!["PAYMENT_CREATED".to_string(), "CARD_TRANSACTION_SUCCESSFUL".to_string()];
    assert!(subscription().create(&client, &events).await?);

    let call = &mock.requests_to(Method::POST, FILTERS)[0];
    assert!(call.has_valid_signature());
    assert_eq!(
        call.json(),
        json!({
            "notification_target": TARGET,
            "category": "MUTATION",
            "notification_filters": [
                {
                    "notification_delivery_method": "URL",
                    "notification_target": TARGET,
                    "category": "MUTATION",
                    "event_type": "PAYMENT_CREATED"
                },
                {
                    "notification_delivery_method": "URL",
                    "notification_target": TARGET,
                    "category": "MUTATION",
                    "event_type": "CARD_TRANSACTION_SUCCESSFUL"
                }
            ]
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_create_failure() {
    let mock = MockBunq::new();
    mock.reply_json(
        Method::POST,
        FILTERS,
        400,
        json!({"Error": [{"error_description": "Url is not reachable"}]}),
    );
    let client = client(&mock);

    let err = subscription()
        .create(&client, &["PAYMENT_CREATED".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert!(err.message().starts_with("failed to create webhook: Url is not reachable"));
}

#[tokio::test]
async fn test_delete() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, FILTERS, 200, registered());
    mock.reply_json(Method::DELETE, &format!("{FILTERS}/7"), 200, json!({"Response": []}));
    let client = client(&mock);

    assert!(subscription().delete(&client).await);
    assert_eq!(mock.count(Method::DELETE, &format!("{FILTERS}/7")), 1);
    assert_eq!(mock.count(Method::DELETE, &format!("{FILTERS}/6")), 0);
}

#[tokio::test]
async fn test_delete_when_missing() {
    let mock = MockBunq::new();
    mock.reply_json(Method::GET, FILTERS, 200, json!({"Response": []}));
    let client = client(&mock);

    assert!(!subscription().delete(&client).await);
    assert!(mock
        .requests()
        .iter()
        .all(|r| r.method != Method::DELETE));
}

#[test]
fn test_receive_notification() -> Result<()> {
    let body = json!({
        "NotificationUrl": {
            "target_url": TARGET,
            "category": "CARD_TRANSACTION_SUCCESSFUL",
            "event_type": "CARD_TRANSACTION_SUCCESSFUL",
            "object": {
                "MasterCardAction": {
                    "id": 11,
                    "amount_billing": {"value": "4.20", "currency": "EUR"},
                    "description": "Bakery"
                }
            }
        }
    });

    let notification = Notification::parse(&body)?;
    let filter = NotificationFilter {
        description: Some("bake".to_string()),
        ..NotificationFilter::new(["CARD_TRANSACTION_SUCCESSFUL"])
    };
    assert!(filter.matches(&notification));

    let output = notification.to_output(false);
    assert_eq!(output["event_type"], "CARD_TRANSACTION_SUCCESSFUL");
    assert_eq!(output["type"], "MasterCardAction");
    assert_eq!(output["id"], 11);
    assert!(output["timestamp"].is_string());
    assert!(output.get("raw_webhook_data").is_none());
    Ok(())
}
