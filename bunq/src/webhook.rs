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

//! Incoming bunq notifications and the `notification-filter-url` subscriptions
//! that produce them.

use crate::client::{user_endpoint, Client};
use crate::request::ApiRequest;
use crate::response::{response_items, ResponseItem};
use log::{debug, warn};
use reqbunq_core::{Error, Result};
use serde_json::{json, Map, Value};

/// Event that matches every mutation notification.
pub const MUTATION_CREATED: &str = "MUTATION_CREATED";

/// A parsed `{"NotificationUrl": {...}}` callback body.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Event category, e.g. `PAYMENT_CREATED` or `MUTATION`.
    pub category: String,
    /// Creation time as sent by bunq.
    pub created: Option<String>,
    /// The typed entity, when `object` is a single-key wrapper.
    pub item: Option<ResponseItem>,
    /// `object` exactly as received.
    pub object: Value,
    /// The whole callback body.
    pub raw: Value,
}

impl Notification {
    /// Parse a callback body.
    pub fn parse(body: &Value) -> Result<Self> {
        let notification = body
            .get("NotificationUrl")
            .ok_or_else(|| Error::request_invalid("webhook body has no NotificationUrl"))?;
        let object = notification
            .get("object")
            .filter(|v| v.is_object())
            .ok_or_else(|| Error::request_invalid("webhook notification has no object"))?;

        Ok(Self {
            category: notification
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            created: notification
                .get("created")
                .and_then(Value::as_str)
                .map(str::to_string),
            item: ResponseItem::decode(object),
            object: object.clone(),
            raw: body.clone(),
        })
    }

    /// Fields of the entity, unwrapped when possible.
    pub fn fields(&self) -> Map<String, Value> {
        match (&self.item, self.object.as_object()) {
            (Some(item), _) => item.fields.clone(),
            (None, Some(obj)) => obj.clone(),
            (None, None) => Map::new(),
        }
    }

    /// `amount.value` of the entity, when present and numeric.
    pub fn amount(&self) -> Option<f64> {
        let fields = self.fields();
        let value = fields.get("amount")?.get("value")?;
        match value {
            Value::String(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        }
    }

    /// `description` of the entity.
    pub fn description(&self) -> Option<String> {
        self.fields()
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Flatten into `{event_type, timestamp, type, ...fields}`.
    ///
    /// `timestamp` falls back to the current time when bunq sent none.
    pub fn to_output(&self, include_raw: bool) -> Value {
        let mut out = Map::new();
        out.insert("event_type".to_string(), json!(self.category));
        out.insert(
            "timestamp".to_string(),
            json!(self
                .created
                .clone()
                .unwrap_or_else(|| reqbunq_core::time::format_rfc3339(reqbunq_core::time::now()))),
        );
        if let Some(item) = &self.item {
            out.insert("type".to_string(), json!(item.entity.as_str()));
        }
        out.extend(self.fields());
        if include_raw {
            out.insert("raw_webhook_data".to_string(), self.raw.clone());
        }
        Value::Object(out)
    }
}

/// Which notifications a receiver wants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilter {
    /// Subscribed categories; `MUTATION_CREATED` accepts every category.
    pub events: Vec<String>,
    /// Drop notifications with a smaller amount.
    pub min_amount: Option<f64>,
    /// Drop notifications with a larger amount.
    pub max_amount: Option<f64>,
    /// Keep only descriptions containing this text, ignoring case.
    pub description: Option<String>,
}

impl NotificationFilter {
    /// Accept the given categories.
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether `notification` passes the filter.
    ///
    /// Amount and description bounds only apply when the entity has that field.
    pub fn matches(&self, notification: &Notification) -> bool {
        let subscribed = self
            .events
            .iter()
            .any(|e| e == &notification.category || e == MUTATION_CREATED);
        if !subscribed {
            debug!("ignoring bunq notification {}", notification.category);
            return false;
        }

        if let Some(amount) = notification.amount() {
            if self.min_amount.is_some_and(|min| amount < min) {
                return false;
            }
            if self.max_amount.is_some_and(|max| amount > max) {
                return false;
            }
        }

        if let (Some(needle), Some(description)) =
            (self.description.as_deref(), notification.description())
        {
            if !needle.is_empty()
                && !description
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

/// A `notification-filter-url` registration for one monetary account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSubscription {
    /// Owner of the account; `None` uses `/user` without an id.
    pub user_id: Option<u64>,
    /// Monetary account the notifications are about.
    pub account_id: u64,
    /// Url bunq will call.
    pub target_url: String,
}

impl WebhookSubscription {
    /// Describe a subscription.
    pub fn new(user_id: Option<u64>, account_id: u64, target_url: impl Into<String>) -> Self {
        Self {
            user_id,
            account_id,
            target_url: target_url.into(),
        }
    }

    /// Endpoint listing the account's notification filters.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/monetary-account/{}/notification-filter-url",
            user_endpoint(self.user_id),
            self.account_id
        )
    }

    fn find_registered(&self, resp: &Value) -> Option<Option<u64>> {
        response_items(resp)
            .iter()
            .filter_map(|item| item.get("NotificationFilterUrl"))
            .find(|filter| {
                filter.get("notification_target").and_then(Value::as_str)
                    == Some(self.target_url.as_str())
            })
            .map(|filter| filter.get("id").and_then(Value::as_u64))
    }

    /// Whether a filter for `target_url` is registered.
    ///
    /// Lookup failures count as "not registered".
    pub async fn check_exists(&self, client: &Client) -> bool {
        match client.request(ApiRequest::get(self.endpoint())).await {
            Ok(resp) => self.find_registered(&resp).is_some(),
            Err(err) => {
                warn!("failed to list bunq notification filters: {err}");
                false
            }
        }
    }

    /// Register `target_url` for `events`.
    ///
    /// Returns whether bunq acknowledged the registration.
    pub async fn create(&self, client: &Client, events: &[String]) -> Result<bool> {
        let filters: Vec<Value> = events
            .iter()
            .map(|event| {
                json!({
                    "notification_delivery_method": "URL",
                    "notification_target": self.target_url,
                    "category": "MUTATION",
                    "event_type": event,
                })
            })
            .collect();
        let body = json!({
            "notification_target": self.target_url,
            "category": "MUTATION",
            "notification_filters": filters,
        });

        let resp = client
            .request(ApiRequest::post(self.endpoint()).with_body(body))
            .await
            .map_err(|err| {
                let mut wrapped = Error::new(
                    err.kind(),
                    format!("failed to create webhook: {}", err.message()),
                );
                if let Some(status) = err.status() {
                    wrapped = wrapped.with_status(status);
                }
                if let Some(endpoint) = err.endpoint() {
                    wrapped = wrapped.with_endpoint(endpoint);
                }
                wrapped.with_source(err)
            })?;

        Ok(!response_items(&resp).is_empty())
    }

    /// Remove the filter registered for `target_url`.
    ///
    /// Returns `false` when none was found or bunq refused; the webhook may
    /// already be gone.
    pub async fn delete(&self, client: &Client) -> bool {
        let endpoint = self.endpoint();
        let resp = match client.request(ApiRequest::get(&endpoint)).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!("failed to list bunq notification filters: {err}");
                return false;
            }
        };
        let Some(Some(id)) = self.find_registered(&resp) else {
            return false;
        };

        match client
            .request(ApiRequest::delete(format!("{endpoint}/{id}")))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!("failed to delete bunq notification filter {id}: {err}");
                false
            }
        }
    }
}
