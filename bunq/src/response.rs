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

//! Decoding of the bunq response envelope.
//!
//! bunq wraps everything in `{"Response": [{"<TypeName>": {...}}, ...]}`.
//! The type name is the only key of each item.

use reqbunq_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// Entity type names that appear as wrapper keys in bunq responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Id,
    Token,
    ServerPublicKey,
    UserPerson,
    UserCompany,
    UserApiKey,
    UserPaymentServiceProvider,
    MonetaryAccountBank,
    MonetaryAccountJoint,
    MonetaryAccountSavings,
    MonetaryAccountExternal,
    Payment,
    PaymentBatch,
    DraftPayment,
    RequestInquiry,
    RequestResponse,
    ScheduledPayment,
    SchedulePaymentEntry,
    CardDebit,
    CardCredit,
    CardLimit,
    AttachmentPublic,
    CustomerStatementExport,
    ExportStatement,
    NotificationFilterUrl,
    BunqMeTab,
    MasterCardAction,
    /// A type name this crate does not know about.
    Unknown(String),
}

impl EntityType {
    /// Name used as wrapper key on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Id => "Id",
            EntityType::Token => "Token",
            EntityType::ServerPublicKey => "ServerPublicKey",
            EntityType::UserPerson => "UserPerson",
            EntityType::UserCompany => "UserCompany",
            EntityType::UserApiKey => "UserApiKey",
            EntityType::UserPaymentServiceProvider => "UserPaymentServiceProvider",
            EntityType::MonetaryAccountBank => "MonetaryAccountBank",
            EntityType::MonetaryAccountJoint => "MonetaryAccountJoint",
            EntityType::MonetaryAccountSavings => "MonetaryAccountSavings",
            EntityType::MonetaryAccountExternal => "MonetaryAccountExternal",
            EntityType::Payment => "Payment",
            EntityType::PaymentBatch => "PaymentBatch",
            EntityType::DraftPayment => "DraftPayment",
            EntityType::RequestInquiry => "RequestInquiry",
            EntityType::RequestResponse => "RequestResponse",
            EntityType::ScheduledPayment => "ScheduledPayment",
            EntityType::SchedulePaymentEntry => "SchedulePaymentEntry",
            EntityType::CardDebit => "CardDebit",
            EntityType::CardCredit => "CardCredit",
            EntityType::CardLimit => "CardLimit",
            EntityType::AttachmentPublic => "AttachmentPublic",
            EntityType::CustomerStatementExport => "CustomerStatementExport",
            EntityType::ExportStatement => "ExportStatement",
            EntityType::NotificationFilterUrl => "NotificationFilterUrl",
            EntityType::BunqMeTab => "BunqMeTab",
            EntityType::MasterCardAction => "MasterCardAction",
            EntityType::Unknown(name) => name,
        }
    }

    /// Whether this is one of the user variants returned by `/session-server`.
    pub fn is_user(&self) -> bool {
        matches!(
            self,
            EntityType::UserPerson
                | EntityType::UserCompany
                | EntityType::UserApiKey
                | EntityType::UserPaymentServiceProvider
        )
    }

    /// Whether the name was recognised.
    pub fn is_known(&self) -> bool {
        !matches!(self, EntityType::Unknown(_))
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        match name {
            "Id" => EntityType::Id,
            "Token" => EntityType::Token,
            "ServerPublicKey" => EntityType::ServerPublicKey,
            "UserPerson" => EntityType::UserPerson,
            "UserCompany" => EntityType::UserCompany,
            "UserApiKey" => EntityType::UserApiKey,
            "UserPaymentServiceProvider" => EntityType::UserPaymentServiceProvider,
            "MonetaryAccountBank" => EntityType::MonetaryAccountBank,
            "MonetaryAccountJoint" => EntityType::MonetaryAccountJoint,
            "MonetaryAccountSavings" => EntityType::MonetaryAccountSavings,
            "MonetaryAccountExternal" => EntityType::MonetaryAccountExternal,
            "Payment" => EntityType::Payment,
            "PaymentBatch" => EntityType::PaymentBatch,
            "DraftPayment" => EntityType::DraftPayment,
            "RequestInquiry" => EntityType::RequestInquiry,
            "RequestResponse" => EntityType::RequestResponse,
            "ScheduledPayment" => EntityType::ScheduledPayment,
            "SchedulePaymentEntry" => EntityType::SchedulePaymentEntry,
            "CardDebit" => EntityType::CardDebit,
            "CardCredit" => EntityType::CardCredit,
            "CardLimit" => EntityType::CardLimit,
            "AttachmentPublic" => EntityType::AttachmentPublic,
            "CustomerStatementExport" => EntityType::CustomerStatementExport,
            "ExportStatement" => EntityType::ExportStatement,
            "NotificationFilterUrl" => EntityType::NotificationFilterUrl,
            "BunqMeTab" => EntityType::BunqMeTab,
            "MasterCardAction" => EntityType::MasterCardAction,
            other => EntityType::Unknown(other.to_string()),
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded item of a `Response` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseItem {
    /// Type named by the wrapper key.
    pub entity: EntityType,
    /// Fields of the wrapped object.
    pub fields: Map<String, Value>,
}

impl ResponseItem {
    /// Decode a `{"<TypeName>": {...}}` wrapper.
    ///
    /// Returns `None` for anything that is not a single-key object wrapping an object.
    pub fn decode(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        let (name, inner) = obj.iter().next()?;
        let fields = inner.as_object()?;

        Some(Self {
            entity: EntityType::from(name.as_str()),
            fields: fields.clone(),
        })
    }

    /// Numeric `id` of the wrapped object.
    pub fn id(&self) -> Option<u64> {
        self.fields.get("id").and_then(Value::as_u64)
    }

    /// Flatten into `{"type": "<TypeName>", ...fields}`.
    ///
    /// A scalar `type` field of the object replaces the type name. An object
    /// valued `type` field is dropped so the result never looks like a wrapper.
    pub fn into_value(self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 1);
        out.insert("type".to_string(), Value::String(self.entity.to_string()));
        for (key, value) in self.fields {
            if key == "type" && value.is_object() {
                continue;
            }
            out.insert(key, value);
        }
        Value::Object(out)
    }
}

/// Flatten one item; values that are not a wrapper are returned unchanged.
///
/// Applying it to its own output yields the same value.
pub fn format_item(item: &Value) -> Value {
    match ResponseItem::decode(item) {
        Some(decoded) => decoded.into_value(),
        None => item.clone(),
    }
}

/// Flatten every item of the `Response` member, keeping other members as-is.
pub fn format_response(response: &Value) -> Value {
    let Some(obj) = response.as_object() else {
        return response.clone();
    };
    let Some(inner) = obj.get("Response") else {
        return response.clone();
    };

    let formatted = match inner {
        Value::Array(items) => Value::Array(items.iter().map(format_item).collect()),
        other => format_item(other),
    };

    let mut out = obj.clone();
    out.insert("Response".to_string(), formatted);
    Value::Object(out)
}

/// Items of the `Response` array, empty when absent.
pub fn response_items(response: &Value) -> &[Value] {
    response
        .get("Response")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// `Token.token` of the item at `index`.
///
/// The handshake endpoints return the token as the second item.
pub fn token_at(response: &Value, index: usize) -> Result<String> {
    response_items(response)
        .get(index)
        .and_then(|item| item.get("Token"))
        .and_then(|token| token.get("token"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::unexpected(format!("bunq response has no token at position {index}"))
        })
}

/// Numeric id of an item, wrapped or already formatted.
pub fn item_id(item: &Value) -> Option<u64> {
    if let Some(id) = item.get("id").and_then(Value::as_u64) {
        return Some(id);
    }
    ResponseItem::decode(item).and_then(|decoded| decoded.id())
}

/// The `Pagination` member of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    /// Url of the page with older items.
    pub older_url: Option<String>,
    /// Url of the page with newer items.
    pub newer_url: Option<String>,
    /// Url to poll for items created later.
    pub future_url: Option<String>,
}

impl Pagination {
    /// Extract pagination from a response, if present and well formed.
    pub fn from_response(response: &Value) -> Option<Self> {
        let value = response.get("Pagination")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// The `older_id` query parameter of `older_url`.
    pub fn older_id(&self) -> Option<String> {
        let url = self.older_url.as_deref()?;
        let (_, query) = url.split_once('?')?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "older_id")
            .map(|(_, v)| v.into_owned())
    }
}
