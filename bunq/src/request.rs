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

use crate::constants::API_VERSION_PREFIX;
use crate::error::{translate, translate_response};
use crate::sign_request::{RequestSigner, SessionCredential};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use log::debug;
use reqbunq_core::{Context, Error, Result, SignRequest};
use serde_json::Value;

/// A call to one bunq endpoint.
///
/// `endpoint` excludes the `/v1` prefix, e.g. `/user/1/monetary-account`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path without the version prefix.
    pub endpoint: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Query pairs in insertion order.
    pub query: Vec<(String, String)>,
    /// Extra headers; they take precedence over the bunq defaults.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request without body, query or extra headers.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// `GET endpoint`
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    /// `POST endpoint`
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    /// `PUT endpoint`
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    /// `DELETE endpoint`
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add an extra header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a query value by key.
    pub fn query_get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of `key` with a single `value`.
    pub fn set_query(&mut self, key: &str, value: impl ToString) {
        self.query.retain(|(k, _)| k != key);
        self.query.push((key.to_string(), value.to_string()));
    }

    /// The exact body string that is signed and sent.
    ///
    /// A missing body and an empty object both serialize to `""`.
    pub fn body_string(&self) -> Result<String> {
        match &self.body {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::Object(map)) if map.is_empty() => Ok(String::new()),
            Some(body) => Ok(serde_json::to_string(body)?),
        }
    }

    /// Full url below `base_url`, including the version prefix and query.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{base_url}{API_VERSION_PREFIX}{}", self.endpoint);
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// Sends [`ApiRequest`]s to one bunq base url.
#[derive(Debug, Clone)]
pub struct Transport {
    ctx: Context,
    signer: RequestSigner,
    base_url: String,
}

impl Transport {
    /// Create a transport for `base_url` (without `/v1`).
    pub fn new(ctx: Context, signer: RequestSigner, base_url: impl Into<String>) -> Self {
        Self {
            ctx,
            signer,
            base_url: base_url.into(),
        }
    }

    /// The context used to send requests.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Base url requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign and send `req`, returning the decoded JSON body.
    ///
    /// `credential` is `None` only for `/installation`. Non-success responses
    /// are translated into errors carrying the status and endpoint; an empty
    /// success body decodes to `Value::Null`.
    pub async fn send(
        &self,
        req: &ApiRequest,
        credential: Option<&SessionCredential>,
    ) -> Result<Value> {
        let endpoint = req.endpoint.as_str();
        let body = req.body_string()?;

        let (mut parts, _) = http::Request::builder()
            .method(req.method.clone())
            .uri(req.url(&self.base_url))
            .body(())?
            .into_parts();
        for (name, value) in &req.headers {
            parts.headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        self.signer
            .sign_request(&self.ctx, &mut parts, body.as_bytes(), credential)
            .await?;

        debug!("sending {} {}", req.method, endpoint);
        let resp = self
            .ctx
            .http_send(http::Request::from_parts(parts, Bytes::from(body)))
            .await
            .map_err(|e| translate(e, endpoint))?;

        let (parts, body) = resp.into_parts();
        if !parts.status.is_success() {
            return Err(translate_response(parts.status, &body, endpoint));
        }

        decode_body(&body).map_err(|e| {
            Error::unexpected(format!("failed to parse bunq response (endpoint: {endpoint})"))
                .with_status(parts.status)
                .with_endpoint(endpoint)
                .with_source(e)
        })
    }
}

fn decode_body(body: &[u8]) -> std::result::Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}
