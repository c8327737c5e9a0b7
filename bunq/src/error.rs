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

//! Translation of failed bunq calls into [`reqbunq_core::Error`].

use http::StatusCode;
use log::debug;
use reqbunq_core::{Error, ErrorKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Error", default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_description_translated: Option<String>,
}

impl ErrorEntry {
    fn description(&self) -> Option<&str> {
        self.error_description_translated
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.error_description.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Extract the most readable description from a bunq error body.
///
/// The translated description wins over the raw one.
pub fn error_description(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .errors
        .iter()
        .find_map(ErrorEntry::description)
        .map(str::to_string)
}

/// Whether a description says the session is no longer usable.
pub fn mentions_invalid_session(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("session")
        && ["invalid", "expired", "no longer valid", "not valid"]
            .iter()
            .any(|needle| lower.contains(needle))
}

fn classify(status: StatusCode, description: Option<&str>) -> ErrorKind {
    if status == StatusCode::UNAUTHORIZED || description.is_some_and(mentions_invalid_session) {
        ErrorKind::CredentialExpired
    } else if status == StatusCode::FORBIDDEN {
        ErrorKind::CredentialDenied
    } else if status.is_client_error() {
        ErrorKind::RequestInvalid
    } else {
        ErrorKind::Unexpected
    }
}

/// Build the error for a non-success response.
///
/// Never fails: a body that cannot be parsed falls back to a generic message
/// carrying the status code.
pub fn translate_response(status: StatusCode, body: &[u8], endpoint: &str) -> Error {
    let description = error_description(body);
    let kind = classify(status, description.as_deref());

    let message = match &description {
        Some(desc) => format!("{desc} (endpoint: {endpoint})"),
        None => format!("bunq API request failed with status {}", status.as_u16()),
    };
    debug!("bunq returned {status} for {endpoint}: {message}");

    Error::new(kind, message)
        .with_status(status)
        .with_endpoint(endpoint)
}

/// Normalize any error raised while calling `endpoint`.
///
/// Errors that already carry a status were produced by
/// [`translate_response`] and pass through. Anything else is a transport
/// failure and gets wrapped.
pub fn translate(err: Error, endpoint: &str) -> Error {
    if err.status().is_some() {
        return err;
    }

    Error::unexpected("bunq API request failed")
        .with_endpoint(endpoint)
        .with_source(err)
}
