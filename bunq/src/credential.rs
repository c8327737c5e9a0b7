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

use crate::constants::*;
use reqbunq_core::utils::Redact;
use reqbunq_core::{Error, Result, SigningCredential};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// bunq environment a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// `https://api.bunq.com`
    Production,
    /// `https://public-api.sandbox.bunq.com`
    #[default]
    Sandbox,
}

impl Environment {
    /// Parse an environment name; anything but `production` is the sandbox.
    pub fn parse(name: &str) -> Self {
        if name == "production" {
            Environment::Production
        } else {
            Environment::Sandbox
        }
    }

    /// Base url of the REST API.
    pub fn api_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_API_URL,
            Environment::Sandbox => SANDBOX_API_URL,
        }
    }

    /// Base url of the OAuth2 authorization pages.
    pub fn oauth_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_OAUTH_URL,
            Environment::Sandbox => SANDBOX_OAUTH_URL,
        }
    }

    /// Name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Environment::parse(s))
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base url of the REST API for an environment name.
///
/// `"production"` maps to the production API, any other string to the sandbox.
pub fn get_api_url(environment: &str) -> &'static str {
    Environment::parse(environment).api_url()
}

/// Credential for the bunq API.
///
/// Only `api_key` (and `environment`) are supplied by the operator. The other
/// fields are derived by the session handshake and can be persisted so later
/// runs skip installation and device registration.
#[derive(Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    /// Environment the API key belongs to.
    pub environment: Environment,
    /// Long-lived API key, sent as `secret` during device and session setup.
    pub api_key: String,
    /// PKCS#8 PEM private key registered at installation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Installation token returned by `/installation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_token: Option<String>,
    /// Server public key returned by `/installation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_public_key: Option<String>,
    /// Device description registered at `/device-server`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_description: Option<String>,
    /// Device server id returned by `/device-server`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<u64>,
    /// Session token returned by `/session-server`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// User the session belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

impl Credential {
    /// Create a credential holding only an API key.
    pub fn new(environment: Environment, api_key: &str) -> Self {
        Self {
            environment,
            api_key: api_key.to_string(),
            ..Default::default()
        }
    }

    /// Parse a persisted credential.
    pub fn from_json(content: &[u8]) -> Result<Self> {
        serde_json::from_slice(content).map_err(|e| {
            Error::credential_invalid("failed to parse bunq credential").with_source(e)
        })
    }

    /// Serialize the credential for persistence.
    ///
    /// The output contains the API key and private key in clear.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("environment", &self.environment)
            .field("api_key", &Redact::from(&self.api_key))
            .field("private_key", &Redact::from(&self.private_key))
            .field("installation_token", &Redact::from(&self.installation_token))
            .field("device_description", &self.device_description)
            .field("device_id", &self.device_id)
            .field("session_token", &Redact::from(&self.session_token))
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        !self.api_key.is_empty()
    }
}
