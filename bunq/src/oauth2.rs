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

//! OAuth2 grants for bunq.
//!
//! bunq's OAuth2 is an alternative to the API key handshake: the access token
//! is sent as a bearer token and requests are not signed.

use crate::constants::*;
use crate::credential::Environment;
use crate::error::{translate, translate_response};
use bytes::Bytes;
use chrono::TimeDelta;
use http::header::CONTENT_TYPE;
use http::Method;
use log::debug;
use reqbunq_core::time::{now, DateTime};
use reqbunq_core::utils::Redact;
use reqbunq_core::{Context, Error, Result, SigningCredential};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "account_info payments user_info";

/// An OAuth2 access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token.
    pub access_token: String,
    /// Usually `bearer`.
    pub token_type: String,
    /// Token for the refresh grant, when issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token stops working, if bunq said so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
}

impl Token {
    /// A bearer token without refresh token or expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the token expires within the next minute.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|t| t <= now() + TimeDelta::try_seconds(60).unwrap_or_default())
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &Redact::from(&self.access_token))
            .field("token_type", &self.token_type)
            .field("refresh_token", &Redact::from(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SigningCredential for Token {
    fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl From<TokenResponse> for Token {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            token_type: resp.token_type,
            refresh_token: resp.refresh_token,
            expires_at: resp
                .expires_in
                .and_then(TimeDelta::try_seconds)
                .map(|d| now() + d),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
enum Grant<'a> {
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        client_id: &'a str,
        client_secret: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
        client_id: &'a str,
        client_secret: &'a str,
    },
}

/// OAuth2 client registration.
#[derive(Clone)]
pub struct OAuth2Config {
    /// Environment the client is registered in.
    pub environment: Environment,
    /// OAuth2 client id.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Redirect uri registered for the client.
    pub redirect_uri: String,
    /// Requested scope.
    pub scope: String,
    /// Overrides the API base url hosting `/v1/oauth/token`.
    pub endpoint: Option<String>,
}

impl Debug for OAuth2Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("environment", &self.environment)
            .field("client_id", &self.client_id)
            .field("client_secret", &Redact::from(&self.client_secret))
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl OAuth2Config {
    /// Create a config with the default scope.
    pub fn new(
        environment: Environment,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: DEFAULT_SCOPE.to_string(),
            endpoint: None,
        }
    }

    /// Override the API base url.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// API base url for token requests and bearer calls.
    pub fn api_url(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.environment.api_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Url the user visits to grant access.
    pub fn authorization_url(&self, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", state)
            .finish();
        format!("{}/auth?{query}", self.environment.oauth_url())
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(&self, ctx: &Context, code: &str) -> Result<Token> {
        self.token_request(
            ctx,
            &Grant::AuthorizationCode {
                code,
                redirect_uri: &self.redirect_uri,
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            },
        )
        .await
    }

    /// Obtain a new access token with a refresh token.
    ///
    /// bunq does not always rotate the refresh token; the old one is kept
    /// when the response omits it.
    pub async fn refresh_token(&self, ctx: &Context, refresh_token: &str) -> Result<Token> {
        let mut token = self
            .token_request(
                ctx,
                &Grant::RefreshToken {
                    refresh_token,
                    client_id: &self.client_id,
                    client_secret: &self.client_secret,
                },
            )
            .await?;
        token
            .refresh_token
            .get_or_insert_with(|| refresh_token.to_string());
        Ok(token)
    }

    async fn token_request(&self, ctx: &Context, grant: &Grant<'_>) -> Result<Token> {
        let body = serde_urlencoded::to_string(grant)
            .map_err(|e| Error::unexpected("failed to encode oauth2 grant").with_source(e))?;
        let url = format!("{}{API_VERSION_PREFIX}{OAUTH_TOKEN_ENDPOINT}", self.api_url());
        debug!("requesting bunq oauth2 token from {url}");

        let req = http::Request::builder()
            .method(Method::POST)
            .uri(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Bytes::from(body))?;
        let resp = ctx
            .http_send(req)
            .await
            .map_err(|e| translate(e, OAUTH_TOKEN_ENDPOINT))?;

        let (parts, body) = resp.into_parts();
        if !parts.status.is_success() {
            return Err(translate_response(parts.status, &body, OAUTH_TOKEN_ENDPOINT));
        }

        let token: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::unexpected("failed to parse bunq oauth2 token response").with_source(e)
        })?;
        Ok(token.into())
    }
}
