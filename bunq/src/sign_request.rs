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

use crate::config::Config;
use crate::constants::*;
use crate::key::KeyPair;
use crate::sign::{canonical_header_name, sign_with_key};
use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::request::Parts;
use log::debug;
use reqbunq_core::hash::random_hex;
use reqbunq_core::utils::Redact;
use reqbunq_core::{Context, Error, Result, SignRequest, SigningCredential, SigningRequest};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Token and key used to authenticate one signed request.
///
/// During the handshake the token is the installation token; afterwards it is
/// the session token.
#[derive(Clone)]
pub struct SessionCredential {
    /// Value of `X-Bunq-Client-Authentication`.
    pub token: String,
    /// Key registered at installation.
    pub key_pair: Arc<KeyPair>,
}

impl SessionCredential {
    /// Create a credential from a token and the installed key pair.
    pub fn new(token: impl Into<String>, key_pair: Arc<KeyPair>) -> Self {
        Self {
            token: token.into(),
            key_pair,
        }
    }
}

impl Debug for SessionCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &Redact::from(&self.token))
            .field("key_pair", &self.key_pair)
            .finish()
    }
}

impl SigningCredential for SessionCredential {
    fn is_valid(&self) -> bool {
        !self.token.is_empty()
    }
}

/// RequestSigner that implements the bunq client signature.
///
/// - [bunq API: Signing](https://doc.bunq.com/basics/authentication/signing)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    language: String,
    region: String,
    geolocation: String,
    user_agent: String,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl RequestSigner {
    /// Create a signer taking default header values from config.
    pub fn new(config: &Config) -> Self {
        Self {
            language: config.language.clone(),
            region: config.region.clone(),
            geolocation: config.geolocation.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Insert the bunq default headers that are not already present.
    ///
    /// Every call gets a fresh client request id.
    pub fn fill_default_headers(&self, req: &mut SigningRequest) -> Result<()> {
        let request_id = random_hex(REQUEST_ID_BYTES);
        let defaults = [
            (HEADER_CONTENT_TYPE, DEFAULT_CONTENT_TYPE),
            (HEADER_CACHE_CONTROL, DEFAULT_CACHE_CONTROL),
            (HEADER_USER_AGENT, self.user_agent.as_str()),
            (HEADER_LANGUAGE, self.language.as_str()),
            (HEADER_REGION, self.region.as_str()),
            (HEADER_GEOLOCATION, self.geolocation.as_str()),
            (HEADER_REQUEST_ID, request_id.as_str()),
        ];

        for (name, value) in defaults {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            if !req.headers.contains_key(&name) {
                req.headers.insert(name, HeaderValue::from_str(value)?);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = SessionCredential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let mut signing_req = SigningRequest::build(req)?;
        self.fill_default_headers(&mut signing_req)?;

        // `/installation` goes out without authentication or signature.
        let Some(cred) = credential else {
            debug!("no session credential, sending {} unsigned", signing_req.path);
            return signing_req.apply(req);
        };

        let auth = HeaderName::from_bytes(HEADER_AUTHENTICATION.as_bytes())?;
        if !signing_req.headers.contains_key(&auth) {
            let mut value = HeaderValue::from_str(&cred.token)?;
            value.set_sensitive(true);
            signing_req.headers.insert(auth, value);
        }

        let headers: Vec<(String, String)> = signing_req
            .header_to_vec_without(&[HEADER_SIGNATURE])?
            .into_iter()
            .map(|(k, v)| (canonical_header_name(&k), v))
            .collect();
        let body = std::str::from_utf8(body)
            .map_err(|e| Error::request_invalid("request body is not valid utf-8").with_source(e))?;

        let signature = sign_with_key(
            cred.key_pair.private_key(),
            signing_req.method.as_str(),
            &signing_req.path,
            &headers,
            body,
        )?;

        signing_req.headers.insert(
            HeaderName::from_bytes(HEADER_SIGNATURE.as_bytes())?,
            HeaderValue::from_str(&signature)?,
        );

        signing_req.apply(req)
    }
}
