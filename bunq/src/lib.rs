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

//! Signed requests and session handling for the bunq API.
//!
//! This crate talks to the bunq public API the way bunq requires: every
//! request carries bunq's default headers and is signed with an RSA key that
//! was registered through the installation, device and session handshake.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqbunq::{ApiRequest, Client, Config, DefaultCredentialProvider};
//! use reqbunq_core::{Context, OsEnv, Result};
//! use reqbunq_file_read_tokio::TokioFileRead;
//! use reqbunq_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     let config = Config::default().from_env(&ctx);
//!     let provider = DefaultCredentialProvider::from_config(&config);
//!     let client = Client::new(ctx, config, provider);
//!
//!     // The first request installs the key, registers the device and opens a session.
//!     let user_id = client.user_id().await?;
//!     let accounts = client
//!         .request_all(ApiRequest::get(format!(
//!             "{}/monetary-account",
//!             reqbunq::user_endpoint(user_id)
//!         )))
//!         .await?;
//!     println!("{} accounts", accounts.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! ### Environment Variables
//!
//! ```bash
//! export BUNQ_API_KEY=your-api-key
//! export BUNQ_ENVIRONMENT=production  # Optional, defaults to sandbox
//! ```
//!
//! ### Context File
//!
//! A session persisted with `SessionManager::snapshot` and
//! `Credential::to_json` can be loaded again from the file named by
//! `BUNQ_CONTEXT_FILE`, which skips installation and device registration.
//!
//! ## Sessions
//!
//! A request failing because the session expired is retried once on a fresh
//! session. Concurrent requests share one handshake.
//!
//! ## OAuth2
//!
//! [`OAuth2Config`] implements the authorization code and refresh grants.
//! [`Client::with_oauth2`] sends the access token as a bearer token instead of
//! signing requests.

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::{get_api_url, Credential, Environment};

mod key;
pub use key::{generate_key_pair, KeyPair};

mod sign;
pub use sign::{canonical_header_name, sign, sign_with_key, string_to_sign, verify};

mod sign_request;
pub use sign_request::{RequestSigner, SessionCredential};

mod error;
pub use error::{error_description, mentions_invalid_session, translate, translate_response};

mod request;
pub use request::{ApiRequest, Transport};

mod response;
pub use response::{
    format_item, format_response, item_id, response_items, token_at, EntityType, Pagination,
    ResponseItem,
};

mod session;
pub use session::{
    ActiveSession, Device, Installation, Session, SessionBootstrapper, SessionManager,
    SessionState,
};

mod retry;
pub use retry::RetryPolicy;

mod client;
pub use client::{user_endpoint, Client, StatementDownload};

mod paginate;
pub use paginate::paginate;

mod oauth2;
pub use oauth2::{OAuth2Config, Token, DEFAULT_SCOPE};

mod webhook;
pub use webhook::{Notification, NotificationFilter, WebhookSubscription, MUTATION_CREATED};

mod provide_credential;
pub use provide_credential::*;
