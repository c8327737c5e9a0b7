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
use crate::credential::Credential;
use crate::error::{translate, translate_response};
use crate::oauth2::{OAuth2Config, Token};
use crate::request::{ApiRequest, Transport};
use crate::response::response_items;
use crate::retry::RetryPolicy;
use crate::session::SessionManager;
use crate::sign_request::RequestSigner;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use http::Method;
use log::debug;
use reqbunq_core::{Context, Error, ProvideCredential, Result, SigningCredential};
use serde_json::{json, Value};
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OnceCell};

/// Path of the user collection, scoped to `user_id` when known.
///
/// `user_endpoint(Some(1))` is `/user/1`, `user_endpoint(None)` is `/user`.
pub fn user_endpoint(user_id: Option<u64>) -> String {
    match user_id {
        Some(id) => format!("/user/{id}"),
        None => "/user".to_string(),
    }
}

struct ApiKeySession {
    manager: SessionManager,
    transport: Transport,
}

enum Auth {
    ApiKey {
        provider: Box<dyn ProvideCredential<Credential = Credential>>,
        session: OnceCell<ApiKeySession>,
    },
    OAuth2 {
        config: OAuth2Config,
        token: Mutex<Token>,
    },
}

/// A downloaded statement export.
#[derive(Debug, Clone)]
pub struct StatementDownload {
    /// Export id.
    pub statement_id: u64,
    /// `CSV`, `MT940` or `PDF`.
    pub format: Option<String>,
    /// Content type reported by bunq.
    pub content_type: String,
    /// Url the content was fetched from.
    pub download_url: String,
    /// Raw file content.
    pub data: Bytes,
}

/// Client for the bunq API.
///
/// With an API key every request is signed and runs on a session that is
/// created on first use. A request failing because the session expired is
/// retried once on a fresh session.
///
/// ```no_run
/// use reqbunq::{ApiRequest, Client, Config, DefaultCredentialProvider};
/// use reqbunq_core::{Context, OsEnv};
///
/// # async fn example() -> reqbunq_core::Result<()> {
/// let ctx = Context::new().with_env(OsEnv);
/// let config = Config::default().from_env(&ctx);
/// let client = Client::new(ctx, config, DefaultCredentialProvider::new());
///
/// let users = client.request(ApiRequest::get("/user")).await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    ctx: Context,
    config: Config,
    signer: RequestSigner,
    retry: RetryPolicy,
    auth: Auth,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mode = match &self.auth {
            Auth::ApiKey { .. } => "api_key",
            Auth::OAuth2 { .. } => "oauth2",
        };
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .field("auth", &mode)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client authenticating with an API key loaded from `provider`.
    pub fn new(
        ctx: Context,
        config: Config,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        let signer = RequestSigner::new(&config);
        Self {
            ctx,
            config,
            signer,
            retry: RetryPolicy::default(),
            auth: Auth::ApiKey {
                provider: Box::new(provider),
                session: OnceCell::new(),
            },
        }
    }

    /// Create a client sending an OAuth2 bearer token instead of signing.
    pub fn with_oauth2(ctx: Context, config: Config, oauth2: OAuth2Config, token: Token) -> Self {
        let signer = RequestSigner::new(&config);
        Self {
            ctx,
            config,
            signer,
            retry: RetryPolicy::default(),
            auth: Auth::OAuth2 {
                config: oauth2,
                token: Mutex::new(token),
            },
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The context used for all I/O.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The client configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn api_key_session(&self) -> Result<&ApiKeySession> {
        let Auth::ApiKey { provider, session } = &self.auth else {
            return Err(Error::config_invalid("oauth2 clients have no bunq session"));
        };

        session
            .get_or_try_init(|| async {
                let cred = provider
                    .provide_credential(&self.ctx)
                    .await?
                    .ok_or_else(|| Error::credential_invalid("no bunq credential found"))?;
                if !cred.is_valid() {
                    return Err(Error::credential_invalid("bunq credential has no api key"));
                }

                let transport = Transport::new(
                    self.ctx.clone(),
                    self.signer.clone(),
                    self.config.base_url(cred.environment),
                );
                let manager = SessionManager::new(transport.clone(), &self.config, cred)?;
                Ok::<_, Error>(ApiKeySession { manager, transport })
            })
            .await
    }

    /// The session manager of an API key client.
    ///
    /// Use it to persist the session with [`SessionManager::snapshot`] or to
    /// start over with [`SessionManager::clear`].
    pub async fn session_manager(&self) -> Result<&SessionManager> {
        Ok(&self.api_key_session().await?.manager)
    }

    /// The current OAuth2 token, `None` for API key clients.
    pub async fn oauth2_token(&self) -> Option<Token> {
        match &self.auth {
            Auth::OAuth2 { token, .. } => Some(token.lock().await.clone()),
            Auth::ApiKey { .. } => None,
        }
    }

    /// Id of the user owning the session.
    ///
    /// Bootstraps the session if needed; always `None` for OAuth2 clients.
    pub async fn user_id(&self) -> Result<Option<u64>> {
        match &self.auth {
            Auth::ApiKey { .. } => Ok(self.session_manager().await?.ready().await?.user_id),
            Auth::OAuth2 { .. } => Ok(None),
        }
    }

    /// Send one request and return the decoded JSON response.
    pub async fn request(&self, req: ApiRequest) -> Result<Value> {
        match &self.auth {
            Auth::ApiKey { .. } => {
                let session = self.api_key_session().await?;
                self.request_signed(session, &req).await
            }
            Auth::OAuth2 { config, token } => self.request_bearer(config, token, &req).await,
        }
    }

    async fn request_signed(&self, session: &ApiKeySession, req: &ApiRequest) -> Result<Value> {
        let manager = &session.manager;
        let transport = &session.transport;
        let observed = AtomicU64::new(0);
        let observed = &observed;

        self.retry
            .run(
                move || async move {
                    let active = manager.ready().await?;
                    observed.store(active.generation, Ordering::SeqCst);
                    transport.send(req, Some(&active.credential)).await
                },
                move |_| async move {
                    manager.refresh(observed.load(Ordering::SeqCst)).await?;
                    Ok::<_, Error>(true)
                },
            )
            .await
    }

    async fn request_bearer(
        &self,
        oauth2: &OAuth2Config,
        token: &Mutex<Token>,
        req: &ApiRequest,
    ) -> Result<Value> {
        let base_url = match &self.config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => oauth2.api_url(),
        };
        let transport = &Transport::new(self.ctx.clone(), self.signer.clone(), base_url);
        let observed = &Mutex::new(String::new());
        let ctx = &self.ctx;

        self.retry
            .run(
                move || async move {
                    let access_token = token.lock().await.access_token.clone();
                    let req = req
                        .clone()
                        .with_header(AUTHORIZATION.as_str(), format!("Bearer {access_token}"));
                    *observed.lock().await = access_token;
                    transport.send(&req, None).await
                },
                move |_| async move {
                    let mut current = token.lock().await;
                    if current.access_token != *observed.lock().await {
                        debug!("oauth2 token already refreshed by another request");
                        return Ok(true);
                    }
                    let Some(refresh_token) = current.refresh_token.clone() else {
                        return Ok(false);
                    };
                    *current = oauth2.refresh_token(ctx, &refresh_token).await?;
                    Ok::<_, Error>(true)
                },
            )
            .await
    }

    /// Fetch an absolute url without signing, e.g. a statement `download_url`.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        self.send_unsigned(Method::GET, url, None, Bytes::new()).await
    }

    /// Put raw bytes to an absolute url without signing.
    ///
    /// Used for the second step of an attachment upload, where bunq hands out
    /// a pre-authorized url.
    pub async fn upload(&self, url: &str, content_type: &str, data: Bytes) -> Result<Bytes> {
        self.send_unsigned(Method::PUT, url, Some(content_type), data).await
    }

    async fn send_unsigned(
        &self,
        method: Method,
        url: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<Bytes> {
        let mut req = http::Request::builder()
            .method(method)
            .uri(url)
            .header(USER_AGENT, &self.config.user_agent);
        if let Some(content_type) = content_type {
            req = req
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_LENGTH, body.len());
        }
        let req = req.body(body)?;

        let resp = self
            .ctx
            .http_send(req)
            .await
            .map_err(|e| translate(e, url))?;
        let (parts, body) = resp.into_parts();
        if !parts.status.is_success() {
            return Err(translate_response(parts.status, &body, url));
        }
        Ok(body)
    }

    /// Create a public attachment and upload its content.
    ///
    /// The metadata is posted to `/user/{id}/attachment-public` as a signed
    /// request, then `data` is put to the `attachment.urls.public` url from
    /// the response. Returns the response of the metadata call.
    pub async fn upload_attachment(
        &self,
        user_id: Option<u64>,
        description: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<Value> {
        let endpoint = format!("{}/attachment-public", user_endpoint(user_id));
        let body = json!({
            "description": description,
            "content_type": content_type,
        });
        let resp = self
            .request(ApiRequest::post(endpoint.as_str()).with_body(body))
            .await?;

        let upload_url = response_items(&resp)
            .iter()
            .find_map(|item| item.get("AttachmentPublic"))
            .and_then(|attachment| attachment.pointer("/attachment/urls/public"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::unexpected("attachment response carries no upload url")
                    .with_endpoint(&endpoint)
            })?;

        debug!("uploading {} bytes of {content_type} attachment", data.len());
        self.upload(upload_url, content_type, data).await?;
        Ok(resp)
    }

    /// Download a completed statement export.
    ///
    /// Fails when the export does not exist or is not `COMPLETED` yet.
    pub async fn download_statement(
        &self,
        user_id: Option<u64>,
        account_id: u64,
        statement_id: u64,
    ) -> Result<StatementDownload> {
        let endpoint = format!(
            "{}/monetary-account/{account_id}/export-statement/{statement_id}",
            user_endpoint(user_id)
        );
        let resp = self.request(ApiRequest::get(endpoint)).await?;

        let export = response_items(&resp)
            .first()
            .and_then(|item| item.get("ExportStatement"))
            .ok_or_else(|| Error::request_invalid(format!("Statement {statement_id} not found")))?;

        let status = export.get("status").and_then(Value::as_str).unwrap_or("");
        let download_url = export.get("download_url").and_then(Value::as_str);
        let Some(download_url) = download_url.filter(|_| status == "COMPLETED") else {
            return Err(Error::request_invalid(format!(
                "Statement {statement_id} is not ready for download. Status: {status}"
            )));
        };

        let data = self.download(download_url).await?;
        Ok(StatementDownload {
            statement_id,
            format: export
                .get("statement_format")
                .and_then(Value::as_str)
                .map(str::to_string),
            content_type: export
                .get("content_type")
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream")
                .to_string(),
            download_url: download_url.to_string(),
            data,
        })
    }
}
