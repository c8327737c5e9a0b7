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

//! The installation, device registration and session handshake.
//!
//! [`SessionState`] is an explicit state machine; each transition performs
//! one API call and yields a new state. [`SessionManager`] owns the current
//! state for one credential and serialises every change to it.

use crate::config::Config;
use crate::constants::*;
use crate::credential::Credential;
use crate::key::KeyPair;
use crate::request::{ApiRequest, Transport};
use crate::response::{response_items, token_at, ResponseItem};
use crate::sign_request::SessionCredential;
use log::{debug, info};
use reqbunq_core::hash::random_hex;
use reqbunq_core::utils::Redact;
use reqbunq_core::{Error, Result};
use serde_json::{json, Value};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of `POST /installation`.
#[derive(Clone, PartialEq, Eq)]
pub struct Installation {
    /// Token authenticating device and session registration.
    pub token: String,
    /// Key the server signs its responses with.
    pub server_public_key: Option<String>,
}

impl Debug for Installation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installation")
            .field("token", &Redact::from(&self.token))
            .field("server_public_key", &self.server_public_key.is_some())
            .finish()
    }
}

/// Result of `POST /device-server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Description the device was registered with.
    pub description: String,
    /// Device server id, when the response carried one.
    pub id: Option<u64>,
}

/// Result of `POST /session-server`.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Token sent as `X-Bunq-Client-Authentication` on ordinary calls.
    pub token: String,
    /// The user owning the API key.
    pub user_id: Option<u64>,
    /// Increases every time the manager replaces the session.
    pub generation: u64,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &Redact::from(&self.token))
            .field("user_id", &self.user_id)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Handshake progress for one credential.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Nothing exists yet.
    #[default]
    Uninitialized,
    /// A key pair exists but has not been installed.
    KeysGenerated {
        /// Key pair to install.
        key_pair: Arc<KeyPair>,
    },
    /// The public key is installed; no device is registered.
    Installed {
        /// Installed key pair.
        key_pair: Arc<KeyPair>,
        /// Installation result.
        installation: Installation,
    },
    /// A device is registered; no session exists.
    DeviceRegistered {
        /// Installed key pair.
        key_pair: Arc<KeyPair>,
        /// Installation result.
        installation: Installation,
        /// Registered device.
        device: Device,
    },
    /// Ready for ordinary API calls.
    Active {
        /// Installed key pair.
        key_pair: Arc<KeyPair>,
        /// Installation result.
        installation: Installation,
        /// Registered device.
        device: Device,
        /// Current session.
        session: Session,
    },
}

impl SessionState {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::KeysGenerated { .. } => "keys_generated",
            SessionState::Installed { .. } => "installed",
            SessionState::DeviceRegistered { .. } => "device_registered",
            SessionState::Active { .. } => "active",
        }
    }

    /// Whether ordinary API calls can be made.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }

    /// The key pair, once generated.
    pub fn key_pair(&self) -> Option<&Arc<KeyPair>> {
        match self {
            SessionState::Uninitialized => None,
            SessionState::KeysGenerated { key_pair }
            | SessionState::Installed { key_pair, .. }
            | SessionState::DeviceRegistered { key_pair, .. }
            | SessionState::Active { key_pair, .. } => Some(key_pair),
        }
    }

    /// The current session, if active.
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Credential for ordinary calls, if active.
    pub fn session_credential(&self) -> Option<SessionCredential> {
        match self {
            SessionState::Active {
                key_pair, session, ..
            } => Some(SessionCredential::new(&session.token, key_pair.clone())),
            _ => None,
        }
    }

    /// Rebuild the deepest consistent state from persisted fields.
    ///
    /// Fields that depend on a missing earlier step are ignored, so a session
    /// token without an installation token is dropped.
    pub fn from_credential(cred: &Credential) -> Result<Self> {
        let Some(pem) = cred.private_key.as_deref() else {
            return Ok(SessionState::Uninitialized);
        };
        let key_pair = Arc::new(KeyPair::from_private_pem(pem)?);

        let Some(token) = cred.installation_token.clone() else {
            return Ok(SessionState::KeysGenerated { key_pair });
        };
        let installation = Installation {
            token,
            server_public_key: cred.server_public_key.clone(),
        };

        let Some(description) = cred.device_description.clone() else {
            return Ok(SessionState::Installed {
                key_pair,
                installation,
            });
        };
        let device = Device {
            description,
            id: cred.device_id,
        };

        let Some(token) = cred.session_token.clone() else {
            return Ok(SessionState::DeviceRegistered {
                key_pair,
                installation,
                device,
            });
        };

        Ok(SessionState::Active {
            key_pair,
            installation,
            device,
            session: Session {
                token,
                user_id: cred.user_id,
                generation: 0,
            },
        })
    }

    /// Export the durable fields on top of `base`'s API key and environment.
    pub fn to_credential(&self, base: &Credential) -> Credential {
        let mut cred = Credential::new(base.environment, &base.api_key);

        if let Some(key_pair) = self.key_pair() {
            cred.private_key = Some(key_pair.private_pem().to_string());
        }
        match self {
            SessionState::Uninitialized | SessionState::KeysGenerated { .. } => {}
            SessionState::Installed { installation, .. } => {
                cred.installation_token = Some(installation.token.clone());
                cred.server_public_key = installation.server_public_key.clone();
            }
            SessionState::DeviceRegistered {
                installation,
                device,
                ..
            } => {
                cred.installation_token = Some(installation.token.clone());
                cred.server_public_key = installation.server_public_key.clone();
                cred.device_description = Some(device.description.clone());
                cred.device_id = device.id;
            }
            SessionState::Active {
                installation,
                device,
                session,
                ..
            } => {
                cred.installation_token = Some(installation.token.clone());
                cred.server_public_key = installation.server_public_key.clone();
                cred.device_description = Some(device.description.clone());
                cred.device_id = device.id;
                cred.session_token = Some(session.token.clone());
                cred.user_id = session.user_id;
            }
        }
        cred
    }
}

/// Performs the handshake calls.
#[derive(Debug, Clone)]
pub struct SessionBootstrapper {
    transport: Transport,
    api_key: String,
    device_description: Option<String>,
}

impl SessionBootstrapper {
    /// Create a bootstrapper registering `api_key` through `transport`.
    pub fn new(transport: Transport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            device_description: None,
        }
    }

    /// Use a fixed device description instead of a generated one.
    pub fn with_device_description(mut self, description: Option<String>) -> Self {
        self.device_description = description;
        self
    }

    /// Perform the next transition. `Active` is returned unchanged.
    pub async fn advance(&self, state: &SessionState, generation: u64) -> Result<SessionState> {
        let next = match state {
            SessionState::Uninitialized => SessionState::KeysGenerated {
                key_pair: Arc::new(KeyPair::generate()?),
            },
            SessionState::KeysGenerated { key_pair } => SessionState::Installed {
                key_pair: key_pair.clone(),
                installation: self.install(key_pair).await?,
            },
            SessionState::Installed {
                key_pair,
                installation,
            } => SessionState::DeviceRegistered {
                key_pair: key_pair.clone(),
                installation: installation.clone(),
                device: self.register_device(key_pair, installation).await?,
            },
            SessionState::DeviceRegistered {
                key_pair,
                installation,
                device,
            } => SessionState::Active {
                key_pair: key_pair.clone(),
                installation: installation.clone(),
                device: device.clone(),
                session: self
                    .create_session(key_pair, installation, generation)
                    .await?,
            },
            SessionState::Active { .. } => state.clone(),
        };

        debug!("bunq session state: {} -> {}", state.name(), next.name());
        Ok(next)
    }

    /// Advance until the state is `Active`.
    ///
    /// Steps already completed in `state` are not repeated.
    pub async fn bootstrap(&self, state: &SessionState, generation: u64) -> Result<SessionState> {
        let mut current = state.clone();
        while !current.is_active() {
            current = self.advance(&current, generation).await?;
        }
        Ok(current)
    }

    /// Replace the session of an active or device-registered state.
    pub async fn recreate_session(
        &self,
        state: &SessionState,
        generation: u64,
    ) -> Result<SessionState> {
        match state {
            SessionState::Active {
                key_pair,
                installation,
                device,
                ..
            } => Ok(SessionState::Active {
                key_pair: key_pair.clone(),
                installation: installation.clone(),
                device: device.clone(),
                session: self
                    .create_session(key_pair, installation, generation)
                    .await?,
            }),
            other => self.bootstrap(other, generation).await,
        }
    }

    async fn install(&self, key_pair: &KeyPair) -> Result<Installation> {
        let req = ApiRequest::post(INSTALLATION_ENDPOINT)
            .with_body(json!({ "client_public_key": key_pair.public_pem() }));
        let resp = self.transport.send(&req, None).await?;

        let installation = Installation {
            token: token_at(&resp, 1)?,
            server_public_key: response_items(&resp)
                .iter()
                .find_map(|item| item.get("ServerPublicKey"))
                .and_then(|v| v.get("server_public_key"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        info!("installed bunq client public key");
        Ok(installation)
    }

    async fn register_device(
        &self,
        key_pair: &Arc<KeyPair>,
        installation: &Installation,
    ) -> Result<Device> {
        let description = self
            .device_description
            .clone()
            .unwrap_or_else(|| format!("{DEVICE_DESCRIPTION_PREFIX}-{}", random_hex(8)));

        let req = ApiRequest::post(DEVICE_SERVER_ENDPOINT).with_body(json!({
            "description": description,
            "secret": self.api_key,
        }));
        let cred = SessionCredential::new(&installation.token, key_pair.clone());
        let resp = self.transport.send(&req, Some(&cred)).await?;

        let id = response_items(&resp)
            .first()
            .and_then(|item| item.get("Id"))
            .and_then(|v| v.get("id"))
            .and_then(Value::as_u64);
        info!("registered bunq device {description}");
        Ok(Device { description, id })
    }

    async fn create_session(
        &self,
        key_pair: &Arc<KeyPair>,
        installation: &Installation,
        generation: u64,
    ) -> Result<Session> {
        let req =
            ApiRequest::post(SESSION_SERVER_ENDPOINT).with_body(json!({ "secret": self.api_key }));
        let cred = SessionCredential::new(&installation.token, key_pair.clone());
        let resp = self.transport.send(&req, Some(&cred)).await?;

        let user_id = response_items(&resp)
            .get(2)
            .and_then(ResponseItem::decode)
            .filter(|item| item.entity.is_user())
            .and_then(|item| item.id());
        info!("created bunq session for user {user_id:?}");

        Ok(Session {
            token: token_at(&resp, 1)?,
            user_id,
            generation,
        })
    }
}

/// A ready session handed out by [`SessionManager::ready`].
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Credential to sign ordinary calls with.
    pub credential: SessionCredential,
    /// The user owning the session.
    pub user_id: Option<u64>,
    /// Generation to pass to [`SessionManager::refresh`] when this session expires.
    pub generation: u64,
}

struct Inner {
    state: Arc<SessionState>,
    next_generation: u64,
}

/// Owns the session state of one credential.
///
/// All transitions happen under one lock: concurrent callers that find the
/// session missing or expired wait for a single bootstrap instead of racing.
pub struct SessionManager {
    bootstrapper: SessionBootstrapper,
    base: Credential,
    inner: Mutex<Inner>,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("bootstrapper", &self.bootstrapper)
            .field("credential", &self.base)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager, resuming from whatever `credential` already holds.
    pub fn new(transport: Transport, config: &Config, credential: Credential) -> Result<Self> {
        if credential.api_key.is_empty() {
            return Err(Error::credential_invalid("bunq credential has no api key"));
        }

        let state = SessionState::from_credential(&credential)?;
        debug!("resuming bunq session in state {}", state.name());

        let device_description = config
            .device_description
            .clone()
            .or_else(|| credential.device_description.clone());
        let bootstrapper = SessionBootstrapper::new(transport, &credential.api_key)
            .with_device_description(device_description);

        Ok(Self {
            bootstrapper,
            base: credential,
            inner: Mutex::new(Inner {
                state: Arc::new(state),
                next_generation: 1,
            }),
        })
    }

    /// The credential this manager was created from.
    pub fn credential(&self) -> &Credential {
        &self.base
    }

    /// Current state without triggering any call.
    pub async fn state(&self) -> Arc<SessionState> {
        self.inner.lock().await.state.clone()
    }

    /// Return an active session, bootstrapping first when needed.
    pub async fn ready(&self) -> Result<ActiveSession> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_active() {
            self.drive(&mut inner).await?;
        }
        active(&inner.state)
    }

    // Each completed step is stored right away so a failure later in the
    // handshake does not repeat installation or device registration.
    async fn drive(&self, inner: &mut Inner) -> Result<()> {
        let generation = inner.next_generation;
        while !inner.state.is_active() {
            let next = self.bootstrapper.advance(&inner.state, generation).await?;
            inner.state = Arc::new(next);
        }
        inner.next_generation += 1;
        Ok(())
    }

    /// Replace the session observed as `generation`.
    ///
    /// When another caller already replaced it, nothing is sent and the
    /// newer session is returned.
    pub async fn refresh(&self, generation: u64) -> Result<ActiveSession> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.state.session() {
            if session.generation != generation {
                debug!("bunq session {generation} already replaced, reusing current session");
                return active(&inner.state);
            }
        }

        if !inner.state.is_active() {
            self.drive(&mut inner).await?;
            return active(&inner.state);
        }

        let next = inner.next_generation;
        let state = self.bootstrapper.recreate_session(&inner.state, next).await?;
        inner.next_generation += 1;
        inner.state = Arc::new(state);
        active(&inner.state)
    }

    /// Forget everything derived from the API key.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = Arc::new(SessionState::Uninitialized);
    }

    /// Persistable view of the current state.
    pub async fn snapshot(&self) -> Credential {
        self.inner.lock().await.state.to_credential(&self.base)
    }
}

fn active(state: &SessionState) -> Result<ActiveSession> {
    match state {
        SessionState::Active {
            key_pair, session, ..
        } => Ok(ActiveSession {
            credential: SessionCredential::new(&session.token, key_pair.clone()),
            user_id: session.user_id,
            generation: session.generation,
        }),
        other => Err(Error::unexpected(format!(
            "bunq session is {} after bootstrap",
            other.name()
        ))),
    }
}
