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

use crate::{constants::*, Credential};
use async_trait::async_trait;
use log::debug;
use reqbunq_core::{Context, Error, ProvideCredential, Result};

/// ContextFileCredentialProvider loads a persisted bunq context from a JSON file.
///
/// The file holds a serialized [`Credential`], typically written from
/// `SessionManager::snapshot()`. Loading it lets a process resume the session
/// without a new installation or device registration.
///
/// The path is taken from [`ContextFileCredentialProvider::with_path`], then
/// from `BUNQ_CONTEXT_FILE`. `~` is expanded to the home dir.
#[derive(Debug, Default, Clone)]
pub struct ContextFileCredentialProvider {
    path: Option<String>,
}

impl ContextFileCredentialProvider {
    /// Create a provider reading the path from `BUNQ_CONTEXT_FILE`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the context from `path`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for ContextFileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(path) = self
            .path
            .clone()
            .or_else(|| ctx.env_var(BUNQ_CONTEXT_FILE))
            .filter(|p| !p.is_empty())
        else {
            return Ok(None);
        };
        let path = ctx.expand_home_dir(&path).ok_or_else(|| {
            Error::config_invalid(format!("cannot expand home dir in {path}"))
        })?;

        debug!("loading bunq context from {path}");
        let content = ctx.file_read(&path).await.map_err(|e| {
            Error::credential_invalid(format!("failed to read bunq context file {path}"))
                .with_source(e)
        })?;

        let cred = Credential::from_json(&content)?;
        if cred.api_key.is_empty() {
            debug!("bunq context file {path} has no api key");
            return Ok(None);
        }
        Ok(Some(cred))
    }
}
