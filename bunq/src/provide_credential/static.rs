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

use crate::{Credential, Environment};
use async_trait::async_trait;
use reqbunq_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider provides a fixed bunq API key.
///
/// Session material can be attached with [`StaticCredentialProvider::with_credential`]
/// to resume a persisted session.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with an API key.
    pub fn new(environment: Environment, api_key: &str) -> Self {
        Self {
            credential: Credential::new(environment, api_key),
        }
    }

    /// Provide a complete credential, e.g. one returned by `SessionManager::snapshot`.
    pub fn with_credential(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
