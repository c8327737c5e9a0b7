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

use crate::provide_credential::{
    ContextFileCredentialProvider, EnvCredentialProvider, StaticCredentialProvider,
};
use crate::{Config, Credential, Environment};
use async_trait::async_trait;
use reqbunq_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

/// DefaultCredentialProvider is a loader that will try to load credential via default chains.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Context file named by `BUNQ_CONTEXT_FILE`
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(ContextFileCredentialProvider::new());

        Self { chain }
    }

    /// Create a chain honoring the API key and context file set in `config`.
    ///
    /// Resolution order:
    ///
    /// 1. `config.api_key` with `config.environment`
    /// 2. Environment variables
    /// 3. Context file at `config.context_file`, else `BUNQ_CONTEXT_FILE`
    pub fn from_config(config: &Config) -> Self {
        let mut context_file = ContextFileCredentialProvider::new();
        if let Some(path) = &config.context_file {
            context_file = context_file.with_path(path);
        }
        let mut chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(context_file);

        if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let environment = config
                .environment
                .as_deref()
                .map(Environment::parse)
                .unwrap_or_default();
            chain = chain.push_front(StaticCredentialProvider::new(environment, api_key));
        }

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }

    /// Add a credential provider to the front of the default chain.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use reqbunq::{DefaultCredentialProvider, Environment, StaticCredentialProvider};
    ///
    /// let provider = DefaultCredentialProvider::new()
    ///     .push_front(StaticCredentialProvider::new(Environment::Sandbox, "api_key"));
    /// ```
    pub fn push_front(
        mut self,
        provider: impl ProvideCredential<Credential = Credential> + 'static,
    ) -> Self {
        self.chain = self.chain.push_front(provider);
        self
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
