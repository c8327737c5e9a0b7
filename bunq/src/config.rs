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
use crate::credential::Environment;
use log::warn;
use reqbunq_core::utils::Redact;
use reqbunq_core::Context;
use std::fmt::{self, Debug, Formatter};

/// Config carries all the configuration for the bunq client.
#[derive(Clone)]
pub struct Config {
    /// `environment` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BUNQ_ENVIRONMENT`]
    pub environment: Option<String>,
    /// `api_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BUNQ_API_KEY`]
    pub api_key: Option<String>,
    /// `context_file` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BUNQ_CONTEXT_FILE`]
    pub context_file: Option<String>,
    /// `device_description` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BUNQ_DEVICE_DESCRIPTION`]
    ///
    /// A `reqbunq-<random hex>` description is generated when unset.
    pub device_description: Option<String>,
    /// `endpoint` overrides the environment's API url. It will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`BUNQ_ENDPOINT`]
    pub endpoint: Option<String>,
    /// `language` defaults to `en_US`, env value: [`BUNQ_LANGUAGE`]
    pub language: String,
    /// `region` defaults to `nl_NL`, env value: [`BUNQ_REGION`]
    pub region: String,
    /// `geolocation` defaults to `0 0 0 0 000`, env value: [`BUNQ_GEOLOCATION`]
    pub geolocation: String,
    /// `user_agent` defaults to `reqbunq/<version>`, env value: [`BUNQ_USER_AGENT`]
    pub user_agent: String,
    /// `page_size` defaults to 200, env value: [`BUNQ_PAGE_SIZE`]
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: None,
            api_key: None,
            context_file: None,
            device_description: None,
            endpoint: None,
            language: DEFAULT_LANGUAGE.to_string(),
            region: DEFAULT_REGION.to_string(),
            geolocation: DEFAULT_GEOLOCATION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("api_key", &Redact::from(&self.api_key))
            .field("context_file", &self.context_file)
            .field("device_description", &self.device_description)
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .field("region", &self.region)
            .field("geolocation", &self.geolocation)
            .field("user_agent", &self.user_agent)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if let Some(v) = ctx.env_var(BUNQ_ENVIRONMENT) {
            self.environment.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(BUNQ_API_KEY) {
            self.api_key.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(BUNQ_CONTEXT_FILE) {
            self.context_file.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(BUNQ_DEVICE_DESCRIPTION) {
            self.device_description.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(BUNQ_ENDPOINT) {
            self.endpoint.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var(BUNQ_LANGUAGE) {
            self.language = v;
        }
        if let Some(v) = ctx.env_var(BUNQ_REGION) {
            self.region = v;
        }
        if let Some(v) = ctx.env_var(BUNQ_GEOLOCATION) {
            self.geolocation = v;
        }
        if let Some(v) = ctx.env_var(BUNQ_USER_AGENT) {
            self.user_agent = v;
        }
        if let Some(v) = ctx.env_var(BUNQ_PAGE_SIZE) {
            match v.parse::<usize>() {
                Ok(size) if size > 0 => self.page_size = size,
                _ => warn!("ignoring invalid {BUNQ_PAGE_SIZE}: {v}"),
            }
        }

        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the environment name, `production` or `sandbox`.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment.as_str().to_string());
        self
    }

    /// Override the API base url.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the device description registered at `/device-server`.
    pub fn with_device_description(mut self, description: impl Into<String>) -> Self {
        self.device_description = Some(description.into());
        self
    }

    /// Set the page size used by list requests.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Base url for requests made with a credential of `environment`.
    pub fn base_url(&self, environment: Environment) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| environment.api_url())
            .trim_end_matches('/')
            .to_string()
    }
}
