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

/// Production API base url.
pub const PRODUCTION_API_URL: &str = "https://api.bunq.com";
/// Sandbox API base url.
pub const SANDBOX_API_URL: &str = "https://public-api.sandbox.bunq.com";
/// Production OAuth2 authorization base url.
pub const PRODUCTION_OAUTH_URL: &str = "https://oauth.bunq.com";
/// Sandbox OAuth2 authorization base url.
pub const SANDBOX_OAUTH_URL: &str = "https://oauth.sandbox.bunq.com";
/// Version segment prefixed to every endpoint.
pub const API_VERSION_PREFIX: &str = "/v1";

// Endpoints used by the session handshake.
pub const INSTALLATION_ENDPOINT: &str = "/installation";
pub const DEVICE_SERVER_ENDPOINT: &str = "/device-server";
pub const SESSION_SERVER_ENDPOINT: &str = "/session-server";
pub const OAUTH_TOKEN_ENDPOINT: &str = "/oauth/token";

// Headers, named the way they appear in the signed string.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CACHE_CONTROL: &str = "Cache-Control";
pub const HEADER_USER_AGENT: &str = "User-Agent";
pub const HEADER_LANGUAGE: &str = "X-Bunq-Language";
pub const HEADER_REGION: &str = "X-Bunq-Region";
pub const HEADER_REQUEST_ID: &str = "X-Bunq-Client-Request-Id";
pub const HEADER_GEOLOCATION: &str = "X-Bunq-Geolocation";
pub const HEADER_AUTHENTICATION: &str = "X-Bunq-Client-Authentication";
pub const HEADER_SIGNATURE: &str = "X-Bunq-Client-Signature";

// Default header values.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_CACHE_CONTROL: &str = "no-cache";
pub const DEFAULT_USER_AGENT: &str = concat!("reqbunq/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_LANGUAGE: &str = "en_US";
pub const DEFAULT_REGION: &str = "nl_NL";
pub const DEFAULT_GEOLOCATION: &str = "0 0 0 0 000";

/// Page size hint sent as `count` by the paginator.
pub const DEFAULT_PAGE_SIZE: usize = 200;
/// Namespace prefixed to generated device descriptions.
pub const DEVICE_DESCRIPTION_PREFIX: &str = "reqbunq";
/// RSA modulus size used for generated keys.
pub const KEY_BITS: usize = 2048;
/// Random bytes in a client request id.
pub const REQUEST_ID_BYTES: usize = 16;

// Environment variables.
pub const BUNQ_ENVIRONMENT: &str = "BUNQ_ENVIRONMENT";
pub const BUNQ_API_KEY: &str = "BUNQ_API_KEY";
pub const BUNQ_CONTEXT_FILE: &str = "BUNQ_CONTEXT_FILE";
pub const BUNQ_DEVICE_DESCRIPTION: &str = "BUNQ_DEVICE_DESCRIPTION";
pub const BUNQ_ENDPOINT: &str = "BUNQ_ENDPOINT";
pub const BUNQ_LANGUAGE: &str = "BUNQ_LANGUAGE";
pub const BUNQ_REGION: &str = "BUNQ_REGION";
pub const BUNQ_GEOLOCATION: &str = "BUNQ_GEOLOCATION";
pub const BUNQ_USER_AGENT: &str = "BUNQ_USER_AGENT";
pub const BUNQ_PAGE_SIZE: &str = "BUNQ_PAGE_SIZE";
