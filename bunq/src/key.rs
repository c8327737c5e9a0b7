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

use crate::constants::KEY_BITS;
use log::debug;
use reqbunq_core::utils::Redact;
use reqbunq_core::{Error, Result};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt::{self, Debug, Formatter};

/// RSA key pair registered with bunq at installation.
///
/// The private key signs every request after installation; the public key is
/// what `/installation` receives.
#[derive(Clone)]
pub struct KeyPair {
    private_key: RsaPrivateKey,
    private_pem: String,
    public_pem: String,
}

impl KeyPair {
    /// Generate a fresh 2048-bit RSA key pair.
    pub fn generate() -> Result<Self> {
        debug!("generating {KEY_BITS}-bit rsa key pair");
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| Error::unexpected("failed to generate rsa key").with_source(e))?;
        Self::from_private_key(private_key)
    }

    /// Rebuild a key pair from a PKCS#8 PEM private key.
    pub fn from_private_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| {
            Error::credential_invalid(format!("failed to read private key: {e}"))
        })?;
        Self::from_private_key(private_key)
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Result<Self> {
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| Error::unexpected("failed to encode private key").with_source(e))?
            .to_string();
        let public_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::unexpected("failed to encode public key").with_source(e))?;

        Ok(Self {
            private_key,
            private_pem,
            public_pem,
        })
    }

    /// The private key used for signing.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// PKCS#8 PEM of the private key.
    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    /// SPKI PEM of the public key.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &Redact::from(&self.private_pem))
            .field("public_key", &Redact::from(&self.public_pem))
            .finish()
    }
}

/// Generate a key pair and return `(private_pem, public_pem)`.
pub fn generate_key_pair() -> Result<(String, String)> {
    let pair = KeyPair::generate()?;
    Ok((pair.private_pem, pair.public_pem))
}
