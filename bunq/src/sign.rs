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

//! Request signature used by bunq.
//!
//! Every request made after installation carries `X-Bunq-Client-Signature`:
//! an RSASSA-PKCS1-v1_5 SHA-256 signature over
//!
//! ```text
//! METHOD\nPATH\nName: value\nName: value\n\nBODY
//! ```
//!
//! where the headers are sorted by name. The path includes the `/v1` prefix.

use log::debug;
use reqbunq_core::hash::{base64_decode, base64_encode};
use reqbunq_core::{Error, Result, SigningRequest};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Build the string that gets signed.
///
/// Header insertion order does not matter: headers are sorted by name.
pub fn string_to_sign(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    body: &str,
) -> String {
    let headers = SigningRequest::header_to_string(headers.to_vec(), ": ", "\n");
    format!("{method}\n{path}\n{headers}\n\n{body}")
}

/// Convert a header name to the Title-Case form bunq expects in the signed string.
///
/// `http::HeaderMap` stores names in lowercase, so `x-bunq-client-request-id`
/// becomes `X-Bunq-Client-Request-Id`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Sign a request with a PKCS#8 PEM private key, returning base64.
pub fn sign(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    body: &str,
    private_key_pem: &str,
) -> Result<String> {
    let key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| Error::credential_invalid(format!("failed to read private key: {e}")))?;
    sign_with_key(&key, method, path, headers, body)
}

/// Sign a request with an already decoded private key, returning base64.
pub fn sign_with_key(
    key: &RsaPrivateKey,
    method: &str,
    path: &str,
    headers: &[(String, String)],
    body: &str,
) -> Result<String> {
    let string_to_sign = string_to_sign(method, path, headers, body);
    debug!("calculated string to sign: {string_to_sign}");

    let signing_key = SigningKey::<Sha256>::new(key.clone());
    let signature = signing_key
        .try_sign(string_to_sign.as_bytes())
        .map_err(|e| Error::unexpected("failed to sign request").with_source(e))?;

    Ok(base64_encode(&signature.to_bytes()))
}

/// Verify a base64 signature against a PEM public key.
///
/// Returns `Ok(false)` when the signature does not match.
pub fn verify(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    body: &str,
    public_key_pem: &str,
    signature: &str,
) -> Result<bool> {
    let key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| Error::credential_invalid(format!("failed to read public key: {e}")))?;
    let raw = base64_decode(signature)?;
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return Ok(false);
    };

    let string_to_sign = string_to_sign(method, path, headers, body);
    Ok(VerifyingKey::<Sha256>::new(key)
        .verify(string_to_sign.as_bytes(), &signature)
        .is_ok())
}
