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

use log::warn;
use reqbunq_core::{Error, Result};
use std::future::Future;

/// Decides whether a failed call is retried after recovering the session.
///
/// Only errors classified as an expired session are retried, and at most
/// once. There is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

impl RetryPolicy {
    /// Retry once after recovery.
    pub fn once() -> Self {
        Self { enabled: true }
    }

    /// Never retry.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Whether `err` qualifies for the single retry.
    pub fn should_retry(&self, err: &Error) -> bool {
        self.enabled && err.is_session_expired()
    }

    /// Run `op`; on a retryable error run `recover` and then `op` once more.
    ///
    /// `recover` returns `Ok(false)` when it cannot do anything, in which case
    /// the first error is returned. A failing recovery returns its own error.
    /// The result of the second attempt is returned as-is.
    pub async fn run<T, Op, OpFut, Rec, RecFut>(&self, mut op: Op, mut recover: Rec) -> Result<T>
    where
        Op: FnMut() -> OpFut,
        OpFut: Future<Output = Result<T>>,
        Rec: FnMut(&Error) -> RecFut,
        RecFut: Future<Output = Result<bool>>,
    {
        let err = match op().await {
            Ok(v) => return Ok(v),
            Err(err) => err,
        };
        if !self.should_retry(&err) {
            return Err(err);
        }

        warn!("bunq session expired, recovering and retrying once: {err}");
        if !recover(&err).await? {
            return Err(err);
        }
        op().await
    }
}
