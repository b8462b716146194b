// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight token refresh.
//!
//! Any number of callers that discover a stale or rejected token at the same
//! time collapse into exactly one call to `POST /refresh`; the one outcome is
//! fanned out to every waiter. A failed refresh is terminal for the session:
//! the credential store is cleared before any waiter sees the error.

use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RefreshError;
use crate::store::{AccessToken, CredentialStore, Session, SessionPatch};

/// Request body for `POST /refresh`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response body from `POST /refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    /// Present only when the server rotates the refresh token.
    #[serde(default)]
    refresh_token: Option<String>,
    /// Expiry as epoch seconds.
    expires_at: u64,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Session, RefreshError>>>;

/// Owner of the single authoritative in-flight refresh operation.
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    http: reqwest::Client,
    refresh_url: String,
    /// The promise cache: one shared future reused by every concurrent
    /// caller, `None` while idle.
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, http: reqwest::Client, base_url: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            http,
            refresh_url: format!("{}/refresh", base_url.trim_end_matches('/')),
            in_flight: Mutex::new(None),
        })
    }

    /// Obtain a session whose access token was just refreshed.
    ///
    /// If a refresh is already in flight this waits on it instead of starting
    /// a second network call; all waiters of one cycle observe the same
    /// resolved session or error.
    pub async fn acquire(self: &Arc<Self>) -> Result<Session, RefreshError> {
        let fut = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let fut: SharedRefresh = Arc::clone(self).run_cycle().boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        fut.await
    }

    /// Drive one refresh cycle.
    ///
    /// Resets the slot to idle before resolving, so every waiter of this
    /// cycle shares this one result and the next 401 starts a fresh cycle.
    async fn run_cycle(self: Arc<Self>) -> Result<Session, RefreshError> {
        let result = self.refresh_once().await;
        *self.in_flight.lock().await = None;
        result
    }

    /// Perform the actual refresh exchange and store update.
    async fn refresh_once(&self) -> Result<Session, RefreshError> {
        let Some(refresh_token) = self.store.read().refresh_token else {
            debug!("refresh requested but no refresh token is stored");
            self.store.clear();
            return Err(RefreshError::NoRefreshToken);
        };

        let resp = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("refresh request failed: {e}");
                self.store.clear();
                return Err(RefreshError::Transport(e.to_string()));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            warn!(status, "refresh rejected, clearing session");
            self.store.clear();
            return Err(RefreshError::Rejected { status });
        }

        let token: RefreshResponse = match resp.json().await {
            Ok(t) => t,
            Err(e) => {
                warn!("malformed refresh response: {e}");
                self.store.clear();
                return Err(RefreshError::Transport(e.to_string()));
            }
        };

        self.store.write(SessionPatch {
            access: Some(AccessToken {
                token: token.access_token,
                expires_at: token.expires_at,
            }),
            refresh_token: token.refresh_token,
            ..Default::default()
        });
        debug!("access token refreshed");
        Ok(self.store.read())
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
