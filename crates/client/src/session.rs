// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: login, logout, and the cached current-user profile.
//!
//! The UI-visible state machine is just LoggedOut -> LoggedIn -> LoggedOut;
//! token staleness never surfaces here, it is handled inside
//! [`ApiClient`](crate::http::ApiClient).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::http::ApiClient;
use crate::store::{AccessToken, CredentialStore, SessionPatch, UserProfile};

/// Response body from `POST /login`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    /// Expiry as epoch seconds.
    expires_at: u64,
    user: UserProfile,
}

/// High-level session API consumed by the UI.
pub struct SessionService {
    api: ApiClient,
}

impl SessionService {
    pub fn new(config: &ClientConfig, store: Arc<CredentialStore>) -> Self {
        Self { api: ApiClient::new(config, store) }
    }

    /// The authenticated client, for endpoints beyond the session layer.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Exchange credentials for a session.
    ///
    /// On success the tokens, user id, and fresh profile land in the store as
    /// one patch, replacing any profile cached for a previous user. A failed
    /// login mutates nothing.
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<UserProfile> {
        let body = json!({ "email": email, "password": password });
        let resp = self.api.post_public("/login", &body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("login failed ({status}): {text}");
        }
        let login: LoginResponse = resp.json().await?;

        self.api.store().write(SessionPatch {
            access: Some(AccessToken {
                token: login.access_token,
                expires_at: login.expires_at,
            }),
            refresh_token: Some(login.refresh_token),
            user_id: Some(login.user.id.clone()),
            cached_profile: Some(login.user.clone()),
        });
        info!(user = %login.user.id, "logged in");
        Ok(login.user)
    }

    /// Clear the local session.
    ///
    /// Never makes a network call: clearing local state must succeed even
    /// when the server is unreachable.
    pub fn logout(&self) {
        self.api.store().clear();
        info!("logged out");
    }

    /// The current user's profile, or `None` when not logged in.
    ///
    /// Served from the cache when the cached profile belongs to the stored
    /// user id; otherwise fetched through the authenticated client and
    /// re-cached. The not-logged-in path makes no request and cannot fail.
    pub async fn current_user(&self) -> anyhow::Result<Option<UserProfile>> {
        let session = self.api.store().read();
        let Some(user_id) = session.user_id else {
            return Ok(None);
        };

        if let Some(profile) = session.cached_profile {
            if profile.id == user_id {
                return Ok(Some(profile));
            }
            // Never serve a profile cached for a different user.
            debug!(cached = %profile.id, current = %user_id, "dropping mismatched cached profile");
        }

        let resp = self.api.get(&format!("/users/{user_id}")).await?;
        if !resp.status().is_success() {
            anyhow::bail!("profile fetch failed ({})", resp.status());
        }
        let profile: UserProfile = resp.json().await?;
        self.api.store().write(SessionPatch {
            cached_profile: Some(profile.clone()),
            ..Default::default()
        });
        Ok(Some(profile))
    }

    /// Whether a user is logged in, as the UI sees it.
    pub fn is_logged_in(&self) -> bool {
        self.api.store().read().user_id.is_some()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
