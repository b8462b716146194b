// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP client.
//!
//! Every API call the application makes goes through [`ApiClient::send`]:
//! the bearer header is attached when a token is stored, a token already
//! known to be stale is refreshed before the first attempt, and a 401 is
//! recovered by exactly one coordinated refresh followed by exactly one
//! retry. No status other than 401 is interpreted here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::expiry;
use crate::refresh::RefreshCoordinator;
use crate::store::CredentialStore;

/// Which physical attempt of a logical request is in progress.
///
/// A logical request makes at most two: the initial send and, only after a
/// 401 recovered by a coordinated refresh, one retry. A 401 on the retry is
/// returned verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// HTTP client for the directory API with transparent token handling.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    safety_margin_secs: u64,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<CredentialStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let coordinator = RefreshCoordinator::new(Arc::clone(&store), http.clone(), &base_url);
        Self {
            http,
            base_url,
            store,
            coordinator,
            safety_margin_secs: config.safety_margin_secs,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Result<Response> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> reqwest::Result<Response> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> reqwest::Result<Response> {
        self.send(Method::DELETE, path, None).await
    }

    /// POST to a public endpoint: no bearer header, no refresh machinery.
    pub async fn post_public(&self, path: &str, body: &Value) -> reqwest::Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        self.http.post(&url).json(body).send().await
    }

    /// Send one logical request.
    ///
    /// The returned error is always the underlying transport error; any
    /// response the server produced, 401 included, is returned as-is once
    /// recovery is exhausted.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> reqwest::Result<Response> {
        // Skip a doomed round trip when the token is already known stale and
        // a refresh is possible.
        let session = self.store.read();
        if session.refresh_token.is_some()
            && !expiry::is_usable(&session, expiry::epoch_secs(), self.safety_margin_secs)
        {
            if let Err(e) = self.coordinator.acquire().await {
                // Terminal failure: the store is already cleared. Fall
                // through and let the server answer the now-anonymous
                // request.
                debug!(path, "proactive refresh failed: {e}");
            }
        }

        let mut attempt = Attempt::First;
        loop {
            let resp = self.execute(method.clone(), path, body.as_ref()).await?;
            if resp.status() != StatusCode::UNAUTHORIZED || attempt == Attempt::Retry {
                return Ok(resp);
            }

            // 401 on the first attempt: one coordinated refresh, one retry.
            match self.coordinator.acquire().await {
                Ok(_) => {
                    debug!(path, "retrying with refreshed token");
                    attempt = Attempt::Retry;
                }
                Err(e) => {
                    debug!(path, "refresh failed, surfacing original 401: {e}");
                    return Ok(resp);
                }
            }
        }
    }

    /// One physical attempt. Reads the store at send time so a retry picks
    /// up the token written by the refresh that preceded it.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> reqwest::Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        let session = self.store.read();
        if let Some(token) = session.access_token() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        trace!(%url, "api request");
        req.send().await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
