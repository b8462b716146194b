// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration and state directory resolution.

use std::path::PathBuf;

use crate::expiry::DEFAULT_SAFETY_MARGIN_SECS;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for an [`ApiClient`](crate::http::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the directory API, e.g. `https://api.tablemap.example`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Seconds before expiry at which the access token is treated as stale.
    pub safety_margin_secs: u64,
}

impl ClientConfig {
    /// Config with default timeout and safety margin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
        }
    }
}

/// Resolve the state directory for persisted session data.
///
/// Checks `TABLEMAP_STATE_DIR`, then `$XDG_STATE_HOME/tablemap`,
/// then `$HOME/.local/state/tablemap`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TABLEMAP_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("tablemap");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/tablemap");
    }
    PathBuf::from(".tablemap")
}
