// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure expiry policy for the stored access token.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::store::Session;

/// Default seconds subtracted from a token's expiry before it is treated as
/// stale. Covers in-flight time and client/server clock skew.
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;

/// Whether the session's access token is safe to send at `now`.
///
/// False when no token is stored or when `now >= expires_at - margin`.
pub fn is_usable(session: &Session, now_epoch_secs: u64, safety_margin_secs: u64) -> bool {
    match &session.access {
        Some(access) => now_epoch_secs < access.expires_at.saturating_sub(safety_margin_secs),
        None => false,
    }
}

/// Current wall-clock time as epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "expiry_tests.rs"]
mod tests;
