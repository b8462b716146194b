// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Why a coordinated token refresh failed.
///
/// Every variant is terminal for the current session: the credential store
/// has already been cleared by the time one of these is returned, so the
/// next session read observes "logged out". `Clone` because the one refresh
/// outcome is fanned out to every concurrent waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token is stored; refresh is impossible without one.
    NoRefreshToken,
    /// The refresh endpoint answered with a non-success status.
    Rejected { status: u16 },
    /// The refresh endpoint could not be reached, or its response was
    /// unreadable.
    Transport(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRefreshToken => f.write_str("no refresh token stored"),
            Self::Rejected { status } => write!(f, "refresh rejected ({status})"),
            Self::Transport(msg) => write!(f, "refresh transport error: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}
