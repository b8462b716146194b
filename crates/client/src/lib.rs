// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side session layer for the tablemap restaurant directory API.
//!
//! Everything the UI sends to the remote API goes through [`http::ApiClient`],
//! which attaches the bearer token, refreshes it proactively when it is about
//! to expire, and transparently recovers from a single 401 per request by
//! deferring to [`refresh::RefreshCoordinator`] — the single-flight owner of
//! the one in-flight refresh call. Identity material lives in
//! [`store::CredentialStore`], the only shared mutable state; login, logout
//! and the cached current-user profile are [`session::SessionService`].

pub mod config;
pub mod error;
pub mod expiry;
pub mod http;
pub mod refresh;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;
