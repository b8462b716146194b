// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: the session record, shallow-merge writes, and
//! atomic clear, mirrored to a JSON file so the session survives restarts.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An access token together with its absolute expiry.
///
/// The two travel as one value so a token can never be stored without its
/// expiry, or the other way around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    /// Expiry as epoch seconds.
    pub expires_at: u64,
}

/// A user profile as returned by the directory API.
///
/// The session layer does not own the profile schema; unknown fields
/// round-trip through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The session record held by [`CredentialStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_profile: Option<UserProfile>,
}

impl Session {
    /// The bearer credential, when one is stored.
    pub fn access_token(&self) -> Option<&str> {
        self.access.as_ref().map(|a| a.token.as_str())
    }
}

/// Partial update applied by [`CredentialStore::write`].
///
/// Fields left `None` keep their current value; fields are only ever emptied
/// by [`CredentialStore::clear`].
#[derive(Debug, Default, Clone)]
pub struct SessionPatch {
    pub access: Option<AccessToken>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub cached_profile: Option<UserProfile>,
}

/// The single owner of the session's identity material.
///
/// Reads never fail: a missing or corrupted file on disk loads as the empty
/// session. Writes merge and then persist atomically (tmp + rename). Only the
/// refresh coordinator and the session service mutate this store; everything
/// else reads.
pub struct CredentialStore {
    session: RwLock<Session>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// Open a store backed by the given file, loading any persisted session.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(session) => session,
                Err(e) => {
                    warn!(path = %path.display(), "corrupt session file, starting logged out: {e}");
                    Session::default()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), "no persisted session: {e}");
                Session::default()
            }
        };
        Self { session: RwLock::new(session), path: Some(path) }
    }

    /// In-memory store with no backing file, for tests and throwaway
    /// sessions.
    pub fn ephemeral() -> Self {
        Self { session: RwLock::new(Session::default()), path: None }
    }

    /// Snapshot of the current session. Never fails.
    pub fn read(&self) -> Session {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Shallow-merge the patch into the current session and persist.
    pub fn write(&self, patch: SessionPatch) {
        let snapshot = {
            let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
            if let Some(access) = patch.access {
                session.access = Some(access);
            }
            if let Some(refresh_token) = patch.refresh_token {
                session.refresh_token = Some(refresh_token);
            }
            if let Some(user_id) = patch.user_id {
                session.user_id = Some(user_id);
            }
            if let Some(profile) = patch.cached_profile {
                session.cached_profile = Some(profile);
            }
            session.clone()
        };
        self.persist(&snapshot);
    }

    /// Drop every session field and remove the backing file. Idempotent.
    pub fn clear(&self) {
        {
            let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
            *session = Session::default();
        }
        if let Some(ref path) = self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "failed to remove session file: {e}"),
            }
        }
    }

    /// Write the session to disk atomically (write tmp + rename).
    ///
    /// Uses a unique temp filename (PID + counter) so concurrent saves cannot
    /// corrupt each other through a shared `.tmp` path.
    fn persist(&self, session: &Session) {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let Some(ref path) = self.path else {
            return;
        };

        let json = match serde_json::to_string_pretty(session) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to serialize session: {e}");
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), "failed to create state dir: {e}");
                return;
            }
        }

        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = path.with_file_name(tmp_name);
        if let Err(e) = std::fs::write(&tmp_path, json) {
            warn!(path = %tmp_path.display(), "failed to write session file: {e}");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            warn!(path = %path.display(), "failed to rename session file: {e}");
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
