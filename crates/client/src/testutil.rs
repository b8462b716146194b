// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stub directory API used by the session-layer tests.
//!
//! An axum router bound to an ephemeral port, with atomic counters so tests
//! can assert exactly how many physical calls each endpoint received.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::ClientConfig;
use crate::expiry::epoch_secs;
use crate::store::{AccessToken, CredentialStore, SessionPatch};

/// Knobs and counters shared between a test and its stub server.
pub struct StubApi {
    /// Token currently accepted by protected endpoints.
    pub valid_token: Mutex<String>,
    /// Token handed out by the next successful refresh.
    pub next_token: Mutex<String>,
    /// Refresh token accepted by `/refresh`.
    pub valid_refresh: Mutex<String>,
    pub refresh_calls: AtomicU32,
    pub protected_calls: AtomicU32,
    pub user_calls: AtomicU32,
    pub unauthorized_responses: AtomicU32,
    /// When set, `/refresh` answers 403 regardless of the presented token.
    pub reject_refresh: AtomicBool,
    /// When set, protected endpoints answer 401 regardless of the token.
    pub always_unauthorized: AtomicBool,
    /// Delay before `/refresh` responds, to widen the concurrency window.
    pub refresh_delay_ms: AtomicU64,
}

impl StubApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new("A1".to_owned()),
            next_token: Mutex::new("A2".to_owned()),
            valid_refresh: Mutex::new("R1".to_owned()),
            refresh_calls: AtomicU32::new(0),
            protected_calls: AtomicU32::new(0),
            user_calls: AtomicU32::new(0),
            unauthorized_responses: AtomicU32::new(0),
            reject_refresh: AtomicBool::new(false),
            always_unauthorized: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
        })
    }

    fn bearer_ok(&self, headers: &HeaderMap) -> bool {
        if self.always_unauthorized.load(Ordering::SeqCst) {
            return false;
        }
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();
        presented == *self.valid_token.lock().expect("valid_token lock")
    }
}

/// Bind the stub API on an ephemeral port and return its base URL.
pub async fn serve(stub: &Arc<StubApi>) -> String {
    let router = Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/users/{id}", get(user))
        .route("/restaurants", get(restaurants))
        .route("/ping", get(ping))
        .with_state(Arc::clone(stub));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_owned(),
        timeout_secs: 5,
        safety_margin_secs: 60,
    }
}

/// Ephemeral store pre-populated with the given identity material.
pub fn seeded_store(
    access: Option<(&str, u64)>,
    refresh: Option<&str>,
    user_id: Option<&str>,
) -> Arc<CredentialStore> {
    let store = CredentialStore::ephemeral();
    store.write(SessionPatch {
        access: access.map(|(token, expires_at)| AccessToken {
            token: token.to_owned(),
            expires_at,
        }),
        refresh_token: refresh.map(str::to_owned),
        user_id: user_id.map(str::to_owned),
        cached_profile: None,
    });
    Arc::new(store)
}

async fn login(
    State(stub): State<Arc<StubApi>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default().to_owned();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if password != "hunter2" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad credentials" })));
    }
    let token = stub.valid_token.lock().expect("valid_token lock").clone();
    let refresh = stub.valid_refresh.lock().expect("valid_refresh lock").clone();
    (
        StatusCode::OK,
        Json(json!({
            "accessToken": token,
            "refreshToken": refresh,
            "expiresAt": epoch_secs() + 3600,
            "user": { "id": "u-1", "email": email, "displayName": "Pat Tester" },
        })),
    )
}

async fn refresh(
    State(stub): State<Arc<StubApi>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = stub.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let presented = body.get("refreshToken").and_then(Value::as_str).unwrap_or_default();
    let valid = stub.valid_refresh.lock().expect("valid_refresh lock").clone();
    if stub.reject_refresh.load(Ordering::SeqCst) || presented != valid {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "refresh token invalid" })));
    }

    let token = stub.next_token.lock().expect("next_token lock").clone();
    *stub.valid_token.lock().expect("valid_token lock") = token.clone();
    let rotated = format!("{valid}-rot");
    *stub.valid_refresh.lock().expect("valid_refresh lock") = rotated.clone();
    (
        StatusCode::OK,
        Json(json!({
            "accessToken": token,
            "refreshToken": rotated,
            "expiresAt": epoch_secs() + 3600,
        })),
    )
}

async fn user(
    State(stub): State<Arc<StubApi>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.user_calls.fetch_add(1, Ordering::SeqCst);
    if !stub.bearer_ok(&headers) {
        stub.unauthorized_responses.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "id": id, "email": format!("{id}@example.com") })),
    )
}

async fn restaurants(
    State(stub): State<Arc<StubApi>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.protected_calls.fetch_add(1, Ordering::SeqCst);
    if !stub.bearer_ok(&headers) {
        stub.unauthorized_responses.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "restaurants": [{ "id": "r-1", "name": "Blue Plate" }] })),
    )
}

async fn ping(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "authenticated": headers.contains_key(AUTHORIZATION) }))
}
