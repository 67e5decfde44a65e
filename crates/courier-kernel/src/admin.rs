//! The HTTP admin surface: health, a read-only view of sessions, pending
//! approvals, and recent events, a task submission endpoint, and basic
//! metrics.
//!
//! Grounded on `tandem-server::http`'s `Router::new().route(...)` / bearer
//! `auth_gate` / `extract_request_token` / `serve` idiom; narrowed to the
//! handful of routes this daemon actually needs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use courier_channels::ingress::HttpIngress;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{KernelError, KernelResult};

/// The key-value entry holding the daemon's start time. Seeded once, the
/// first time `AdminState` is built against a given database, and read
/// through on every `/health`/`/metrics` request rather than cached in an
/// in-process `Instant` — so `courier admin`, run against an
/// already-running daemon's database, reports the real daemon's uptime
/// instead of its own.
const DAEMON_STARTED_AT_KV_KEY: &str = "daemon.started_at";

/// State shared by every admin route.
#[derive(Clone)]
pub struct AdminState {
    store: Arc<dyn courier_storage::Store>,
    bearer_token: Option<String>,
    tasks: HttpIngress,
}

impl AdminState {
    /// Build the admin surface's shared state.
    #[must_use]
    pub fn new(store: Arc<dyn courier_storage::Store>, bearer_token: Option<String>, tasks: HttpIngress) -> Self {
        seed_started_at(store.as_ref());
        Self {
            store,
            bearer_token,
            tasks,
        }
    }
}

fn seed_started_at(store: &dyn courier_storage::Store) {
    if matches!(store.kv_get(DAEMON_STARTED_AT_KV_KEY), Ok(None)) {
        let _ = store.kv_put(DAEMON_STARTED_AT_KV_KEY, &Utc::now().to_rfc3339());
    }
}

fn uptime_secs(store: &dyn courier_storage::Store) -> u64 {
    let started_at = store
        .kv_get(DAEMON_STARTED_AT_KV_KEY)
        .ok()
        .flatten()
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc));
    match started_at {
        Some(started_at) => (Utc::now() - started_at).num_seconds().max(0) as u64,
        None => 0,
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AdminState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(state.store.as_ref()),
    })
}

async fn sessions(State(state): State<AdminState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let sessions = state
        .store
        .list_sessions(500)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

async fn approvals(State(state): State<AdminState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let approvals = state
        .store
        .list_pending_approvals(500)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::json!({ "approvals": approvals })))
}

async fn events(State(state): State<AdminState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let events = state
        .store
        .recent_events(200)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(serde_json::json!({ "events": events })))
}

async fn metrics(State(state): State<AdminState>) -> impl IntoResponse {
    let sessions = state.store.list_sessions(10_000).unwrap_or_default().len();
    let pending_approvals = state.store.list_pending_approvals(10_000).unwrap_or_default().len();
    Json(serde_json::json!({
        "uptime_secs": uptime_secs(state.store.as_ref()),
        "sessions": sessions,
        "pending_approvals": pending_approvals,
    }))
}

/// Body of `POST /tasks`: a channel-agnostic task submitted directly through
/// the admin surface rather than one of the five scripted channels.
#[derive(Debug, Deserialize)]
struct TaskSubmission {
    sender: String,
    text: String,
    channel_hint: Option<String>,
}

async fn submit_task(
    State(state): State<AdminState>,
    Json(input): Json<TaskSubmission>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let id = state
        .tasks
        .submit(&input.sender, &input.text, input.channel_hint.as_deref())
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

fn extract_request_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())?;
    let trimmed = auth.trim();
    let bearer = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?;
    let token = bearer.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn auth_gate(
    State(state): State<AdminState>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }
    let Some(expected) = state.bearer_token.as_deref() else {
        return next.run(request).await;
    };
    if extract_request_token(request.headers()).as_deref() == Some(expected) {
        return next.run(request).await;
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorEnvelope {
            error: "missing or invalid bearer token".to_string(),
        }),
    )
        .into_response()
}

fn router(state: AdminState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(sessions))
        .route("/approvals", get(approvals))
        .route("/events", get(events))
        .route("/tasks", post(submit_task))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(state.clone(), auth_gate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the admin surface until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AdminState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> KernelResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KernelError::Http(e.to_string()))?;
    info!(%addr, "admin http surface listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| KernelError::Http(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_storage::SqliteStore;

    fn state() -> AdminState {
        let store: Arc<dyn courier_storage::Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        AdminState::new(store, Some("secret".to_string()), HttpIngress::new(tx))
    }

    #[test]
    fn extract_request_token_reads_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(extract_request_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_request_token_is_case_insensitive_on_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "bearer xyz".parse().unwrap());
        assert_eq!(extract_request_token(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn extract_request_token_rejects_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(extract_request_token(&headers), None);
    }

    #[tokio::test]
    async fn health_reports_ok_without_a_token() {
        let s = state();
        let response = health(State(s)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn started_at_is_seeded_once_and_read_through_on_every_call() {
        let store: Arc<dyn courier_storage::Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        seed_started_at(store.as_ref());
        let first = store.kv_get(DAEMON_STARTED_AT_KV_KEY).unwrap();
        seed_started_at(store.as_ref());
        let second = store.kv_get(DAEMON_STARTED_AT_KV_KEY).unwrap();
        assert_eq!(first, second, "re-seeding an already-started daemon must not reset its start time");
        assert!(uptime_secs(store.as_ref()) < 5);
    }

    #[tokio::test]
    async fn submit_task_forwards_to_the_inbound_channel() {
        let store: Arc<dyn courier_storage::Store> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let s = AdminState::new(store, None, HttpIngress::new(tx));
        let body = submit_task(
            State(s),
            Json(TaskSubmission {
                sender: "+15551234567".to_string(),
                text: "hello".to_string(),
                channel_hint: None,
            }),
        )
        .await
        .unwrap();
        assert!(body.0.get("id").is_some());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.text, "hello");
    }
}
