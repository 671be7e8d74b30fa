//! HTTP handlers. Each one validates its request, calls the store under
//! its own concurrency discipline, and logs only a token prefix (first 8
//! hex chars) plus status — never ciphertext, nonces, or full tokens.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::rate_limit::{RateLimitDecision, RateLimitHook};
use crate::store::RelayStore;
use crate::wire::{
    HealthResponse, MessagesResponse, RootResponse, SendRequest, SendResponse, StatusResponse,
    TokenRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RelayStore>,
    pub metrics: Arc<Metrics>,
    pub rate_limiter: Arc<dyn RateLimitHook>,
}

fn token_prefix(token: &str) -> &str {
    &token[..token.len().min(8)]
}

fn check_rate_limit(state: &AppState, addr: SocketAddr) -> Result<(), ApiError> {
    match state.rate_limiter.check(addr.ip()) {
        RateLimitDecision::Allow => Ok(()),
        RateLimitDecision::Reject { retry_after_secs } => {
            state.metrics.record_rate_limited();
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}

pub async fn get_root() -> Response {
    Json(RootResponse {
        name: "wisp-relay",
        version: env!("CARGO_PKG_VERSION"),
        description: "zero-knowledge message relay",
    })
    .into_response()
}

pub async fn get_health() -> Response {
    Json(HealthResponse { status: "ok" }).into_response()
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    let stats = state.store.stats();
    Json(StatusResponse {
        active_tokens: stats.active_tokens,
        total_messages: stats.total_messages,
        uptime_seconds: state.metrics.uptime_seconds(),
    })
    .into_response()
}

pub async fn post_send(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<SendRequest>,
) -> Response {
    let start = Instant::now();

    if let Err(e) = check_rate_limit(&state, addr) {
        return e.into_response();
    }

    let put_request = match body.into_put_request() {
        Ok(r) => r,
        Err(e) => {
            warn!(status = 400, "send validation failed");
            return e.into_response();
        }
    };

    let prefix = token_prefix(&put_request.token).to_string();
    let message_id = state.store.put(put_request);
    state.metrics.record_send();

    info!(
        endpoint = "send",
        token_prefix = %prefix,
        status = 200,
        latency_ms = start.elapsed().as_millis() as u64,
        "accepted"
    );

    (
        StatusCode::OK,
        Json(SendResponse {
            message_id,
            accepted_at: crate::ids::epoch_seconds(),
        }),
    )
        .into_response()
}

pub async fn post_poll(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<TokenRequest>,
) -> Response {
    let start = Instant::now();

    if let Err(e) = check_rate_limit(&state, addr) {
        return e.into_response();
    }

    let token = match body.validated_token() {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    let prefix = token_prefix(token).to_string();

    let messages = state.store.poll(token);
    state.metrics.record_poll(messages.len());

    info!(
        endpoint = "poll",
        token_prefix = %prefix,
        status = 200,
        latency_ms = start.elapsed().as_millis() as u64,
        "polled"
    );

    (StatusCode::OK, Json(MessagesResponse::from_messages(messages))).into_response()
}

pub async fn post_consume(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<TokenRequest>,
) -> Response {
    let start = Instant::now();

    if let Err(e) = check_rate_limit(&state, addr) {
        return e.into_response();
    }

    let token = match body.validated_token() {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    let prefix = token_prefix(token).to_string();

    let messages = state.store.consume(token);
    state.metrics.record_consume(messages.len());

    info!(
        endpoint = "consume",
        token_prefix = %prefix,
        status = 200,
        latency_ms = start.elapsed().as_millis() as u64,
        "consumed"
    );

    (StatusCode::OK, Json(MessagesResponse::from_messages(messages))).into_response()
}
