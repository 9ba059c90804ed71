//! HTTP service around the bias engine.
//!
//! Endpoints:
//!   GET  /api/health                              - Health check
//!   GET  /api/mock-data[?profile=&n=&seed=]       - Mock trades as {"trades": [...]}
//!   POST /api/analyze                             - Analyze a list or {"trades": [...]}
//!
//! Every error is a JSON `{"error": ...}` body. Bodies above
//! `max_body_bytes` get 413 whether or not they declare a length, and a
//! request that is not complete within `request_timeout_ms` gets 408.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::analysis::BiasEngine;
use crate::config::Config;
use crate::logging;
use crate::mock::{generate_mock_trades, MockProfile};
use crate::trade::RawTradeRecord;

/// Upper bound on `n` for `/api/mock-data`.
pub const MAX_MOCK_TRADES: usize = 10_000;

#[derive(Clone)]
struct AppState {
    cfg: Arc<Config>,
    engine: BiasEngine,
    requests: Arc<AtomicU64>,
}

/// Build the service for `cfg`.
pub fn router(cfg: Config) -> Router {
    let body_limit = cfg.max_body_bytes;
    let state = AppState {
        cfg: Arc::new(cfg),
        engine: BiasEngine::new(),
        requests: Arc::new(AtomicU64::new(0)),
    };
    Router::new()
        .route("/api/health", get(health).fallback(method_not_allowed))
        .route("/api/mock-data", get(mock_data).fallback(method_not_allowed))
        .route("/api/analyze", post(analyze).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), track))
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

#[derive(Serialize)]
struct MockData {
    trades: Vec<RawTradeRecord>,
}

async fn mock_data(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let cfg = &state.cfg;
    let profile = match params.get("profile") {
        Some(name) => match MockProfile::parse(name) {
            Some(p) => p,
            None => {
                let msg = format!("unknown profile: {}", name);
                return error_response(StatusCode::BAD_REQUEST, msg);
            }
        },
        None => cfg.mock_profile,
    };
    let n = match params.get("n").map(|v| v.parse::<usize>()) {
        Some(Ok(n)) => n.min(MAX_MOCK_TRADES),
        Some(Err(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "n must be a non-negative integer")
        }
        None => cfg.mock_trades,
    };
    let seed = match params.get("seed").map(|v| v.parse::<u64>()) {
        Some(Ok(s)) => s,
        Some(Err(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "seed must be an unsigned integer")
        }
        None => cfg.seed_or_now(),
    };
    Json(MockData {
        trades: generate_mock_trades(profile, n, seed),
    })
    .into_response()
}

async fn analyze(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            logging::agg_increment("rejected", 1);
            return error_response(rejection.status(), rejection.body_text());
        }
    };
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            logging::agg_increment("rejected", 1);
            return error_response(StatusCode::BAD_REQUEST, format!("invalid JSON: {}", err));
        }
    };
    match state.engine.analyze_json(&payload) {
        Ok(report) => {
            logging::agg_increment("analysis", 1);
            logging::agg_increment("trades", report.statistics.total_trades as u64);
            Json(report).into_response()
        }
        Err(err) => {
            logging::agg_increment("rejected", 1);
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

/// Deadline, CORS header and request log for every route.
async fn track(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let request_id = state.requests.fetch_add(1, Ordering::Relaxed);
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let deadline = Duration::from_millis(state.cfg.request_timeout_ms);
    let mut response = match tokio::time::timeout(deadline, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            logging::agg_increment("error", 1);
            error_response(StatusCode::REQUEST_TIMEOUT, "request timed out")
        }
    };
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

    logging::log_request(
        request_id,
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    response
}
