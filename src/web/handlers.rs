//! HTTP request handlers.

use super::AppState;
use crate::store::{summarize, Monitor, Sample, DEFAULT_BUCKETS_MS};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

const TARGET_PREFIX: &str = "/api/target/";

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub recent: Vec<Sample>,
}

// ============================================================================
// API: Targets
// ============================================================================

pub async fn handle_get_targets(State(state): State<AppState>) -> impl IntoResponse {
    let targets = state
        .monitors
        .iter()
        .map(|m| target_path(&m.target.address))
        .collect();
    Json(TargetsResponse { targets })
}

/// Path under which a target's summary is served.
pub fn target_path(address: &str) -> String {
    format!("{}{}", TARGET_PREFIX, path_escape(address))
}

/// Escape a single path segment. Hosts rarely need it, but a stray `/` or
/// `?` would otherwise change the route.
fn path_escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~:@$&+=".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

// ============================================================================
// API: Summaries
// ============================================================================

pub async fn handle_status(State(state): State<AppState>) -> Response {
    match state.monitors.first() {
        Some(monitor) => summary_response(monitor, state.recent),
        None => (StatusCode::NOT_FOUND, "No targets configured").into_response(),
    }
}

pub async fn handle_target_summary(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    match state.monitor(&address) {
        Some(monitor) => summary_response(monitor, state.recent),
        None => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

pub async fn handle_target_recent(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    match state.monitor(&address) {
        Some(monitor) => Json(RecentResponse {
            recent: monitor.samples.get(),
        })
        .into_response(),
        None => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

fn summary_response(monitor: &Monitor, recent: usize) -> Response {
    let samples = monitor.samples.get();
    Json(summarize(&samples, &DEFAULT_BUCKETS_MS, recent)).into_response()
}
