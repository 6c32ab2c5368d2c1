use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::adaptive::decision::GatewayStats;
use crate::adaptive::types::Provenance;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: String,
    start_time: String,
    uptime: u64,
    decision_source: &'static str,
    gateway: GatewayStats,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let session = state.session();
    let gateway = session.gateway();
    let stats = gateway.stats();
    let status = if gateway.has_remote() && stats.last_provenance == Some(Provenance::Local) {
        "degraded"
    } else {
        "ok"
    };

    let response = HealthResponse {
        status,
        service: "trial-adapt",
        version: std::env::var("APP_VERSION")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        start_time: DateTime::<Utc>::from(state.started_at_system())
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        decision_source: if gateway.has_remote() { "remote" } else { "local" },
        gateway: stats,
        timestamp: now_iso(),
    };

    Json(response).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
