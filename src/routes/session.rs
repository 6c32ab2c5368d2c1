use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current))
        .route("/choose", post(choose))
        .route("/hint", post(hint))
        .route("/reset", post(reset))
        .route("/attempts", get(attempts))
        .route("/export", get(export))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChooseRequest {
    option_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HintResponse {
    hints_used_this_trial: u32,
}

async fn current(State(state): State<AppState>) -> Response {
    let session = state.session();
    let snapshot = session.snapshot().await;
    ok(serde_json::json!({
        "session": snapshot,
        "gateway": session.gateway_stats(),
    }))
}

async fn choose(
    State(state): State<AppState>,
    payload: Result<Json<ChooseRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let outcome = state.session().choose(payload.option_id).await?;
    Ok(ok(outcome))
}

async fn hint(State(state): State<AppState>) -> Result<Response, AppError> {
    let hints_used_this_trial = state.session().use_hint().await?;
    Ok(ok(HintResponse {
        hints_used_this_trial,
    }))
}

async fn reset(State(state): State<AppState>) -> Response {
    ok(state.session().reset().await)
}

async fn attempts(State(state): State<AppState>) -> Response {
    ok(state.session().attempts())
}

async fn export(State(state): State<AppState>) -> Response {
    ok(state.session().export())
}
