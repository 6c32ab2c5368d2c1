use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::adaptive::types::DecisionInput;
use crate::response::AppError;
use crate::state::AppState;

/// Decision service endpoint: the same policy the engine falls back to,
/// exposed over HTTP with the remote contract.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(decide))
}

async fn decide(
    State(state): State<AppState>,
    payload: Result<Json<DecisionInput>, JsonRejection>,
) -> Response {
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return AppError::validation(rejection.body_text()).into_response(),
    };
    if !input.latency_sec.is_finite() || input.latency_sec < 0.0 {
        return AppError::validation("latencySec must be a non-negative number").into_response();
    }

    let decision = state.policy().evaluate(&input);
    tracing::debug!(
        frustration = decision.frustration,
        action = decision.action.as_str(),
        level = %input.level,
        "decision served"
    );
    Json(decision).into_response()
}
