mod decision;
mod health;
mod session;

use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .nest("/api/session", session::router())
        .nest("/health", health::router());

    if state.decision_endpoint() {
        app = app.nest("/api/decision", decision::router());
    }

    app.fallback(fallback_handler).with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("endpoint not found").into_response()
}
