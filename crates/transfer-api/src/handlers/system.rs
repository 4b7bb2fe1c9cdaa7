//! Version and health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build": option_env!("BUILD_TAG").unwrap_or("unknown"),
    }))
}

/// `{alive, postgres}`; 500 when the database does not answer.
pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    let postgres = state.db.ping().await;
    let status = if postgres {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(serde_json::json!({
            "alive": true,
            "postgres": postgres,
        })),
    )
}
