//! Final submission of the transfer form.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::warn;

use transfer_core::SubmissionPayload;

use crate::error::ApiError;
use crate::state::AppState;

/// Accept a submission. The body is the full accession graph as JSON.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionPayload>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(subsystem = "api", component = "submissions", error = %rejection.body_text(), "Unable to parse submission");
        ApiError::BadRequest(rejection.body_text())
    })?;

    state.submissions.submit(payload).await?;
    Ok("accepted")
}
