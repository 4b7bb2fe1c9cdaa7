//! Submission token and controlled vocabulary endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use transfer_core::{new_submission_token, VocabEntry, VocabularyRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// Fresh opaque token naming a submission and its upload directory.
pub async fn identifier() -> String {
    new_submission_token()
}

pub async fn genres(State(state): State<AppState>) -> Result<Json<Vec<VocabEntry>>, ApiError> {
    Ok(Json(state.db.vocabs.list_genres().await?))
}

#[derive(Debug, Deserialize)]
pub struct TypesQuery {
    /// `true` limits the list to digital record types; anything else lists all.
    #[serde(default)]
    pub digital: Option<String>,
}

pub async fn record_types(
    State(state): State<AppState>,
    Query(query): Query<TypesQuery>,
) -> Result<Json<Vec<VocabEntry>>, ApiError> {
    let digital_only = query
        .digital
        .as_deref()
        .filter(|v| v.eq_ignore_ascii_case("true") || *v == "1")
        .map(|_| true);
    Ok(Json(state.db.vocabs.list_record_types(digital_only).await?))
}

pub async fn transfer_methods(
    State(state): State<AppState>,
) -> Result<Json<Vec<VocabEntry>>, ApiError> {
    Ok(Json(state.db.vocabs.list_transfer_methods().await?))
}

pub async fn media_carriers(
    State(state): State<AppState>,
) -> Result<Json<Vec<VocabEntry>>, ApiError> {
    Ok(Json(state.db.vocabs.list_media_carriers().await?))
}
