//! Staff accession browser and notes. Every handler requires [`AdminSession`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use transfer_core::{
    AccessionDetail, AccessionListRequest, AccessionPage, AccessionRepository, NewNote, Note,
    NoteRepository,
};

use crate::error::ApiError;
use crate::middleware::AdminSession;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccessionQuery {
    pub page: Option<String>,
    pub q: Option<String>,
    /// Genre name.
    pub g: Option<String>,
}

/// Unparseable or non-positive pages fall back to the first page.
fn page_number(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

pub async fn list_accessions(
    _session: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<AccessionQuery>,
) -> Result<Json<AccessionPage>, ApiError> {
    let request = AccessionListRequest {
        page: page_number(query.page.as_deref()),
        query: query.q,
        genre: query.g,
    };
    Ok(Json(state.db.accessions.list_accessions(request).await?))
}

pub async fn get_accession(
    _session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AccessionDetail>, ApiError> {
    Ok(Json(state.db.accessions.get_accession_detail(id).await?))
}

pub async fn list_notes(
    _session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.db.notes.list_notes(id).await?))
}

/// Append a note authored by the session user.
pub async fn add_note(
    session: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<NewNote>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(note) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(Json(
        state.db.notes.add_note(id, session.user.id, &note).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some("3")), 3);
        assert_eq!(page_number(Some("zero")), 1);
        assert_eq!(page_number(Some("-2")), 1);
        assert_eq!(page_number(Some("9223372036854775807")), i64::MAX);
        assert_eq!(page_number(Some("9223372036854775808")), 1);
    }
}
