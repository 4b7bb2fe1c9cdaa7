//! Pending upload endpoints used by the drag-and-drop widget.

use axum::extract::{Multipart, Path, Query, State};
use serde::Deserialize;
use tracing::{debug, warn};

use transfer_db::{ChunkInfo, StagedUpload, UploadStore};

use crate::error::ApiError;
use crate::state::AppState;

/// Form fields of one upload request.
#[derive(Debug, Default)]
struct UploadForm {
    identifier: Option<String>,
    filename: Option<String>,
    staged: Option<StagedUpload>,
    chunk_index: Option<u32>,
    chunk_size: Option<u64>,
    total_size: Option<u64>,
    total_chunks: Option<u32>,
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {}: {}", field, value)))
}

/// Read every field, streaming the file part to a staging file.
async fn read_form(
    uploads: &UploadStore,
    mut multipart: Multipart,
    form: &mut UploadForm,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Unable to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            if let Some(previous) = form.staged.take() {
                uploads.discard(previous).await;
            }
            form.filename = field.file_name().map(str::to_string);
            let staged = form.staged.insert(uploads.stage().await?);
            while let Some(bytes) = field
                .chunk()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Unable to get form file: {}", e)))?
            {
                staged.write(&bytes).await?;
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Unable to read {}: {}", name, e)))?;
        match name.as_str() {
            "identifier" => form.identifier = Some(value.trim().to_string()),
            "dzchunkindex" => form.chunk_index = Some(parse_number(&name, &value)?),
            "dzchunksize" => form.chunk_size = Some(parse_number(&name, &value)?),
            "dztotalfilesize" => form.total_size = Some(parse_number(&name, &value)?),
            "dztotalchunkcount" => form.total_chunks = Some(parse_number(&name, &value)?),
            // Other widget fields (dzuuid, dzchunkbyteoffset) are not needed.
            _ => debug!(subsystem = "api", component = "uploads", field = %name, "Ignoring upload form field"),
        }
    }
    Ok(())
}

/// Receive a whole file or one chunk of it under a submission token.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<&'static str, ApiError> {
    let mut form = UploadForm::default();
    let read = read_form(&state.uploads, multipart, &mut form).await;

    let staged = form.staged.take();
    let token = read.and_then(|()| {
        form.identifier
            .take()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("upload identifier missing".to_string()))
    });
    let (token, staged) = match (token, staged) {
        (Ok(token), Some(staged)) => (token, staged),
        (Ok(_), None) => {
            return Err(ApiError::BadRequest(
                "Unable to get form file: no file field".to_string(),
            ))
        }
        (Err(e), staged) => {
            if let Some(staged) = staged {
                state.uploads.discard(staged).await;
            }
            return Err(e);
        }
    };

    let filename = form.filename.unwrap_or_default();
    let chunk = form.chunk_index.map(|index| ChunkInfo {
        index,
        chunk_size: form.chunk_size,
        total_size: form.total_size,
        total_chunks: form.total_chunks,
    });
    state
        .uploads
        .commit_staged(staged, &token, &filename, chunk)
        .await?;
    Ok("Submitted")
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub key: Option<String>,
}

/// Remove one pending file; `key` is the submission token.
pub async fn delete_upload(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<String, ApiError> {
    let token = query
        .key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing required key query param".to_string()))?;

    state
        .uploads
        .delete_file(&token, &file)
        .await
        .map_err(|e| {
            warn!(subsystem = "api", component = "uploads", op = "delete_file", upload_token = %token, filename = %file, error = %e, "Unable to delete pending file");
            ApiError::from(e)
        })?;
    Ok(format!("deleted {}", file))
}
