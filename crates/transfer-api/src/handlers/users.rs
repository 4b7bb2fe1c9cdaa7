//! Submitter registration and verification.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use transfer_core::{Error, User, UserProfile, UserRepository};

use crate::error::ApiError;
use crate::state::AppState;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub email: Option<String>,
}

/// Find a user by email.
pub async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<User>, ApiError> {
    let email = query
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing required email query param".to_string()))?;

    match state.db.users.find_by_email(&email).await {
        Ok(user) => Ok(Json(user)),
        Err(Error::NotFound(_)) => Err(ApiError::NotFound(format!("{} not found", email))),
        Err(e) => Err(e.into()),
    }
}

/// Register a new, unverified user and send the verification link.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<UserProfile>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let profile = json_body(body)?;
    let user = state.db.users.create(&profile).await.map_err(|e| match e {
        Error::Validation(_) => ApiError::BadRequest("All fields are required".to_string()),
        other => other.into(),
    })?;
    state.notifier.send_verification(&user).await;
    Ok(Json(user))
}

/// Mark the user owning a verification token as verified.
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<User>, ApiError> {
    let mut user = state.db.users.find_by_verify_token(&token).await?;
    if user.verified {
        info!(subsystem = "api", component = "users", email = %user.email, "User already verified");
    } else {
        state.db.users.mark_verified(user.id).await?;
        user.verified = true;
    }
    Ok(Json(user))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendRequest {
    pub token: String,
}

/// Send the verification email again.
pub async fn resend_verification(
    State(state): State<AppState>,
    body: Result<Json<ResendRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let request = json_body(body)?;
    if request.token.trim().is_empty() {
        return Err(ApiError::BadRequest("token is required".to_string()));
    }
    let user = state.db.users.find_by_verify_token(&request.token).await?;
    state.notifier.send_verification(&user).await;
    Ok("email resent")
}
