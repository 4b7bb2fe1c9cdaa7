//! `/authenticate`: the landing route behind the campus identity proxy.
//!
//! The proxy puts the computing id in the `remote_user` header. The route
//! only confirms a user exists for it, sets the session cookies and
//! redirects to the requested page.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};

use transfer_core::UserRepository;
use transfer_db::secrets::{generate_token, API_TOKEN_LEN};

use crate::error::ApiError;
use crate::middleware::{session_cookie, user_cookie};
use crate::state::AppState;

/// Header set by the identity proxy.
pub const REMOTE_USER_HEADER: &str = "remote_user";

/// Page that needs no admin session.
const SUBMIT_PAGE: &str = "submit";

#[derive(Debug, Default, Deserialize)]
pub struct AuthenticateQuery {
    pub page: Option<String>,
}

/// Reduce the target page to a local route.
///
/// Only ASCII alphanumerics, `-`, `_` and `/` survive and leading slashes
/// are dropped, so the redirect cannot leave the site.
pub fn local_route(page: &str) -> String {
    page.trim()
        .trim_start_matches('/')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        .collect::<String>()
        .trim_start_matches('/')
        .to_string()
}

pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuthenticateQuery>,
) -> Result<Response, ApiError> {
    let computing_id = match &state.config.dev_auth_user {
        Some(dev_user) => Some(dev_user.clone()),
        None => headers
            .get(REMOTE_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
    };
    let Some(computing_id) = computing_id else {
        warn!(subsystem = "api", component = "auth", "Expected auth header not present in request");
        return found("/forbidden");
    };

    let email = state.config.email_for(&computing_id);
    let user = match state.db.users.find_by_email(&email).await {
        Ok(user) => user,
        Err(e) => {
            warn!(subsystem = "api", component = "auth", email = %email, error = %e, "No user record for authenticated computing id");
            return found("/forbidden");
        }
    };

    let page = local_route(query.page.as_deref().unwrap_or_default());
    let user_json = serde_json::to_string(&user)
        .map_err(|e| ApiError::Internal(format!("Unable to encode user: {}", e)))?;

    let mut response = found(&format!("/{}", page))?;
    let cookies = response.headers_mut();

    if page != SUBMIT_PAGE {
        let token = generate_token(API_TOKEN_LEN);
        state.db.users.set_api_token(user.id, &token).await?;
        let secure = !state.config.dev_mode();
        append_cookie(cookies, &session_cookie(&token, &user.email, secure))?;
    }
    append_cookie(cookies, &user_cookie(&user_json))?;

    info!(subsystem = "api", component = "auth", email = %user.email, page = %page, "Authentication successful");
    Ok(response)
}

/// 302 to a local path.
fn found(location: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(location)
        .map_err(|e| ApiError::Internal(format!("Invalid redirect target: {}", e)))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::Internal(format!("Unable to set cookie: {}", e)))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_route() {
        assert_eq!(local_route("submit"), "submit");
        assert_eq!(local_route("/admin/accessions"), "admin/accessions");
        assert_eq!(local_route("//evil.example.com"), "evilexamplecom");
        assert_eq!(local_route("https://evil.example.com"), "https//evilexamplecom");
        assert_eq!(local_route(""), "");
    }
}
