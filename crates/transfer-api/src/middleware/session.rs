//! Admin session cookie.
//!
//! `/authenticate` issues an API token for staff pages and stores its hash
//! on the user. The browser carries `<token>|<email>` back in an http-only
//! cookie; [`AdminSession`] checks both halves against the stored user and
//! requires the admin flag.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::{debug, warn};

use transfer_core::{User, UserRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// http-only cookie holding `<token>|<email>`.
pub const SESSION_COOKIE: &str = "archives_xfer_api_session";

/// Script-readable cookie holding the user JSON.
pub const USER_COOKIE: &str = "archives_xfer_user";

/// Lifetime of the user cookie, in seconds.
pub const USER_COOKIE_MAX_AGE: u32 = 3600;

/// Find a cookie in a `Cookie` header and URL-decode its value.
pub fn parse_cookie(header_value: &str, name: &str) -> Option<String> {
    header_value
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// `Set-Cookie` value for the admin session. `secure` is off in dev mode.
pub fn session_cookie(token: &str, email: &str, secure: bool) -> String {
    let value = urlencoding::encode(&format!("{}|{}", token, email)).into_owned();
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, value);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value carrying the user JSON to the front end.
pub fn user_cookie(user_json: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        USER_COOKIE,
        urlencoding::encode(user_json),
        USER_COOKIE_MAX_AGE
    )
}

/// An authenticated admin.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let forbidden = || ApiError::Forbidden("Forbidden".to_string());

        let session = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| parse_cookie(v, SESSION_COOKIE))
            .ok_or_else(|| {
                debug!(subsystem = "api", component = "auth", path = %parts.uri.path(), "No admin session cookie");
                forbidden()
            })?;

        let (token, email) = session.split_once('|').ok_or_else(forbidden)?;
        if token.is_empty() {
            return Err(forbidden());
        }

        let user = state.db.users.find_by_api_token(token).await.map_err(|e| {
            warn!(subsystem = "api", component = "auth", error = %e, "No user for session token");
            forbidden()
        })?;

        if user.email != email {
            warn!(subsystem = "api", component = "auth", email = %email, "Session email does not match token owner");
            return Err(forbidden());
        }
        if !user.admin {
            warn!(subsystem = "api", component = "auth", email = %user.email, "Session user is not an admin");
            return Err(forbidden());
        }

        debug!(subsystem = "api", component = "auth", email = %user.email, path = %parts.uri.path(), "Admin session accepted");
        Ok(AdminSession { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_round_trips_through_header() {
        let set = session_cookie("abc123", "ada@virginia.edu", true);
        assert!(set.contains("HttpOnly"));
        assert!(set.ends_with("; Secure"));

        let pair = set.split(';').next().unwrap();
        let header = format!("theme=dark; {}", pair);
        assert_eq!(
            parse_cookie(&header, SESSION_COOKIE).as_deref(),
            Some("abc123|ada@virginia.edu")
        );
    }

    #[test]
    fn test_dev_session_cookie_is_not_secure() {
        assert!(!session_cookie("t", "e@x.edu", false).contains("Secure"));
    }

    #[test]
    fn test_user_cookie_is_encoded() {
        let set = user_cookie(r#"{"email":"a@b.edu"}"#);
        assert!(set.starts_with("archives_xfer_user=%7B%22email%22"));
        assert!(!set.contains("HttpOnly"));
        assert!(set.contains("Max-Age=3600"));
    }

    #[test]
    fn test_parse_cookie_missing() {
        assert_eq!(parse_cookie("a=1; b=2", SESSION_COOKIE), None);
    }
}
