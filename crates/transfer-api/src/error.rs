//! HTTP error mapping.
//!
//! Bodies are plain text; the web form shows them to the submitter as is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<transfer_core::Error> for ApiError {
    fn from(err: transfer_core::Error) -> Self {
        use transfer_core::Error;
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::Internal(msg) => ApiError::Internal(msg),
            Error::Serialization(msg) => ApiError::BadRequest(msg),
            other => {
                // Driver and I/O details stay in the log.
                error!(subsystem = "api", error = %other, "Request failed");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transfer_core::Error;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (Error::Validation("summary is required".into()), 400),
            (Error::NotFound("x".into()), 404),
            (Error::Conflict("x".into()), 409),
            (Error::Forbidden("x".into()), 403),
            (Error::Internal("x".into()), 500),
            (Error::Config("x".into()), 500),
            (Error::Mail("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), status);
        }
    }

    #[test]
    fn test_body_is_bare_message() {
        let err = ApiError::from(Error::Validation("summary is required".into()));
        assert_eq!(err.to_string(), "summary is required");
    }

    #[test]
    fn test_database_detail_is_hidden() {
        let err = ApiError::from(Error::Database(sqlx::Error::RowNotFound));
        assert_eq!(err.to_string(), "Internal server error");
    }
}
