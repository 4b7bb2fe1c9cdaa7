//! Error types for the archives transfer service.

use thiserror::Error;

/// Result type alias using the transfer service's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for transfer service operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A required field is missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate natural key (e.g. a user email that already exists)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A fatal failure while committing a submission
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authenticated session missing, stale, or lacking admin rights
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Email rendering or transport failed
    #[error("Mail error: {0}")]
    Mail(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert a sqlx error, mapping unique-constraint violations to `Conflict`.
    pub fn from_unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::Conflict(format!("{} already exists", what));
            }
        }
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("summary is required".to_string());
        assert_eq!(err.to_string(), "Validation error: summary is required");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("report.pdf".to_string());
        assert_eq!(err.to_string(), "Not found: report.pdf");
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("user a@b.edu already exists".to_string());
        assert_eq!(err.to_string(), "Conflict: user a@b.edu already exists");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("Unable to create physical transfer record".to_string());
        assert_eq!(
            err.to_string(),
            "Internal error: Unable to create physical transfer record"
        );
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_non_database_sqlx_error_is_not_conflict() {
        let err = Error::from_unique_violation(sqlx::Error::RowNotFound, "user");
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
