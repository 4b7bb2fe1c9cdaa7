//! Structured logging field names shared by every transfer crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A request failed, or a fatal write rolled back a submission |
//! | WARN  | Advisory write skipped, file move or email failed, size mismatch |
//! | INFO  | Lifecycle events, accepted submissions, uploads received |
//! | DEBUG | Decision points, individual rows written |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "uploads", "mail"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "submissions", "users", "pool", "smtp"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "commit", "receive_chunk", "promote", "send_receipt"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Accession row id.
pub const ACCESSION_ID: &str = "accession_id";

/// Opaque submission/upload token.
pub const UPLOAD_TOKEN: &str = "upload_token";

/// Submitter email.
pub const EMAIL: &str = "email";

/// Database table affected by a write.
pub const DB_TABLE: &str = "db_table";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of advisory rows that failed to insert.
pub const ADVISORY_FAILURES: &str = "advisory_failures";

/// Byte length of an upload chunk or file.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_unique_snake_case() {
        let fields = [
            REQUEST_ID,
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            ACCESSION_ID,
            UPLOAD_TOKEN,
            EMAIL,
            DB_TABLE,
            DURATION_MS,
            ADVISORY_FAILURES,
            SIZE_BYTES,
            ERROR_MSG,
        ];
        for field in fields {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        let mut sorted = fields.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), fields.len());
    }
}
