//! Opaque submission tokens.
//!
//! A token names the pending upload directory of a submission before the
//! accession row exists. UUIDv7 keeps tokens time-ordered, so directory
//! listings under `pending/` sort by issue time.

use uuid::Uuid;

/// Issue a fresh submission token (UUIDv7, 32 lowercase hex digits).
pub fn new_submission_token() -> String {
    Uuid::now_v7().simple().to_string()
}
