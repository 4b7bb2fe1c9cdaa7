//! Repository traits for the transfer service.
//!
//! Concrete PostgreSQL implementations live in `transfer-db`. Handlers and
//! services depend on these traits where a seam is useful for testing.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REGISTRY
// =============================================================================

/// Lookup and mutation of submitter accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by email. `NotFound` when absent.
    async fn find_by_email(&self, email: &str) -> Result<User>;

    /// Find a user by the token sent in the verification email.
    async fn find_by_verify_token(&self, token: &str) -> Result<User>;

    /// Find a user by the hash of an issued admin API token.
    async fn find_by_api_token(&self, token: &str) -> Result<User>;

    /// Create an unverified user. `Conflict` if the email is taken.
    async fn create(&self, profile: &UserProfile) -> Result<User>;

    /// Update the mutable profile fields of the user owning `profile.email`.
    async fn update_profile(&self, profile: &UserProfile) -> Result<User>;

    /// Mark a user verified.
    async fn mark_verified(&self, id: i32) -> Result<()>;

    /// Store (the hash of) a freshly issued admin API token.
    async fn set_api_token(&self, id: i32, token: &str) -> Result<()>;

    /// Emails of every admin user.
    async fn admin_emails(&self) -> Result<Vec<String>>;
}

// =============================================================================
// CONTROLLED VOCABULARIES
// =============================================================================

/// Read-only reference data.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    async fn list_genres(&self) -> Result<Vec<VocabEntry>>;

    /// Record types, optionally restricted by their `digital` flag.
    async fn list_record_types(&self, digital_only: Option<bool>) -> Result<Vec<VocabEntry>>;

    async fn list_transfer_methods(&self) -> Result<Vec<VocabEntry>>;

    async fn list_media_carriers(&self) -> Result<Vec<VocabEntry>>;

    /// Name of one entry, or an empty string when the id is unknown.
    async fn resolve_name(&self, table: VocabTable, id: i32) -> Result<String>;

    /// Comma-joined names of the given ids, in the order given.
    async fn resolve_names(&self, table: VocabTable, ids: &[i32]) -> Result<String>;
}

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// Atomic persistence of a validated accession graph.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn commit(&self, submission: &Submission) -> Result<CommittedSubmission>;
}

// =============================================================================
// ADMIN
// =============================================================================

/// Staff-facing read access to committed accessions.
#[async_trait]
pub trait AccessionRepository: Send + Sync {
    async fn list_accessions(&self, req: AccessionListRequest) -> Result<AccessionPage>;

    async fn get_accession_detail(&self, id: i32) -> Result<AccessionDetail>;
}

/// Append-only staff notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn list_notes(&self, accession_id: i32) -> Result<Vec<Note>>;

    async fn add_note(&self, accession_id: i32, user_id: i32, note: &NewNote) -> Result<Note>;
}
