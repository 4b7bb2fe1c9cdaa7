//! # transfer-db
//!
//! PostgreSQL database layer for the archives transfer service.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, vocabularies, accessions and notes
//! - The transactional commit of a submitted accession graph
//! - The pending-upload filesystem store
//!
//! ## Example
//!
//! ```rust,ignore
//! use transfer_db::{Database, SubmissionRepository};
//!
//! let db = Database::connect("postgres://localhost/transfer").await?;
//! db.migrate().await?;
//! let committed = db.submissions.commit(&submission).await?;
//! ```

pub mod admin;
pub mod notes;
pub mod pool;
pub mod secrets;
pub mod submissions;
pub mod uploads;
pub mod users;
pub mod vocabs;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use transfer_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export repository implementations
pub use admin::{PgAccessionRepository, PAGE_SIZE};
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use submissions::{PgSubmissionRepository, WriteClass, WriteOutcome};
pub use uploads::{ChunkInfo, PendingFile, StagedUpload, UploadStore};
pub use users::PgUserRepository;
pub use vocabs::PgVocabularyRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Submitter and admin accounts.
    pub users: PgUserRepository,
    /// Controlled vocabularies.
    pub vocabs: PgVocabularyRepository,
    /// Accession graph commit.
    pub submissions: PgSubmissionRepository,
    /// Admin accession listing and detail.
    pub accessions: PgAccessionRepository,
    /// Staff notes.
    pub notes: PgNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            vocabs: PgVocabularyRepository::new(pool.clone()),
            submissions: PgSubmissionRepository::new(pool.clone()),
            accessions: PgAccessionRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query; used by the health check.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
