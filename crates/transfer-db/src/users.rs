//! User registry repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::{debug, info};

use transfer_core::{normalize_phone, Error, Result, User, UserProfile, UserRepository};

use crate::secrets::{generate_token, hash_token, VERIFY_TOKEN_LEN};

const USER_COLUMNS: &str = "id, first_name, last_name, title, university_affiliation, email, \
     phone, verified, verify_token, admin, created_at, updated_at";

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

pub(crate) fn map_row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        title: row.get("title"),
        affiliation: row.get("university_affiliation"),
        email: row.get("email"),
        phone: row.get("phone"),
        verified: row.get("verified"),
        verify_token: row.get("verify_token"),
        admin: row.get("admin"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str, what: &str) -> Result<User> {
        // `column` is always a literal from this module.
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| map_row_to_user(&r))
            .ok_or_else(|| Error::NotFound(format!("user {}", what)))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<User> {
        self.find_one("email", email.trim(), email).await
    }

    async fn find_by_verify_token(&self, token: &str) -> Result<User> {
        self.find_one("verify_token", token, "for verification token")
            .await
    }

    async fn find_by_api_token(&self, token: &str) -> Result<User> {
        self.find_one("api_token", &hash_token(token), "for session token")
            .await
    }

    async fn create(&self, profile: &UserProfile) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let user = self.create_tx(&mut tx, profile).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(user)
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let user = self.update_profile_tx(&mut tx, profile).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(user)
    }

    async fn mark_verified(&self, id: i32) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET verified = TRUE, updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        info!(subsystem = "db", component = "users", op = "mark_verified", user_id = id, "User verified");
        Ok(())
    }

    async fn set_api_token(&self, id: i32, token: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET api_token = $2 WHERE id = $1")
            .bind(id)
            .bind(hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn admin_emails(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT email FROM users WHERE admin = TRUE ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("email")).collect())
    }
}

/// Transaction-aware variants used by the submission commit.
impl PgUserRepository {
    /// Create an unverified user within an existing transaction.
    ///
    /// Every profile field is required. A duplicate email is a `Conflict`.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        profile: &UserProfile,
    ) -> Result<User> {
        profile.validate()?;
        let now = Utc::now();
        let email = profile.email.trim();

        let row = sqlx::query(&format!(
            "INSERT INTO users (first_name, last_name, title, university_affiliation, email, \
             phone, verified, verify_token, admin, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, FALSE, $8, $8) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.title)
        .bind(&profile.affiliation)
        .bind(email)
        .bind(profile.normalized_phone())
        .bind(generate_token(VERIFY_TOKEN_LEN))
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Error::from_unique_violation(e, &format!("user {}", email)))?;

        let user = map_row_to_user(&row);
        info!(subsystem = "db", component = "users", op = "create", user_id = user.id, email = %user.email, "User created");
        Ok(user)
    }

    /// Update the mutable fields of the user owning `profile.email`.
    ///
    /// `verified`, `verify_token`, `admin`, `created_at` and `email` are
    /// never written here.
    pub async fn update_profile_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        profile: &UserProfile,
    ) -> Result<User> {
        let email = profile.email.trim();
        let row = sqlx::query(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, title = $4, \
             university_affiliation = $5, phone = $6, updated_at = $7 \
             WHERE email = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.title)
        .bind(&profile.affiliation)
        .bind(profile.normalized_phone())
        .bind(Utc::now())
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.map(|r| map_row_to_user(&r))
            .ok_or_else(|| Error::NotFound(format!("user {}", email)))
    }

    /// Insert the submitter or refresh their mutable fields, keyed by email.
    ///
    /// Runs as a single statement so two first-time submissions from the same
    /// address cannot both insert.
    pub async fn upsert_submitter_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        profile: &UserProfile,
    ) -> Result<User> {
        let now = Utc::now();
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(Error::Validation("user email is required".to_string()));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO users (first_name, last_name, title, university_affiliation, email, \
             phone, verified, verify_token, admin, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, FALSE, $8, $8) \
             ON CONFLICT (email) DO UPDATE SET \
                first_name = EXCLUDED.first_name, \
                last_name = EXCLUDED.last_name, \
                title = EXCLUDED.title, \
                university_affiliation = EXCLUDED.university_affiliation, \
                phone = EXCLUDED.phone, \
                updated_at = EXCLUDED.updated_at \
             RETURNING {}, (xmax = 0) AS inserted",
            USER_COLUMNS
        ))
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.title)
        .bind(&profile.affiliation)
        .bind(email)
        .bind(normalize_phone(&profile.phone))
        .bind(generate_token(VERIFY_TOKEN_LEN))
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let inserted: bool = row.get("inserted");
        let user = map_row_to_user(&row);
        debug!(
            subsystem = "db",
            component = "users",
            op = "upsert_submitter",
            user_id = user.id,
            inserted,
            "Submitter recorded"
        );
        Ok(user)
    }
}
