//! Staff notes attached to accessions. Notes are append-only.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::info;

use transfer_core::{Error, NewNote, Note, NoteRepository, Result};

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

fn map_row_to_note(row: &PgRow) -> Note {
    let first: String = row.get("first_name");
    let last: String = row.get("last_name");
    Note {
        id: row.get("id"),
        title: row.get("title"),
        note: row.get("note"),
        user_id: row.get("user_id"),
        user_name: format!("{} {}", first, last),
        created_at: row.get("created_at"),
    }
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_note(&self, note_id: i32) -> Result<Note> {
        let row = sqlx::query(
            "SELECT n.id, n.title, n.note, n.user_id, n.created_at, u.first_name, u.last_name \
             FROM notes n JOIN users u ON u.id = n.user_id WHERE n.id = $1",
        )
        .bind(note_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(map_row_to_note(&row))
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list_notes(&self, accession_id: i32) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.id, n.title, n.note, n.user_id, n.created_at, u.first_name, u.last_name \
             FROM accession_notes an \
             JOIN notes n ON n.id = an.note_id \
             JOIN users u ON u.id = n.user_id \
             WHERE an.accession_id = $1 \
             ORDER BY n.created_at, n.id",
        )
        .bind(accession_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_note).collect())
    }

    async fn add_note(&self, accession_id: i32, user_id: i32, note: &NewNote) -> Result<Note> {
        if note.note.trim().is_empty() {
            return Err(Error::Validation("note text is required".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accessions WHERE id = $1)")
                .bind(accession_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if !exists {
            return Err(Error::NotFound(format!("accession {}", accession_id)));
        }

        let note_id: i32 = sqlx::query_scalar(
            "INSERT INTO notes (title, note, user_id, created_at) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(note.title.trim())
        .bind(&note.note)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("INSERT INTO accession_notes (accession_id, note_id) VALUES ($1, $2)")
            .bind(accession_id)
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "notes",
            op = "add_note",
            accession_id,
            note_id,
            user_id,
            "Note added"
        );
        self.fetch_note(note_id).await
    }
}
