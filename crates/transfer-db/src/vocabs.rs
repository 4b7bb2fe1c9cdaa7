//! Controlled vocabulary lookups.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use transfer_core::{Error, Result, VocabEntry, VocabTable, VocabularyRepository};

/// PostgreSQL implementation of VocabularyRepository.
#[derive(Clone)]
pub struct PgVocabularyRepository {
    pool: Pool<Postgres>,
}

fn map_row_to_entry(row: &PgRow) -> VocabEntry {
    VocabEntry {
        id: row.get("id"),
        name: row.get("name"),
        description: row.try_get("description").ok().flatten(),
        digital_only: row.try_get("digital").ok(),
    }
}

impl PgVocabularyRepository {
    /// Create a new PgVocabularyRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn list_simple(&self, table: VocabTable) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name FROM {} ORDER BY id",
            table.table_name()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_entry).collect())
    }
}

#[async_trait]
impl VocabularyRepository for PgVocabularyRepository {
    async fn list_genres(&self) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query("SELECT id, name, description FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_entry).collect())
    }

    async fn list_record_types(&self, digital_only: Option<bool>) -> Result<Vec<VocabEntry>> {
        let rows = sqlx::query(
            "SELECT id, name, description, digital FROM record_types \
             WHERE $1::BOOLEAN IS NULL OR digital = $1 ORDER BY id",
        )
        .bind(digital_only)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(map_row_to_entry).collect())
    }

    async fn list_transfer_methods(&self) -> Result<Vec<VocabEntry>> {
        self.list_simple(VocabTable::TransferMethods).await
    }

    async fn list_media_carriers(&self) -> Result<Vec<VocabEntry>> {
        self.list_simple(VocabTable::MediaCarriers).await
    }

    async fn resolve_name(&self, table: VocabTable, id: i32) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar(&format!(
            "SELECT name FROM {} WHERE id = $1",
            table.table_name()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(name.unwrap_or_default())
    }

    async fn resolve_names(&self, table: VocabTable, ids: &[i32]) -> Result<String> {
        if ids.is_empty() {
            return Ok(String::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT t.name FROM UNNEST($1::INT[]) WITH ORDINALITY AS u(id, ord) \
             JOIN {} t ON t.id = u.id ORDER BY u.ord",
            table.table_name()
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        Ok(names.join(", "))
    }
}
