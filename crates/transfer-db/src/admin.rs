//! Staff-facing accession queries.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use transfer_core::{
    AccessionDetail, AccessionListRequest, AccessionPage, AccessionRepository, AccessionRow,
    DigitalDetail, Error, InventoryItem, PhysicalDetail, Result, TransferKind,
};

use crate::escape_like;
use crate::users::map_row_to_user;

/// Rows per page of the admin accession listing.
pub const PAGE_SIZE: i64 = 50;

// $1 = ILIKE pattern or NULL, $2 = genre name or NULL
const LIST_FILTER: &str = "\
    FROM accessions a \
    JOIN users u ON u.id = a.user_id \
    LEFT JOIN digital_accessions d ON d.accession_id = a.id \
    LEFT JOIN physical_accessions p ON p.accession_id = a.id \
    WHERE ($1::TEXT IS NULL \
           OR a.description ILIKE $1 ESCAPE '\\' \
           OR d.description ILIKE $1 ESCAPE '\\' \
           OR p.tech_description ILIKE $1 ESCAPE '\\' \
           OR u.first_name ILIKE $1 ESCAPE '\\' \
           OR u.last_name ILIKE $1 ESCAPE '\\' \
           OR d.date_range ILIKE $1 ESCAPE '\\' \
           OR p.date_range ILIKE $1 ESCAPE '\\') \
      AND ($2::TEXT IS NULL OR EXISTS ( \
           SELECT 1 FROM accession_genres ag JOIN genres g ON g.id = ag.genre_id \
           WHERE ag.accession_id = a.id AND g.name = $2))";

/// PostgreSQL implementation of AccessionRepository.
#[derive(Clone)]
pub struct PgAccessionRepository {
    pool: Pool<Postgres>,
}

fn map_row_to_accession_row(row: &PgRow) -> AccessionRow {
    let first: String = row.get("first_name");
    let last: String = row.get("last_name");
    AccessionRow {
        id: row.get("id"),
        identifier: row.get("identifier"),
        submitter: format!("{} {}", first, last),
        description: row.get("description"),
        accession_type: row.get("accession_type"),
        genres: row.get("genres"),
        digital: row.get("digital"),
        physical: row.get("physical"),
        submitted_at: row.get("created_at"),
    }
}

fn map_row_to_inventory_item(row: &PgRow) -> InventoryItem {
    InventoryItem {
        box_number: row.get("box_number"),
        record_group: row.get("record_group_number"),
        title: row.get("box_title"),
        description: row.get("description"),
        dates: row.get("dates"),
    }
}

fn search_pattern(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)))
}

impl PgAccessionRepository {
    /// Create a new PgAccessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn names(&self, sql: &str, id: i32) -> Result<Vec<String>> {
        let rows = sqlx::query(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn record_type_names(&self, kind: TransferKind, id: i32) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT rt.name FROM accession_record_types art \
             JOIN record_types rt ON rt.id = art.record_type_id \
             WHERE art.accession_type = $1 AND art.accession_id = $2 ORDER BY art.id",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(|r| r.get("name")).collect())
    }

    async fn digital_detail(&self, accession_id: i32) -> Result<Option<DigitalDetail>> {
        let row = sqlx::query(
            "SELECT id, upload_id, description, date_range, upload_size \
             FROM digital_accessions WHERE accession_id = $1",
        )
        .bind(accession_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: i32 = row.get("id");
        let files = sqlx::query_scalar::<_, String>(
            "SELECT filename FROM digital_files WHERE digital_accession_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Some(DigitalDetail {
            id,
            upload_id: row.get("upload_id"),
            description: row.get("description"),
            date_range: row.get("date_range"),
            record_types: self.record_type_names(TransferKind::Digital, id).await?,
            files,
            total_size_bytes: row.get("upload_size"),
        }))
    }

    async fn physical_detail(&self, accession_id: i32) -> Result<Option<PhysicalDetail>> {
        let row = sqlx::query(
            "SELECT p.id, p.date_range, p.box_info, p.transfer_method_id, p.has_digital, \
             p.tech_description, p.media_counts, p.has_software, \
             COALESCE(tm.name, '') AS transfer_method \
             FROM physical_accessions p \
             LEFT JOIN transfer_methods tm ON tm.id = p.transfer_method_id \
             WHERE p.accession_id = $1",
        )
        .bind(accession_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: i32 = row.get("id");

        let media_carriers = self
            .names(
                "SELECT mc.name FROM physical_media_carriers pmc \
                 JOIN media_carriers mc ON mc.id = pmc.media_carrier_id \
                 WHERE pmc.physical_accession_id = $1 ORDER BY pmc.id",
                id,
            )
            .await?;

        let inventory = sqlx::query(
            "SELECT box_number, record_group_number, box_title, description, dates \
             FROM inventory_items WHERE physical_accession_id = $1 ORDER BY position, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .iter()
        .map(map_row_to_inventory_item)
        .collect();

        Ok(Some(PhysicalDetail {
            id,
            date_range: row.get("date_range"),
            box_info: row.get("box_info"),
            record_types: self.record_type_names(TransferKind::Physical, id).await?,
            transfer_method_id: row.get("transfer_method_id"),
            transfer_method: row.get("transfer_method"),
            has_digital: row.get("has_digital"),
            tech_description: row.get("tech_description"),
            media_carriers,
            media_count: row.get("media_counts"),
            has_software: row.get("has_software"),
            inventory,
        }))
    }
}

/// Row offset of a 1-based page, `None` when it does not fit in an `i64`.
fn page_offset(page: i64) -> Option<i64> {
    page.max(1).checked_sub(1)?.checked_mul(PAGE_SIZE)
}

#[async_trait]
impl AccessionRepository for PgAccessionRepository {
    async fn list_accessions(&self, req: AccessionListRequest) -> Result<AccessionPage> {
        let page = req.page.max(1);
        let pattern = search_pattern(req.query.as_deref());
        let genre = req
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accessions")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let filtered_total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(DISTINCT a.id) {}", LIST_FILTER))
                .bind(&pattern)
                .bind(&genre)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        // A page past the addressable range is simply empty.
        let Some(offset) = page_offset(page) else {
            return Ok(AccessionPage {
                total,
                filtered_total,
                page,
                page_size: PAGE_SIZE,
                accessions: Vec::new(),
            });
        };

        let rows = sqlx::query(&format!(
            "SELECT a.id, a.identifier, a.description, a.accession_type, a.created_at, \
             u.first_name, u.last_name, \
             d.id IS NOT NULL AS digital, p.id IS NOT NULL AS physical, \
             COALESCE((SELECT string_agg(g.name, ', ' ORDER BY g.name) \
                       FROM accession_genres ag JOIN genres g ON g.id = ag.genre_id \
                       WHERE ag.accession_id = a.id), '') AS genres \
             {} ORDER BY a.created_at DESC, a.id DESC LIMIT $3 OFFSET $4",
            LIST_FILTER
        ))
        .bind(&pattern)
        .bind(&genre)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(AccessionPage {
            total,
            filtered_total,
            page,
            page_size: PAGE_SIZE,
            accessions: rows.iter().map(map_row_to_accession_row).collect(),
        })
    }

    async fn get_accession_detail(&self, id: i32) -> Result<AccessionDetail> {
        let row = sqlx::query(
            "SELECT id, identifier, user_id, description, activities, creator, \
             accession_type, created_at FROM accessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("accession {}", id)))?;

        let user_id: i32 = row.get("user_id");
        let user_row = sqlx::query(
            "SELECT id, first_name, last_name, title, university_affiliation, email, phone, \
             verified, verify_token, admin, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let genres = self
            .names(
                "SELECT g.name FROM accession_genres ag JOIN genres g ON g.id = ag.genre_id \
                 WHERE ag.accession_id = $1 ORDER BY ag.id",
                id,
            )
            .await?;

        let digital = self.digital_detail(id).await?;
        let physical = self.physical_detail(id).await?;

        Ok(AccessionDetail {
            id,
            identifier: row.get("identifier"),
            user: map_row_to_user(&user_row),
            summary: row.get("description"),
            activities: row.get("activities"),
            creator: row.get("creator"),
            genres,
            accession_type: row.get("accession_type"),
            created_at: row.get("created_at"),
            digital_transfer: digital.is_some(),
            digital,
            physical_transfer: physical.is_some(),
            physical,
        })
    }
}
