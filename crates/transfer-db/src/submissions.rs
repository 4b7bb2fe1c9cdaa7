//! Transactional commit of a validated accession graph.
//!
//! Every row of a submission is written inside one transaction. Writes come
//! in two classes:
//!
//! - **Critical**: the submitter, the accession, and the digital/physical
//!   sub-records. A failure rolls back the whole submission.
//! - **Advisory**: genre, record type and media carrier associations, file
//!   names and inventory rows. Each runs in its own savepoint so a failed row
//!   is rolled back alone, logged, counted, and skipped.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Acquire, Pool, Postgres, Row, Transaction};
use tracing::{debug, error, info, warn};

use transfer_core::{
    sanitize_filename, CommittedSubmission, DigitalTransfer, Error, PhysicalTransfer, Result,
    Submission, SubmissionRepository, TransferKind,
};

use crate::users::PgUserRepository;

/// How a failed write affects the surrounding submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteClass {
    /// Failure aborts the transaction.
    Critical,
    /// Failure is logged and the row skipped.
    Advisory,
}

impl WriteClass {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteClass::Critical => "critical",
            WriteClass::Advisory => "advisory",
        }
    }
}

/// Result of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row written; carries the generated id when the statement returns one.
    Written(Option<i32>),
    /// Advisory row skipped after a failure.
    Skipped,
}

impl WriteOutcome {
    pub fn id(self) -> Option<i32> {
        match self {
            WriteOutcome::Written(id) => id,
            WriteOutcome::Skipped => None,
        }
    }
}

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Writes the rows of one accession graph into an open transaction.
struct GraphWriter<'a, 't> {
    tx: &'a mut Transaction<'t, Postgres>,
    identifier: &'a str,
    advisory_failures: usize,
}

impl<'a, 't> GraphWriter<'a, 't> {
    fn new(tx: &'a mut Transaction<'t, Postgres>, identifier: &'a str) -> Self {
        Self {
            tx,
            identifier,
            advisory_failures: 0,
        }
    }

    async fn write(
        &mut self,
        class: WriteClass,
        table: &'static str,
        query: PgQuery<'_>,
    ) -> Result<WriteOutcome> {
        match class {
            WriteClass::Critical => match query.fetch_optional(&mut **self.tx).await {
                Ok(row) => {
                    let id = row.and_then(|r| r.try_get::<i32, _>("id").ok());
                    debug!(subsystem = "db", component = "submissions", db_table = table, write_class = class.as_str(), row_id = ?id, "Row written");
                    Ok(WriteOutcome::Written(id))
                }
                Err(e) => {
                    error!(
                        subsystem = "db",
                        component = "submissions",
                        op = "commit",
                        upload_token = %self.identifier,
                        db_table = table,
                        write_class = class.as_str(),
                        error = %e,
                        "Critical write failed, rolling back submission"
                    );
                    Err(Error::Internal(format!("Unable to create {} record", table)))
                }
            },
            WriteClass::Advisory => {
                // A failed statement aborts a Postgres transaction; isolating it
                // in a savepoint keeps the outer transaction usable.
                let mut savepoint = (&mut **self.tx).begin().await.map_err(Error::Database)?;
                match query.execute(&mut *savepoint).await {
                    Ok(_) => {
                        savepoint.commit().await.map_err(Error::Database)?;
                        Ok(WriteOutcome::Written(None))
                    }
                    Err(e) => {
                        savepoint.rollback().await.map_err(Error::Database)?;
                        self.advisory_failures += 1;
                        warn!(
                            subsystem = "db",
                            component = "submissions",
                            op = "commit",
                            upload_token = %self.identifier,
                            db_table = table,
                            write_class = class.as_str(),
                            error = %e,
                            "Advisory write failed, row skipped"
                        );
                        Ok(WriteOutcome::Skipped)
                    }
                }
            }
        }
    }

    async fn critical_id(&mut self, table: &'static str, query: PgQuery<'_>) -> Result<i32> {
        self.write(WriteClass::Critical, table, query)
            .await?
            .id()
            .ok_or_else(|| Error::Internal(format!("Unable to create {} record", table)))
    }

    async fn insert_accession(
        &mut self,
        submission: &Submission,
        user_id: i32,
        created_at: DateTime<Utc>,
    ) -> Result<i32> {
        let query = sqlx::query(
            "INSERT INTO accessions (identifier, user_id, description, activities, creator, \
             accession_type, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&submission.identifier)
        .bind(user_id)
        .bind(&submission.summary)
        .bind(&submission.activities)
        .bind(&submission.creator)
        .bind(&submission.accession_type)
        .bind(created_at);
        self.critical_id("accessions", query).await
    }

    async fn insert_genres(&mut self, accession_id: i32, genres: &[i32]) -> Result<()> {
        for genre_id in genres {
            let query =
                sqlx::query("INSERT INTO accession_genres (accession_id, genre_id) VALUES ($1, $2)")
                    .bind(accession_id)
                    .bind(*genre_id);
            self.write(WriteClass::Advisory, "accession_genres", query)
                .await?;
        }
        Ok(())
    }

    async fn insert_record_types(
        &mut self,
        kind: TransferKind,
        sub_record_id: i32,
        record_types: &[i32],
    ) -> Result<()> {
        for record_type_id in record_types {
            let query = sqlx::query(
                "INSERT INTO accession_record_types (accession_id, accession_type, record_type_id) \
                 VALUES ($1, $2, $3)",
            )
            .bind(sub_record_id)
            .bind(kind.as_str())
            .bind(*record_type_id);
            self.write(WriteClass::Advisory, "accession_record_types", query)
                .await?;
        }
        Ok(())
    }

    async fn insert_physical(
        &mut self,
        accession_id: i32,
        physical: &PhysicalTransfer,
    ) -> Result<i32> {
        let query = sqlx::query(
            "INSERT INTO physical_accessions (accession_id, date_range, box_info, \
             transfer_method_id, has_digital, tech_description, media_counts, has_software) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(accession_id)
        .bind(&physical.date_range)
        .bind(&physical.box_info)
        .bind(physical.transfer_method_id)
        .bind(physical.has_digital)
        .bind(&physical.tech_description)
        .bind(&physical.media_count)
        .bind(physical.has_software);
        let physical_id = self.critical_id("physical_accessions", query).await?;

        for carrier_id in &physical.media_carriers {
            let query = sqlx::query(
                "INSERT INTO physical_media_carriers (physical_accession_id, media_carrier_id) \
                 VALUES ($1, $2)",
            )
            .bind(physical_id)
            .bind(*carrier_id);
            self.write(WriteClass::Advisory, "physical_media_carriers", query)
                .await?;
        }

        self.insert_record_types(TransferKind::Physical, physical_id, &physical.record_types)
            .await?;

        for (position, item) in physical.inventory.iter().enumerate() {
            let query = sqlx::query(
                "INSERT INTO inventory_items (physical_accession_id, position, box_number, \
                 record_group_number, box_title, description, dates) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(physical_id)
            .bind(position as i32)
            .bind(&item.box_number)
            .bind(&item.record_group)
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.dates);
            self.write(WriteClass::Advisory, "inventory_items", query)
                .await?;
        }

        Ok(physical_id)
    }

    async fn insert_digital(
        &mut self,
        accession_id: i32,
        upload_id: &str,
        digital: &DigitalTransfer,
    ) -> Result<i32> {
        let query = sqlx::query(
            "INSERT INTO digital_accessions (accession_id, upload_id, description, date_range, \
             upload_size) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(accession_id)
        .bind(upload_id)
        .bind(&digital.description)
        .bind(&digital.date_range)
        .bind(digital.total_size_bytes);
        let digital_id = self.critical_id("digital_accessions", query).await?;

        for filename in &digital.files {
            let query = sqlx::query(
                "INSERT INTO digital_files (digital_accession_id, filename) VALUES ($1, $2)",
            )
            .bind(digital_id)
            .bind(sanitize_filename(filename));
            self.write(WriteClass::Advisory, "digital_files", query)
                .await?;
        }

        self.insert_record_types(TransferKind::Digital, digital_id, &digital.record_types)
            .await?;

        Ok(digital_id)
    }
}

/// PostgreSQL implementation of SubmissionRepository.
#[derive(Clone)]
pub struct PgSubmissionRepository {
    pool: Pool<Postgres>,
    users: PgUserRepository,
}

impl PgSubmissionRepository {
    /// Create a new PgSubmissionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl SubmissionRepository for PgSubmissionRepository {
    async fn commit(&self, submission: &Submission) -> Result<CommittedSubmission> {
        let start = Instant::now();
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let user = self
            .users
            .upsert_submitter_tx(&mut tx, &submission.user)
            .await
            .map_err(|e| match e {
                Error::Database(db_err) => {
                    error!(
                        subsystem = "db",
                        component = "submissions",
                        op = "commit",
                        upload_token = %submission.identifier,
                        db_table = "users",
                        write_class = WriteClass::Critical.as_str(),
                        error = %db_err,
                        "Critical write failed, rolling back submission"
                    );
                    Error::Internal("Unable to record submitter".to_string())
                }
                other => other,
            })?;

        let mut writer = GraphWriter::new(&mut tx, &submission.identifier);
        let accession_id = writer
            .insert_accession(submission, user.id, created_at)
            .await?;
        writer.insert_genres(accession_id, &submission.genres).await?;

        let physical_accession_id = match &submission.physical {
            Some(physical) => Some(writer.insert_physical(accession_id, physical).await?),
            None => None,
        };

        let digital_accession_id = match (&submission.digital, submission.upload_token()) {
            (Some(digital), Some(upload_id)) => {
                Some(writer.insert_digital(accession_id, upload_id, digital).await?)
            }
            _ => None,
        };

        let advisory_failures = writer.advisory_failures;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "submissions",
            op = "commit",
            accession_id,
            upload_token = %submission.identifier,
            user_id = user.id,
            advisory_failures,
            duration_ms = start.elapsed().as_millis() as u64,
            "Submission committed"
        );

        Ok(CommittedSubmission {
            accession_id,
            identifier: submission.identifier.clone(),
            user,
            created_at,
            digital_accession_id,
            physical_accession_id,
            advisory_failures,
        })
    }
}
