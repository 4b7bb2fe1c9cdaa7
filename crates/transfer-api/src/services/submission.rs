//! Submission workflow: validate, commit, then the post-commit side effects.
//!
//! The database commit is the only step that decides the outcome. Moving
//! the uploaded files and sending the receipt run afterwards and are only
//! logged when they fail.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use transfer_core::{
    sanitize_filename, CommittedSubmission, Result, Submission, SubmissionPayload,
    SubmissionRepository, UserRepository, VocabTable, VocabularyRepository,
};
use transfer_db::{Database, UploadStore};
use transfer_mail::{DigitalReceipt, Notifier, PhysicalReceipt, ReceiptView};

/// What happened to an accepted submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub accession_id: i32,
    pub identifier: String,
    /// Where the pending files were moved, when that succeeded.
    pub transferred_to: Option<PathBuf>,
    pub receipt_sent: bool,
    pub advisory_failures: usize,
}

/// Orchestrates one submission end to end.
#[derive(Clone)]
pub struct SubmissionService {
    db: Database,
    uploads: UploadStore,
    notifier: Notifier,
}

impl SubmissionService {
    pub fn new(db: Database, uploads: UploadStore, notifier: Notifier) -> Self {
        Self {
            db,
            uploads,
            notifier,
        }
    }

    /// Validate and commit a payload, then move its files and send the receipt.
    pub async fn submit(&self, payload: SubmissionPayload) -> Result<SubmissionReceipt> {
        let start = Instant::now();
        let submission = payload.validate()?;
        let committed = self.db.submissions.commit(&submission).await?;

        let transferred_to = self.move_uploads(&submission, &committed).await;

        let view = self.receipt_view(&submission, &committed).await;
        let bcc = match self.db.users.admin_emails().await {
            Ok(emails) => emails,
            Err(e) => {
                warn!(subsystem = "api", component = "submissions", op = "admin_emails", accession_id = committed.accession_id, error = %e, "Unable to load admin emails; receipt goes to submitter only");
                Vec::new()
            }
        };
        let receipt_sent = self
            .notifier
            .send_receipt(&committed.user, &view, &bcc)
            .await;

        info!(
            subsystem = "api",
            component = "submissions",
            op = "submit",
            accession_id = committed.accession_id,
            upload_token = %committed.identifier,
            email = %committed.user.email,
            files_moved = transferred_to.is_some(),
            receipt_sent,
            advisory_failures = committed.advisory_failures,
            duration_ms = start.elapsed().as_millis() as u64,
            "Submission accepted"
        );

        Ok(SubmissionReceipt {
            accession_id: committed.accession_id,
            identifier: committed.identifier,
            transferred_to,
            receipt_sent,
            advisory_failures: committed.advisory_failures,
        })
    }

    async fn move_uploads(
        &self,
        submission: &Submission,
        committed: &CommittedSubmission,
    ) -> Option<PathBuf> {
        let token = submission.upload_token()?;
        match self.uploads.promote(token, committed.created_at).await {
            Ok(dest) => Some(dest),
            Err(e) => {
                warn!(
                    subsystem = "api",
                    component = "submissions",
                    op = "promote",
                    accession_id = committed.accession_id,
                    upload_token = %token,
                    error = %e,
                    "Unable to move pending files to transferred"
                );
                None
            }
        }
    }

    async fn names(&self, table: VocabTable, ids: &[i32]) -> String {
        match self.db.vocabs.resolve_names(table, ids).await {
            Ok(names) => names,
            Err(e) => {
                warn!(subsystem = "api", component = "submissions", op = "resolve_names", table = table.table_name(), error = %e, "Unable to resolve vocabulary names");
                String::new()
            }
        }
    }

    async fn name(&self, table: VocabTable, id: Option<i32>) -> String {
        let Some(id) = id else {
            return String::new();
        };
        self.db
            .vocabs
            .resolve_name(table, id)
            .await
            .unwrap_or_default()
    }

    /// Denormalize the submission for the receipt email.
    async fn receipt_view(
        &self,
        submission: &Submission,
        committed: &CommittedSubmission,
    ) -> ReceiptView {
        let digital = match &submission.digital {
            Some(d) => Some(DigitalReceipt {
                description: d.description.clone(),
                date_range: d.date_range.clone(),
                record_types: self.names(VocabTable::RecordTypes, &d.record_types).await,
                files: d.files.iter().map(|f| sanitize_filename(f)).collect(),
                total_size_bytes: d.total_size_bytes,
            }),
            None => None,
        };

        let physical = match &submission.physical {
            Some(p) => Some(PhysicalReceipt {
                date_range: p.date_range.clone(),
                box_info: p.box_info.clone(),
                record_types: self.names(VocabTable::RecordTypes, &p.record_types).await,
                transfer_method: self
                    .name(VocabTable::TransferMethods, p.transfer_method_id)
                    .await,
                has_digital: p.has_digital,
                media_carriers: self.names(VocabTable::MediaCarriers, &p.media_carriers).await,
                media_count: p.media_count.clone(),
                has_software: p.has_software,
                tech_description: p.tech_description.clone(),
                inventory: p.inventory.clone(),
            }),
            None => None,
        };

        ReceiptView {
            accession_id: committed.accession_id,
            identifier: committed.identifier.clone(),
            submitted_at: committed.created_at,
            summary: submission.summary.clone(),
            activities: submission.activities.clone(),
            creator: submission.creator.clone(),
            genres: self.names(VocabTable::Genres, &submission.genres).await,
            digital,
            physical,
        }
    }
}
