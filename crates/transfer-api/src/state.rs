//! Shared application state.

use std::sync::Arc;

use transfer_core::Result;
use transfer_db::{Database, UploadStore};
use transfer_mail::{mailer_from_config, Mailer, Notifier};

use crate::config::ServiceConfig;
use crate::services::SubmissionService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub uploads: UploadStore,
    pub notifier: Notifier,
    pub submissions: SubmissionService,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Build the state with the transport chosen by the mail configuration.
    pub fn new(db: Database, config: ServiceConfig) -> Result<Self> {
        let mailer = mailer_from_config(&config.mail)?;
        Ok(Self::with_mailer(db, config, mailer))
    }

    /// Build the state with an explicit mail transport.
    pub fn with_mailer(db: Database, config: ServiceConfig, mailer: Arc<dyn Mailer>) -> Self {
        let uploads = UploadStore::new(config.upload_dir.clone());
        let notifier = Notifier::new(mailer, config.hostname.clone());
        let submissions = SubmissionService::new(db.clone(), uploads.clone(), notifier.clone());
        Self {
            db,
            uploads,
            notifier,
            submissions,
            config: Arc::new(config),
        }
    }
}
