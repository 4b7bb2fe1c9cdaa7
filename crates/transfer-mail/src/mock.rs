//! Recording mailer for tests.
//!
//! ```rust,ignore
//! let mailer = MockMailer::new();
//! let notifier = Notifier::new(Arc::new(mailer.clone()), "transfer.example.edu");
//! notifier.send_verification(&user).await;
//! assert_eq!(mailer.sent().len(), 1);
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use transfer_core::{Error, Result};

use crate::mailer::{EmailMessage, Mailer};

/// Mailer that stores every message it is asked to send.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail {
            return Err(Error::Mail("mock transport failure".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| Error::Mail("mock mailer lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
