//! # transfer-mail
//!
//! Outbound email for the archives transfer service.
//!
//! This crate provides:
//! - A [`Mailer`] transport trait with SMTP and log-only implementations
//! - `{{placeholder}}` rendering of the bundled HTML templates
//! - A [`Notifier`] that renders and sends submission receipts and
//!   account verification links
//! - A recording [`mock::MockMailer`] for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use transfer_mail::{mailer_from_config, MailConfig, Notifier};
//!
//! # fn main() -> transfer_core::Result<()> {
//! let config = MailConfig::from_env();
//! let notifier = Notifier::new(mailer_from_config(&config)?, "transfer.example.edu");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mailer;
pub mod notifier;
pub mod mock;
pub mod template;

pub use config::MailConfig;
pub use mailer::{build_message, mailer_from_config, EmailMessage, LogMailer, Mailer, SmtpMailer};
pub use notifier::{
    format_size, render_receipt, render_verification, verification_url, DigitalReceipt, Notifier,
    PhysicalReceipt, ReceiptView, RECEIPT_SUBJECT, VERIFY_SUBJECT,
};
pub use template::{escape_html, render, TemplateVars};
