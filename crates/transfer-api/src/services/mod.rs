//! Service layer for business logic.

pub mod submission;

pub use submission::{SubmissionReceipt, SubmissionService};
