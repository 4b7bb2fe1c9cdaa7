//! # transfer-core
//!
//! Core types, traits, and error taxonomy for the archives transfer service.
//!
//! The other transfer crates depend on this one for the accession graph,
//! the submission payload and its validation, and the repository traits.

pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod tokens;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{sanitize_filename, validate_upload_token};
pub use models::*;
pub use tokens::new_submission_token;
pub use traits::*;
