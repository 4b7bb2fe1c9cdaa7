//! # transfer-api
//!
//! HTTP service for the archives records-transfer form.
//!
//! The binary in `main.rs` only sets up logging, reads [`ServiceConfig`],
//! connects the database and serves [`build_router`]. Everything else lives
//! here so the integration tests can run the same router in-process.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::build_router;
pub use services::{SubmissionReceipt, SubmissionService};
pub use state::AppState;
