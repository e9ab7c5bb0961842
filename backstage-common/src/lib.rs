//! # Backstage Common Library
//!
//! Shared code for the Backstage admin services including:
//! - Contact submission models and the change-feed event type
//! - Configuration loading and root folder resolution
//! - Database initialization
//! - SSE stream helpers
//! - Status icon mapping

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod icons;
pub mod models;
pub mod sse;

pub use error::{Error, Result};
pub use events::ChangeEvent;
pub use icons::Icon;
pub use models::{ContactSubmission, NewSubmission, SubmissionPatch, SubmissionStatus};
