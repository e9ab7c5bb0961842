//! Message inbox synchronizer
//!
//! Keeps the admin's view of contact submissions consistent across change
//! feed refetches, paginated fetches and local edits:
//! - [`projector`]: tab and text filtering of the loaded page
//! - [`session`]: state container and the mutation operations
//! - [`listener`]: change feed subscription that triggers refetches

use backstage_common::Error;
use serde::Serialize;
use thiserror::Error;

pub mod listener;
pub mod projector;
pub mod session;

pub use listener::ChangeListener;
pub use projector::{project, InboxTab, TabCounts};
pub use session::{Inbox, InboxSettings, InboxView, NotesOutcome};

/// Errors surfaced by inbox operations
///
/// Every variant is terminal for the action that produced it; nothing is
/// retried automatically.
#[derive(Debug, Error)]
pub enum InboxError {
    /// Database, file store or other gateway failure (includes remote not-found)
    #[error(transparent)]
    Gateway(#[from] Error),

    /// The submission is not on the loaded page
    #[error("Submission not loaded: {0}")]
    NotLoaded(String),

    #[error("Attachment not found on submission {id}: {url}")]
    AttachmentNotFound { id: String, url: String },

    /// Deletion is irreversible and must be confirmed explicitly
    #[error("Deletion requires confirmation")]
    ConfirmationRequired,

    #[error("Malformed attachment URL {url}: {reason}")]
    MalformedAttachmentUrl { url: String, reason: String },

    #[error("Please select a valid image file (JPEG, PNG, GIF, WEBP), got {0}")]
    UnsupportedImageType(String),

    #[error("Image size should be less than {max} (got {size})")]
    UploadTooLarge { size: String, max: String },

    #[error("Could not process image: {0}")]
    ImageDecode(String),
}

/// Severity of a [`Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing notification ("toast")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
