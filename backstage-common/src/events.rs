//! Change-feed events for the submissions collection
//!
//! Published by the data gateway after every successful write. Consumers
//! (the inbox change listener, SSE clients) treat every event as a hint to
//! refetch; the payload is informational only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row-level change on the `contact_submissions` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeEvent {
    /// A visitor submitted the contact form
    Inserted {
        id: String,
        timestamp: DateTime<Utc>,
    },

    /// An admin mutated read state, status, notes or attachments
    Updated {
        id: String,
        timestamp: DateTime<Utc>,
    },

    /// A submission was deleted
    Deleted {
        id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ChangeEvent {
    pub fn inserted(id: impl Into<String>) -> Self {
        ChangeEvent::Inserted { id: id.into(), timestamp: Utc::now() }
    }

    pub fn updated(id: impl Into<String>) -> Self {
        ChangeEvent::Updated { id: id.into(), timestamp: Utc::now() }
    }

    pub fn deleted(id: impl Into<String>) -> Self {
        ChangeEvent::Deleted { id: id.into(), timestamp: Utc::now() }
    }

    /// Id of the affected submission
    pub fn submission_id(&self) -> &str {
        match self {
            ChangeEvent::Inserted { id, .. }
            | ChangeEvent::Updated { id, .. }
            | ChangeEvent::Deleted { id, .. } => id,
        }
    }

    /// Event name used on SSE streams
    pub fn event_type(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted { .. } => "SubmissionInserted",
            ChangeEvent::Updated { .. } => "SubmissionUpdated",
            ChangeEvent::Deleted { .. } => "SubmissionDeleted",
        }
    }
}
