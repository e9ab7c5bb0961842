//! Contact submission models
//!
//! A submission is created by a site visitor through the public contact
//! form. Only `is_read`, `status`, `notes` and `attachments` change after
//! creation, and only through admin actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::icons::Icon;
use crate::Error;

/// Workflow status of a submission
///
/// Any status may be set from any other; there is no transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    New,
    InProgress,
    Completed,
    Archived,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [
        SubmissionStatus::New,
        SubmissionStatus::InProgress,
        SubmissionStatus::Completed,
        SubmissionStatus::Archived,
    ];

    /// Stored/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::New => "new",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Archived => "archived",
        }
    }

    /// Human-readable label ("in progress")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Badge icon shown next to the status in the admin detail view
    pub fn icon(&self) -> Icon {
        match self {
            SubmissionStatus::New => Icon::Mail,
            SubmissionStatus::InProgress => Icon::Clock,
            SubmissionStatus::Completed => Icon::CheckCircle,
            SubmissionStatus::Archived => Icon::Archive,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(SubmissionStatus::New),
            "in_progress" => Ok(SubmissionStatus::InProgress),
            "completed" => Ok(SubmissionStatus::Completed),
            "archived" => Ok(SubmissionStatus::Archived),
            other => Err(Error::InvalidInput(format!("Unknown submission status: {}", other))),
        }
    }
}

/// One contact-form entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub status: SubmissionStatus,
    pub notes: Option<String>,
    /// Public URLs of uploaded images, in upload order
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl ContactSubmission {
    /// Apply a patch in place. Fields absent from the patch are left alone.
    pub fn apply(&mut self, patch: &SubmissionPatch) {
        if let Some(is_read) = patch.is_read {
            self.is_read = is_read;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(attachments) = &patch.attachments {
            self.attachments = attachments.clone();
        }
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// Fields supplied by the visitor when a submission is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

impl NewSubmission {
    /// Reject blank required fields and addresses without an `@`
    pub fn validate(&self) -> crate::Result<()> {
        for (field, value) in [("name", &self.name), ("email", &self.email), ("message", &self.message)] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("Field '{}' is required", field)));
            }
        }
        if !self.email.contains('@') {
            return Err(Error::InvalidInput(format!("Invalid email address: {}", self.email)));
        }
        Ok(())
    }
}

/// Admin-mutable fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
}

impl SubmissionPatch {
    pub fn read() -> Self {
        Self { is_read: Some(true), ..Default::default() }
    }

    pub fn status(status: SubmissionStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self { notes: Some(notes.into()), ..Default::default() }
    }

    pub fn attachments(attachments: Vec<String>) -> Self {
        Self { attachments: Some(attachments), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.is_read.is_none()
            && self.status.is_none()
            && self.notes.is_none()
            && self.attachments.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContactSubmission {
        ContactSubmission {
            id: "m1".to_string(),
            name: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            phone: None,
            message: "Booking request".to_string(),
            submission_date: Utc::now(),
            is_read: false,
            status: SubmissionStatus::New,
            notes: None,
            attachments: vec![],
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in SubmissionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
        }
        assert!("done".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_status_label() {
        assert_eq!(SubmissionStatus::InProgress.label(), "in progress");
        assert_eq!(SubmissionStatus::Archived.label(), "archived");
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SubmissionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_apply_patch_only_touches_present_fields() {
        let mut s = sample();
        s.apply(&SubmissionPatch::status(SubmissionStatus::Completed));
        assert_eq!(s.status, SubmissionStatus::Completed);
        assert!(!s.is_read);
        assert_eq!(s.notes, None);

        s.apply(&SubmissionPatch::read());
        assert!(s.is_read);
        assert_eq!(s.status, SubmissionStatus::Completed);
    }

    #[test]
    fn test_missing_attachments_deserialize_as_empty() {
        let json = r#"{
            "id": "m2", "name": "A", "email": "a@b.c", "phone": null,
            "message": "hi", "submission_date": "2024-05-01T10:00:00Z",
            "notes": null
        }"#;
        let s: ContactSubmission = serde_json::from_str(json).unwrap();
        assert!(s.attachments.is_empty());
        assert_eq!(s.status, SubmissionStatus::New);
    }

    #[test]
    fn test_new_submission_validation() {
        let ok = NewSubmission {
            name: "Maria".into(),
            email: "maria@example.com".into(),
            phone: None,
            message: "Hello".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = NewSubmission { message: "   ".into(), ..ok.clone() };
        assert!(matches!(blank.validate(), Err(Error::InvalidInput(_))));

        let bad_email = NewSubmission { email: "nope".into(), ..ok };
        assert!(bad_email.validate().is_err());
    }
}
