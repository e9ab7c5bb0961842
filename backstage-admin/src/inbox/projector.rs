//! Tab and free-text filtering over the loaded page
//!
//! Pure functions: same inputs, same output, source order preserved.

use backstage_common::{ContactSubmission, Error, SubmissionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named list filter shown as a tab in the inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxTab {
    #[default]
    All,
    Unread,
    InProgress,
    Archived,
    WithImages,
}

impl InboxTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboxTab::All => "all",
            InboxTab::Unread => "unread",
            InboxTab::InProgress => "in_progress",
            InboxTab::Archived => "archived",
            InboxTab::WithImages => "with_images",
        }
    }

    pub fn matches(&self, submission: &ContactSubmission) -> bool {
        match self {
            InboxTab::All => true,
            InboxTab::Unread => !submission.is_read,
            InboxTab::InProgress => submission.status == SubmissionStatus::InProgress,
            InboxTab::Archived => submission.status == SubmissionStatus::Archived,
            InboxTab::WithImages => submission.has_attachments(),
        }
    }
}

impl fmt::Display for InboxTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboxTab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(InboxTab::All),
            "unread" => Ok(InboxTab::Unread),
            // The admin UI tab value has no underscore
            "in_progress" | "inprogress" => Ok(InboxTab::InProgress),
            "archived" => Ok(InboxTab::Archived),
            "with_images" => Ok(InboxTab::WithImages),
            other => Err(Error::InvalidInput(format!("Unknown inbox tab: {}", other))),
        }
    }
}

/// Case-insensitive substring match on name, email or message
///
/// `needle` must already be lowercase. An empty needle matches everything.
fn matches_text(submission: &ContactSubmission, needle: &str) -> bool {
    needle.is_empty()
        || submission.name.to_lowercase().contains(needle)
        || submission.email.to_lowercase().contains(needle)
        || submission.message.to_lowercase().contains(needle)
}

/// Submissions on the active tab that match the search query
pub fn project(list: &[ContactSubmission], tab: InboxTab, query: &str) -> Vec<ContactSubmission> {
    let needle = query.to_lowercase();
    list.iter()
        .filter(|s| tab.matches(s))
        .filter(|s| matches_text(s, &needle))
        .cloned()
        .collect()
}

/// Badge counts per tab over the loaded page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub unread: usize,
    pub in_progress: usize,
    pub archived: usize,
    pub with_images: usize,
}

impl TabCounts {
    pub fn tally(list: &[ContactSubmission]) -> Self {
        let count = |tab: InboxTab| list.iter().filter(|s| tab.matches(s)).count();
        Self {
            unread: count(InboxTab::Unread),
            in_progress: count(InboxTab::InProgress),
            archived: count(InboxTab::Archived),
            with_images: count(InboxTab::WithImages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission(id: &str, name: &str, status: SubmissionStatus, is_read: bool, images: usize) -> ContactSubmission {
        ContactSubmission {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", id),
            phone: None,
            message: format!("Message {}", id),
            submission_date: Utc::now(),
            is_read,
            status,
            notes: None,
            attachments: (0..images).map(|i| format!("https://host/{}/{}.png", id, i)).collect(),
        }
    }

    fn fixture() -> Vec<ContactSubmission> {
        vec![
            submission("m1", "Maria Lopez", SubmissionStatus::New, false, 0),
            submission("m2", "Jon Marsh", SubmissionStatus::InProgress, true, 1),
            submission("m3", "maria k", SubmissionStatus::Archived, true, 2),
            submission("m4", "Ines", SubmissionStatus::Completed, false, 0),
            submission("m5", "Tom", SubmissionStatus::InProgress, false, 3),
        ]
    }

    fn ids(list: &[ContactSubmission]) -> Vec<&str> {
        list.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_all_tab_empty_query_is_identity() {
        let list = fixture();
        assert_eq!(project(&list, InboxTab::All, ""), list);
    }

    #[test]
    fn test_tab_semantics() {
        let list = fixture();
        assert_eq!(ids(&project(&list, InboxTab::Unread, "")), ["m1", "m4", "m5"]);
        assert_eq!(ids(&project(&list, InboxTab::InProgress, "")), ["m2", "m5"]);
        assert_eq!(ids(&project(&list, InboxTab::Archived, "")), ["m3"]);
        assert_eq!(ids(&project(&list, InboxTab::WithImages, "")), ["m2", "m3", "m5"]);
    }

    #[test]
    fn test_text_filter_is_case_insensitive_across_fields() {
        let list = fixture();
        assert_eq!(ids(&project(&list, InboxTab::All, "MARIA")), ["m1", "m3"]);
        assert_eq!(ids(&project(&list, InboxTab::All, "m4@example")), ["m4"]);
        assert_eq!(ids(&project(&list, InboxTab::All, "message m5")), ["m5"]);
        assert!(project(&list, InboxTab::All, "nobody").is_empty());
    }

    #[test]
    fn test_with_images_and_query_intersect() {
        let mut list = vec![
            submission("a", "Maria One", SubmissionStatus::New, false, 0),
            submission("b", "Maria Two", SubmissionStatus::New, false, 2),
        ];
        list.push(submission("c", "Someone", SubmissionStatus::New, false, 1));

        let result = project(&list, InboxTab::WithImages, "maria");

        assert_eq!(ids(&result), ["b"]);
    }

    #[test]
    fn test_projection_is_deterministic_and_order_preserving() {
        let list = fixture();
        for tab in [InboxTab::All, InboxTab::Unread, InboxTab::InProgress, InboxTab::Archived, InboxTab::WithImages] {
            for query in ["", "m", "maria", "EXAMPLE", "zzz"] {
                let first = project(&list, tab, query);
                assert_eq!(first, project(&list, tab, query));

                // Order follows the source list
                let positions: Vec<usize> = first
                    .iter()
                    .map(|s| list.iter().position(|x| x.id == s.id).unwrap())
                    .collect();
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_tab_then_text_equals_text_then_tab() {
        let list = fixture();
        for tab in [InboxTab::All, InboxTab::Unread, InboxTab::InProgress, InboxTab::Archived, InboxTab::WithImages] {
            for query in ["", "maria", "o", "@"] {
                let combined = project(&list, tab, query);
                let tab_first: Vec<_> = project(&list, tab, "")
                    .into_iter()
                    .filter(|s| matches_text(s, &query.to_lowercase()))
                    .collect();
                let text_first = project(&project(&list, InboxTab::All, query), tab, "");
                assert_eq!(combined, tab_first);
                assert_eq!(combined, text_first);
            }
        }
    }

    #[test]
    fn test_tab_parsing() {
        assert_eq!("inprogress".parse::<InboxTab>().unwrap(), InboxTab::InProgress);
        assert_eq!("in_progress".parse::<InboxTab>().unwrap(), InboxTab::InProgress);
        assert_eq!("with_images".parse::<InboxTab>().unwrap(), InboxTab::WithImages);
        assert!("spam".parse::<InboxTab>().is_err());
    }

    #[test]
    fn test_tab_counts() {
        let counts = TabCounts::tally(&fixture());
        assert_eq!(
            counts,
            TabCounts { unread: 3, in_progress: 2, archived: 1, with_images: 3 }
        );
    }
}
