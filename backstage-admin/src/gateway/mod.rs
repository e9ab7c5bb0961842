//! Data access gateway
//!
//! The inbox never talks to SQLite or the file store directly. It goes
//! through [`DataGateway`], which bundles the relational store, the object
//! store and the change feed the way a hosted backend would expose them.
//! The gateway is constructed once in `main` and injected wherever needed.

use async_trait::async_trait;
use backstage_common::{ChangeEvent, ContactSubmission, NewSubmission, Result, SubmissionPatch};
use tokio::sync::broadcast;

pub mod sqlite;
pub mod storage;

pub use sqlite::SqliteGateway;
pub use storage::{object_path_from_public_url, FileStore};

/// One page of submissions plus the collection size
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPage {
    /// Rows ordered by submission date, newest first
    pub rows: Vec<ContactSubmission>,
    /// Total rows in the collection, independent of the page
    pub total_count: u64,
}

/// Hosted-backend style access to submissions and their attachment files
#[async_trait]
pub trait DataGateway: Send + Sync + 'static {
    /// Fetch rows `[offset, offset + limit)` newest first, plus the total count
    async fn query_submissions(&self, offset: u64, limit: u64) -> Result<SubmissionPage>;

    /// Create a submission with a fresh id and the current timestamp
    async fn insert_submission(&self, new: NewSubmission) -> Result<ContactSubmission>;

    /// Update the fields present in `patch`; `NotFound` if no row matched
    async fn update_submission(&self, id: &str, patch: &SubmissionPatch) -> Result<()>;

    /// Delete one submission; `NotFound` if no row matched
    async fn delete_submission(&self, id: &str) -> Result<()>;

    /// Subscribe to insert/update/delete events; dropping the receiver unsubscribes
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Store an object and return its public URL. Existing objects are not overwritten.
    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    /// Remove objects by bucket-relative path
    async fn remove_files(&self, bucket: &str, paths: &[String]) -> Result<()>;

    /// Public URL prefix of a bucket, ending in `/`
    fn public_url_prefix(&self, bucket: &str) -> String;
}
