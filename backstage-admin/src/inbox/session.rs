//! Inbox session: loaded page, selection and admin mutations
//!
//! Every remote call goes through the injected [`DataGateway`]. Local state
//! only changes after the gateway reports success, so a failed mutation is
//! never visible to the admin.
//!
//! Fetches and mutations take a ticket from a monotonic counter when they
//! start. A fetch result is applied only if its ticket is newer than the
//! last applied one; a fetch that started before a mutation finished is
//! discarded once that mutation has been applied.

use backstage_common::config::TomlConfig;
use backstage_common::{ContactSubmission, Icon, SubmissionPatch, SubmissionStatus};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::projector::{project, InboxTab, TabCounts};
use super::{InboxError, Notice};
use crate::gateway::{object_path_from_public_url, DataGateway, SubmissionPage};
use crate::images;
use crate::pagination;

/// Notice buffer; slow subscribers miss old notices
const NOTICE_CAPACITY: usize = 64;

/// Message shown while the last fetch failed
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load messages. Please try again.";

/// Inbox tunables
#[derive(Debug, Clone)]
pub struct InboxSettings {
    pub page_size: u32,
    pub attachment_bucket: String,
    pub max_upload_bytes: usize,
    pub max_image_dimension: u32,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

impl InboxSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            page_size: config.inbox.page_size.max(1),
            attachment_bucket: config.storage.attachment_bucket.clone(),
            max_upload_bytes: config.storage.max_upload_bytes,
            max_image_dimension: config.storage.max_image_dimension,
        }
    }
}

/// Result of a notes save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesOutcome {
    Saved,
    /// Draft equals the stored notes; nothing was sent
    Unchanged,
}

/// Snapshot of the inbox for rendering
#[derive(Debug, Clone, Serialize)]
pub struct InboxView {
    /// Loaded page after tab and search filtering
    pub messages: Vec<ContactSubmission>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub total_attachments: usize,
    pub tab: InboxTab,
    pub query: String,
    pub counts: TabCounts,
    pub selected: Option<ContactSubmission>,
    pub selected_status_icon: Option<Icon>,
    /// At least one fetch is in flight
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct InboxState {
    messages: Vec<ContactSubmission>,
    selected: Option<ContactSubmission>,
    page: u32,
    total_count: u64,
    total_attachments: usize,
    tab: InboxTab,
    query: String,
    error: Option<String>,
    applied_seq: u64,
    /// Ids with a mark-read call in flight
    pending_reads: HashSet<String>,
}

impl InboxState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            selected: None,
            page: 1,
            total_count: 0,
            total_attachments: 0,
            tab: InboxTab::All,
            query: String::new(),
            error: None,
            applied_seq: 0,
            pending_reads: HashSet::new(),
        }
    }

    fn find(&self, id: &str) -> Option<&ContactSubmission> {
        self.messages.iter().find(|s| s.id == id)
    }

    fn apply_page(&mut self, ticket: u64, page: SubmissionPage) {
        self.applied_seq = ticket;
        self.total_attachments = page.rows.iter().map(|s| s.attachments.len()).sum();
        self.total_count = page.total_count;
        self.messages = page.rows;
        self.error = None;

        // Keep the selection pointing at fresh data; leave it alone if the
        // record is no longer on this page
        if let Some(selected) = self.selected.as_mut() {
            if let Some(fresh) = self.messages.iter().find(|s| s.id == selected.id) {
                *selected = fresh.clone();
            }
        }
    }

    /// Apply a patch the gateway has accepted
    ///
    /// Patches carry absolute values, so applying one after a newer fetch
    /// already reflected it is harmless. The attachment counter moves by the
    /// actual change in array length.
    fn apply_patch(&mut self, ticket: u64, id: &str, patch: &SubmissionPatch) {
        self.applied_seq = self.applied_seq.max(ticket);

        if let Some(entry) = self.messages.iter_mut().find(|s| s.id == id) {
            let before = entry.attachments.len();
            entry.apply(patch);
            let after = entry.attachments.len();
            self.total_attachments = (self.total_attachments + after).saturating_sub(before);
        }

        if let Some(selected) = self.selected.as_mut().filter(|s| s.id == id) {
            selected.apply(patch);
        }
    }

    fn apply_delete(&mut self, ticket: u64, id: &str) {
        self.applied_seq = self.applied_seq.max(ticket);

        if let Some(pos) = self.messages.iter().position(|s| s.id == id) {
            let removed = self.messages.remove(pos);
            self.total_count = self.total_count.saturating_sub(1);
            self.total_attachments = self.total_attachments.saturating_sub(removed.attachments.len());
        }

        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            self.selected = None;
        }
    }
}

/// Counts a fetch as in flight until dropped, including when the fetching
/// task is aborted mid-await
struct FetchGuard<'a>(&'a AtomicUsize);

impl<'a> FetchGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Admin inbox over a [`DataGateway`]
pub struct Inbox<G: DataGateway> {
    gateway: Arc<G>,
    settings: InboxSettings,
    state: Mutex<InboxState>,
    tickets: AtomicU64,
    /// Fetches started and not yet finished or aborted
    fetches_in_flight: AtomicUsize,
    notices: broadcast::Sender<Notice>,
}

impl<G: DataGateway> Inbox<G> {
    pub fn new(gateway: Arc<G>, settings: InboxSettings) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            gateway,
            settings,
            state: Mutex::new(InboxState::new()),
            tickets: AtomicU64::new(0),
            fetches_in_flight: AtomicUsize::new(0),
            notices,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn settings(&self) -> &InboxSettings {
        &self.settings
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is fine
        let _ = self.notices.send(notice);
    }

    async fn snapshot(&self, id: &str) -> Result<ContactSubmission, InboxError> {
        let state = self.state.lock().await;
        state
            .find(id)
            .cloned()
            .ok_or_else(|| InboxError::NotLoaded(id.to_string()))
    }

    /// Send a patch and apply it locally once accepted
    async fn commit(&self, id: &str, patch: SubmissionPatch, failure: &str) -> Result<(), InboxError> {
        let ticket = self.next_ticket();

        if let Err(e) = self.gateway.update_submission(id, &patch).await {
            warn!("Update of submission {} failed: {}", id, e);
            self.notify(Notice::error(failure));
            return Err(e.into());
        }

        self.state.lock().await.apply_patch(ticket, id, &patch);
        Ok(())
    }

    // ========================================================================
    // Fetching and navigation
    // ========================================================================

    /// Fetch the current page and the total count
    ///
    /// If the page is past the end of a shrunken collection, moves to the
    /// last page and fetches again.
    pub async fn refresh(&self) -> Result<(), InboxError> {
        let _in_flight = FetchGuard::enter(&self.fetches_in_flight);

        loop {
            let ticket = self.next_ticket();
            let window = {
                let state = self.state.lock().await;
                pagination::page_window(state.total_count, self.settings.page_size, state.page)
            };

            let result = self.gateway.query_submissions(window.offset, window.limit).await;

            let mut state = self.state.lock().await;
            if ticket <= state.applied_seq {
                debug!("Discarding stale fetch (ticket {} <= {})", ticket, state.applied_seq);
                return Ok(());
            }

            match result {
                Ok(page) => {
                    debug!(
                        "Loaded page {} ({} rows, {} total)",
                        state.page,
                        page.rows.len(),
                        page.total_count
                    );
                    state.apply_page(ticket, page);

                    let total_pages = pagination::total_pages(state.total_count, self.settings.page_size);
                    let clamped = pagination::clamp_page(state.page, total_pages);
                    if clamped == state.page {
                        return Ok(());
                    }
                    debug!("Page {} is past the end, moving to {}", state.page, clamped);
                    state.page = clamped;
                }
                Err(e) => {
                    warn!("Failed to load messages: {}", e);
                    state.error = Some(LOAD_ERROR_MESSAGE.to_string());
                    drop(state);
                    self.notify(Notice::error("Failed to load messages"));
                    return Err(e.into());
                }
            }
        }
    }

    /// Move to `page` (clamped to the known page range) and fetch it
    pub async fn set_page(&self, page: u32) -> Result<(), InboxError> {
        {
            let mut state = self.state.lock().await;
            let total_pages = pagination::total_pages(state.total_count, self.settings.page_size);
            state.page = pagination::clamp_page(page, total_pages);
        }
        self.refresh().await
    }

    pub async fn set_tab(&self, tab: InboxTab) {
        self.state.lock().await.tab = tab;
    }

    pub async fn set_query(&self, query: impl Into<String>) {
        self.state.lock().await.query = query.into();
    }

    pub async fn view(&self) -> InboxView {
        let state = self.state.lock().await;
        InboxView {
            messages: project(&state.messages, state.tab, &state.query),
            page: state.page,
            page_size: self.settings.page_size,
            total_pages: pagination::total_pages(state.total_count, self.settings.page_size),
            total_count: state.total_count,
            total_attachments: state.total_attachments,
            tab: state.tab,
            query: state.query.clone(),
            counts: TabCounts::tally(&state.messages),
            selected_status_icon: state.selected.as_ref().map(|s| s.status.icon()),
            selected: state.selected.clone(),
            loading: self.fetches_in_flight.load(Ordering::SeqCst) > 0,
            error: state.error.clone(),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Open a loaded submission, marking it read on first open
    pub async fn select(&self, id: &str) -> Result<ContactSubmission, InboxError> {
        let needs_read = {
            let mut state = self.state.lock().await;
            let submission = state
                .find(id)
                .cloned()
                .ok_or_else(|| InboxError::NotLoaded(id.to_string()))?;
            let needs_read = !submission.is_read && state.pending_reads.insert(id.to_string());
            state.selected = Some(submission);
            needs_read
        };

        if needs_read {
            let result = self.mark_read(id).await;
            self.state.lock().await.pending_reads.remove(id);
            result?;
        }

        let state = self.state.lock().await;
        state
            .selected
            .clone()
            .filter(|s| s.id == id)
            .or_else(|| state.find(id).cloned())
            .ok_or_else(|| InboxError::NotLoaded(id.to_string()))
    }

    /// Set `is_read`; a submission already read locally makes no call
    pub async fn mark_read(&self, id: &str) -> Result<(), InboxError> {
        let submission = self.snapshot(id).await?;
        if submission.is_read {
            return Ok(());
        }
        self.commit(id, SubmissionPatch::read(), "Failed to mark message as read").await
    }

    pub async fn set_status(&self, id: &str, status: SubmissionStatus) -> Result<(), InboxError> {
        self.snapshot(id).await?;
        self.commit(id, SubmissionPatch::status(status), "Failed to update message status")
            .await?;
        self.notify(Notice::success(format!("Message marked as {}", status.label())));
        Ok(())
    }

    /// Save the notes draft unless it matches what is stored
    ///
    /// Absent notes compare equal to an empty draft.
    pub async fn set_notes(&self, id: &str, notes: &str) -> Result<NotesOutcome, InboxError> {
        let submission = self.snapshot(id).await?;
        if submission.notes.as_deref().unwrap_or_default() == notes {
            debug!("Notes for {} unchanged, not saving", id);
            return Ok(NotesOutcome::Unchanged);
        }

        self.commit(id, SubmissionPatch::notes(notes), "Failed to update notes").await?;
        self.notify(Notice::success("Notes updated successfully"));
        Ok(NotesOutcome::Saved)
    }

    /// Delete a submission and its attachment files
    ///
    /// Files go first. If their removal fails the record is kept.
    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<(), InboxError> {
        if !confirmed {
            return Err(InboxError::ConfirmationRequired);
        }

        let submission = self.snapshot(id).await?;
        let bucket = &self.settings.attachment_bucket;
        let paths = match self.attachment_paths(&submission.attachments) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Not deleting submission {}: {}", id, e);
                self.notify(Notice::error("Failed to delete message"));
                return Err(e);
            }
        };

        let ticket = self.next_ticket();

        if !paths.is_empty() {
            if let Err(e) = self.gateway.remove_files(bucket, &paths).await {
                warn!("Failed to remove attachments of {}: {}", id, e);
                self.notify(Notice::error("Failed to delete message"));
                return Err(e.into());
            }
            debug!("Removed {} attachment(s) of {}", paths.len(), id);
        }

        if let Err(e) = self.gateway.delete_submission(id).await {
            if !paths.is_empty() {
                warn!(
                    "Submission {} kept after its {} attachment file(s) were removed: {}",
                    id,
                    paths.len(),
                    e
                );
            } else {
                warn!("Failed to delete submission {}: {}", id, e);
            }
            self.notify(Notice::error("Failed to delete message"));
            return Err(e.into());
        }

        self.state.lock().await.apply_delete(ticket, id);
        info!("Deleted submission {} with {} attachment(s)", id, paths.len());
        self.notify(Notice::success("Message deleted successfully"));
        Ok(())
    }

    /// Append a public URL to a submission's attachments
    ///
    /// Duplicates are not checked.
    pub async fn add_attachment(&self, id: &str, url: &str) -> Result<(), InboxError> {
        let submission = self.snapshot(id).await?;
        let mut attachments = submission.attachments;
        attachments.push(url.to_string());
        self.commit(
            id,
            SubmissionPatch::attachments(attachments),
            "Failed to update message attachments",
        )
        .await
    }

    /// Drop one occurrence (the most recent) of a URL from a submission's attachments
    pub async fn remove_attachment(&self, id: &str, url: &str) -> Result<(), InboxError> {
        let submission = self.snapshot(id).await?;
        let mut attachments = submission.attachments;
        let pos = attachments
            .iter()
            .rposition(|u| u == url)
            .ok_or_else(|| InboxError::AttachmentNotFound {
                id: id.to_string(),
                url: url.to_string(),
            })?;
        attachments.remove(pos);
        self.commit(
            id,
            SubmissionPatch::attachments(attachments),
            "Failed to update message attachments",
        )
        .await
    }

    /// Validate, downscale and store an image, then attach it
    ///
    /// Returns the public URL. If the record update fails the stored file is
    /// removed again.
    pub async fn upload_attachment(
        &self,
        id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, InboxError> {
        self.snapshot(id).await?;

        let prepared = match images::prepare_upload(
            &bytes,
            content_type,
            file_name,
            self.settings.max_upload_bytes,
            self.settings.max_image_dimension,
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        let bucket = &self.settings.attachment_bucket;
        let path = format!("{}/{}.{}", id, Uuid::new_v4(), prepared.extension);
        let url = match self
            .gateway
            .upload_file(bucket, &path, prepared.bytes, &prepared.content_type)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to store attachment for {}: {}", id, e);
                self.notify(Notice::error("Failed to upload image"));
                return Err(e.into());
            }
        };

        if let Err(e) = self.add_attachment(id, &url).await {
            if let Err(cleanup) = self.gateway.remove_files(bucket, &[path.clone()]).await {
                warn!("Could not remove unattached upload {}: {}", path, cleanup);
            }
            return Err(e);
        }

        info!(
            "Attached {} to {} ({}x{}{})",
            path,
            id,
            prepared.width,
            prepared.height,
            if prepared.resized { ", resized" } else { "" }
        );
        self.notify(Notice::success("Image uploaded successfully"));
        Ok(url)
    }

    /// Remove an attachment's file, then detach it
    pub async fn delete_attachment(&self, id: &str, url: &str) -> Result<(), InboxError> {
        let submission = self.snapshot(id).await?;
        if !submission.attachments.iter().any(|u| u == url) {
            return Err(InboxError::AttachmentNotFound {
                id: id.to_string(),
                url: url.to_string(),
            });
        }

        let path = match self.attachment_path(url) {
            Ok(path) => path,
            Err(e) => {
                warn!("Not deleting attachment of {}: {}", id, e);
                self.notify(Notice::error("Failed to delete image"));
                return Err(e);
            }
        };

        if let Err(e) = self
            .gateway
            .remove_files(&self.settings.attachment_bucket, &[path])
            .await
        {
            warn!("Failed to remove attachment file {}: {}", url, e);
            self.notify(Notice::error("Failed to delete image"));
            return Err(e.into());
        }

        self.remove_attachment(id, url).await?;
        self.notify(Notice::success("Image deleted successfully"));
        Ok(())
    }

    // ========================================================================
    // Attachment paths
    // ========================================================================

    fn attachment_path(&self, url: &str) -> Result<String, InboxError> {
        let prefix = self.gateway.public_url_prefix(&self.settings.attachment_bucket);
        object_path_from_public_url(url, &prefix).map_err(|e| InboxError::MalformedAttachmentUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Derive every storage path up front; one bad URL aborts the lot
    fn attachment_paths(&self, urls: &[String]) -> Result<Vec<String>, InboxError> {
        urls.iter().map(|url| self.attachment_path(url)).collect()
    }
}
