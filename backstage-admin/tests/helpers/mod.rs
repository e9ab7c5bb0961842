//! Shared test fixtures: an in-memory gateway with a call log and failure
//! injection.

#![allow(dead_code)]

use async_trait::async_trait;
use backstage_admin::gateway::{DataGateway, SubmissionPage};
use backstage_common::{
    ChangeEvent, ContactSubmission, Error, NewSubmission, Result, SubmissionPatch,
    SubmissionStatus,
};
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

/// Gateway operation, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Query,
    Update,
    Delete,
    Upload,
    Remove,
}

/// Recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query { offset: u64, limit: u64 },
    Insert,
    Update { id: String, patch: SubmissionPatch },
    Delete { id: String },
    Upload { bucket: String, path: String },
    Remove { bucket: String, paths: Vec<String> },
}

pub struct MockGateway {
    rows: Mutex<Vec<ContactSubmission>>,
    files: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Op>>,
    query_gate: Mutex<Option<Arc<Notify>>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MockGateway {
    pub fn new(rows: Vec<ContactSubmission>) -> Arc<Self> {
        let (changes, _) = broadcast::channel(32);
        Arc::new(Self {
            rows: Mutex::new(rows),
            files: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            query_gate: Mutex::new(None),
            changes,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn row(&self, id: &str) -> Option<ContactSubmission> {
        self.rows.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains(path)
    }

    pub fn put_file(&self, path: &str) {
        self.files.lock().unwrap().insert(path.to_string());
    }

    /// Insert a row directly, as another admin session would
    pub fn push_row(&self, row: ContactSubmission) {
        self.rows.lock().unwrap().insert(0, row);
    }

    /// Publish a change event without touching the rows
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.changes.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Make the next query snapshot its rows, then wait for the returned
    /// notify before completing
    pub fn hold_next_query(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.query_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: Op) -> Result<()> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(Error::Storage(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl DataGateway for MockGateway {
    async fn query_submissions(&self, offset: u64, limit: u64) -> Result<SubmissionPage> {
        self.record(Call::Query { offset, limit });
        let gate = self.query_gate.lock().unwrap().take();
        let result = self.check(Op::Query).map(|_| {
            let rows = self.rows.lock().unwrap();
            SubmissionPage {
                rows: rows
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect(),
                total_count: rows.len() as u64,
            }
        });

        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn insert_submission(&self, new: NewSubmission) -> Result<ContactSubmission> {
        self.record(Call::Insert);
        new.validate()?;
        let row = submission(&format!("new-{}", self.rows.lock().unwrap().len()), &new.name);
        self.push_row(row.clone());
        self.emit(ChangeEvent::inserted(&row.id));
        Ok(row)
    }

    async fn update_submission(&self, id: &str, patch: &SubmissionPatch) -> Result<()> {
        self.record(Call::Update { id: id.to_string(), patch: patch.clone() });
        self.check(Op::Update)?;
        {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| Error::NotFound(format!("Submission {}", id)))?;
            row.apply(patch);
        }
        self.emit(ChangeEvent::updated(id));
        Ok(())
    }

    async fn delete_submission(&self, id: &str) -> Result<()> {
        self.record(Call::Delete { id: id.to_string() });
        self.check(Op::Delete)?;
        {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|s| s.id != id);
            if rows.len() == before {
                return Err(Error::NotFound(format!("Submission {}", id)));
            }
        }
        self.emit(ChangeEvent::deleted(id));
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        self.record(Call::Upload { bucket: bucket.to_string(), path: path.to_string() });
        self.check(Op::Upload)?;
        self.put_file(path);
        Ok(format!("{}{}", self.public_url_prefix(bucket), path))
    }

    async fn remove_files(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.record(Call::Remove { bucket: bucket.to_string(), paths: paths.to_vec() });
        self.check(Op::Remove)?;
        let mut files = self.files.lock().unwrap();
        for path in paths {
            files.remove(path);
        }
        Ok(())
    }

    fn public_url_prefix(&self, bucket: &str) -> String {
        format!("https://host/bucket/{}/", bucket)
    }
}

/// Unread `new` submission without attachments
pub fn submission(id: &str, name: &str) -> ContactSubmission {
    ContactSubmission {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id),
        phone: None,
        message: format!("Booking enquiry from {}", name),
        submission_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        is_read: false,
        status: SubmissionStatus::New,
        notes: None,
        attachments: Vec::new(),
    }
}

/// `count` submissions, newest first
pub fn submissions(count: usize) -> Vec<ContactSubmission> {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let mut s = submission(&format!("m{}", i + 1), &format!("Visitor {}", i + 1));
            s.submission_date = base - Duration::minutes(i as i64);
            s
        })
        .collect()
}

/// Public URL of an attachment in the default bucket
pub fn attachment_url(path: &str) -> String {
    format!("https://host/bucket/message-attachments/{}", path)
}
