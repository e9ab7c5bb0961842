//! SQLite + local file store implementation of [`DataGateway`]

use async_trait::async_trait;
use backstage_common::{
    ChangeEvent, ContactSubmission, Error, NewSubmission, Result, SubmissionPatch,
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::{DataGateway, FileStore, SubmissionPage};

/// Change feed buffer; slow subscribers see `Lagged` and refetch
const CHANGE_FEED_CAPACITY: usize = 100;

/// Gateway over a SQLite pool and a [`FileStore`]
///
/// Every successful write publishes a [`ChangeEvent`] to subscribers.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
    files: FileStore,
    changes: broadcast::Sender<ChangeEvent>,
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    message: String,
    submission_date: DateTime<Utc>,
    is_read: bool,
    status: String,
    notes: Option<String>,
    attachments: Option<String>,
}

impl TryFrom<SubmissionRow> for ContactSubmission {
    type Error = Error;

    fn try_from(row: SubmissionRow) -> Result<Self> {
        let attachments = match row.attachments.as_deref() {
            None | Some("") => Vec::new(),
            Some(json) => serde_json::from_str(json)?,
        };

        Ok(ContactSubmission {
            status: row.status.parse()?,
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            submission_date: row.submission_date,
            is_read: row.is_read,
            notes: row.notes,
            attachments,
        })
    }
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool, files: FileStore) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        info!("Data gateway ready (file store at {})", files.root().display());
        Self { pool, files, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    fn publish(&self, event: ChangeEvent) {
        // No subscribers is fine
        let _ = self.changes.send(event);
    }
}

#[async_trait]
impl DataGateway for SqliteGateway {
    async fn query_submissions(&self, offset: u64, limit: u64) -> Result<SubmissionPage> {
        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<SubmissionRow> = sqlx::query_as(
            "SELECT id, name, email, phone, message, submission_date, is_read, status, notes, attachments
             FROM contact_submissions
             ORDER BY submission_date DESC, id ASC
             LIMIT ? OFFSET ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let rows = rows
            .into_iter()
            .map(ContactSubmission::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!("Fetched {} submissions at offset {} (total {})", rows.len(), offset, total_count);

        Ok(SubmissionPage {
            rows,
            total_count: u64::try_from(total_count).unwrap_or(0),
        })
    }

    async fn insert_submission(&self, new: NewSubmission) -> Result<ContactSubmission> {
        new.validate()?;

        let submission = ContactSubmission {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_string(),
            phone: new
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            message: new.message.trim().to_string(),
            submission_date: Utc::now(),
            is_read: false,
            status: Default::default(),
            notes: None,
            attachments: Vec::new(),
        };

        sqlx::query(
            "INSERT INTO contact_submissions
                (id, name, email, phone, message, submission_date, is_read, status, notes, attachments)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, NULL, NULL)",
        )
        .bind(&submission.id)
        .bind(&submission.name)
        .bind(&submission.email)
        .bind(&submission.phone)
        .bind(&submission.message)
        .bind(submission.submission_date)
        .bind(submission.status.as_str())
        .execute(&self.pool)
        .await?;

        info!("New contact submission {} from {}", submission.id, submission.email);
        self.publish(ChangeEvent::inserted(&submission.id));
        Ok(submission)
    }

    async fn update_submission(&self, id: &str, patch: &SubmissionPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Update has no fields".to_string()));
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE contact_submissions SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(is_read) = patch.is_read {
                fields.push("is_read = ").push_bind_unseparated(is_read);
            }
            if let Some(status) = patch.status {
                fields.push("status = ").push_bind_unseparated(status.as_str());
            }
            if let Some(notes) = &patch.notes {
                fields.push("notes = ").push_bind_unseparated(notes.clone());
            }
            if let Some(attachments) = &patch.attachments {
                fields
                    .push("attachments = ")
                    .push_bind_unseparated(serde_json::to_string(attachments)?);
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Submission {}", id)));
        }

        debug!("Updated submission {}: {:?}", id, patch);
        self.publish(ChangeEvent::updated(id));
        Ok(())
    }

    async fn delete_submission(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Submission {}", id)));
        }

        info!("Deleted submission {}", id);
        self.publish(ChangeEvent::deleted(id));
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    async fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        self.files.write(bucket, path, &bytes).await?;
        debug!("Uploaded {} ({}, {} bytes)", path, content_type, bytes.len());
        Ok(self.files.public_url(bucket, path))
    }

    async fn remove_files(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.files.remove(bucket, paths).await
    }

    fn public_url_prefix(&self, bucket: &str) -> String {
        self.files.public_url_prefix(bucket)
    }
}
