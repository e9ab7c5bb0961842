//! Unit tests for database initialization
//!
//! - Automatic database creation with default schema
//! - Re-opening an existing database is idempotent

use backstage_common::db::init::{init_database, SCHEMA_VERSION};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sub").join("backstage.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("backstage.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO contact_submissions (id, name, email, message, submission_date)
         VALUES ('m1', 'Maria', 'maria@example.com', 'Hello', '2024-05-01T10:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    // Second initialization must keep existing rows
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_submission_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("backstage.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO contact_submissions (id, name, email, message, submission_date)
         VALUES ('m1', 'Maria', 'maria@example.com', 'Hello', '2024-05-01T10:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let (is_read, status, attachments): (bool, String, Option<String>) = sqlx::query_as(
        "SELECT is_read, status, attachments FROM contact_submissions WHERE id = 'm1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert!(!is_read);
    assert_eq!(status, "new");
    assert!(attachments.is_none());
}

#[tokio::test]
async fn test_status_check_constraint() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("backstage.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO contact_submissions (id, name, email, message, submission_date, status)
         VALUES ('m1', 'Maria', 'maria@example.com', 'Hello', '2024-05-01T10:00:00Z', 'spam')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Unknown status should violate the CHECK constraint");
}
