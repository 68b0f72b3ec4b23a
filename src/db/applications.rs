//! Applications table: the index from an application to its generated PDF.
//!
//! The table belongs to the application-intake system. This service only
//! fills in `pdf_file` for rows that already exist.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ApplicationRecord {
    pub application_id: String,
    pub certificate_type: String,
    pub pdf_file: Option<String>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point the matching application at `path`. Returns whether a row matched;
    /// rows are never inserted.
    async fn record_artifact(
        &self,
        application_id: &str,
        certificate_type: &str,
        path: &Path,
    ) -> Result<bool, RecordStoreError>;

    /// Path last recorded for the application, if any.
    async fn artifact_for(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<PathBuf>, RecordStoreError>;

    async fn application(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<ApplicationRecord>, RecordStoreError>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Applications (
    application_id TEXT NOT NULL,
    certificate_type TEXT NOT NULL,
    pdf_file TEXT,
    PRIMARY KEY (application_id, certificate_type)
)
"#;

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn connect(database_url: &str) -> Result<Self, RecordStoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the Applications table when running without the intake system.
    pub async fn ensure_schema(&self) -> Result<(), RecordStoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn record_artifact(
        &self,
        application_id: &str,
        certificate_type: &str,
        path: &Path,
    ) -> Result<bool, RecordStoreError> {
        let result = sqlx::query(
            "UPDATE Applications SET pdf_file = ? WHERE application_id = ? AND certificate_type = ?",
        )
        .bind(path.to_string_lossy().into_owned())
        .bind(application_id)
        .bind(certificate_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn artifact_for(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<PathBuf>, RecordStoreError> {
        let record = self.application(application_id, certificate_type).await?;
        Ok(record.and_then(|r| r.pdf_file).map(PathBuf::from))
    }

    async fn application(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<ApplicationRecord>, RecordStoreError> {
        let record = sqlx::query_as::<_, ApplicationRecord>(
            "SELECT application_id, certificate_type, pdf_file FROM Applications \
             WHERE application_id = ? AND certificate_type = ?",
        )
        .bind(application_id)
        .bind(certificate_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
