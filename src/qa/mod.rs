//! Question answering over uploaded PDFs.
//!
//! Retrieval and generation live in an external service reached through the
//! [`DocumentQa`] trait. This module owns the HTTP surface and the upload
//! directory only.

pub mod client;
pub mod handlers;
pub mod models;

pub use client::HttpDocumentQa;
pub use handlers::config;
pub use models::{IngestSummary, QaAnswer, Source};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use async_trait::async_trait;
use thiserror::Error;

use crate::storage::StorageError;
use crate::ErrorResponse;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("document QA service is not configured")]
    NotConfigured,
    #[error("{0}")]
    BadRequest(String),
    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),
    #[error("document QA service request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("document QA service error: {status} - {body}")]
    UpstreamStatus { status: u16, body: String },
}

impl ResponseError for QaError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upload(StorageError::MissingUpload | StorageError::Multipart(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let body = match self.status_code() {
            StatusCode::SERVICE_UNAVAILABLE => ErrorResponse::service_unavailable(&message),
            StatusCode::BAD_REQUEST => ErrorResponse::bad_request(&message),
            _ => ErrorResponse::internal_error(&message),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Ingests documents and answers questions grounded in them.
#[async_trait]
pub trait DocumentQa: Send + Sync {
    async fn ingest(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestSummary, QaError>;

    async fn ask(&self, query: &str) -> Result<QaAnswer, QaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(QaError::NotConfigured.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            QaError::BadRequest("Query cannot be empty.".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QaError::Upload(StorageError::MissingUpload).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QaError::Upload(StorageError::Cancelled).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            QaError::UpstreamStatus {
                status: 502,
                body: String::new()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
