//! Certificate generation pipeline.
//!
//! A request flows through the static [`catalog`], is drawn by the
//! [`synthesizer`], written through [`crate::storage`] and indexed in the
//! record store. Retrieval recomputes the same artifact path.
//!
//! - `catalog` - one template per certificate kind
//! - `layout` - page geometry per kind
//! - `metrics` - Helvetica widths for centring and justification
//! - `synthesizer` - PDF drawing
//! - `service` - sequencing of the pipeline
//! - `handlers` - HTTP surface

pub mod catalog;
pub mod handlers;
pub mod layout;
pub mod metrics;
pub mod models;
pub mod service;
pub mod synthesizer;

pub use catalog::{CatalogError, CertificateTemplate, TemplateField};
pub use handlers::config;
pub use models::{ApplicationId, CertificateRequest, FilledField, GeneratedCertificate};
pub use service::CertificateService;
pub use synthesizer::{RenderError, RenderedCertificate, Synthesizer};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::RecordStoreError;
use crate::storage::StorageError;
use crate::ErrorResponse;

/// The four certificate kinds issued by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CertificateKind {
    #[serde(rename = "Birth Certificate")]
    Birth,
    #[serde(rename = "Death Certificate")]
    Death,
    #[serde(rename = "Income Certificate")]
    Income,
    #[serde(rename = "Land Certificate")]
    Land,
}

impl CertificateKind {
    pub const ALL: [CertificateKind; 4] = [Self::Birth, Self::Death, Self::Income, Self::Land];

    /// Wire name, as sent in `certificate_type`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Birth => "Birth Certificate",
            Self::Death => "Death Certificate",
            Self::Income => "Income Certificate",
            Self::Land => "Land Certificate",
        }
    }

    /// Exact match on the wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the certificate endpoints.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("failed to render certificate: {0}")]
    Render(#[from] RenderError),
    #[error("failed to store certificate: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to update application record: {0}")]
    Records(#[from] RecordStoreError),
    #[error("blocking task failed: {0}")]
    Blocking(String),
}

impl From<actix_web::error::BlockingError> for CertificateError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Self::Blocking(err.to_string())
    }
}

impl ResponseError for CertificateError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::BadRequest(message) => ErrorResponse::bad_request(message),
            Self::NotFound(message) => ErrorResponse::not_found(message),
            other => ErrorResponse::internal_error(&other.to_string()),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
