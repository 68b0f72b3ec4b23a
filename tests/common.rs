#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Document, Object};
use parking_lot::Mutex;
use tempfile::TempDir;

use citizen_certificate_server::certificate::Synthesizer;
use citizen_certificate_server::db::{ApplicationRecord, RecordStore, RecordStoreError};
use citizen_certificate_server::qa::{DocumentQa, IngestSummary, QaAnswer, QaError, Source};
use citizen_certificate_server::storage::ArtifactStorage;
use citizen_certificate_server::AppState;

/// Temp directories plus an `AppState` wired to them.
pub struct TestContext {
    pub dir: TempDir,
    pub state: AppState,
    pub records: Arc<MockRecordStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(None, true)
    }

    pub fn with_qa(qa: Arc<dyn DocumentQa>) -> Self {
        Self::build(Some(qa), true)
    }

    /// A context whose letterhead file does not exist.
    pub fn without_letterhead() -> Self {
        Self::build(None, false)
    }

    fn build(qa: Option<Arc<dyn DocumentQa>>, letterhead: bool) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let letterhead_path = if letterhead {
            write_letterhead(dir.path())
        } else {
            dir.path().join("missing.png")
        };
        let records = Arc::new(MockRecordStore::default());
        let state = AppState::from_parts(
            Synthesizer::new(letterhead_path),
            ArtifactStorage::new(dir.path().join("generated")),
            records.clone(),
            qa,
            dir.path().join("pdf"),
        );
        Self {
            dir,
            state,
            records,
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("generated")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("pdf")
    }

    /// Files currently in the storage root.
    pub fn stored_files(&self) -> Vec<String> {
        match std::fs::read_dir(self.storage_root()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Small translucent PNG standing in for the government emblem.
pub fn write_letterhead(dir: &Path) -> PathBuf {
    let path = dir.join("govt.png");
    let mut image = RgbaImage::from_pixel(16, 10, Rgba([255, 255, 255, 0]));
    for x in 4..12 {
        for y in 2..8 {
            image.put_pixel(x, y, Rgba([128, 20, 20, 255]));
        }
    }
    image.save(&path).expect("Failed to write letterhead");
    path
}

/// Decoded text runs of a single-page PDF, in drawing order.
pub fn pdf_text(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).expect("Not a valid PDF");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1, "certificate must be exactly one page");
    let page_id = *pages.values().next().unwrap();
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        })
        .collect()
}

/// In-memory Applications table.
#[derive(Default)]
pub struct MockRecordStore {
    rows: Mutex<HashMap<(String, String), Option<String>>>,
}

impl MockRecordStore {
    pub fn add_application(&self, application_id: &str, certificate_type: &str) {
        self.rows.lock().insert(
            (application_id.to_string(), certificate_type.to_string()),
            None,
        );
    }

    pub fn recorded(&self, application_id: &str, certificate_type: &str) -> Option<String> {
        self.rows
            .lock()
            .get(&(application_id.to_string(), certificate_type.to_string()))
            .cloned()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn record_artifact(
        &self,
        application_id: &str,
        certificate_type: &str,
        path: &Path,
    ) -> Result<bool, RecordStoreError> {
        let mut rows = self.rows.lock();
        match rows.get_mut(&(application_id.to_string(), certificate_type.to_string())) {
            Some(pdf_file) => {
                *pdf_file = Some(path.to_string_lossy().into_owned());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn artifact_for(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<PathBuf>, RecordStoreError> {
        Ok(self
            .recorded(application_id, certificate_type)
            .map(PathBuf::from))
    }

    async fn application(
        &self,
        application_id: &str,
        certificate_type: &str,
    ) -> Result<Option<ApplicationRecord>, RecordStoreError> {
        Ok(self
            .rows
            .lock()
            .get(&(application_id.to_string(), certificate_type.to_string()))
            .map(|pdf_file| ApplicationRecord {
                application_id: application_id.to_string(),
                certificate_type: certificate_type.to_string(),
                pdf_file: pdf_file.clone(),
            }))
    }
}

/// QA collaborator that remembers what it was given.
#[derive(Default)]
pub struct MockDocumentQa {
    pub fail: bool,
    pub ingested: Mutex<Vec<(String, usize)>>,
    pub queries: Mutex<Vec<String>>,
}

impl MockDocumentQa {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentQa for MockDocumentQa {
    async fn ingest(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestSummary, QaError> {
        if self.fail {
            return Err(QaError::UpstreamStatus {
                status: 502,
                body: "vector store offline".to_string(),
            });
        }
        self.ingested.lock().push((file_name.to_string(), bytes.len()));
        Ok(IngestSummary {
            doc_len: 3,
            chunks: 7,
        })
    }

    async fn ask(&self, query: &str) -> Result<QaAnswer, QaError> {
        if self.fail {
            return Err(QaError::UpstreamStatus {
                status: 502,
                body: "model unavailable".to_string(),
            });
        }
        self.queries.lock().push(query.to_string());
        Ok(QaAnswer {
            answer: format!("Answer to: {}", query),
            sources: vec![Source {
                source: Some("pdf/handbook.pdf".to_string()),
                page_content: "Land certificates require a survey number.".to_string(),
            }],
        })
    }
}
