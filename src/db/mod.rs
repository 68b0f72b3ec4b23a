//! Database module - AppState and the application record store
//!
//! - `applications` - the Applications table, where generated certificates are indexed

mod applications;

pub use applications::{ApplicationRecord, RecordStore, RecordStoreError, SqliteRecordStore};

use std::path::PathBuf;
use std::sync::Arc;

use crate::certificate::{CertificateService, Synthesizer};
use crate::config::AppConfig;
use crate::qa::{DocumentQa, HttpDocumentQa};
use crate::storage::ArtifactStorage;

#[derive(Clone)]
pub struct AppState {
    pub certificates: Arc<CertificateService>,
    pub qa: Option<Arc<dyn DocumentQa>>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub async fn new_with_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let records = SqliteRecordStore::connect(&config.database_url).await?;
        if config.init_schema {
            records.ensure_schema().await?;
            log::info!("Applications table ready at {}", config.database_url);
        }

        let qa = match &config.qa_service_url {
            Some(url) => {
                let http_client = reqwest::Client::builder()
                    .timeout(config.qa_timeout)
                    .user_agent(concat!("citizen-certificate-server/", env!("CARGO_PKG_VERSION")))
                    .build()?;
                log::info!("Document QA service at {}", url);
                Some(Arc::new(HttpDocumentQa::new(http_client, url.as_str())) as Arc<dyn DocumentQa>)
            }
            None => {
                log::warn!("QA_SERVICE_URL not set; /pdf and /ask_pdf will answer 503");
                None
            }
        };

        Ok(Self::from_parts(
            Synthesizer::new(&config.letterhead_image),
            ArtifactStorage::new(&config.storage_root),
            Arc::new(records),
            qa,
            config.upload_dir.clone(),
        ))
    }

    pub fn from_parts(
        synthesizer: Synthesizer,
        storage: ArtifactStorage,
        records: Arc<dyn RecordStore>,
        qa: Option<Arc<dyn DocumentQa>>,
        upload_dir: PathBuf,
    ) -> Self {
        AppState {
            certificates: Arc::new(CertificateService::new(synthesizer, storage, records)),
            qa,
            upload_dir,
        }
    }
}
