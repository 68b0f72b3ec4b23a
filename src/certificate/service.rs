use std::path::PathBuf;
use std::sync::Arc;

use actix_web::web;
use log::{debug, info, warn};

use super::catalog;
use super::models::{CertificateKey, CertificateRequest, GeneratedCertificate};
use super::synthesizer::Synthesizer;
use super::CertificateError;
use crate::db::RecordStore;
use crate::storage::{ArtifactStorage, KeyedLocks};

const UNSTORABLE_KEY: &str =
    "application_id and certificate_type must form a plain file name of at most 255 bytes";

/// Render, persist and index certificates; locate them again on request.
pub struct CertificateService {
    synthesizer: Synthesizer,
    storage: ArtifactStorage,
    records: Arc<dyn RecordStore>,
    locks: KeyedLocks,
}

impl CertificateService {
    pub fn new(
        synthesizer: Synthesizer,
        storage: ArtifactStorage,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            synthesizer,
            storage,
            records,
            locks: KeyedLocks::new(),
        }
    }

    /// Generate the certificate for `request`, replacing any earlier one for
    /// the same key.
    ///
    /// An unrecognised certificate type still produces a document carrying
    /// only the letterhead, tracking number, header and footer.
    pub async fn generate(
        &self,
        request: CertificateRequest,
    ) -> Result<GeneratedCertificate, CertificateError> {
        let CertificateRequest { key, fields } = request;

        let template = match catalog::resolve(&key.certificate_type) {
            Ok(template) => Some(template),
            Err(err) => {
                warn!("{}; rendering letterhead only for {}", err, key.application_id);
                None
            }
        };
        let filled = template
            .as_ref()
            .map(|t| t.fill(&fields))
            .unwrap_or_default();
        let path = self
            .storage
            .artifact_path(&key.certificate_type, key.application_id.as_str())
            .ok_or_else(|| CertificateError::BadRequest(UNSTORABLE_KEY.to_string()))?;

        let _guard = self.locks.lock(&path.to_string_lossy()).await;

        let synthesizer = self.synthesizer.clone();
        let storage = self.storage.clone();
        let target = path.clone();
        let tracking_number = web::block(move || -> Result<u32, CertificateError> {
            let rendered = synthesizer.render(template.as_ref(), &filled)?;
            storage.write_atomic(&target, &rendered.pdf)?;
            debug!("Wrote {} bytes to {}", rendered.pdf.len(), target.display());
            Ok(rendered.tracking_number)
        })
        .await??;

        let matched = self
            .records
            .record_artifact(key.application_id.as_str(), &key.certificate_type, &path)
            .await?;
        if !matched {
            warn!(
                "No application row for {} / {}; certificate saved but not indexed",
                key.application_id, key.certificate_type
            );
        }

        info!(
            "Generated {} for application {} at {}",
            key.certificate_type,
            key.application_id,
            path.display()
        );
        Ok(GeneratedCertificate {
            application_id: key.application_id,
            certificate_type: key.certificate_type,
            tracking_number,
            path,
        })
    }

    /// Path of a previously generated certificate.
    pub async fn locate(&self, key: &CertificateKey) -> Result<PathBuf, CertificateError> {
        let path = self
            .storage
            .artifact_path(&key.certificate_type, key.application_id.as_str())
            .filter(|path| self.storage.exists(path))
            .ok_or_else(|| CertificateError::NotFound("PDF not found".to_string()))?;

        match self
            .records
            .artifact_for(key.application_id.as_str(), &key.certificate_type)
            .await
        {
            Ok(Some(recorded)) if recorded != path => warn!(
                "Recorded path {} for {} differs from {}",
                recorded.display(),
                key.application_id,
                path.display()
            ),
            Ok(_) => {}
            Err(err) => warn!("Could not read application record: {}", err),
        }

        Ok(path)
    }
}
