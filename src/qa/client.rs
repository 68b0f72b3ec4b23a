use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::models::{IngestSummary, QaAnswer};
use super::{DocumentQa, QaError};

/// Client for a QA service exposing `POST /ingest` (multipart `file`) and
/// `POST /query` (JSON `{ "query": ... }`).
#[derive(Debug, Clone)]
pub struct HttpDocumentQa {
    client: Client,
    base_url: String,
}

impl HttpDocumentQa {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, QaError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentQa for HttpDocumentQa {
    async fn ingest(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestSummary, QaError> {
        debug!("Ingesting {} ({} bytes)", file_name, bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let response = self
            .client
            .post(self.endpoint("ingest"))
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn ask(&self, query: &str) -> Result<QaAnswer, QaError> {
        debug!("Forwarding query to {}", self.base_url);
        let response = self
            .client
            .post(self.endpoint("query"))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_cleanly() {
        let qa = HttpDocumentQa::new(Client::new(), "http://qa.local:9000/");
        assert_eq!(qa.base_url(), "http://qa.local:9000");
        assert_eq!(qa.endpoint("ingest"), "http://qa.local:9000/ingest");
        assert_eq!(qa.endpoint("query"), "http://qa.local:9000/query");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_upstream_error() {
        let qa = HttpDocumentQa::new(Client::new(), "http://127.0.0.1:9");
        let err = qa.ask("anything").await.unwrap_err();
        assert!(matches!(err, QaError::Upstream(_)));
    }
}
