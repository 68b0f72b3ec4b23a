use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the QA service made of an ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestSummary {
    /// Pages (documents) extracted from the PDF.
    pub doc_len: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Source {
    pub source: Option<String>,
    pub page_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QaAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadPdfResponse {
    #[schema(example = "Successfully Uploaded")]
    pub status: String,
    #[schema(example = "handbook.pdf")]
    pub filename: String,
    pub doc_len: usize,
    pub chunks: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadPdfForm {
    #[allow(unused)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskPdfRequest {
    #[schema(example = "What documents are needed for a land certificate?")]
    pub query: String,
}
