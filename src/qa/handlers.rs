use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use log::{error, info, warn};
use serde_json::Value;

use super::models::{AskPdfRequest, QaAnswer, UploadPdfForm, UploadPdfResponse};
use super::{DocumentQa, QaError};
use crate::storage::save_upload;
use crate::{AppState, ErrorResponse};

const UPLOADED_STATUS: &str = "Successfully Uploaded";
const EMPTY_QUERY: &str = "Query cannot be empty.";

fn log_failure(route: &str, err: &QaError) {
    if err.status_code().is_server_error() {
        error!("{} failed: {}", route, err);
    } else {
        warn!("{} rejected: {}", route, err);
    }
}

fn service(state: &AppState) -> Result<&Arc<dyn DocumentQa>, QaError> {
    state.qa.as_ref().ok_or(QaError::NotConfigured)
}

async fn upload(state: &AppState, payload: Multipart) -> Result<UploadPdfResponse, QaError> {
    let qa = service(state)?;
    let saved = save_upload(payload, &state.upload_dir).await?;
    info!("File saved: {}", saved.path.display());

    let summary = qa.ingest(&saved.file_name, saved.bytes).await?;
    info!(
        "Ingested {}: {} documents, {} chunks",
        saved.file_name, summary.doc_len, summary.chunks
    );
    Ok(UploadPdfResponse {
        status: UPLOADED_STATUS.to_string(),
        filename: saved.file_name,
        doc_len: summary.doc_len,
        chunks: summary.chunks,
    })
}

async fn ask(state: &AppState, body: Option<Value>) -> Result<QaAnswer, QaError> {
    let query = body
        .as_ref()
        .and_then(|b| b.get("query"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| QaError::BadRequest(EMPTY_QUERY.to_string()))?;

    let qa = service(state)?;
    let answer = qa.ask(query).await?;
    info!("Answered query with {} sources", answer.sources.len());
    Ok(answer)
}

#[utoipa::path(
    post,
    path = "/pdf",
    tag = "Document QA",
    request_body(content = inline(UploadPdfForm), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDF stored and ingested", body = UploadPdfResponse),
        (status = 400, description = "No file part in the upload", body = ErrorResponse),
        (status = 500, description = "Storage or QA service failure", body = ErrorResponse),
        (status = 503, description = "No QA service configured", body = ErrorResponse)
    )
)]
pub async fn upload_pdf(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, QaError> {
    info!("POST /pdf");
    match upload(&state, payload).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            log_failure("pdf", &err);
            Err(err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/ask_pdf",
    tag = "Document QA",
    request_body = AskPdfRequest,
    responses(
        (status = 200, description = "Answer with the passages it was drawn from", body = QaAnswer),
        (status = 400, description = "Empty or missing query", body = ErrorResponse),
        (status = 500, description = "QA service failure", body = ErrorResponse),
        (status = 503, description = "No QA service configured", body = ErrorResponse)
    )
)]
pub async fn ask_pdf(
    state: web::Data<AppState>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, QaError> {
    info!("POST /ask_pdf");
    match ask(&state, body.map(web::Json::into_inner)).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(answer)),
        Err(err) => {
            log_failure("ask_pdf", &err);
            Err(err)
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/pdf").route(web::post().to(upload_pdf)))
        .service(web::resource("/ask_pdf").route(web::post().to(ask_pdf)));
}
