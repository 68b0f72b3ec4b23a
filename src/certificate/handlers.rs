use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, ResponseError};
use log::{error, info, warn};
use serde_json::Value;

use super::models::{
    CertificateKey, CertificateRequest, GenerateCertificateRequest, GenerateCertificateResponse,
    GeneratedCertificate, GetCertificateRequest,
};
use super::CertificateError;
use crate::{AppState, ErrorResponse};

const GENERATED_MESSAGE: &str = "PDF generated and saved successfully";

fn log_failure(route: &str, err: &CertificateError) {
    if err.status_code().is_server_error() {
        error!("{} failed: {}", route, err);
    } else {
        warn!("{} rejected: {}", route, err);
    }
}

async fn generate(
    state: &AppState,
    body: Option<Value>,
) -> Result<GeneratedCertificate, CertificateError> {
    let request = CertificateRequest::from_json(body)?;
    state.certificates.generate(request).await
}

async fn open(state: &AppState, body: Option<Value>) -> Result<NamedFile, CertificateError> {
    let key = CertificateKey::from_json(body)?;
    let path = state.certificates.locate(&key).await?;
    // the file can vanish between locate and open
    let file = NamedFile::open_async(&path)
        .await
        .map_err(|_| CertificateError::NotFound("PDF not found".to_string()))?;
    Ok(file)
}

#[utoipa::path(
    post,
    path = "/generate_pdf",
    tag = "Certificates",
    request_body = GenerateCertificateRequest,
    responses(
        (status = 200, description = "Certificate generated and stored", body = GenerateCertificateResponse),
        (status = 400, description = "Invalid body, missing key fields or a key that is not a plain file name", body = ErrorResponse),
        (status = 500, description = "Rendering, storage or database failure", body = ErrorResponse)
    )
)]
pub async fn generate_pdf(
    state: web::Data<AppState>,
    body: Option<web::Json<Value>>,
) -> Result<HttpResponse, CertificateError> {
    info!("POST /generate_pdf");

    match generate(&state, body.map(web::Json::into_inner)).await {
        Ok(generated) => Ok(HttpResponse::Ok().json(GenerateCertificateResponse {
            message: GENERATED_MESSAGE.to_string(),
            file_path: generated.path.to_string_lossy().into_owned(),
            tracking_number: generated.tracking_number,
        })),
        Err(err) => {
            log_failure("generate_pdf", &err);
            Err(err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/get_pdf",
    tag = "Certificates",
    request_body = GetCertificateRequest,
    responses(
        (status = 200, description = "The certificate PDF as an attachment", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Missing application_id or certificate_type", body = ErrorResponse),
        (status = 404, description = "No certificate generated for this key", body = ErrorResponse)
    )
)]
pub async fn get_pdf(
    state: web::Data<AppState>,
    body: Option<web::Json<Value>>,
) -> Result<NamedFile, CertificateError> {
    info!("POST /get_pdf");

    match open(&state, body.map(web::Json::into_inner)).await {
        Ok(file) => {
            let file_name = file
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(file
                .set_content_type(mime_guess::mime::APPLICATION_PDF)
                .set_content_disposition(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(file_name)],
                }))
        }
        Err(err) => {
            log_failure("get_pdf", &err);
            Err(err)
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate_pdf").route(web::post().to(generate_pdf)))
        .service(web::resource("/get_pdf").route(web::post().to(get_pdf)));
}
