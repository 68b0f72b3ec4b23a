use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use utoipa::ToSchema;

use super::{CertificateError, CertificateKind};

const INVALID_BODY: &str = "Invalid or missing JSON data";
const MISSING_GENERATE_FIELDS: &str = "Missing required fields";
const MISSING_LOOKUP_FIELDS: &str = "application_id and certificate_type are required";

/// Opaque application identifier, kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Accepts a non-empty JSON string or a JSON number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            Value::Number(n) => Self::new(n.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key shared by generation and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateKey {
    pub application_id: ApplicationId,
    /// Raw `certificate_type`, possibly not a known kind.
    pub certificate_type: String,
}

impl CertificateKey {
    pub fn kind(&self) -> Option<CertificateKind> {
        CertificateKind::from_name(&self.certificate_type)
    }

    /// Parse the key from a retrieval body.
    pub fn from_json(body: Option<Value>) -> Result<Self, CertificateError> {
        let object = into_object(body)?;
        Self::from_object(&object, MISSING_LOOKUP_FIELDS)
    }

    fn from_object(object: &Map<String, Value>, missing: &str) -> Result<Self, CertificateError> {
        let application_id = object
            .get("application_id")
            .and_then(ApplicationId::from_value);
        let certificate_type = object
            .get("certificate_type")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty());

        match (application_id, certificate_type) {
            (Some(application_id), Some(certificate_type)) => Ok(Self {
                application_id,
                certificate_type: certificate_type.to_string(),
            }),
            _ => Err(CertificateError::BadRequest(missing.to_string())),
        }
    }
}

/// A validated generation request.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub key: CertificateKey,
    /// Every field of the request body, including the key fields.
    pub fields: Map<String, Value>,
}

impl CertificateRequest {
    pub fn from_json(body: Option<Value>) -> Result<Self, CertificateError> {
        let fields = into_object(body)?;
        let key = CertificateKey::from_object(&fields, MISSING_GENERATE_FIELDS)?;
        Ok(Self { key, fields })
    }
}

fn into_object(body: Option<Value>) -> Result<Map<String, Value>, CertificateError> {
    match body {
        Some(Value::Object(object)) => Ok(object),
        _ => Err(CertificateError::BadRequest(INVALID_BODY.to_string())),
    }
}

/// One resolved `Label: value` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilledField {
    pub label: String,
    pub value: String,
}

impl FilledField {
    pub fn line(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCertificate {
    pub application_id: ApplicationId,
    pub certificate_type: String,
    pub tracking_number: u32,
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateCertificateResponse {
    #[schema(example = "PDF generated and saved successfully")]
    pub message: String,
    #[schema(example = "./generated/BirthCertificatecertificate1024.pdf")]
    pub file_path: String,
    #[schema(example = 483920)]
    pub tracking_number: u32,
}

/// Body of `POST /generate_pdf`. Only the fields of the requested kind are read.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateCertificateRequest {
    #[schema(example = "1024")]
    pub application_id: String,
    #[schema(example = "Birth Certificate")]
    pub certificate_type: String,
    #[schema(example = "Anjali Menon")]
    pub full_name: Option<String>,
    pub fathers_name: Option<String>,
    pub mothers_name: Option<String>,
    #[schema(example = "2001-04-14")]
    pub date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub name: Option<String>,
    pub date_of_death: Option<String>,
    pub place_of_death: Option<String>,
    pub cause_of_death: Option<String>,
    pub annual_income: Option<String>,
    pub source_of_income: Option<String>,
    pub address: Option<String>,
    pub owner_name: Option<String>,
    pub property_address: Option<String>,
    pub market_value: Option<String>,
    pub area_sqft: Option<String>,
    pub survey_number: Option<String>,
}

/// Body of `POST /get_pdf`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GetCertificateRequest {
    #[schema(example = "1024")]
    pub application_id: String,
    #[schema(example = "Birth Certificate")]
    pub certificate_type: String,
}
