//! Static template catalog, one layout per certificate kind.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{CertificateKind, FilledField};

const REGISTRATION_PREAMBLE: &str = "(Issued under Section 12 of the Registration of Births and Deaths Acts, 1969 and Rule 8 of the Kerala \
Registration of Births and Deaths Rules, 1999) This is to certify that the following information has been \
taken from the original record of";

const REGISTRATION_LOCALITY: &str = "which is the register for (local area/local body) \
Thiruvananthapuram Corporation of Taluk Thiruvananthapuram of District Thiruvananthapuram of State Kerala.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown certificate type '{0}'")]
    UnknownKind(String),
}

/// One labelled line of a template and the request field that fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    pub label: &'static str,
    pub source: &'static str,
    /// Used when the request omits the field or sends `null`.
    pub default: Option<&'static str>,
}

const fn field(label: &'static str, source: &'static str) -> TemplateField {
    TemplateField {
        label,
        source,
        default: None,
    }
}

const fn field_or_na(label: &'static str, source: &'static str) -> TemplateField {
    TemplateField {
        label,
        source,
        default: Some("N/A"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub kind: CertificateKind,
    pub title: &'static str,
    /// Justified statutory paragraph drawn under the title.
    pub boilerplate: Option<String>,
    /// Single unwrapped line drawn above the field list.
    pub intro_line: Option<&'static str>,
    pub fields: Vec<TemplateField>,
}

impl CertificateTemplate {
    /// Resolve every template field against the request body, in order.
    pub fn fill(&self, values: &Map<String, Value>) -> Vec<FilledField> {
        self.fields
            .iter()
            .map(|f| FilledField {
                label: f.label.to_string(),
                value: field_value(values.get(f.source), f.default),
            })
            .collect()
    }
}

fn field_value(value: Option<&Value>, default: Option<&str>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.unwrap_or_default().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

fn registration_paragraph(event: &str) -> String {
    format!("{REGISTRATION_PREAMBLE} {event} {REGISTRATION_LOCALITY}")
}

/// Template for a known kind.
pub fn lookup(kind: CertificateKind) -> CertificateTemplate {
    match kind {
        CertificateKind::Birth => CertificateTemplate {
            kind,
            title: "BIRTH CERTIFICATE",
            boilerplate: Some(registration_paragraph("birth")),
            intro_line: None,
            fields: vec![
                field("Name", "full_name"),
                field("Father's Name", "fathers_name"),
                field("Mother's Name", "mothers_name"),
                field("Date of Birth", "date_of_birth"),
                field("Place of Birth", "place_of_birth"),
            ],
        },
        CertificateKind::Death => CertificateTemplate {
            kind,
            title: "DEATH CERTIFICATE",
            boilerplate: Some(registration_paragraph("death")),
            intro_line: None,
            fields: vec![
                field_or_na("Name", "name"),
                field_or_na("Date of Death", "date_of_death"),
                field_or_na("Place of Death", "place_of_death"),
                field_or_na("Cause of Death", "cause_of_death"),
            ],
        },
        CertificateKind::Income => CertificateTemplate {
            kind,
            title: "INCOME CERTIFICATE",
            boilerplate: None,
            intro_line: Some(
                "Certified that the Annual Family Income of the person with the details mentioned below",
            ),
            fields: vec![
                field("Name", "name"),
                field("Annual Income", "annual_income"),
                field("Source of Income", "source_of_income"),
                field("Address", "address"),
            ],
        },
        CertificateKind::Land => CertificateTemplate {
            kind,
            title: "LAND POSSESSION CERTIFICATE",
            boilerplate: None,
            intro_line: None,
            fields: vec![
                field("Owner Name", "owner_name"),
                field("Property Address", "property_address"),
                field("Market Value", "market_value"),
                field("Area in Sq. Ft", "area_sqft"),
                field("Survey Number", "survey_number"),
            ],
        },
    }
}

/// Template for a raw `certificate_type` string.
pub fn resolve(certificate_type: &str) -> Result<CertificateTemplate, CatalogError> {
    CertificateKind::from_name(certificate_type)
        .map(lookup)
        .ok_or_else(|| CatalogError::UnknownKind(certificate_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(kind: CertificateKind) -> Vec<&'static str> {
        lookup(kind).fields.iter().map(|f| f.label).collect()
    }

    #[test]
    fn test_field_lists_per_kind() {
        assert_eq!(
            labels(CertificateKind::Birth),
            vec!["Name", "Father's Name", "Mother's Name", "Date of Birth", "Place of Birth"]
        );
        assert_eq!(
            labels(CertificateKind::Death),
            vec!["Name", "Date of Death", "Place of Death", "Cause of Death"]
        );
        assert_eq!(
            labels(CertificateKind::Income),
            vec!["Name", "Annual Income", "Source of Income", "Address"]
        );
        assert_eq!(
            labels(CertificateKind::Land),
            vec!["Owner Name", "Property Address", "Market Value", "Area in Sq. Ft", "Survey Number"]
        );
    }

    #[test]
    fn test_only_registration_kinds_carry_boilerplate() {
        let birth = lookup(CertificateKind::Birth).boilerplate.unwrap();
        let death = lookup(CertificateKind::Death).boilerplate.unwrap();
        assert!(birth.contains("Section 12 of the Registration of Births and Deaths Acts, 1969"));
        assert!(birth.contains("original record of birth which is the register"));
        assert!(death.contains("original record of death which is the register"));
        assert!(lookup(CertificateKind::Income).boilerplate.is_none());
        assert!(lookup(CertificateKind::Land).boilerplate.is_none());
    }

    #[test]
    fn test_resolve_unknown_kind() {
        assert_eq!(
            resolve("Unknown Kind"),
            Err(CatalogError::UnknownKind("Unknown Kind".to_string()))
        );
        assert_eq!(resolve("Land Certificate").unwrap().title, "LAND POSSESSION CERTIFICATE");
    }

    #[test]
    fn test_fill_uses_defaults_only_where_declared() {
        let values = json!({ "name": "Mary" });
        let death = lookup(CertificateKind::Death).fill(values.as_object().unwrap());
        assert_eq!(death[0].value, "Mary");
        assert_eq!(death[1].value, "N/A");
        assert_eq!(death[3].value, "N/A");

        let income = lookup(CertificateKind::Income).fill(values.as_object().unwrap());
        assert_eq!(income[0].value, "Mary");
        assert_eq!(income[1].value, "");
    }

    #[test]
    fn test_fill_renders_non_string_values() {
        let values = json!({
            "owner_name": "K. Nair",
            "market_value": 2500000,
            "area_sqft": 1200.5,
            "survey_number": null,
            "property_address": true
        });
        let land = lookup(CertificateKind::Land).fill(values.as_object().unwrap());
        assert_eq!(land[1].value, "true");
        assert_eq!(land[2].value, "2500000");
        assert_eq!(land[3].value, "1200.5");
        assert_eq!(land[4].value, "");
    }
}
