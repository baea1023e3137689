use serde::{Deserialize, Serialize};

use crate::db::{self, DbPool};
use crate::error::ApiError;

/// Person-type discriminator shared by plaintiff and defendant records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Individual,
    Company,
    Institution,
}

impl PersonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Individual => "individual",
            PersonKind::Company => "company",
            PersonKind::Institution => "institution",
        }
    }
}

/// Current request shape: plaintiff/defendant/detail sub-objects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedShape {
    pub plaintiff: PlaintiffBody,
    pub defendant: DefendantBody,
    pub detail: DetailBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaintiffBody {
    pub kind: Option<PersonKind>,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country_id: i32,
    pub city_id: i32,
    pub profession_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefendantBody {
    pub kind: PersonKind,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub commercial_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailBody {
    pub summary: String,
    pub object_id: i32,
    pub jurisdiction_id: i32,
}

/// Legacy flat shape still sent by older mobile builds.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyShape {
    pub plaintiff_kind: Option<PersonKind>,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country_id: i32,
    pub city_id: i32,
    pub profession_id: i32,
    pub defendant_kind: PersonKind,
    pub defendant_first_name: Option<String>,
    pub defendant_last_name: Option<String>,
    pub defendant_commercial_name: Option<String>,
    pub summary: String,
    pub object_id: i32,
    pub jurisdiction_id: i32,
}

/// The two accepted request shapes. The nested variant is tried first; it is
/// the only one carrying a `plaintiff` object, so the discrimination is
/// unambiguous.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ComplaintRequest {
    Nested(NestedShape),
    Legacy(LegacyShape),
}

/// The single reconciled parameter set consumed by persistence, whichever
/// shape the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalComplaint {
    pub session_id: String,
    pub summary: String,
    pub object_id: i32,
    pub jurisdiction_id: i32,
    pub plaintiff_kind: PersonKind,
    pub plaintiff_first_name: String,
    pub plaintiff_last_name: String,
    pub plaintiff_national_id: String,
    pub plaintiff_email: Option<String>,
    pub plaintiff_phone: Option<String>,
    pub plaintiff_country_id: i32,
    pub plaintiff_city_id: i32,
    pub plaintiff_profession_id: i32,
    pub defendant_kind: PersonKind,
    pub defendant_first_name: Option<String>,
    pub defendant_last_name: Option<String>,
    pub defendant_commercial_name: Option<String>,
}

/// Map either request shape to the canonical record. Pure field
/// restructuring; business validation happens in [`validate`]. The session id
/// comes from the `x-session-id` header and falls back to an empty string.
pub fn reconcile(req: ComplaintRequest, session_id: Option<&str>) -> CanonicalComplaint {
    let session_id = session_id.unwrap_or("").to_string();
    match req {
        ComplaintRequest::Nested(n) => CanonicalComplaint {
            session_id,
            summary: n.detail.summary,
            object_id: n.detail.object_id,
            jurisdiction_id: n.detail.jurisdiction_id,
            plaintiff_kind: n.plaintiff.kind.unwrap_or(PersonKind::Individual),
            plaintiff_first_name: n.plaintiff.first_name,
            plaintiff_last_name: n.plaintiff.last_name,
            plaintiff_national_id: n.plaintiff.national_id,
            plaintiff_email: n.plaintiff.email,
            plaintiff_phone: n.plaintiff.phone,
            plaintiff_country_id: n.plaintiff.country_id,
            plaintiff_city_id: n.plaintiff.city_id,
            plaintiff_profession_id: n.plaintiff.profession_id,
            defendant_kind: n.defendant.kind,
            defendant_first_name: n.defendant.first_name,
            defendant_last_name: n.defendant.last_name,
            defendant_commercial_name: n.defendant.commercial_name,
        },
        ComplaintRequest::Legacy(l) => CanonicalComplaint {
            session_id,
            summary: l.summary,
            object_id: l.object_id,
            jurisdiction_id: l.jurisdiction_id,
            plaintiff_kind: l.plaintiff_kind.unwrap_or(PersonKind::Individual),
            plaintiff_first_name: l.first_name,
            plaintiff_last_name: l.last_name,
            plaintiff_national_id: l.national_id,
            plaintiff_email: l.email,
            plaintiff_phone: l.phone,
            plaintiff_country_id: l.country_id,
            plaintiff_city_id: l.city_id,
            plaintiff_profession_id: l.profession_id,
            defendant_kind: l.defendant_kind,
            defendant_first_name: l.defendant_first_name,
            defendant_last_name: l.defendant_last_name,
            defendant_commercial_name: l.defendant_commercial_name,
        },
    }
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationFailed(format!("{} is required", field)));
    }
    Ok(())
}

fn positive(value: i32, field: &str) -> Result<(), ApiError> {
    if value <= 0 {
        return Err(ApiError::ValidationFailed(format!(
            "{} must be a positive id",
            field
        )));
    }
    Ok(())
}

/// Structural validation of the canonical record. Runs before any store
/// call; referential checks against the reference tables belong to the
/// atomic create procedure.
pub fn validate(c: &CanonicalComplaint) -> Result<(), ApiError> {
    required(&c.summary, "summary")?;
    positive(c.object_id, "objectId")?;
    positive(c.jurisdiction_id, "jurisdictionId")?;
    positive(c.plaintiff_country_id, "countryId")?;
    positive(c.plaintiff_city_id, "cityId")?;
    positive(c.plaintiff_profession_id, "professionId")?;

    // An individual plaintiff must identify themselves fully.
    if c.plaintiff_kind == PersonKind::Individual {
        required(&c.plaintiff_first_name, "firstName")?;
        required(&c.plaintiff_last_name, "lastName")?;
        required(&c.plaintiff_national_id, "nationalId")?;
    }

    // Defendant kind constrains which name fields must be present.
    match c.defendant_kind {
        PersonKind::Individual => {
            let first = c.defendant_first_name.as_deref().unwrap_or("");
            let last = c.defendant_last_name.as_deref().unwrap_or("");
            required(first, "defendantFirstName")?;
            required(last, "defendantLastName")?;
        }
        PersonKind::Company | PersonKind::Institution => {
            let name = c.defendant_commercial_name.as_deref().unwrap_or("");
            required(name, "defendantCommercialName")?;
        }
    }

    Ok(())
}

/// Result of the atomic create procedure.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub complaint_id: i64,
    pub tracking_code: String,
}

/// Validate and persist a complaint in one atomic store procedure.
pub fn submit(db: &DbPool, canonical: &CanonicalComplaint) -> Result<SubmissionReceipt, ApiError> {
    validate(canonical)?;

    let (complaint_id, tracking_code) =
        db::create_complaint(db, canonical).map_err(ApiError::from)?;

    tracing::info!(
        "Complaint {} accepted (tracking {})",
        complaint_id,
        tracking_code
    );

    Ok(SubmissionReceipt {
        complaint_id,
        tracking_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_json() -> &'static str {
        r#"{
            "plaintiff": {
                "kind": "individual",
                "firstName": "Maria",
                "lastName": "Rojas",
                "nationalId": "12.345.678-9",
                "email": "maria@example.com",
                "countryId": 1,
                "cityId": 1,
                "professionId": 2
            },
            "defendant": {
                "kind": "company",
                "commercialName": "Acme Ltda"
            },
            "detail": {
                "summary": "Defective appliance, refused refund",
                "objectId": 1,
                "jurisdictionId": 3
            }
        }"#
    }

    fn legacy_json() -> &'static str {
        r#"{
            "firstName": "Maria",
            "lastName": "Rojas",
            "nationalId": "12.345.678-9",
            "email": "maria@example.com",
            "countryId": 1,
            "cityId": 1,
            "professionId": 2,
            "defendantKind": "company",
            "defendantCommercialName": "Acme Ltda",
            "summary": "Defective appliance, refused refund",
            "objectId": 1,
            "jurisdictionId": 3
        }"#
    }

    #[test]
    fn both_shapes_reconcile_identically() {
        let nested: ComplaintRequest = serde_json::from_str(nested_json()).unwrap();
        let legacy: ComplaintRequest = serde_json::from_str(legacy_json()).unwrap();
        assert!(matches!(nested, ComplaintRequest::Nested(_)));
        assert!(matches!(legacy, ComplaintRequest::Legacy(_)));

        let a = reconcile(nested, Some("sess-1"));
        let b = reconcile(legacy, Some("sess-1"));
        assert_eq!(a, b);
        assert_eq!(a.session_id, "sess-1");
        assert_eq!(a.defendant_kind, PersonKind::Company);
    }

    #[test]
    fn missing_session_header_becomes_empty_string() {
        let nested: ComplaintRequest = serde_json::from_str(nested_json()).unwrap();
        let c = reconcile(nested, None);
        assert_eq!(c.session_id, "");
    }

    #[test]
    fn company_defendant_requires_commercial_name() {
        let nested: ComplaintRequest = serde_json::from_str(nested_json()).unwrap();
        let mut c = reconcile(nested, None);
        assert!(validate(&c).is_ok());

        c.defendant_commercial_name = None;
        let err = validate(&c).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_FAILED");
    }

    #[test]
    fn individual_defendant_requires_personal_name() {
        let nested: ComplaintRequest = serde_json::from_str(nested_json()).unwrap();
        let mut c = reconcile(nested, None);
        c.defendant_kind = PersonKind::Individual;
        c.defendant_commercial_name = None;
        assert!(validate(&c).is_err());

        c.defendant_first_name = Some("Pedro".into());
        c.defendant_last_name = Some("Soto".into());
        assert!(validate(&c).is_ok());
    }

    #[test]
    fn empty_summary_rejected() {
        let nested: ComplaintRequest = serde_json::from_str(nested_json()).unwrap();
        let mut c = reconcile(nested, None);
        c.summary = "   ".into();
        assert!(validate(&c).is_err());
    }
}
