// Database models for the complaint intake store
use diesel::prelude::*;
use serde::Serialize;

use super::schema::*;

#[derive(Queryable, Clone, Debug)]
pub struct Complaint {
    pub id: i64,
    pub tracking_code: String,
    pub session_id: String,
    pub summary: String,
    pub object_id: i32,
    pub jurisdiction_id: i32,
    pub plaintiff_kind: String,
    pub plaintiff_first_name: String,
    pub plaintiff_last_name: String,
    pub plaintiff_national_id: String,
    pub plaintiff_email: Option<String>,
    pub plaintiff_phone: Option<String>,
    pub plaintiff_country_id: i32,
    pub plaintiff_city_id: i32,
    pub plaintiff_profession_id: i32,
    pub defendant_kind: String,
    pub defendant_first_name: Option<String>,
    pub defendant_last_name: Option<String>,
    pub defendant_commercial_name: Option<String>,
    pub created_at: i64,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub tracking_code: String,
    pub session_id: String,
    pub summary: String,
    pub object_id: i32,
    pub jurisdiction_id: i32,
    pub plaintiff_kind: String,
    pub plaintiff_first_name: String,
    pub plaintiff_last_name: String,
    pub plaintiff_national_id: String,
    pub plaintiff_email: Option<String>,
    pub plaintiff_phone: Option<String>,
    pub plaintiff_country_id: i32,
    pub plaintiff_city_id: i32,
    pub plaintiff_profession_id: i32,
    pub defendant_kind: String,
    pub defendant_first_name: Option<String>,
    pub defendant_last_name: Option<String>,
    pub defendant_commercial_name: Option<String>,
    pub created_at: i64,
}

/// Metadata row for a stored attachment. `id` is serialized as a decimal
/// string so oversized identifiers never round-trip through floats.
#[derive(Queryable, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(serialize_with = "crate::db::models::i64_as_string")]
    pub id: i64,
    #[serde(serialize_with = "crate::db::models::i64_as_string")]
    pub complaint_id: i64,
    pub stored_name: String,
    pub extension: String,
    pub media_type: String,
    pub created_at: i64,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = attachments)]
pub struct NewAttachment {
    pub complaint_id: i64,
    pub stored_name: String,
    pub extension: String,
    pub media_type: String,
    pub created_at: i64,
}

/// One row of any reference table (country, city, profession, ...).
#[derive(Queryable, Clone, Debug, Serialize)]
pub struct RefItem {
    pub id: i32,
    pub name: String,
}

pub fn i64_as_string<S: serde::Serializer>(v: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.to_string())
}
