use actix_multipart::form::bytes::Bytes as MultipartBytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::complaint::{self, ComplaintRequest};
use crate::db::{self, DbPool};
use crate::error::ApiError;
use crate::guard::AuthClaims;
use crate::storage::AttachmentStore;
use crate::token::TokenAuthority;
use crate::upload::{IncomingFile, UploadPipeline, MAX_FILES_PER_REQUEST};

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonAuthRequest {
    pub install_id: String,
    pub scopes: Option<Vec<String>>,
}

/// Mint an anonymous device-bound session credential.
pub async fn auth_anon(
    authority: web::Data<TokenAuthority>,
    body: web::Json<AnonAuthRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let issued = authority.issue(&body.install_id, body.scopes)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "accessToken": issued.access_token,
        "sessionId": issued.session_id,
        "expiresIn": issued.expires_in,
    })))
}

/// Accept a complaint in either request shape, reconcile, validate and run
/// the atomic create procedure.
pub async fn submit_complaint(
    claims: AuthClaims,
    req: HttpRequest,
    db: web::Data<DbPool>,
    body: web::Json<ComplaintRequest>,
) -> Result<HttpResponse, ApiError> {
    // Correlation id comes from the header; empty string when absent.
    let session_id = req
        .headers()
        .get("x-session-id")
        .and_then(|v| v.to_str().ok());

    let canonical = complaint::reconcile(body.into_inner(), session_id);

    tracing::debug!(
        "Complaint submission from session {} (device subject {})",
        claims.0.sid,
        claims.0.sub
    );

    let receipt = complaint::submit(&db, &canonical)?;

    // The numeric id travels as a decimal string so it never degrades to a
    // float on the client side.
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Complaint received",
        "complaintId": receipt.complaint_id.to_string(),
        "trackingCode": receipt.tracking_code,
    })))
}

#[derive(MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "complaintId")]
    pub complaint_id: Option<Text<String>>,
    #[multipart(limit = "2MiB")]
    pub files: Vec<MultipartBytes>,
}

/// Attach validated files to an existing complaint. The whole batch is
/// accepted or rejected together.
pub async fn upload_files(
    claims: AuthClaims,
    db: web::Data<DbPool>,
    pipeline: web::Data<UploadPipeline>,
    store: web::Data<AttachmentStore>,
    form: MultipartForm<UploadForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();

    let complaint_id: i64 = form
        .complaint_id
        .as_ref()
        .and_then(|t| t.0.trim().parse().ok())
        .ok_or_else(|| {
            ApiError::MissingOrInvalidTarget("complaintId field is required".to_string())
        })?;

    if form.files.is_empty() {
        return Err(ApiError::MissingOrInvalidTarget(
            "at least one file is required".to_string(),
        ));
    }
    if form.files.len() > MAX_FILES_PER_REQUEST {
        return Err(ApiError::ValidationFailed(format!(
            "at most {} files per request",
            MAX_FILES_PER_REQUEST
        )));
    }

    tracing::info!(
        "Upload of {} file(s) for complaint {} from session {}",
        form.files.len(),
        complaint_id,
        claims.0.sid
    );

    let incoming: Vec<IncomingFile> = form
        .files
        .into_iter()
        .map(|f| IncomingFile {
            declared_type: f
                .content_type
                .as_ref()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default(),
            file_name: f.file_name,
            bytes: f.data.to_vec(),
        })
        .collect();

    let validated = pipeline.validate_batch(incoming)?;
    let created = store.persist(&db, complaint_id, validated)?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "attachments": created })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityFilter {
    pub country_id: Option<i32>,
}

pub async fn list_countries(db: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let rows = db::list_countries(&db).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn list_cities(
    db: web::Data<DbPool>,
    filter: web::Query<CityFilter>,
) -> Result<HttpResponse, ApiError> {
    let rows = db::list_cities(&db, filter.country_id).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn list_professions(db: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let rows = db::list_professions(&db).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn list_jurisdictions(db: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let rows = db::list_jurisdictions(&db).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub async fn list_complaint_objects(db: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    let rows = db::list_complaint_objects(&db).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(rows))
}

pub fn configure_routes() -> impl actix_web::dev::HttpServiceFactory {
    web::scope("")
        .route("/healthz", web::get().to(healthz))
        .route("/auth/anon", web::post().to(auth_anon))
        .service(
            web::scope("/api/v1")
                .route("/complaints", web::post().to(submit_complaint))
                .route("/files", web::post().to(upload_files))
                .service(
                    web::scope("/refs")
                        .route("/countries", web::get().to(list_countries))
                        .route("/cities", web::get().to(list_cities))
                        .route("/professions", web::get().to(list_professions))
                        .route("/jurisdictions", web::get().to(list_jurisdictions))
                        .route("/objects", web::get().to(list_complaint_objects)),
                ),
        )
}

/// Map JSON body deserialization failures to the 422 validation class
/// instead of actix's generic 400.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    ApiError::ValidationFailed(err.to_string()).into()
}
