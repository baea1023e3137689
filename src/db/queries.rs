// Store procedures and queries for the complaint intake tables
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::complaint::CanonicalComplaint;
use crate::db::{
    schema::*, Attachment, DbPool, NewAttachment, NewComplaint, RefItem,
};
use crate::error::ApiError;

diesel::define_sql_function! {
    fn last_insert_rowid() -> BigInt;
}

/// Store-layer failures, converted to [`ApiError`] at the component boundary.
#[derive(Debug)]
pub enum StoreError {
    /// A supplied reference id does not exist in its reference table.
    UnknownReference(&'static str, i32),
    /// The owning complaint for an attachment batch does not exist.
    ComplaintNotFound(i64),
    /// The create procedure produced no row. Fatal.
    NoRow,
    Db(diesel::result::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownReference(field, id) => {
                write!(f, "unknown {} reference: {}", field, id)
            }
            StoreError::ComplaintNotFound(id) => write!(f, "complaint {} not found", id),
            StoreError::NoRow => write!(f, "create procedure returned no row"),
            StoreError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Db(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownReference(field, id) => {
                ApiError::ValidationFailed(format!("unknown {} reference: {}", field, id))
            }
            StoreError::ComplaintNotFound(id) => {
                ApiError::MissingOrInvalidTarget(format!("complaint {} not found", id))
            }
            StoreError::NoRow => ApiError::PersistenceInvariantViolation,
            StoreError::Db(db_err) => ApiError::Internal(format!("database error: {}", db_err)),
        }
    }
}

/// Generate the client-facing tracking code. Opaque, unique, distinct from
/// the numeric row id.
fn new_tracking_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("RC-{}", raw[..12].to_uppercase())
}

fn check_reference(field: &'static str, count: i64, id: i32) -> Result<(), StoreError> {
    if count == 0 {
        return Err(StoreError::UnknownReference(field, id));
    }
    Ok(())
}

/// The atomic create procedure: validates every reference id and inserts the
/// complaint in a single transaction, returning the durable numeric id plus
/// the tracking code. Referential violations are rejected here, not
/// pre-checked by callers.
pub fn create_complaint(
    db: &DbPool,
    params: &CanonicalComplaint,
) -> Result<(i64, String), StoreError> {
    let mut conn = db.lock().unwrap();

    conn.transaction::<(i64, String), StoreError, _>(|conn| {
        let country_count: i64 = countries::table
            .filter(countries::id.eq(params.plaintiff_country_id))
            .count()
            .get_result(conn)?;
        check_reference("countryId", country_count, params.plaintiff_country_id)?;

        let city_count: i64 = cities::table
            .filter(cities::id.eq(params.plaintiff_city_id))
            .count()
            .get_result(conn)?;
        check_reference("cityId", city_count, params.plaintiff_city_id)?;

        let profession_count: i64 = professions::table
            .filter(professions::id.eq(params.plaintiff_profession_id))
            .count()
            .get_result(conn)?;
        check_reference(
            "professionId",
            profession_count,
            params.plaintiff_profession_id,
        )?;

        let jurisdiction_count: i64 = jurisdictions::table
            .filter(jurisdictions::id.eq(params.jurisdiction_id))
            .count()
            .get_result(conn)?;
        check_reference("jurisdictionId", jurisdiction_count, params.jurisdiction_id)?;

        let object_count: i64 = complaint_objects::table
            .filter(complaint_objects::id.eq(params.object_id))
            .count()
            .get_result(conn)?;
        check_reference("objectId", object_count, params.object_id)?;

        let tracking_code = new_tracking_code();
        let row = NewComplaint {
            tracking_code: tracking_code.clone(),
            session_id: params.session_id.clone(),
            summary: params.summary.clone(),
            object_id: params.object_id,
            jurisdiction_id: params.jurisdiction_id,
            plaintiff_kind: params.plaintiff_kind.as_str().to_string(),
            plaintiff_first_name: params.plaintiff_first_name.clone(),
            plaintiff_last_name: params.plaintiff_last_name.clone(),
            plaintiff_national_id: params.plaintiff_national_id.clone(),
            plaintiff_email: params.plaintiff_email.clone(),
            plaintiff_phone: params.plaintiff_phone.clone(),
            plaintiff_country_id: params.plaintiff_country_id,
            plaintiff_city_id: params.plaintiff_city_id,
            plaintiff_profession_id: params.plaintiff_profession_id,
            defendant_kind: params.defendant_kind.as_str().to_string(),
            defendant_first_name: params.defendant_first_name.clone(),
            defendant_last_name: params.defendant_last_name.clone(),
            defendant_commercial_name: params.defendant_commercial_name.clone(),
            created_at: Utc::now().timestamp(),
        };

        let inserted = diesel::insert_into(complaints::table)
            .values(&row)
            .execute(conn)?;
        if inserted == 0 {
            return Err(StoreError::NoRow);
        }

        let complaint_id: i64 = diesel::select(last_insert_rowid()).get_result(conn)?;
        Ok((complaint_id, tracking_code))
    })
}

/// Insert the metadata rows for one upload request as a set: either all rows
/// commit or none do. The owning complaint is re-checked inside the
/// transaction.
pub fn insert_attachments(
    db: &DbPool,
    complaint_id: i64,
    rows: Vec<NewAttachment>,
) -> Result<Vec<Attachment>, StoreError> {
    let mut conn = db.lock().unwrap();

    conn.transaction::<Vec<Attachment>, StoreError, _>(|conn| {
        let owner_count: i64 = complaints::table
            .filter(complaints::id.eq(complaint_id))
            .count()
            .get_result(conn)?;
        if owner_count == 0 {
            return Err(StoreError::ComplaintNotFound(complaint_id));
        }

        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            diesel::insert_into(attachments::table)
                .values(&row)
                .execute(conn)?;
            let id: i64 = diesel::select(last_insert_rowid()).get_result(conn)?;
            created.push(Attachment {
                id,
                complaint_id: row.complaint_id,
                stored_name: row.stored_name,
                extension: row.extension,
                media_type: row.media_type,
                created_at: row.created_at,
            });
        }
        Ok(created)
    })
}

pub fn find_complaint(db: &DbPool, id: i64) -> Result<Option<crate::db::Complaint>, StoreError> {
    let mut conn = db.lock().unwrap();
    let row = complaints::table
        .filter(complaints::id.eq(id))
        .first::<crate::db::Complaint>(&mut *conn)
        .optional()?;
    Ok(row)
}

pub fn list_attachments(db: &DbPool, complaint_id: i64) -> Result<Vec<Attachment>, StoreError> {
    let mut conn = db.lock().unwrap();
    let rows = attachments::table
        .filter(attachments::complaint_id.eq(complaint_id))
        .order_by(attachments::id.asc())
        .load::<Attachment>(&mut *conn)?;
    Ok(rows)
}

pub fn list_countries(db: &DbPool) -> Result<Vec<RefItem>, StoreError> {
    let mut conn = db.lock().unwrap();
    let rows = countries::table
        .select((countries::id, countries::name))
        .order_by(countries::name.asc())
        .load::<RefItem>(&mut *conn)?;
    Ok(rows)
}

pub fn list_cities(db: &DbPool, country_id: Option<i32>) -> Result<Vec<RefItem>, StoreError> {
    let mut conn = db.lock().unwrap();
    let mut query = cities::table
        .select((cities::id, cities::name))
        .order_by(cities::name.asc())
        .into_boxed();
    if let Some(cid) = country_id {
        query = query.filter(cities::country_id.eq(cid));
    }
    let rows = query.load::<RefItem>(&mut *conn)?;
    Ok(rows)
}

pub fn list_professions(db: &DbPool) -> Result<Vec<RefItem>, StoreError> {
    let mut conn = db.lock().unwrap();
    let rows = professions::table
        .select((professions::id, professions::name))
        .order_by(professions::name.asc())
        .load::<RefItem>(&mut *conn)?;
    Ok(rows)
}

pub fn list_jurisdictions(db: &DbPool) -> Result<Vec<RefItem>, StoreError> {
    let mut conn = db.lock().unwrap();
    let rows = jurisdictions::table
        .select((jurisdictions::id, jurisdictions::name))
        .order_by(jurisdictions::name.asc())
        .load::<RefItem>(&mut *conn)?;
    Ok(rows)
}

pub fn list_complaint_objects(db: &DbPool) -> Result<Vec<RefItem>, StoreError> {
    let mut conn = db.lock().unwrap();
    let rows = complaint_objects::table
        .select((complaint_objects::id, complaint_objects::name))
        .order_by(complaint_objects::name.asc())
        .load::<RefItem>(&mut *conn)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaint::PersonKind;
    use crate::db::init::{init_db, run_migrations, seed_reference_data};

    fn test_db() -> DbPool {
        let db = init_db(":memory:").unwrap();
        run_migrations(&db).unwrap();
        seed_reference_data(&db).unwrap();
        db
    }

    fn canonical() -> CanonicalComplaint {
        CanonicalComplaint {
            session_id: "sess-1".into(),
            summary: "Defective appliance".into(),
            object_id: 1,
            jurisdiction_id: 3,
            plaintiff_kind: PersonKind::Individual,
            plaintiff_first_name: "Maria".into(),
            plaintiff_last_name: "Rojas".into(),
            plaintiff_national_id: "12.345.678-9".into(),
            plaintiff_email: Some("maria@example.com".into()),
            plaintiff_phone: None,
            plaintiff_country_id: 1,
            plaintiff_city_id: 1,
            plaintiff_profession_id: 2,
            defendant_kind: PersonKind::Company,
            defendant_first_name: None,
            defendant_last_name: None,
            defendant_commercial_name: Some("Acme Ltda".into()),
        }
    }

    #[test]
    fn create_returns_id_and_tracking_code() {
        let db = test_db();
        let (id, code) = create_complaint(&db, &canonical()).unwrap();
        assert!(id > 0);
        assert!(code.starts_with("RC-"));

        let (id2, code2) = create_complaint(&db, &canonical()).unwrap();
        assert_ne!(id, id2);
        assert_ne!(code, code2);

        let stored = find_complaint(&db, id).unwrap().unwrap();
        assert_eq!(stored.tracking_code, code);
        assert_eq!(stored.session_id, "sess-1");
        assert_eq!(stored.defendant_kind, "company");
        assert_eq!(stored.defendant_commercial_name.as_deref(), Some("Acme Ltda"));
    }

    #[test]
    fn unknown_reference_is_rejected_by_the_procedure() {
        let db = test_db();
        let mut params = canonical();
        params.plaintiff_country_id = 999;
        let err = create_complaint(&db, &params).unwrap_err();
        assert!(matches!(err, StoreError::UnknownReference("countryId", 999)));

        // Nothing committed.
        let mut conn = db.lock().unwrap();
        let count: i64 = complaints::table.count().get_result(&mut *conn).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn attachment_batch_requires_existing_complaint() {
        let db = test_db();
        let rows = vec![NewAttachment {
            complaint_id: 42,
            stored_name: "x.jpg".into(),
            extension: "jpg".into(),
            media_type: "image/jpeg".into(),
            created_at: 0,
        }];
        let err = insert_attachments(&db, 42, rows).unwrap_err();
        assert!(matches!(err, StoreError::ComplaintNotFound(42)));
    }

    #[test]
    fn attachment_batch_is_all_or_nothing() {
        let db = test_db();
        let (id, _) = create_complaint(&db, &canonical()).unwrap();

        // Second row violates the stored_name UNIQUE constraint; the first
        // row must roll back with it.
        let rows = vec![
            NewAttachment {
                complaint_id: id,
                stored_name: "dup.jpg".into(),
                extension: "jpg".into(),
                media_type: "image/jpeg".into(),
                created_at: 0,
            },
            NewAttachment {
                complaint_id: id,
                stored_name: "dup.jpg".into(),
                extension: "jpg".into(),
                media_type: "image/jpeg".into(),
                created_at: 0,
            },
        ];
        assert!(insert_attachments(&db, id, rows).is_err());
        assert!(list_attachments(&db, id).unwrap().is_empty());
    }

    #[test]
    fn reference_lists_are_seeded() {
        let db = test_db();
        assert_eq!(list_countries(&db).unwrap().len(), 3);
        assert_eq!(list_cities(&db, Some(1)).unwrap().len(), 2);
        assert_eq!(list_cities(&db, None).unwrap().len(), 3);
        assert!(!list_jurisdictions(&db).unwrap().is_empty());
        assert!(!list_complaint_objects(&db).unwrap().is_empty());
        assert!(!list_professions(&db).unwrap().is_empty());
    }
}
