// Database initialization and connection management
use std::sync::{Arc, Mutex};

use diesel::sqlite::SqliteConnection;
use diesel::Connection;

/// SQLite has built-in thread safety; Arc<Mutex<>> gives safe shared access
/// across actix workers.
pub type DbPool = Arc<Mutex<SqliteConnection>>;

/// Open (creating if necessary) the SQLite store.
pub fn init_db(database_url: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    let conn = SqliteConnection::establish(database_url)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create the table set if it does not exist yet.
pub fn run_migrations(db: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    use diesel::sql_query;
    use diesel::RunQueryDsl;

    let mut conn = db.lock().unwrap();

    let tables = vec![
        "CREATE TABLE IF NOT EXISTS complaints (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            tracking_code TEXT NOT NULL UNIQUE,
            session_id TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL,
            object_id INTEGER NOT NULL,
            jurisdiction_id INTEGER NOT NULL,
            plaintiff_kind TEXT NOT NULL,
            plaintiff_first_name TEXT NOT NULL,
            plaintiff_last_name TEXT NOT NULL,
            plaintiff_national_id TEXT NOT NULL,
            plaintiff_email TEXT,
            plaintiff_phone TEXT,
            plaintiff_country_id INTEGER NOT NULL,
            plaintiff_city_id INTEGER NOT NULL,
            plaintiff_profession_id INTEGER NOT NULL,
            defendant_kind TEXT NOT NULL,
            defendant_first_name TEXT,
            defendant_last_name TEXT,
            defendant_commercial_name TEXT,
            created_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            complaint_id INTEGER NOT NULL REFERENCES complaints(id),
            stored_name TEXT NOT NULL UNIQUE,
            extension TEXT NOT NULL,
            media_type TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS countries (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS cities (
            id INTEGER PRIMARY KEY NOT NULL,
            country_id INTEGER NOT NULL REFERENCES countries(id),
            name TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS professions (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS jurisdictions (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS complaint_objects (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
    ];

    for table in tables {
        sql_query(table).execute(&mut *conn)?;
    }

    Ok(())
}

/// Seed the reference tables with a starter set when they are empty, so a
/// fresh deployment can accept complaints immediately.
pub fn seed_reference_data(db: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    use diesel::prelude::*;

    use super::schema::{cities, complaint_objects, countries, jurisdictions, professions};

    let mut conn = db.lock().unwrap();

    let existing: i64 = countries::table.count().get_result(&mut *conn)?;
    if existing > 0 {
        return Ok(());
    }

    diesel::insert_into(countries::table)
        .values(vec![
            (countries::id.eq(1), countries::name.eq("Chile")),
            (countries::id.eq(2), countries::name.eq("Argentina")),
            (countries::id.eq(3), countries::name.eq("Peru")),
        ])
        .execute(&mut *conn)?;

    diesel::insert_into(cities::table)
        .values(vec![
            (cities::id.eq(1), cities::country_id.eq(1), cities::name.eq("Santiago")),
            (cities::id.eq(2), cities::country_id.eq(1), cities::name.eq("Valparaiso")),
            (cities::id.eq(3), cities::country_id.eq(2), cities::name.eq("Buenos Aires")),
        ])
        .execute(&mut *conn)?;

    diesel::insert_into(professions::table)
        .values(vec![
            (professions::id.eq(1), professions::name.eq("Employee")),
            (professions::id.eq(2), professions::name.eq("Self-employed")),
            (professions::id.eq(3), professions::name.eq("Student")),
        ])
        .execute(&mut *conn)?;

    diesel::insert_into(jurisdictions::table)
        .values(vec![
            (jurisdictions::id.eq(1), jurisdictions::name.eq("Civil")),
            (jurisdictions::id.eq(2), jurisdictions::name.eq("Labor")),
            (jurisdictions::id.eq(3), jurisdictions::name.eq("Consumer")),
        ])
        .execute(&mut *conn)?;

    diesel::insert_into(complaint_objects::table)
        .values(vec![
            (complaint_objects::id.eq(1), complaint_objects::name.eq("Defective product")),
            (complaint_objects::id.eq(2), complaint_objects::name.eq("Unpaid wages")),
            (complaint_objects::id.eq(3), complaint_objects::name.eq("Contract breach")),
        ])
        .execute(&mut *conn)?;

    tracing::info!("Reference tables seeded");
    Ok(())
}
