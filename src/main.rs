use std::sync::Arc;

use actix_multipart::form::MultipartFormConfig;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing::info;

use reclamoserv::config::Config;
use reclamoserv::db;
use reclamoserv::handlers;
use reclamoserv::storage::AttachmentStore;
use reclamoserv::token::TokenAuthority;
use reclamoserv::upload::scan::{ClamdScanner, DisabledScanner, MalwareScanner};
use reclamoserv::upload::sniff::MagicSniffer;
use reclamoserv::upload::{UploadPipeline, MAX_FILES_PER_REQUEST, MAX_FILE_BYTES};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut _guard = None;

    if std::env::var("SERVER_LOG").unwrap_or_default() == "true" {
        let file_appender = tracing_appender::rolling::RollingFileAppender::new(
            tracing_appender::rolling::Rotation::DAILY,
            "./logs",
            "reclamoserv.log",
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::writer::MakeWriterExt::and(
                non_blocking,
                std::io::stdout,
            ))
            .with_file(true)
            .with_line_number(true)
            .with_env_filter("info,actix_server=warn,actix_http::h1::dispatcher=off")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%dT%H:%M:%S".to_string(),
            ))
            .init();

        _guard = Some(guard);
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stdout)
            .with_file(true)
            .with_line_number(true)
            .with_env_filter("info,actix_server=warn,actix_http::h1::dispatcher=off")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%dT%H:%M:%S".to_string(),
            ))
            .init();
    }

    let config = Config::from_env();

    let db_pool = db::init::init_db(&config.database_url).expect("Failed to initialize database");
    db::init::run_migrations(&db_pool).expect("Failed to run database migrations");
    db::init::seed_reference_data(&db_pool).expect("Failed to seed reference data");
    tracing::info!("Database initialized at {}", config.database_url);

    if config.auth_disabled {
        tracing::warn!("AUTH_DISABLED=true: bearer checks are bypassed on every route");
    }

    let scanner: Arc<dyn MalwareScanner> = match &config.clamd_addr {
        Some(addr) => {
            tracing::info!("Malware scanning via clamd at {}", addr);
            Arc::new(ClamdScanner::new(addr, config.scan_timeout))
        }
        None => {
            tracing::warn!("CLAMD_ADDR not set: malware scanning is DISABLED");
            Arc::new(DisabledScanner)
        }
    };

    let pipeline = web::Data::new(UploadPipeline::new(Arc::new(MagicSniffer), scanner));
    let store = web::Data::new(
        AttachmentStore::new(&config.content_root).expect("Failed to create content root"),
    );
    let authority = web::Data::new(TokenAuthority::new(
        &config.token_secret,
        &config.token_ttl,
    ));
    let db_data = web::Data::new(db_pool);
    let config_data = web::Data::new(config.clone());

    let bind_addr = config.bind_addr.clone();
    info!("Server starting on http://{}/", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(authority.clone())
            .app_data(db_data.clone())
            .app_data(pipeline.clone())
            .app_data(store.clone())
            .app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
            // Room for a full batch at the per-file ceiling plus form overhead.
            .app_data(
                MultipartFormConfig::default()
                    .total_limit((MAX_FILES_PER_REQUEST + 1) * MAX_FILE_BYTES)
                    .memory_limit((MAX_FILES_PER_REQUEST + 1) * MAX_FILE_BYTES),
            )
            .wrap(Logger::default())
            .service(handlers::configure_routes())
    })
    .bind(bind_addr)?
    .run()
    .await
}
