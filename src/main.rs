use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod repository;
mod routes;
mod service;
mod utils;

use config::Config;
use db::{ensure_schema, init_db};

use crate::clock::SystemClock;
use crate::docs::ApiDoc;
use crate::repository::mysql::MySqlStore;
use crate::repository::{AttendanceLedger, ScheduleCatalog, StudentDirectory};
use crate::service::recorder::AttendanceRecorder;
use crate::service::report::ReportAggregator;
use crate::service::sweeper::AbsenceSweeper;
use crate::utils::schedule_cache::CachedScheduleCatalog;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "School attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    ensure_schema(&pool).await?;

    let store = Arc::new(MySqlStore::new(pool));
    let catalog: Arc<dyn ScheduleCatalog> = Arc::new(CachedScheduleCatalog::new(
        store.clone(),
        config.session_cache_ttl(),
    ));
    let students: Arc<dyn StudentDirectory> = store.clone();
    let ledger: Arc<dyn AttendanceLedger> = store;
    let clock = Arc::new(SystemClock::new(config.utc_offset()?));

    let recorder = Data::new(AttendanceRecorder::new(
        catalog.clone(),
        students.clone(),
        ledger.clone(),
        clock.clone(),
    ));
    let reports = Data::new(ReportAggregator::new(
        catalog.clone(),
        students.clone(),
        ledger.clone(),
    ));
    let sweeper = Arc::new(AbsenceSweeper::new(
        catalog,
        students,
        ledger,
        clock,
        config.sweep_grace_minutes,
    ));
    let sweeper_handle = sweeper.clone().spawn(config.sweep_interval());
    let sweeper = Data::from(sweeper);

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(recorder.clone())
            .app_data(sweeper.clone())
            .app_data(reports.clone())
            .service(index)
            // Protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run();

    let result = server.await;

    sweeper_handle.stop().await;
    info!("Server stopped");

    result.context("HTTP server failed")
}
