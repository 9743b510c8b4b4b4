//! Clinic prescription service
//!
//! Main entry point for the clinic record-keeping server.

use actix_cors::Cors;
use actix_files as fs;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use rxclinic::api::{self, AppState};
use rxclinic::{config, db};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;

    // Connect to database
    let database = db::Database::connect(&config.database.url)
        .await
        .context("failed to connect to database")?;

    // Run migrations
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;

    // Generated prescription documents are served straight from this
    // directory.
    let uploads_dir = config.storage.uploads_path();
    std::fs::create_dir_all(&uploads_dir).context("failed to create uploads directory")?;

    // Create app state
    let state = web::Data::new(AppState {
        db: database,
        clinic: config.clinic.clone(),
        storage: config.storage.clone(),
    });

    tracing::info!(host = %config.server.host, port = config.server.port, "starting server");

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            // Add app state
            .app_data(state.clone())
            // Request logging
            .wrap(TracingLogger::default())
            // The browser pages are served from elsewhere
            .wrap(Cors::permissive())
            // API routes
            .configure(api::configure)
            // Generated PDFs
            .service(fs::Files::new("/uploads", uploads_dir.clone()))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
