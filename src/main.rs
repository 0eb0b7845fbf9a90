mod config;
mod database;
mod error;
mod handlers;
mod models;
mod monitor;
mod query;
mod utils;

use axum::{routing::get, Router};
use dotenvy::dotenv;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::Config;
use database::{create_database_pool, PgSource, ProductionSource};
use handlers::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let pool = create_database_pool(&config.database_url, config.max_connections).await?;
    let source = PgSource::new(pool, config.db_schema.clone());

    // Warm the ledger column cache before the first request
    let ledger = source.ledger_columns().await;
    log::info!(
        "Phase ledger columns: {} / {}",
        ledger.order,
        ledger.quantity
    );

    let state = AppState::new(Arc::new(source), config.scope);
    let app = create_router(state, &config.static_dir);

    log::info!("Production monitor listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/api/data", get(handlers::monitor::data))
        .route("/api/garland_data", get(handlers::monitor::garland_data))
        .route("/api/completed", get(handlers::monitor::completed))
        .route("/api/returns", get(handlers::monitor::returns))
        .route("/api/export", get(handlers::export::export))
        // Static files
        .nest_service("/static", ServeDir::new(static_dir))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
