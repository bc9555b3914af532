use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod config;
mod dashboard;
mod db;
mod engine;
mod predict;
mod props;
mod scheduler;
mod sources;
mod teams;

use config::Config;
use dashboard::AppState;
use engine::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = db::connect(
        config.postgres_url(),
        config.postgres_max_connections,
        &config.database_path,
    )
    .await?;

    let engine = Arc::new(Engine::new(config.clone(), db.clone())?);

    scheduler::start(engine.clone(), &config);

    let state = AppState {
        engine,
        db,
        env_label: config.env_label.clone(),
    };
    let app = dashboard::router(state);
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Prediction server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
