//! vigil-server - screening and therapy backend

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use vigil_server::config::Config;
use vigil_server::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();

    info!("Starting vigil-server v{}", env!("CARGO_PKG_VERSION"));
    if config.uses_dev_secret() {
        warn!("Using built-in development JWT secret; set VIGIL_JWT_SECRET in production");
    }

    info!("Database path: {}", config.database.display());
    let pool = db::init_database(&config.database).await?;

    let state = AppState::new(pool, &config.jwt_secret);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("vigil-server listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
