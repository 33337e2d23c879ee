use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

use blockmesh_core::{Mesher, Settings};
use blockmesh_gateway::{build_router, AppState};

#[tokio::main]
async fn main() {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run().await {
        error!("CRITICAL: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("blockMesh Gateway Initializing...");

    // 2. Load Settings
    let settings = Settings::from_env().context("Failed to load settings")?;

    // 3. Prepare the cases root
    tokio::fs::create_dir_all(&settings.cases_dir)
        .await
        .with_context(|| format!("Failed to create cases root {}", settings.cases_dir.display()))?;

    // 4. Define Routes
    let port = settings.port;
    let app = build_router(AppState::new(Mesher::new(settings)));

    // 5. Start Server
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!("Gateway listening on port {}...", port);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
