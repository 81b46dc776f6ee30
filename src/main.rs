//! SnakeSafe server.
//!
//! # Endpoints
//!
//! - `GET /` - Landing page
//! - `GET /snakebite`, `GET /api/hospitals` - Nearest hospitals
//! - `GET /rescue`, `GET /api/rescuers` - Nearest snake rescuers
//! - `POST /predict` - Identify a snake from a photo
//! - `POST /submit_request` - Ask for help
//! - `GET /dashboard`, `POST /delete_request/:id` - Operator views
//! - `GET|POST /login`, `GET /logout` - Sessions
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use snakesafe::api::{AppState, router};
use snakesafe::auth::session_key;
use snakesafe::classifier::SpeciesClassifier;
use snakesafe::config::Config;
use snakesafe::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Passwords, cookies, and requester details are never logged at any level.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("snakesafe=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(
        port = config.port,
        db_url = %config.database_url,
        model_path = %config.model_path.display(),
        "Starting SnakeSafe server"
    );

    let storage = Storage::new(&config.database_url)
        .await
        .context("failed to open database")?;
    info!("Database initialized");

    let classifier = load_classifier(&config.model_path)?;
    info!("Species classifier loaded");

    let state = AppState {
        storage,
        classifier,
        session_key: session_key(&config.secret_key),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "SnakeSafe is listening");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "onnx")]
fn load_classifier(path: &Path) -> anyhow::Result<SpeciesClassifier> {
    use std::sync::Arc;

    use snakesafe::classifier::OnnxModel;

    let model = OnnxModel::load(path)
        .with_context(|| format!("failed to load model from {}", path.display()))?;
    Ok(SpeciesClassifier::new(Arc::new(model)))
}

#[cfg(not(feature = "onnx"))]
fn load_classifier(_path: &Path) -> anyhow::Result<SpeciesClassifier> {
    anyhow::bail!("built without a model backend; enable the `onnx` feature")
}
