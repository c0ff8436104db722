//! Main entry point for the Image Generation Relay

use anyhow::Context;
use gen_image_relay::{
    api,
    config::{LoggingConfig, Settings},
    orchestrator::{Orchestrator, OrchestratorConfig},
    provider::leonardo::LeonardoProvider,
    storage::{auth::ServiceAccountTokenSource, gcs::GcsStore},
    transport::RetryingClient,
    AppState,
};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    init_tracing(&settings.logging)?;
    settings.validate()?;

    info!("Starting Image Generation Relay");
    info!(
        "Loaded configuration: server={}:{}, bucket={}",
        settings.server.host, settings.server.port, settings.storage.bucket
    );

    tokio::fs::create_dir_all(&settings.storage.scratch_dir)
        .await
        .with_context(|| format!("creating scratch directory {}", settings.storage.scratch_dir))?;

    // One outbound client for the provider and the store
    let http = RetryingClient::from_config(
        &settings.transport,
        Duration::from_secs(settings.provider.request_timeout_secs),
    )?;

    let provider = Arc::new(LeonardoProvider::new(http.clone(), &settings.provider));

    let credentials_path = settings
        .storage
        .credentials_path
        .as_deref()
        .context("storage credentials are required (set GOOGLE_APPLICATION_CREDENTIALS)")?;
    let tokens = Arc::new(
        ServiceAccountTokenSource::from_file(http.clone(), credentials_path)
            .context("Google Cloud Storage initialization failed")?,
    );
    let store = Arc::new(GcsStore::new(http, tokens, &settings.storage)?);

    let orchestrator = Orchestrator::new(
        provider,
        store,
        OrchestratorConfig::new(&settings.polling, settings.storage.folder.clone()),
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = Arc::new(AppState::new(orchestrator));

    // Build the router
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match logging.file.as_deref().filter(|path| !path.trim().is_empty()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if logging.format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }

    Ok(())
}
