use anyhow::Context;
use dotenvy::dotenv;
use lesson_hls::{app, config::settings::AppConfig, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("invalid configuration")?;
    let port = config.server_port;
    info!(
        upload_dir = %config.upload_dir.display(),
        workers = config.max_concurrent_transcodes,
        renditions = config.renditions.len(),
        "Configuration loaded"
    );

    let state = AppState::from_config(config)
        .await
        .context("failed to prepare upload directory")?;

    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    info!("App is listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
