use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, warn};

use tts_core::{OnnxModelLoader, TtsManager};
use tts_server::{build_router, config::ServerConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting Waitau/Hakka TTS server...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, model_dir={}, preload={:?}",
        config.port,
        config.model_dir.display(),
        config.preload_models.iter().map(|k| k.to_string()).collect::<Vec<_>>()
    );

    if !config.model_dir.join(tts_core::engine::CONFIG_FILE).exists() {
        warn!(
            "No {} in {}; synthesis requests will fail until models are installed",
            tts_core::engine::CONFIG_FILE,
            config.model_dir.display()
        );
    }

    let loader = OnnxModelLoader::new(&config.model_dir, config.intra_threads);
    let tts = Arc::new(TtsManager::new(Arc::new(loader)));

    if !config.preload_models.is_empty() {
        info!("Preloading {} model(s)...", config.preload_models.len());
        let tts = tts.clone();
        let keys = config.preload_models.clone();
        let preload = tokio::task::spawn_blocking(move || tts.cache().preload(&keys)).await?;
        if let Err(e) = preload {
            warn!("Preloading stopped: {e}. Remaining models load on first request.");
        }
    }

    let state = AppState::new(tts, config.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
