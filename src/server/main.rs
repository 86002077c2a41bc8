use anyhow::{Context, Result};
use scribe::history::HistoryStore;
use scribe::process::{OcrOrchestrator, ProcessorConfig};
use scribescan::common::utils::{init_logger_exe, load_dotenv, spawn_progress_logger};
use scribescan::service::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_logger_exe();

    log::info!("Starting server...");

    let config = ProcessorConfig::from_env();
    log::info!(
        "Cloud OCR configured: {}, default language: {}",
        config.remote.is_configured(),
        config.default_language
    );
    let orchestrator = OcrOrchestrator::from_config(&config);

    let history = match HistoryStore::open_default() {
        Ok(history) => history,
        Err(e) => {
            log::error!("Failed to open history database, keeping history in memory: {:#}", e);
            HistoryStore::open_in_memory()?
        }
    };

    let state = Arc::new(AppState::new(orchestrator, history));
    let app = router(state.clone());

    let port: u16 = match std::env::var("PORT") {
        Ok(port) => port.parse().with_context(|| format!("Invalid PORT value {:?}", port))?,
        Err(_) => 3000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Attempting to bind to port {}", port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!("Successfully bound to http://{}", addr);

    let reporter = spawn_progress_logger(state.orchestrator.subscribe());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    reporter.abort();
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::warn!("Ctrl-C received, stopping...");
}
