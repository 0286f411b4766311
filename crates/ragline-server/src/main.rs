//! Ragline — retrieval-augmented QA server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ragline_core::RaglineConfig;
use ragline_infer::OllamaClient;
use ragline_server::{build_router, indexing, state, AppState};
use ragline_store::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RaglineConfig::from_env()?;
    let port = config.port;
    info!("Data directory: {}", config.db_dir().display());
    info!(
        "Backend {} (generation {}, embedding {}, dim {})",
        config.backend.host,
        config.backend.generation_model,
        config.backend.embedding_model,
        config.embedding_dim
    );

    let store = DocumentStore::open(config.db_dir(), config.embedding_dim)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let backend = Arc::new(OllamaClient::new(
        &config.backend.host,
        &config.backend.generation_model,
    )?);
    let index = state::connect_index(&config.index)?;

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store),
        backend.clone(),
        backend,
        index,
    ));

    indexing::start_reconcile_worker(state.clone());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Ragline server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
