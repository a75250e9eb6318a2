//! Faceguard Server - HTTP gate for signed camera frames
//!
//! Endpoints:
//! - POST /upload  - Submit a signed frame, receive an access verdict
//! - GET  /archive - List recent verdicts
//! - GET  /health, GET /ready
//! - GET  /swagger-ui - API documentation

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use faceguard_core::{
    AccessDecider, ExtractorFactory, FileIndexStore, FilesystemArchive, IdentityIndex,
    IndexStore, PipelineConfig, SignatureVerifier,
};
use faceguard_server::{create_router_with_config, spawn_index_reloader, AppState, Config};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!(error = %message, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let pipeline = PipelineConfig::from_env().map_err(|e| e.to_string())?;
    let config = Config::from_env();

    let extractor =
        ExtractorFactory::create(pipeline.extractor.clone()).map_err(|e| e.to_string())?;
    let policy = pipeline.policy().map_err(|e| e.to_string())?;

    // Load the persisted index; a missing or incompatible index keeps the
    // gate up but every submission fails closed until a rebuild lands.
    let store: Arc<dyn IndexStore> = Arc::new(FileIndexStore::new(&pipeline.index_dir));
    let index = Arc::new(IdentityIndex::unloaded());
    if let Err(e) = index.reload_from(store.as_ref(), &pipeline.collection) {
        tracing::warn!(error = %e, "No identity index loaded at startup");
    }

    let archive = Arc::new(FilesystemArchive::new(&pipeline.archive_dir));
    let decider = AccessDecider::new(
        SignatureVerifier::new(pipeline.secret.clone()),
        extractor,
        Arc::clone(&index),
        policy,
        pipeline.distance_metric,
    )
    .with_archive(archive.clone(), pipeline.archive_folder.clone());

    if let Ok(snapshot) = index.snapshot() {
        if let Err(e) = snapshot.metadata().ensure_matches(&decider.profile()) {
            tracing::error!(error = %e, "Loaded identity index does not match the gate configuration");
        }
    }

    tracing::info!(
        model = %decider.profile().embedding_model,
        metric = %pipeline.distance_metric,
        threshold = pipeline.distance_threshold,
        collection = %pipeline.collection,
        index_dir = %pipeline.index_dir.display(),
        archive_dir = %pipeline.archive_dir.display(),
        "Gate configured"
    );

    let reloader = (config.index_reload_secs > 0).then(|| {
        spawn_index_reloader(
            Arc::clone(&index),
            Arc::clone(&store),
            pipeline.collection.clone(),
            Duration::from_secs(config.index_reload_secs),
        )
    });

    let state = AppState::new(Arc::new(decider), archive);
    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| format!("server error: {e}"))?;

    if let Some(reloader) = reloader {
        reloader.abort();
    }
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
