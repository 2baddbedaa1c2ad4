use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pdfquiz_pdf_mupdf::MupdfBackend;
use pdfquiz_web::{AppState, GeminiFactory, router, session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = pdfquiz_core::config_file::load_config().with_env();
    tracing::info!(
        model = config.model_name(),
        max_upload_bytes = config.max_upload_bytes(),
        "configuration loaded"
    );

    let state = Arc::new(AppState::from_config(
        &config,
        Arc::new(MupdfBackend::new()),
        Arc::new(GeminiFactory::new(config.clone())),
    ));

    // Idle sessions hold document text; sweep them regularly
    let sweep_every = config.session_ttl().min(Duration::from_secs(300));
    tokio::spawn(session::sweep_expired(Arc::clone(&state), sweep_every));

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.bind_addr()))?;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
