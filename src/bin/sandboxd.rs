use sandbox_core::config::AppConfig;
use sandbox_core::http::{router, AppState};
use std::net::SocketAddr;

/// Built with a manually-sized multi-thread runtime, not `#[tokio::main]`,
/// because `server.workers` only becomes known once the config file has
/// been read (after the runtime would otherwise already exist).
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sandboxd=info,sandbox_core=info".to_string()),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load();
    tracing::info!(
        port = config.server.port,
        workers = config.server.workers,
        max_concurrent_requests = config.server.max_concurrent_requests,
        max_queue_size = config.server.max_queue_size,
        "sandboxd starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let port = config.server.port;
    let state = AppState::new(&config);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
