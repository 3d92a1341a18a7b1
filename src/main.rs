use antidoom::{load_data, router, AppState, Config};
use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let data = load_data(&config.data_path).await;
    info!(
        "loaded {} user documents from {}",
        data.users.len(),
        config.data_path.display()
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, data));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
