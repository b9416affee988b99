use anyhow::{Context, Result};
use clap::Parser;
use fitsync::{AppConfig, Cli, bootstrap, shutdown_signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::from(Cli::parse());

    let (store, router) = bootstrap(&config)
        .await
        .context("failed to open store")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .context("failed to bind listener")?;
    info!(
        addr = %config.bind_addr(),
        data_dir = ?config.data_dir,
        day_offset = %config.day_offset,
        "fitsync listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum serve error")?;

    let stats = store.stats().await;
    if stats.ops_since_snapshot > 0 {
        store
            .flush_snapshot()
            .await
            .context("failed to write final snapshot")?;
    }
    info!(%stats, "fitsync stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fitsync=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
