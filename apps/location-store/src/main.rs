use anyhow::{Context, Result};
use clap::Parser;
use location_store::config::Config;
use location_store::{cli, http, store};
use tokio::net::TcpListener;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,location_store=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind location-store listener on {addr}: port already in use. Stop the other service using this port or re-run with --bind to choose another address.",
            );
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to bind location-store listener on {addr}"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = Config::from_env()?.apply_args(&args);
    init_tracing()?;

    let store = store::spawn_store_thread(config.csv_path.clone())?;
    let app = http::router(http::HttpState { store });

    let listener = bind_listener(&config.http_bind).await?;
    tracing::info!(bind=%config.http_bind, csv=%config.csv_path.display(), "location-store HTTP listening");
    let http_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error=%err, "http server exited");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = http_handle => {}
    }

    Ok(())
}
