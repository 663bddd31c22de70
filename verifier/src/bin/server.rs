//! Verifier server
//!
//! Serves the ticket index and check-in API.
//!
//! # Usage
//!
//! ```bash
//! PORT=2122 RUST_LOG=info,ticketchain=debug cargo run --bin verifier
//! ```

use anyhow::Context;
use ticketchain_verifier::{Config, RecordStore, build_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "Verifier listening");

    axum::serve(listener, build_router(RecordStore::new()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gracefully...");
        })
        .await
        .context("server error")?;

    tracing::info!("Verifier stopped");
    Ok(())
}
