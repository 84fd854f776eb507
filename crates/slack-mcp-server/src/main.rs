//! Slack MCP gateway.
//!
//! Run with: cargo run -p slack-mcp-server
//!
//! Clients initialize a session at `POST /mcp` with an `x-slack-bot-token`
//! header and reuse it through the returned `mcp-session-id`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slack_mcp_client::SlackClientFactory;
use slack_mcp_core::ClientFactory;
use slack_mcp_session::SessionRegistry;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod routes;

use config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = args.bind_addr()?;

    let factory = SlackClientFactory::new(args.slack_api_url.clone(), args.upstream_timeout())
        .context("Failed to build Slack HTTP client")?;
    let registry = SessionRegistry::new(factory);
    let app = routes::create_router(Arc::clone(&registry));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(upstream = %args.slack_api_url, "Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then close every session so open event
/// streams end and the server can drain.
async fn shutdown_signal<F: ClientFactory>(registry: Arc<SessionRegistry<F>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received terminate signal, shutting down"),
    }

    registry.close_all().await;
}
