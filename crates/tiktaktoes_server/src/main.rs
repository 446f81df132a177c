//! tiktaktoes - game server binary

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use axum::{body::Body, http::Request};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use tiktaktoes_server::{AppState, ServerConfig, router};
use tower::ServiceBuilder;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::Config { config } => print_config(config),
    }
}

/// Run the HTTP game server
#[instrument]
async fn run_server(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    initialize_tracing();

    let config = ServerConfig::load(config_path.as_deref())?.with_overrides(host, port);
    info!(?config, "Starting tiktaktoes server");

    let state = AppState::from_config(&config);
    let app = router(state).layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
        debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
        req
    }));

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(addr = %listener.local_addr()?, "Server ready");
    info!("Routes: /api/game, /ws/{{id}}, /sse/{{id}}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Print the effective configuration
fn print_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = ServerConfig::load(config_path.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tiktaktoes_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
