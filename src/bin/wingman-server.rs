// ABOUTME: Server binary for the Wingman reply-orchestration service
// ABOUTME: Loads configuration, wires resources and serves the HTTP routes until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Wingman Server Binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use wingman_server::config::ServerConfig;
use wingman_server::logging::LoggingConfig;
use wingman_server::resources::ServerResources;
use wingman_server::routes;

#[derive(Parser)]
#[command(name = "wingman-server")]
#[command(about = "Wingman - streaming reply suggestions for chat apps")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    LoggingConfig::from_env().init()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!(
        environment = ?config.environment,
        database = %config.database_url,
        "Starting Wingman server"
    );

    let resources = Arc::new(ServerResources::from_config(&config).await?);
    let router = routes::router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");
    info!("   Analyze:        POST http://{addr}/api/analyze");
    info!("   Suggestions:    POST http://{addr}/api/suggestions");
    info!("   Conversations:  POST http://{addr}/api/conversations");
    info!("   Health:         GET  http://{addr}/health");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(routes::shutdown_signal())
        .await
    {
        error!("Server error: {e}");
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}
