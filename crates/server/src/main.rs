//! memento server entry point.
//!
//! Boots the MCP server on stdio transport over the configured cache
//! database. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use anyhow::{Context, Result};
use memento_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(db_path = %config.db_path.display(), "Starting memento server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    db.ensure_initialized().await?;

    let handler = handler::MementoServer::new(db, config.default_page_size);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
