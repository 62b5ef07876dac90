//! subdx MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use subdx_client::{CacheTtls, CinemetaClient, SubdivxClient, SubtitleService};
use subdx_core::{AppConfig, CacheDb, Memoizer};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), base_url = %config.base_url, "Starting subdx server on stdio transport");

    let memoizer = Memoizer::new(CacheDb::open(&config.db_path).await?);
    let service = SubtitleService::new(
        memoizer.clone(),
        Arc::new(CinemetaClient::from_config(&config)?),
        Arc::new(SubdivxClient::from_config(&config)?),
        CacheTtls::from(&config),
    );

    let handler = handler::SubdxServer::new(service);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    let outcome = server.waiting().await;

    memoizer.close().await?;
    tracing::info!("cache store closed");

    outcome?;
    Ok(())
}
