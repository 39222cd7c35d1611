//! GovMatch Server - HTTP REST API for opportunity/company matching
//!
//! This binary serves the matching engine and batch orchestrator over REST
//! with authentication and rate limiting.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
