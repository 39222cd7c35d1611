//! GovMatch Server - HTTP REST API for the matching engine
//!
//! This crate provides a production-ready HTTP server over the GovMatch
//! pipeline. It supports:
//!
//! - **Synchronous matching**: evaluate one opportunity/company pair inline
//!   or by stored ids
//! - **Batch jobs**: submit, poll, health-check, and cancel batch scoring runs
//! - **Schedules**: cron and one-shot triggers for recurring batch jobs
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Features
//!
//! - **Authentication**: API key-based authentication with rate limiting
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: Environment variable and file-based configuration
//! - **Error Handling**: Error responses with stable error codes
//! - **Graceful Shutdown**: Signal handling that stops the background workers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
