//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (auth, logging, compression, etc.)
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{api_key_auth, log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{batch, health, matching, schedules};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Routes are divided into:
/// - Public routes: /, /health, /ready, /metrics (no auth required)
/// - Protected routes: All /api/v1/* endpoints (API key required)
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    // Protected routes (require API key)
    let protected_routes = Router::new()
        // Matching
        .route("/api/v1/match", post(matching::evaluate))
        .route("/api/v1/match/by-id", post(matching::evaluate_by_id))
        .route("/api/v1/matches/{company_id}", get(matching::top_matches))
        .route(
            "/api/v1/companies/{company_id}/invalidate",
            post(matching::invalidate_company),
        )
        // Batch jobs
        .route("/api/v1/batch", post(batch::submit))
        .route("/api/v1/jobs/{job_id}", get(batch::job_status))
        .route("/api/v1/jobs/{job_id}/health", get(batch::job_health))
        .route("/api/v1/jobs/{job_id}/cancel", post(batch::cancel_job))
        // Schedules
        .route("/api/v1/schedules", get(schedules::list))
        .route("/api/v1/schedules/{name}", put(schedules::upsert))
        .route("/api/v1/schedules/{name}", get(schedules::get))
        .route("/api/v1/schedules/{name}", delete(schedules::delete))
        .route("/api/v1/schedules/{name}/trigger", post(schedules::trigger))
        // Add auth middleware
        .layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the GovMatch HTTP server
///
/// Initializes structured logging and the Prometheus recorder, builds the
/// shared state (engine, coordinator, workers, schedule loop), and serves
/// until SIGTERM or Ctrl+C.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .json()
        .init();

    let metrics_handle = if config.metrics_enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let mut state = ServerState::new(config.clone())?;
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }
    let state = Arc::new(state);

    let app = build_router(Arc::clone(&state));
    let addr: SocketAddr = config.listen_addr()?;

    tracing::info!(
        %addr,
        workers = config.worker_count,
        rate_limit = config.rate_limit_per_minute,
        "Starting GovMatch server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
