//! Server configuration.
//!
//! Settings are layered, last source wins: built-in defaults, an optional
//! `govmatch` config file in the working directory, then `GOVMATCH_SERVER__*`
//! environment variables (a `.env` file is honored in development). The
//! `engine` and `batch` sections feed straight into [`crate::state::ServerState`],
//! so every orchestrator budget and batch tunable can be set per deployment
//! without touching code.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use batch::BatchConfig;
use engine::EngineConfig;

/// Development fallback key installed when no real keys are configured.
const DEMO_API_KEY: &str = "demo-key-12345";

/// Runtime settings for the HTTP server and its background workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface the listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whole-request deadline enforced by the timeout layer.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Request body cap; inline match requests carry full entities, so this
    /// stays generous.
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,
    /// Per-key request allowance per minute.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    /// Accepted API keys. Left empty, a demo key is installed so local
    /// development works out of the box.
    #[serde(default)]
    pub api_keys: HashSet<String>,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    /// `tracing` env-filter directive for the subscriber.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Expose Prometheus metrics at `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Match workers pulling from the shared work queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// How often the schedule manager sweeps for due entries.
    #[serde(default = "default_schedule_tick_secs")]
    pub schedule_tick_secs: u64,
    /// Orchestrator budgets, cache TTLs, confidence thresholds.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Batch coordination: default sizes, in-flight ceiling, failure cutoff.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            worker_count: default_worker_count(),
            schedule_tick_secs: default_schedule_tick_secs(),
            engine: EngineConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve configuration from defaults, file, and environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let layered = config::Config::builder()
            .add_source(config::File::with_name("govmatch").required(false))
            .add_source(config::Environment::with_prefix("GOVMATCH_SERVER").separator("__"))
            .build()?;
        let mut resolved: ServerConfig = layered.try_deserialize()?;
        resolved.validate()?;

        if resolved.api_keys.is_empty() {
            tracing::warn!("no API keys configured; installing demo key {DEMO_API_KEY:?}");
            resolved.api_keys.insert(DEMO_API_KEY.to_string());
        }
        Ok(resolved)
    }

    /// Reject configurations the server cannot run with. The embedded engine
    /// section carries its own validation.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_count == 0 {
            anyhow::bail!("worker_count must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("rate_limit_per_minute must be at least 1");
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Address the listener binds to.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn schedule_tick(&self) -> Duration {
        Duration::from_secs(self.schedule_tick_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_worker_count() -> usize {
    2
}

fn default_schedule_tick_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_and_carry_pipeline_sections() {
        let cfg = ServerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.worker_count, 2);
        // Pipeline sections default to the same values the crates ship with.
        assert_eq!(cfg.engine.orchestrator_budget_ms, 5_000);
        assert_eq!(cfg.batch.batch_size_default, 50);
    }

    #[test]
    fn listen_addr_combines_host_and_port() {
        let cfg = ServerConfig {
            bind_addr: "127.0.0.1".into(),
            port: 9900,
            ..Default::default()
        };
        let addr = cfg.listen_addr().unwrap();
        assert_eq!(addr.port(), 9900);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn zero_workers_rejected() {
        let cfg = ServerConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_engine_section_fails_validation() {
        let mut cfg = ServerConfig::default();
        cfg.engine.scorer_pool_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn body_and_timeout_conversions() {
        let cfg = ServerConfig {
            timeout_secs: 5,
            max_body_size_mb: 2,
            ..Default::default()
        };
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.max_body_size(), 2 * 1024 * 1024);
    }
}
