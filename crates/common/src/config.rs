//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Path to the symmetric key file used to sign session tokens (C1)
    pub session_key_path: String,
    /// Session token lifetime in seconds (default 24h)
    pub session_token_lifetime_secs: i64,
    /// Max idle age before a session is garbage-collected, in seconds
    pub session_max_idle_secs: i64,
    /// Interval between session GC sweeps, in seconds
    pub session_gc_interval_secs: u64,

    /// Scheduler backend: "http" (cluster manager over REST) or "mock"
    pub scheduler_provider: String,
    /// Base URL of the external scheduler (HTTP backend only)
    pub scheduler_base_url: String,
    /// Path prefix for submit/cancel calls, e.g. `/slurm/v0.0.40`
    pub scheduler_submit_path: String,
    /// Path prefix for status queries, e.g. `/slurm/v0.0.40`
    pub scheduler_api_path: String,
    /// Path to the symmetric key file used to sign the scheduler's own
    /// credential (HTTP backend only)
    pub scheduler_key_path: String,
    /// Scheduler credential lifetime in seconds (default 24h)
    pub scheduler_token_lifetime_secs: i64,
    /// Scheduler credential refresh interval in seconds (default 12h)
    pub scheduler_token_refresh_secs: u64,
    /// Per-call timeout to the scheduler, in seconds
    pub scheduler_call_timeout_secs: u64,

    /// Base directory for dataset content and per-job artifacts
    pub data_dir: String,

    /// Interval between Status Monitor reconciliation ticks, in seconds
    pub monitor_interval_secs: u64,

    /// Runtime configuration
    pub log_level: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            session_key_path: env::var("SESSION_KEY_PATH")
                .unwrap_or_else(|_| "./data/session.key".to_string()),
            session_token_lifetime_secs: env::var("SESSION_TOKEN_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24 * 3600),
            session_max_idle_secs: env::var("SESSION_MAX_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30 * 24 * 3600),
            session_gc_interval_secs: env::var("SESSION_GC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),

            scheduler_provider: env::var("SCHEDULER_PROVIDER")
                .unwrap_or_else(|_| "mock".to_string()),
            scheduler_base_url: env::var("SCHEDULER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:6820".to_string()),
            scheduler_submit_path: env::var("SCHEDULER_SUBMIT_PATH")
                .unwrap_or_else(|_| "/slurm/v0.0.40".to_string()),
            scheduler_api_path: env::var("SCHEDULER_API_PATH")
                .unwrap_or_else(|_| "/slurm/v0.0.40".to_string()),
            scheduler_key_path: env::var("SCHEDULER_KEY_PATH")
                .unwrap_or_else(|_| "./data/scheduler.key".to_string()),
            scheduler_token_lifetime_secs: env::var("SCHEDULER_TOKEN_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24 * 3600),
            scheduler_token_refresh_secs: env::var("SCHEDULER_TOKEN_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12 * 3600),
            scheduler_call_timeout_secs: env::var("SCHEDULER_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),

            monitor_interval_secs: env::var("MONITOR_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_loads_successfully() {
        env::set_var("DATABASE_URL", "postgres://localhost/phylo_test");
        env::set_var("SCHEDULER_PROVIDER", "mock");

        let config = Config::from_env().expect("config should load with DATABASE_URL set");

        assert_eq!(config.database_url, "postgres://localhost/phylo_test");
        assert_eq!(config.scheduler_provider, "mock");
        assert!(config.port > 0, "PORT should be a valid port number");

        env::remove_var("DATABASE_URL");
        env::remove_var("SCHEDULER_PROVIDER");
    }

    #[test]
    #[serial]
    fn test_config_from_env_requires_database_url() {
        env::remove_var("DATABASE_URL");
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_defaults_applied_when_unset() {
        env::set_var("DATABASE_URL", "postgres://localhost/phylo_test");
        env::remove_var("SCHEDULER_PROVIDER");
        env::remove_var("SESSION_TOKEN_LIFETIME_SECS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.scheduler_provider, "mock");
        assert_eq!(config.session_token_lifetime_secs, 24 * 3600);
        assert_eq!(config.monitor_interval_secs, 10);

        env::remove_var("DATABASE_URL");
    }
}
