//! Client configuration
//!
//! `ClientConfig` carries the pool limits, connection retry policy, and the
//! optional migration-script directory. Every field has a default, so a
//! plain `ClientConfig::default()` works for most embedded use cases, and
//! builder-style setters cover the rest.
//!
//! Configuration can also be loaded from `config/config.toml` plus
//! `TIDEPOOL`-prefixed environment variables (separator `__`, section
//! `database`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Idle connections parked in the pool
    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: usize,
    /// Total open connections (minimum 1)
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: usize,
    /// Connections older than this are recycled at checkout
    #[serde(default = "default_conn_max_lifetime_seconds")]
    pub conn_max_lifetime_seconds: u64,
    /// Initial-open retry attempts
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Fixed delay between open retries
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum wait for a free pooled connection
    #[serde(default = "default_pool_timeout_seconds")]
    pub pool_timeout_seconds: u64,
    /// Migration script directory; presence of this path is the sole toggle
    /// enabling the migration runner
    #[serde(default)]
    pub migrations_dir: Option<PathBuf>,
}

fn default_max_idle_conns() -> usize {
    50
}

fn default_max_open_conns() -> usize {
    100
}

fn default_conn_max_lifetime_seconds() -> u64 {
    86_400 // 24 hours
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

fn default_pool_timeout_seconds() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_idle_conns: default_max_idle_conns(),
            max_open_conns: default_max_open_conns(),
            conn_max_lifetime_seconds: default_conn_max_lifetime_seconds(),
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            pool_timeout_seconds: default_pool_timeout_seconds(),
            migrations_dir: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn max_idle_conns(mut self, max_idle_conns: usize) -> Self {
        self.max_idle_conns = max_idle_conns;
        self
    }

    #[must_use]
    pub fn max_open_conns(mut self, max_open_conns: usize) -> Self {
        self.max_open_conns = max_open_conns;
        self
    }

    #[must_use]
    pub fn conn_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.conn_max_lifetime_seconds = lifetime.as_secs();
        self
    }

    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn pool_timeout(mut self, timeout: Duration) -> Self {
        self.pool_timeout_seconds = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(dir.into());
        self
    }

    /// Load the client configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        // Build configuration by reading the TOML file (optional) and environment variables
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("TIDEPOOL").separator("__"));

        // Try to build the configuration, handling missing or unreadable file
        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // If the file existed but was unreadable (parse error, permission issue, etc.), log a warning and retry with env only
                if std::path::Path::new("config/config.toml").exists() {
                    log::warn!("failed to load config file, falling back to env. Error: {err}");
                }
                // Retry using only environment variables as source
                Config::builder()
                    .add_source(Environment::with_prefix("TIDEPOOL").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        // Deserialize the configuration into our ClientConfig struct
        let client_config: ClientConfig = settings.get::<ClientConfig>("database").map_err(|e| {
            ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {}",
                e
            ))
        })?;

        Ok(client_config)
    }
}
