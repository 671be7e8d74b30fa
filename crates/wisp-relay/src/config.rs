//! Layered configuration: built-in defaults, optional TOML file, then
//! environment variable overrides — checked in that order, matching the
//! precedence a deployed relay actually wants (env vars win at the edge).

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse environment variable {name}: {source}")]
    Env {
        name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    pub per_token_cap: usize,
    pub sweep_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid default address"),
            per_token_cap: crate::store::DEFAULT_PER_TOKEN_CAP,
            sweep_interval_secs: 60,
            request_timeout_secs: 10,
        }
    }
}

impl RelayConfig {
    /// Load defaults, then a TOML file at `RELAY_CONFIG_PATH` if set, then
    /// `HOST`/`PORT`/`RELAY_*` environment overrides, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
            config = Self::from_toml(&path)?;
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let host = std::env::var("HOST").ok();
        let port = std::env::var("PORT").ok();
        if host.is_some() || port.is_some() {
            let host = host.unwrap_or_else(|| self.bind_addr.ip().to_string());
            let port = match port {
                Some(p) => p.parse().map_err(|e| ConfigError::Env {
                    name: "PORT",
                    source: Box::new(e),
                })?,
                None => self.bind_addr.port(),
            };
            self.bind_addr = format!("{host}:{port}").parse().map_err(|_| {
                ConfigError::Invalid(format!("invalid HOST/PORT combination: {host}:{port}"))
            })?;
        }

        if let Ok(cap) = std::env::var("RELAY_PER_TOKEN_CAP") {
            self.per_token_cap = cap.parse().map_err(|e| ConfigError::Env {
                name: "RELAY_PER_TOKEN_CAP",
                source: Box::new(e),
            })?;
        }

        if let Ok(secs) = std::env::var("RELAY_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = secs.parse().map_err(|e| ConfigError::Env {
                name: "RELAY_SWEEP_INTERVAL_SECS",
                source: Box::new(e),
            })?;
        }

        if let Ok(secs) = std::env::var("RELAY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|e| ConfigError::Env {
                name: "RELAY_REQUEST_TIMEOUT_SECS",
                source: Box::new(e),
            })?;
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.per_token_cap == 0 {
            return Err(ConfigError::Invalid("per_token_cap must be > 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be > 0".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_validate() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_cap_is_rejected() {
        let mut config = RelayConfig::default();
        config.per_token_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn host_and_port_env_override_bind_addr() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("HOST", "127.0.0.1");
        std::env::set_var("PORT", "9100");

        let mut config = RelayConfig::default();
        config.apply_env().unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9100".parse().unwrap());

        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
    }
}
