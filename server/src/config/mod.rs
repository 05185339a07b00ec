//! Server configuration

use anyhow::{Context, Result};
use protocol::DISCOVERY_PORT;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub server_name: String,
    pub bind_address: String,
    /// 0 lets the OS pick; the chosen port is advertised in every offer
    pub tcp_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub port: u16,
    pub broadcast_address: Ipv4Addr,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub request_timeout_sec: u64,
    pub decision_timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            server_name: "DragonLion".to_string(),
            bind_address: "0.0.0.0".to_string(),
            tcp_port: 0,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            broadcast_address: Ipv4Addr::BROADCAST,
            interval_ms: 1000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_sec: 30,
            decision_timeout_sec: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_sec)
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.general.server_name.is_empty() {
            anyhow::bail!("server_name must not be empty");
        }
        if self.discovery.interval_ms == 0 {
            anyhow::bail!("discovery.interval_ms must be greater than 0");
        }
        if self.session.request_timeout_sec == 0 || self.session.decision_timeout_sec == 0 {
            anyhow::bail!("session timeouts must be greater than 0");
        }
        Ok(())
    }
}
