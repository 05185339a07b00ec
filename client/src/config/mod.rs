//! Configuration management

use anyhow::{Context, Result};
use protocol::DISCOVERY_PORT;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Where a loaded [`Config`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub strategy: StrategyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub client_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub port: u16,
    /// How long one attempt listens for an offer
    pub timeout_sec: u64,
    /// 0 keeps listening until an offer arrives
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub read_timeout_sec: u64,
    pub connect_timeout_sec: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    DealerMirror,
    Threshold,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Only used by `threshold`: stand once the hand reaches this total
    pub stand_on: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            client_name: "DragonLion".to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            timeout_sec: 5,
            max_attempts: 0,
            retry_delay_ms: 2000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout_sec: 30,
            connect_timeout_sec: 10,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::DealerMirror,
            stand_on: protocol::DEALER_STAND_THRESHOLD,
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

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl SessionConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_sec)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_sec)
    }
}

impl Config {
    /// Load from `path`, or fall back to defaults if the file does not exist.
    ///
    /// Runs before logging is set up, so the caller reports the source.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();
        let (config, source) = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config =
                toml::from_str(&contents).with_context(|| "Failed to parse config file")?;
            (config, ConfigSource::File)
        } else {
            (Config::default(), ConfigSource::Defaults)
        };

        config.validate()?;
        Ok((config, source))
    }

    fn validate(&self) -> Result<()> {
        if self.general.client_name.is_empty() {
            anyhow::bail!("client_name must not be empty");
        }
        if self.discovery.timeout_sec == 0 {
            anyhow::bail!("discovery.timeout_sec must be greater than 0");
        }
        if self.session.read_timeout_sec == 0 || self.session.connect_timeout_sec == 0 {
            anyhow::bail!("session timeouts must be greater than 0");
        }
        Ok(())
    }
}
