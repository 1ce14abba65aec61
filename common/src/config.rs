//! # Configuration
//!
//! The JSON descriptor read once at startup.
//!
//! ```json
//! {
//!   "mode": "targets",
//!   "interval": 60,
//!   "interface": "eth0",
//!   "mqtt": { "ip": "127.0.0.1", "port": 1883, "username": "user",
//!             "password": "secret", "topic": "presence", "client_id": "arpcast" },
//!   "targets": [ { "mac": "AA:BB:CC:DD:EE:FF", "identifier": "router" } ]
//! }
//! ```
//!
//! `scan` and `reconnect` sections are optional. The loaded [`Config`] is never
//! mutated afterwards; callers share it behind an `Arc`.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::network::mac::{self, MacParseError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("interval must be a positive number of seconds")]
    InvalidInterval,
    #[error("no network interface configured")]
    MissingInterface,
    #[error("invalid scan settings: {0}")]
    InvalidScan(&'static str),
    #[error("invalid reconnect settings: {0}")]
    InvalidReconnect(&'static str),
    #[error("target \"{identifier}\" has an invalid MAC address \"{mac}\": {source}")]
    InvalidMac {
        identifier: String,
        mac: String,
        #[source]
        source: MacParseError,
    },
    #[error("no targets found in configuration")]
    NoTargets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report every device that answers.
    All,
    /// Report only configured targets, tagged with their identifier.
    Targets,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::All => write!(f, "all"),
            Mode::Targets => write!(f, "targets"),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct BrokerConfig {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub topic: String,
    pub client_id: String,
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("topic", &self.topic)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    pub mac: String,
    pub identifier: String,
}

impl TargetConfig {
    pub fn new(mac: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds spent waiting for replies, spread over all rounds.
    pub timeout_secs: u64,
    /// Number of probe rounds; silent hosts are asked again each round.
    pub retries: u32,
    /// Addresses never probed nor reported, on top of the scanning host.
    pub exclude: Vec<Ipv4Addr>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            retries: 5,
            exclude: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Consecutive failures before the circuit opens.
    pub max_attempts: u32,
    pub circuit_cooldown_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_attempts: 10,
            circuit_cooldown_secs: 300,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_cooldown_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidReconnect("max_attempts must be at least 1"));
        }
        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidReconnect("initial_backoff_ms must be at least 1"));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::InvalidReconnect(
                "max_backoff_ms must not be below initial_backoff_ms",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mode: Mode,
    /// Seconds to sleep between two scan cycles.
    pub interval: u64,
    pub interface: String,
    pub mqtt: BrokerConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a configuration. Target MACs come back normalized.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.interface.trim().is_empty() {
            return Err(ConfigError::MissingInterface);
        }
        if self.scan.retries == 0 {
            return Err(ConfigError::InvalidScan("retries must be at least 1"));
        }
        if self.scan.timeout_secs == 0 {
            return Err(ConfigError::InvalidScan("timeout_secs must be at least 1"));
        }
        self.reconnect.validate()?;

        for target in &mut self.targets {
            target.mac = mac::normalize(&target.mac).map_err(|source| ConfigError::InvalidMac {
                identifier: target.identifier.clone(),
                mac: target.mac.clone(),
                source,
            })?;
        }

        if self.mode == Mode::Targets && self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Operator-facing summary of where reports go and what is tracked.
    pub fn log_summary(&self) {
        info!(
            "[config]: will connect to MQTT broker {}:{} and will report on topic \"{}\"",
            self.mqtt.ip, self.mqtt.port, self.mqtt.topic
        );
        info!(
            "[config]: mode {} on interface {} every {}s",
            self.mode, self.interface, self.interval
        );
        if !self.scan.exclude.is_empty() {
            let skipped: Vec<String> = self.scan.exclude.iter().map(Ipv4Addr::to_string).collect();
            info!("[config]: never probing {}", skipped.join(", "));
        }

        if self.mode == Mode::Targets {
            info!("[targets]:");
            for target in &self.targets {
                info!("\tMAC: {} -> {}", target.mac, target.identifier);
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
