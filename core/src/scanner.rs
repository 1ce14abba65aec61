//! The central **abstraction** for network scanning.
//!
//! The rest of the crate only sees [`NetworkScanner`]: hand it an interface
//! name and some timing knobs, get back the devices that answered. The [`arp`]
//! submodule provides the implementation used in production.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use arpcast_common::config::ScanConfig;
use arpcast_common::device::Observation;
use arpcast_common::network::interface::InterfaceError;
use arpcast_protocols::PacketError;
use async_trait::async_trait;
use pnet::ipnetwork::Ipv4Network;
use thiserror::Error;

pub mod arp;

pub use arp::ArpScanner;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error("subnet {0} is too large to sweep (prefix must be /16 or longer)")]
    SubnetTooLarge(Ipv4Network),
    #[error("opening channel on {interface}: {source}")]
    Channel {
        interface: String,
        #[source]
        source: std::io::Error,
    },
    #[error("non-ethernet channel for {0}")]
    NotEthernet(String),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("scan task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Total time spent listening for replies.
    pub timeout: Duration,
    /// Probe rounds; hosts that stay silent are asked again.
    pub retries: u32,
    /// Addresses never probed nor reported. The scanning host is always added.
    pub exclude: Vec<Ipv4Addr>,
}

impl From<&ScanConfig> for ScanOptions {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            retries: cfg.retries,
            exclude: cfg.exclude.clone(),
        }
    }
}

/// Receives progress while a scan runs. Every method defaults to doing nothing.
pub trait ScanProgress: Send + Sync {
    fn started(&self, _interface: &str, _probes: u64) {}
    fn probed(&self, _count: u64) {}
    fn finished(&self, _found: usize) {}
}

pub struct NoProgress;

impl ScanProgress for NoProgress {}

#[async_trait]
pub trait NetworkScanner: Send + Sync {
    async fn scan(
        &self,
        interface: &str,
        options: &ScanOptions,
        progress: Arc<dyn ScanProgress>,
    ) -> Result<Vec<Observation>, ScanError>;
}
