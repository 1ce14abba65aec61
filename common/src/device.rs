//! # Device Model
//!
//! What one scan cycle sees and what ends up on the broker.
//!
//! Nothing here outlives a cycle: observations are produced by the scanner,
//! optionally narrowed down to [`MatchedTarget`]s, turned into
//! [`PresenceRecord`]s at publish time and dropped.

use std::net::Ipv4Addr;

use serde::Serialize;

/// A single device that answered an ARP probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub vendor: String,
}

impl Observation {
    pub fn new(ip: Ipv4Addr, mac: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            ip,
            mac: mac.into(),
            vendor: vendor.into(),
        }
    }
}

/// An [`Observation`] whose MAC belongs to a configured target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTarget {
    pub mac: String,
    pub identifier: String,
    pub ip: Ipv4Addr,
    pub vendor: String,
}

/// Anything the reporter can turn into a [`PresenceRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reportable {
    Observed(Observation),
    Matched(MatchedTarget),
}

impl Reportable {
    pub fn ip(&self) -> Ipv4Addr {
        match self {
            Reportable::Observed(o) => o.ip,
            Reportable::Matched(m) => m.ip,
        }
    }

    pub fn mac(&self) -> &str {
        match self {
            Reportable::Observed(o) => &o.mac,
            Reportable::Matched(m) => &m.mac,
        }
    }

    pub fn vendor(&self) -> &str {
        match self {
            Reportable::Observed(o) => &o.vendor,
            Reportable::Matched(m) => &m.vendor,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Reportable::Observed(_) => None,
            Reportable::Matched(m) => Some(&m.identifier),
        }
    }

    pub fn into_record(self, last_seen: String) -> PresenceRecord {
        match self {
            Reportable::Observed(o) => PresenceRecord {
                name: None,
                ip: o.ip,
                mac: o.mac,
                vendor: o.vendor,
                last_seen,
            },
            Reportable::Matched(m) => PresenceRecord {
                name: Some(m.identifier),
                ip: m.ip,
                mac: m.mac,
                vendor: m.vendor,
                last_seen,
            },
        }
    }
}

impl From<Observation> for Reportable {
    fn from(observation: Observation) -> Self {
        Reportable::Observed(observation)
    }
}

impl From<MatchedTarget> for Reportable {
    fn from(matched: MatchedTarget) -> Self {
        Reportable::Matched(matched)
    }
}

/// The JSON payload published for every reported device.
///
/// `name` is only present for configured targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ip: Ipv4Addr,
    pub mac: String,
    pub vendor: String,
    pub last_seen: String,
}

/// Liveness message sent once the broker link is up.
#[derive(Debug, Clone, Serialize)]
pub struct Hello {
    pub msg: &'static str,
}

impl Default for Hello {
    fn default() -> Self {
        Self { msg: "hello" }
    }
}
