//! Resolving the configured interface name to a usable LAN interface.

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum ViabilityError {
    /// The interface is operationally down.
    #[error("interface is down")]
    IsDown,
    /// Loopback interfaces cannot carry ARP.
    #[error("interface is a loopback")]
    IsLoopback,
    /// The interface does not have a MAC address.
    #[error("interface has no MAC address")]
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    #[error("interface does not support broadcast")]
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    #[error("interface is a point-to-point link")]
    IsPointToPoint,
    /// The interface has no IPv4 address to probe from.
    #[error("interface has no IPv4 address")]
    NoIpv4,
}

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum InterfaceError {
    #[error("no interface named \"{0}\"")]
    NotFound(String),
    #[error(
        "interface \"{name}\" is ambiguous, pick one of: {}",
        .candidates.join(", ")
    )]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    #[error("interface \"{name}\" cannot be scanned: {reason}")]
    NotViable {
        name: String,
        reason: ViabilityError,
    },
}

pub trait NetworkInterfaceExtension {
    fn get_ipv4_net(&self) -> Option<Ipv4Network>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_net(&self) -> Option<Ipv4Network> {
        self.ips.iter().find_map(|ip| match ip {
            IpNetwork::V4(net) if !net.ip().is_loopback() => Some(*net),
            _ => None,
        })
    }
}

/// Picks the interface called `name` out of `interfaces`.
///
/// An exact name wins. Otherwise `name` is treated as a prefix (`"en"`,
/// `"wlp"`) and accepted only when exactly one interface carries it; several
/// candidates are reported back so the operator can spell the name out.
pub fn select_interface(
    name: &str,
    interfaces: &[NetworkInterface],
) -> Result<NetworkInterface, InterfaceError> {
    if let Some(exact) = interfaces.iter().find(|i| i.name == name) {
        return Ok(exact.clone());
    }

    let candidates: Vec<&NetworkInterface> = interfaces
        .iter()
        .filter(|i| !name.is_empty() && i.name.starts_with(name))
        .collect();

    match candidates.as_slice() {
        [] => Err(InterfaceError::NotFound(name.to_string())),
        [single] => Ok((*single).clone()),
        many => Err(InterfaceError::Ambiguous {
            name: name.to_string(),
            candidates: many.iter().map(|i| i.name.clone()).collect(),
        }),
    }
}

/// Looks up `name` among the interfaces of this machine and checks it can carry ARP.
pub fn resolve(name: &str) -> Result<NetworkInterface, InterfaceError> {
    let interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces();
    let interface = select_interface(name, &interfaces)?;
    is_arp_capable(&interface).map_err(|reason| InterfaceError::NotViable {
        name: interface.name.clone(),
        reason,
    })?;
    Ok(interface)
}

pub fn is_arp_capable(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    if interface.get_ipv4_net().is_none() {
        return Err(ViabilityError::NoIpv4);
    }

    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
