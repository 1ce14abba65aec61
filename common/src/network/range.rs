use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            0
        } else {
            (end - start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.start_addr <= addr && addr <= self.end_addr
    }
}

/// Usable host addresses of a network, without the network and broadcast addresses.
///
/// `/31` and `/32` networks have no such addresses to strip and are returned whole.
pub fn host_range(net: Ipv4Network) -> Ipv4Range {
    let net_u32: u32 = u32::from(net.network());
    let broadcast_u32: u32 = u32::from(net.broadcast());

    let start_u32 = net_u32.saturating_add(1);
    let end_u32 = broadcast_u32.saturating_sub(1);

    if net.prefix() < 31 && start_u32 <= end_u32 {
        Ipv4Range::new(Ipv4Addr::from(start_u32), Ipv4Addr::from(end_u32))
    } else {
        Ipv4Range::new(net.network(), net.broadcast())
    }
}
