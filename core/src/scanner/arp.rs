//! A **local area network (LAN)** ARP sweep.
//!
//! Every host address of the interface's IPv4 subnet is asked "who-has" over a
//! raw Ethernet channel, and the replies are collected into observations.
//!
//! This scanner requires **root privileges** (or `CAP_NET_RAW`) to open a
//! Layer 2 channel.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arpcast_common::device::Observation;
use arpcast_common::network::interface::{
    self, InterfaceError, NetworkInterfaceExtension, ViabilityError,
};
use arpcast_common::network::mac;
use arpcast_common::network::range::{self, Ipv4Range};
use arpcast_protocols::arp::{self, ArpReply};
use async_trait::async_trait;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::util::MacAddr;
use tracing::{debug, info};

use super::{NetworkScanner, ScanError, ScanOptions, ScanProgress};

const MIN_PREFIX: u8 = 16;
const MIN_ROUND_WINDOW: Duration = Duration::from_millis(200);
const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub struct ArpScanner;

#[async_trait]
impl NetworkScanner for ArpScanner {
    async fn scan(
        &self,
        interface: &str,
        options: &ScanOptions,
        progress: Arc<dyn ScanProgress>,
    ) -> Result<Vec<Observation>, ScanError> {
        let interface = interface.to_string();
        let options = options.clone();
        tokio::task::spawn_blocking(move || scan_blocking(&interface, &options, progress.as_ref()))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?
    }
}

fn scan_blocking(
    name: &str,
    options: &ScanOptions,
    progress: &dyn ScanProgress,
) -> Result<Vec<Observation>, ScanError> {
    let intf: NetworkInterface = interface::resolve(name)?;
    let ctx = SweepContext::new(&intf, options)?;

    info!("[scanner]: interface -> {}", intf.name);
    info!("[scanner]: this IP -> {}", ctx.src_addr);
    info!("[scanner]: this MAC -> {}", mac::canonical(ctx.src_mac));

    let (mut tx, mut rx) = open_eth_channel(&intf, &channel_config(), datalink::channel)?;

    progress.started(&intf.name, ctx.probe_budget());
    let replies = sweep(&ctx, tx.as_mut(), rx.as_mut(), progress)?;
    progress.finished(replies.len());

    Ok(into_observations(replies))
}

/// Everything one sweep needs to know about the probing side.
pub struct SweepContext {
    pub src_mac: MacAddr,
    pub src_addr: Ipv4Addr,
    pub range: Ipv4Range,
    pub exclude: HashSet<Ipv4Addr>,
    pub window: Duration,
    pub retries: u32,
}

impl SweepContext {
    pub fn new(intf: &NetworkInterface, options: &ScanOptions) -> Result<Self, ScanError> {
        let not_viable = |reason| InterfaceError::NotViable {
            name: intf.name.clone(),
            reason,
        };
        let src_mac = intf.mac.ok_or_else(|| not_viable(ViabilityError::NoMacAddress))?;
        let net = intf
            .get_ipv4_net()
            .ok_or_else(|| not_viable(ViabilityError::NoIpv4))?;

        if net.prefix() < MIN_PREFIX {
            return Err(ScanError::SubnetTooLarge(net));
        }

        let mut exclude: HashSet<Ipv4Addr> = options.exclude.iter().copied().collect();
        exclude.insert(net.ip());

        let retries = options.retries.max(1);
        let window = (options.timeout / retries).max(MIN_ROUND_WINDOW);

        Ok(Self {
            src_mac,
            src_addr: net.ip(),
            range: range::host_range(net),
            exclude,
            window,
            retries,
        })
    }

    fn targets(&self) -> Vec<Ipv4Addr> {
        self.range
            .to_iter()
            .filter(|ip| !self.exclude.contains(ip))
            .collect()
    }

    pub fn probe_budget(&self) -> u64 {
        self.targets().len() as u64 * u64::from(self.retries)
    }

    /// Keeps replies from probed addresses only, never our own.
    fn accept(&self, frame: &[u8]) -> Option<ArpReply> {
        let reply = arp::parse_reply(frame)?;
        let wanted = reply.sender_mac != self.src_mac
            && self.range.contains(reply.sender_ip)
            && !self.exclude.contains(&reply.sender_ip);
        wanted.then_some(reply)
    }
}

/// Runs `retries` probe rounds and returns the first reply seen per MAC.
pub fn sweep(
    ctx: &SweepContext,
    tx: &mut dyn DataLinkSender,
    rx: &mut dyn DataLinkReceiver,
    progress: &dyn ScanProgress,
) -> Result<Vec<ArpReply>, ScanError> {
    let targets = ctx.targets();
    let mut answered: HashSet<Ipv4Addr> = HashSet::new();
    let mut seen: HashSet<MacAddr> = HashSet::new();
    let mut replies: Vec<ArpReply> = Vec::new();

    for round in 1..=ctx.retries {
        let pending: Vec<Ipv4Addr> = targets
            .iter()
            .copied()
            .filter(|ip| !answered.contains(ip))
            .collect();
        progress.probed((targets.len() - pending.len()) as u64);

        if pending.is_empty() {
            progress.probed(targets.len() as u64 * u64::from(ctx.retries - round));
            break;
        }

        debug!("[scanner]: round {round}/{}, probing {} hosts", ctx.retries, pending.len());
        for dst_addr in pending {
            let frame = arp::create_request(ctx.src_mac, ctx.src_addr, dst_addr)?;
            if let Some(Err(e)) = tx.send_to(&frame, None) {
                debug!("[scanner]: send {dst_addr} failed: {e}");
            }
            progress.probed(1);
        }

        let deadline = Instant::now() + ctx.window;
        while Instant::now() < deadline {
            let Ok(frame) = rx.next() else {
                continue;
            };
            let Some(reply) = ctx.accept(frame) else {
                continue;
            };
            answered.insert(reply.sender_ip);
            if seen.insert(reply.sender_mac) {
                replies.push(reply);
            }
        }
    }

    Ok(replies)
}

fn into_observations(mut replies: Vec<ArpReply>) -> Vec<Observation> {
    replies.sort_by_key(|reply| reply.sender_ip);
    replies
        .into_iter()
        .map(|reply| {
            Observation::new(
                reply.sender_ip,
                mac::canonical(reply.sender_mac),
                mac::vendor_or_unknown(reply.sender_mac),
            )
        })
        .collect()
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), ScanError>
where
    F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg).map_err(|source| ScanError::Channel {
        interface: intf.name.clone(),
        source,
    })?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => Err(ScanError::NotEthernet(intf.name.clone())),
    }
}

fn channel_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
