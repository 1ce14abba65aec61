use is_root::is_root;
use tracing::warn;

/// Raw datalink channels need root (or `CAP_NET_RAW` on Linux).
///
/// Only warns: a capability-granted binary still works without uid 0, and the
/// scanner reports the real failure when it cannot open the channel.
pub fn check_privileges() -> bool {
    let privileged = is_root();
    if !privileged {
        warn!("[system]: not running as root, opening the ARP channel will probably fail");
    }
    privileged
}
