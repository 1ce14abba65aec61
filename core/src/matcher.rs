//! Pairs scan observations with configured targets.

use std::collections::{HashMap, HashSet};

use arpcast_common::config::TargetConfig;
use arpcast_common::device::{MatchedTarget, Observation};
use arpcast_common::network::mac;

/// Returns the observations whose MAC belongs to a target, tagged with its identifier.
///
/// MACs are compared in canonical form on both sides. A configured MAC claims
/// at most one observation (the first one), and a MAC configured twice keeps
/// its first identifier. Output follows the order of `observations`.
pub fn match_targets(observations: &[Observation], targets: &[TargetConfig]) -> Vec<MatchedTarget> {
    let mut identifiers: HashMap<String, &str> = HashMap::new();
    for target in targets {
        if let Ok(key) = mac::normalize(&target.mac) {
            identifiers.entry(key).or_insert(target.identifier.as_str());
        }
    }

    let mut claimed: HashSet<String> = HashSet::new();
    observations
        .iter()
        .filter_map(|observation| {
            let key = mac::normalize(&observation.mac).ok()?;
            let identifier = *identifiers.get(&key)?;
            if !claimed.insert(key) {
                return None;
            }
            Some(MatchedTarget {
                mac: observation.mac.clone(),
                identifier: identifier.to_string(),
                ip: observation.ip,
                vendor: observation.vendor.clone(),
            })
        })
        .collect()
}
