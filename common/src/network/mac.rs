//! MAC address normalization and vendor lookup.
//!
//! Configured targets and scan results may spell the same hardware address in
//! different ways (`aa:bb:..`, `AA-BB-..`, `aabb.ccdd.eeff`). Everything that
//! compares addresses goes through [`normalize`] first, which yields the
//! canonical uppercase, colon-delimited form.

use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;
use thiserror::Error;
use tracing::warn;

pub const UNKNOWN_VENDOR: &str = "Unknown";

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    #[error("invalid hex digit '{0}'")]
    InvalidDigit(char),
    #[error("expected 12 hex digits, found {0}")]
    Length(usize),
}

/// Parses a MAC address written with `:`, `-`, `.` or no separators at all.
pub fn parse(raw: &str) -> Result<MacAddr, MacParseError> {
    let digits: Vec<char> = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    if let Some(bad) = digits.iter().find(|c| !c.is_ascii_hexdigit()) {
        return Err(MacParseError::InvalidDigit(*bad));
    }
    if digits.len() != 12 {
        return Err(MacParseError::Length(digits.len()));
    }

    let mut octets = [0u8; 6];
    for (octet, pair) in octets.iter_mut().zip(digits.chunks(2)) {
        let high = pair[0].to_digit(16).unwrap_or_default() as u8;
        let low = pair[1].to_digit(16).unwrap_or_default() as u8;
        *octet = (high << 4) | low;
    }

    Ok(MacAddr::new(
        octets[0], octets[1], octets[2], octets[3], octets[4], octets[5],
    ))
}

/// Renders a MAC address as `AA:BB:CC:DD:EE:FF`.
pub fn canonical(mac: MacAddr) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac.0, mac.1, mac.2, mac.3, mac.4, mac.5
    )
}

pub fn normalize(raw: &str) -> Result<String, MacParseError> {
    parse(raw).map(canonical)
}

/// Retrieves or initializes the **Organizationally unique identifier** database.
fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("[vendors]: OUI database unavailable -> {e}");
                None
            }
        })
        .as_ref()
}

/// Identify the vendor of a MAC address.
pub fn get_vendor(mac: MacAddr) -> Option<String> {
    let db = get_oui_db()?;
    match db.lookup_by_mac(&mac.to_string()) {
        Ok(Some(entry)) => Some(entry.company_name.clone()),
        _ => None,
    }
}

pub fn vendor_or_unknown(mac: MacAddr) -> String {
    get_vendor(mac).unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uppercases_colon_form() {
        assert_eq!(normalize("aa:bb:cc:dd:ee:ff").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(normalize("Aa:bB:01:23:45:67").unwrap(), "AA:BB:01:23:45:67");
    }

    #[test]
    fn normalize_accepts_other_separators() {
        assert_eq!(normalize("aa-bb-cc-dd-ee-ff").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(normalize("aabb.ccdd.eeff").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(normalize("aabbccddeeff").unwrap(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(normalize("  aa:bb:cc:dd:ee:ff \n").unwrap(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert_eq!(normalize("zz:bb:cc:dd:ee:ff"), Err(MacParseError::InvalidDigit('z')));
        assert_eq!(normalize("aa:bb:cc:dd:ee"), Err(MacParseError::Length(10)));
        assert_eq!(normalize("aa:bb:cc:dd:ee:ff:00"), Err(MacParseError::Length(14)));
        assert_eq!(normalize(""), Err(MacParseError::Length(0)));
    }

    #[test]
    fn canonical_pads_single_digit_octets() {
        let mac = MacAddr::new(0x0a, 0x01, 0x02, 0x03, 0x04, 0x05);
        assert_eq!(canonical(mac), "0A:01:02:03:04:05");
    }

    #[test]
    fn parse_matches_pnet_representation() {
        let mac = MacAddr::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x01);
        assert_eq!(parse(&mac.to_string()).unwrap(), mac);
    }
}
