use std::fmt::Display;

use arpcast_common::config::Mode;
use arpcast_common::device::Reportable;
use colored::*;
use tracing::info;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;

/// Events on this target are written as-is, without a level prefix.
pub const PRINT_TARGET: &str = "arpcast::print";

const KEY_WIDTH: usize = 9;
const IP_WIDTH: usize = 15;
const MAC_WIDTH: usize = 17;
const VENDOR_WIDTH: usize = 22;

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn banner() {
    let text_content: String = format!("⟦ ARPCAST v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2).bright_black();
    print(&format!("{}{}{}", sep, text, sep));
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = console::measure_text_width(&formatted);

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn aligned_line<V: Display>(key: &str, value: V) {
    let dots: String = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    let colon: String = format!(
        "{}{}",
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    print_status(format!(
        "{}{} {}",
        key.color(colors::PRIMARY),
        colon,
        value.to_string().color(colors::TEXT_DEFAULT)
    ));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    print(&format!("{} {}", prefix, msg.as_ref()));
}

/// One line per device, numbered from 1. Targets carry their identifier.
pub fn device_table(mode: Mode, devices: &[Reportable]) {
    if devices.is_empty() {
        let what = match mode {
            Mode::Targets => "no configured target answered",
            Mode::All => "nobody answered",
        };
        print_status(what.color(colors::SEPARATOR).to_string());
        return;
    }

    let title = match mode {
        Mode::Targets => format!("{} target(s) present", devices.len()),
        Mode::All => format!("{} device(s) on the network", devices.len()),
    };
    print_status(title);
    for (idx, device) in devices.iter().enumerate() {
        print(&device_row(idx + 1, device));
    }
}

fn device_row(idx: usize, device: &Reportable) -> String {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    let mut row = format!(
        " {} {} {} {}",
        idx_str.color(colors::SEPARATOR),
        pad(&device.ip().to_string(), IP_WIDTH).color(colors::IPV4_ADDR),
        pad(device.mac(), MAC_WIDTH).color(colors::MAC_ADDR),
        pad(device.vendor(), VENDOR_WIDTH).color(colors::VENDOR),
    );
    if let Some(identifier) = device.identifier() {
        row.push_str(&format!(" {}", identifier.color(colors::PRIMARY).bold()));
    }
    row.trim_end().to_string()
}

/// Fits `text` into exactly `width` terminal columns, truncating with `…`.
fn pad(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{}{}", text, " ".repeat(width - text.width()));
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR);
    print(&format!("{}", sep));
}
