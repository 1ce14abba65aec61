use std::sync::{Mutex, PoisonError};

use arpcast_common::config::Mode;
use arpcast_common::device::Reportable;
use arpcast_core::broker::LinkState;
use arpcast_core::driver::CycleObserver;
use arpcast_core::scanner::ScanProgress;
use indicatif::ProgressStyle;
use tokio::sync::watch;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::print;

const BAR_TEMPLATE: &str = "{spinner:.blue} {msg} [{bar:30.green/bright_black}] {pos}/{len}";

/// Renders each cycle on the terminal: the broker status, a probe progress
/// bar while the sweep runs, then the device table.
pub struct ConsoleObserver {
    sweep: Mutex<Option<Span>>,
    link: Option<watch::Receiver<LinkState>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            sweep: Mutex::new(None),
            link: None,
        }
    }

    pub fn with_link(mut self, link: watch::Receiver<LinkState>) -> Self {
        self.link = Some(link);
        self
    }

    fn link_status(&self) -> Option<String> {
        self.link.as_ref().map(|link| link.borrow().to_string())
    }

    fn with_sweep(&self, f: impl FnOnce(&mut Option<Span>)) {
        let mut guard = self.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress for ConsoleObserver {
    fn started(&self, interface: &str, probes: u64) {
        let span = info_span!("sweep", indicatif.pb_show = true);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            span.pb_set_style(&style.progress_chars("━╸ "));
        }
        span.pb_set_message(&format!("probing {interface}"));
        span.pb_set_length(probes);
        span.pb_start();
        self.with_sweep(|sweep| *sweep = Some(span));
    }

    fn probed(&self, count: u64) {
        self.with_sweep(|sweep| {
            if let Some(span) = sweep {
                span.pb_inc(count);
            }
        });
    }

    fn finished(&self, _found: usize) {
        self.with_sweep(|sweep| {
            sweep.take();
        });
    }
}

impl CycleObserver for ConsoleObserver {
    fn cycle_started(&self, tick: u64) {
        // a failed sweep never reports `finished`
        self.with_sweep(|sweep| {
            sweep.take();
        });
        print::header(&format!("cycle {tick}"));
        if let Some(status) = self.link_status() {
            print::aligned_line("broker", status);
        }
    }

    fn devices_found(&self, mode: Mode, devices: &[Reportable]) {
        print::device_table(mode, devices);
    }
}
