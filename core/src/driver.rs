//! # Scan Loop
//!
//! One tick is scan, then (in `targets` mode) match, then report. [`ScanLoop::run`]
//! ticks forever with `interval` seconds of sleep in between; a failed tick is
//! logged and the loop carries on.

use std::sync::Arc;

use arpcast_common::config::{Config, Mode};
use arpcast_common::device::Reportable;
use tracing::{debug, error, info};

use crate::broker::Publisher;
use crate::matcher;
use crate::reporter::Reporter;
use crate::scanner::{NetworkScanner, NoProgress, ScanError, ScanOptions, ScanProgress};

/// Sees every cycle before it is reported. The CLI renders its device table here.
pub trait CycleObserver: Send + Sync {
    fn cycle_started(&self, _tick: u64) {}
    fn devices_found(&self, _mode: Mode, _devices: &[Reportable]) {}
}

pub struct SilentObserver;

impl CycleObserver for SilentObserver {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tick: u64,
    pub mode: Mode,
    /// Devices that answered the scan.
    pub observed: usize,
    /// Devices handed to the reporter.
    pub reported: usize,
    /// Messages the broker accepted.
    pub published: usize,
}

pub struct ScanLoop {
    config: Arc<Config>,
    scanner: Arc<dyn NetworkScanner>,
    publisher: Arc<dyn Publisher>,
    reporter: Reporter,
    observer: Arc<dyn CycleObserver>,
    progress: Arc<dyn ScanProgress>,
    tick: u64,
}

impl ScanLoop {
    pub fn new(
        config: Arc<Config>,
        scanner: Arc<dyn NetworkScanner>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            scanner,
            publisher,
            reporter: Reporter::new(),
            observer: Arc::new(SilentObserver),
            progress: Arc::new(NoProgress),
            tick: 0,
        }
    }

    /// Attaches something that follows both the cycle and the sweep itself.
    pub fn with_observer<O>(mut self, observer: Arc<O>) -> Self
    where
        O: CycleObserver + ScanProgress + 'static,
    {
        self.progress = observer.clone();
        self.observer = observer;
        self
    }

    pub async fn run_tick(&mut self) -> Result<CycleReport, ScanError> {
        self.tick += 1;
        self.observer.cycle_started(self.tick);

        let mode = self.config.mode;
        let options = ScanOptions::from(&self.config.scan);
        let observations = self
            .scanner
            .scan(&self.config.interface, &options, Arc::clone(&self.progress))
            .await?;
        let observed = observations.len();

        let records: Vec<Reportable> = match mode {
            Mode::All => observations.into_iter().map(Reportable::from).collect(),
            Mode::Targets => matcher::match_targets(&observations, &self.config.targets)
                .into_iter()
                .map(Reportable::from)
                .collect(),
        };
        self.observer.devices_found(mode, &records);

        let reported = records.len();
        let published = self
            .reporter
            .report(records, mode, self.publisher.as_ref())
            .await;

        Ok(CycleReport {
            tick: self.tick,
            mode,
            observed,
            reported,
            published,
        })
    }

    /// Never returns.
    pub async fn run(mut self) {
        let interval = self.config.interval();
        info!(
            "[scanner]: scanning {} every {}s in {} mode",
            self.config.interface, self.config.interval, self.config.mode
        );
        loop {
            match self.run_tick().await {
                Ok(report) => debug!(
                    "[scanner]: cycle {} done, {} seen, {}/{} published",
                    report.tick, report.observed, report.published, report.reported
                ),
                Err(e) => error!("[scanner]: cycle {} failed: {e}", self.tick),
            }
            tokio::time::sleep(interval).await;
        }
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
