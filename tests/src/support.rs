use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arpcast_common::config::Config;
use arpcast_common::device::Observation;
use arpcast_core::broker::{PublishError, Publisher};
use arpcast_core::scanner::{NetworkScanner, ScanError, ScanOptions, ScanProgress};
use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Answers each scan with the next scripted result, then with nothing.
#[derive(Default)]
pub struct ScriptedScanner {
    results: Mutex<VecDeque<Result<Vec<Observation>, ScanError>>>,
    calls: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new(results: Vec<Result<Vec<Observation>, ScanError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkScanner for ScriptedScanner {
    async fn scan(
        &self,
        interface: &str,
        _options: &ScanOptions,
        progress: Arc<dyn ScanProgress>,
    ) -> Result<Vec<Observation>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.results.lock().unwrap().pop_front();
        let result = next.unwrap_or_else(|| Ok(Vec::new()));
        if let Ok(found) = &result {
            progress.started(interface, found.len() as u64);
            progress.probed(found.len() as u64);
            progress.finished(found.len());
        }
        result
    }
}

/// Keeps every payload it is handed.
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn payloads(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn json(&self) -> Vec<serde_json::Value> {
        self.payloads()
            .iter()
            .map(|p| serde_json::from_str(p).unwrap())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, payload: String) -> Result<(), PublishError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }
}

struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Counts WARN events on the current thread until the guard drops.
pub fn count_warnings() -> (Arc<AtomicUsize>, DefaultGuard) {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    (warnings, tracing::subscriber::set_default(subscriber))
}

pub fn config(json: &str) -> Arc<Config> {
    Arc::new(Config::from_json(json).unwrap())
}
