//! # Presence Reporter
//!
//! Every device of a cycle becomes one [`PresenceRecord`] message. The
//! timestamp is taken right before the record is handed to the broker, not at
//! scan time.

use arpcast_common::config::Mode;
use arpcast_common::device::{PresenceRecord, Reportable};
use chrono::Local;
use tracing::{debug, error, warn};

use crate::broker::Publisher;

/// `last_seen` format, local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

pub struct Reporter {
    clock: Box<dyn Clock>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self::with_clock(LocalClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Publishes one message per record and returns how many the broker accepted.
    ///
    /// In `targets` mode only matched targets are sent. A failed publish is
    /// logged and the remaining records still go out. An empty cycle logs a
    /// single warning.
    pub async fn report(
        &self,
        records: Vec<Reportable>,
        mode: Mode,
        publisher: &dyn Publisher,
    ) -> usize {
        let records: Vec<Reportable> = records
            .into_iter()
            .filter(|record| mode == Mode::All || record.identifier().is_some())
            .collect();

        if records.is_empty() {
            match mode {
                Mode::Targets => warn!("[reporter]: no targets found on the network"),
                Mode::All => warn!("[reporter]: no devices found on the network"),
            }
            return 0;
        }

        let mut published = 0;
        for record in records {
            let label = record.identifier().unwrap_or(record.mac()).to_string();
            let payload = match self.encode(record.into_record(self.clock.now())) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("[reporter]: cannot encode record for {label}: {e}");
                    continue;
                }
            };

            match publisher.publish(payload).await {
                Ok(()) => {
                    debug!("[reporter]: published {label}");
                    published += 1;
                }
                Err(e) => error!("[mqtt]: failed to publish {label}: {e}"),
            }
        }
        published
    }

    fn encode(&self, record: PresenceRecord) -> Result<String, serde_json::Error> {
        serde_json::to_string(&record)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::PublishError;
    use arpcast_common::device::{MatchedTarget, Observation};
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> String {
            "2024-01-02 03:04:05".into()
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<String>>,
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, payload: String) -> Result<(), PublishError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                return Err(PublishError::Closed);
            }
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

    fn count_warnings() -> (Arc<AtomicUsize>, tracing::subscriber::DefaultGuard) {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let guard = tracing::subscriber::set_default(subscriber);
        (warnings, guard)
    }

    fn observed(last_octet: u8, mac: &str) -> Reportable {
        Observation::new(Ipv4Addr::new(192, 168, 1, last_octet), mac, "Acme").into()
    }

    fn matched(identifier: &str) -> Reportable {
        MatchedTarget {
            mac: "AA:BB:CC:DD:EE:FF".into(),
            identifier: identifier.into(),
            ip: Ipv4Addr::new(192, 168, 1, 1),
            vendor: "Acme".into(),
        }
        .into()
    }

    #[tokio::test]
    async fn targets_mode_publishes_named_record() {
        let publisher = RecordingPublisher::default();
        let reporter = Reporter::with_clock(FixedClock);

        let count = reporter.report(vec![matched("router")], Mode::Targets, &publisher).await;

        assert_eq!(count, 1);
        assert_eq!(
            *publisher.sent.lock().unwrap(),
            vec![
                r#"{"name":"router","ip":"192.168.1.1","mac":"AA:BB:CC:DD:EE:FF","vendor":"Acme","last_seen":"2024-01-02 03:04:05"}"#
            ]
        );
    }

    #[tokio::test]
    async fn all_mode_publishes_every_observation_without_name() {
        let publisher = RecordingPublisher::default();
        let reporter = Reporter::with_clock(FixedClock);
        let records = vec![
            observed(1, "AA:BB:CC:DD:EE:01"),
            observed(2, "AA:BB:CC:DD:EE:02"),
            observed(3, "AA:BB:CC:DD:EE:03"),
        ];

        let count = reporter.report(records, Mode::All, &publisher).await;

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(count, 3);
        assert_eq!(sent.len(), 3);
        for payload in sent.iter() {
            let value: serde_json::Value = serde_json::from_str(payload).unwrap();
            assert!(value.get("name").is_none());
            assert_eq!(value["last_seen"], "2024-01-02 03:04:05");
        }
        assert!(sent[1].contains("192.168.1.2"));
    }

    #[tokio::test]
    async fn empty_cycle_warns_once_and_publishes_nothing() {
        let (warnings, _guard) = count_warnings();
        let publisher = RecordingPublisher::default();

        let count = Reporter::new().report(Vec::new(), Mode::Targets, &publisher).await;

        assert_eq!(count, 0);
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn targets_mode_skips_unmatched_observations() {
        let (warnings, _guard) = count_warnings();
        let publisher = RecordingPublisher::default();

        let count = Reporter::new()
            .report(vec![observed(4, "11:22:33:44:55:66")], Mode::Targets, &publisher)
            .await;

        assert_eq!(count, 0);
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_publish_does_not_abort_the_batch() {
        let publisher = RecordingPublisher {
            fail_on: Some(0),
            ..Default::default()
        };
        let reporter = Reporter::with_clock(FixedClock);
        let records = vec![matched("first"), matched("second"), matched("third")];

        let count = reporter.report(records, Mode::Targets, &publisher).await;

        assert_eq!(count, 2);
        assert_eq!(publisher.calls.load(Ordering::SeqCst), 3);
        let sent = publisher.sent.lock().unwrap();
        assert!(sent[0].contains("\"second\""));
        assert!(sent[1].contains("\"third\""));
    }

    #[test]
    fn local_clock_uses_expected_format() {
        let now = LocalClock.now();
        assert!(chrono::NaiveDateTime::parse_from_str(&now, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(now.len(), "2024-01-02 03:04:05".len());
    }
}
