//! # Broker Link
//!
//! The publishing half ([`BrokerLink`]) and the task that keeps the connection
//! alive ([`Supervisor`]) share nothing but a `watch` channel carrying the
//! current [`LinkState`].
//!
//! The supervisor owns the session. Each `poll` is one step of the protocol
//! state machine; after a failed poll the next one is a reconnect attempt, so
//! the supervisor sleeps a backoff between them and opens a circuit after too
//! many consecutive failures. Publishers wait for `Connected` before they
//! enqueue anything.
//!
//! [`mqtt`] plugs `rumqttc` into both sides.

use std::fmt;
use std::time::Duration;

use arpcast_common::config::ReconnectConfig;
use arpcast_common::device::Hello;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub mod mqtt;

pub use mqtt::{MqttLink, connect};

/// How long a publish waits for the link before giving up on the record.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("broker link is closed")]
    Closed,
    #[error("broker not connected after {0:?}")]
    NotConnected(Duration),
    #[error("client rejected message: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid broker endpoint: {0}")]
    InvalidEndpoint(&'static str),
    #[error("{0}")]
    Connection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    CircuitOpen,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            LinkState::CircuitOpen => write!(f, "paused after repeated failures"),
        }
    }
}

/// Outcome of a successful session poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The broker acknowledged a (re)connection.
    Connected,
    Activity,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: String) -> Result<(), PublishError>;
}

#[async_trait]
pub trait LinkSession: Send {
    async fn poll(&mut self) -> Result<LinkEvent, LinkError>;
}

#[async_trait]
pub trait MessageSink: Clone + Send + Sync + 'static {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;

    /// Enqueues without waiting. Used from the supervisor, which is the task
    /// that drains the queue.
    fn try_send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

pub struct Supervisor<S, C> {
    session: S,
    sink: C,
    topic: String,
    reconnect: ReconnectConfig,
    state: watch::Sender<LinkState>,
}

impl<S: LinkSession, C: MessageSink> Supervisor<S, C> {
    pub fn new(
        session: S,
        sink: C,
        topic: impl Into<String>,
        reconnect: ReconnectConfig,
        state: watch::Sender<LinkState>,
    ) -> Self {
        Self {
            session,
            sink,
            topic: topic.into(),
            reconnect,
            state,
        }
    }

    /// Drives the session forever.
    pub async fn run(mut self) {
        let mut failures: u32 = 0;
        loop {
            match self.session.poll().await {
                Ok(LinkEvent::Connected) => {
                    if failures > 0 {
                        info!("[mqtt]: reconnected after {failures} failed attempt(s)");
                    } else {
                        info!("[mqtt]: connected to broker");
                    }
                    failures = 0;
                    self.state.send_replace(LinkState::Connected);
                    self.say_hello();
                }
                Ok(LinkEvent::Activity) => {}
                Err(e) => {
                    failures += 1;
                    if failures >= self.reconnect.max_attempts {
                        let cooldown = self.reconnect.cooldown();
                        error!(
                            "[mqtt]: {failures} consecutive connection failures (last: {e}), pausing for {cooldown:?}"
                        );
                        self.state.send_replace(LinkState::CircuitOpen);
                        failures = 0;
                        tokio::time::sleep(cooldown).await;
                    } else {
                        let delay = self.reconnect.backoff(failures);
                        warn!("[mqtt]: connection error: {e}, reconnect attempt {failures} in {delay:?}");
                        self.state
                            .send_replace(LinkState::Reconnecting { attempt: failures });
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    fn say_hello(&self) {
        let payload = match serde_json::to_vec(&Hello::default()) {
            Ok(payload) => payload,
            Err(e) => {
                error!("[mqtt]: cannot encode hello: {e}");
                return;
            }
        };
        match self.sink.try_send(&self.topic, payload) {
            Ok(()) => debug!("[mqtt]: hello queued on {}", self.topic),
            Err(e) => warn!("[mqtt]: failed to queue hello: {e}"),
        }
    }
}

/// Publishing half of the link.
pub struct BrokerLink<C> {
    sink: C,
    topic: String,
    state: watch::Receiver<LinkState>,
    ready_timeout: Duration,
}

impl<C: MessageSink> BrokerLink<C> {
    pub fn new(sink: C, topic: impl Into<String>, state: watch::Receiver<LinkState>) -> Self {
        Self {
            sink,
            topic: topic.into(),
            state,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    async fn wait_connected(&self) -> Result<(), PublishError> {
        let mut state = self.state.clone();
        let ready = async move {
            state
                .wait_for(|s| *s == LinkState::Connected)
                .await
                .map(|_| ())
        };
        match tokio::time::timeout(self.ready_timeout, ready).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(PublishError::Closed),
            Err(_) => Err(PublishError::NotConnected(self.ready_timeout)),
        }
    }
}

#[async_trait]
impl<C: MessageSink> Publisher for BrokerLink<C> {
    async fn publish(&self, payload: String) -> Result<(), PublishError> {
        self.wait_connected().await?;
        self.sink.send(&self.topic, payload.into_bytes()).await
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
