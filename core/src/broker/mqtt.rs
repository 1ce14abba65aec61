use std::time::Duration;

use arpcast_common::config::{BrokerConfig, ReconnectConfig};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{BrokerLink, LinkError, LinkEvent, LinkSession, LinkState, MessageSink, PublishError, Supervisor};

pub const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Outgoing requests buffered between the client and the event loop.
const REQUEST_CAPACITY: usize = 64;

pub type MqttLink = BrokerLink<AsyncClient>;

pub struct MqttSession(EventLoop);

#[async_trait]
impl LinkSession for MqttSession {
    async fn poll(&mut self) -> Result<LinkEvent, LinkError> {
        match self.0.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!("[mqtt]: connack {:?}", ack.code);
                Ok(LinkEvent::Connected)
            }
            Ok(_) => Ok(LinkEvent::Activity),
            Err(e) => Err(LinkError::Connection(e.to_string())),
        }
    }
}

#[async_trait]
impl MessageSink for AsyncClient {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(client_error)
    }

    fn try_send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(client_error)
    }
}

fn client_error(e: ClientError) -> PublishError {
    PublishError::Client(e.to_string())
}

/// Opens the MQTT link and spawns its supervisor.
///
/// Returns as soon as the options are valid; the connection itself is made by
/// the supervisor, and publishes wait for it.
pub fn connect(
    broker: &BrokerConfig,
    reconnect: &ReconnectConfig,
) -> Result<(MqttLink, JoinHandle<()>), LinkError> {
    let options = mqtt_options(broker)?;
    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let (state_tx, state_rx) = watch::channel(LinkState::Connecting);

    let supervisor = Supervisor::new(
        MqttSession(eventloop),
        client.clone(),
        broker.topic.as_str(),
        *reconnect,
        state_tx,
    );
    let handle = tokio::spawn(supervisor.run());

    Ok((BrokerLink::new(client, broker.topic.as_str(), state_rx), handle))
}

fn mqtt_options(broker: &BrokerConfig) -> Result<MqttOptions, LinkError> {
    if broker.ip.trim().is_empty() {
        return Err(LinkError::InvalidEndpoint("broker ip is empty"));
    }
    if broker.port == 0 {
        return Err(LinkError::InvalidEndpoint("broker port is 0"));
    }
    if broker.topic.is_empty() {
        return Err(LinkError::InvalidEndpoint("topic is empty"));
    }
    if broker.client_id.trim().is_empty() || broker.client_id.starts_with(' ') {
        return Err(LinkError::InvalidEndpoint("client id is empty or starts with a space"));
    }

    let mut options = MqttOptions::new(broker.client_id.as_str(), broker.ip.trim(), broker.port);
    options.set_keep_alive(KEEP_ALIVE);
    if !broker.username.is_empty() {
        options.set_credentials(broker.username.as_str(), broker.password.as_str());
    }
    Ok(options)
}
