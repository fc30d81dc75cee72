//! MQTT client glue (rumqttc)
//!
//! Thin wrapper around `rumqttc::AsyncClient`: an event-loop task forwards
//! inbound publishes to a channel, the handle offers publish/subscribe
//! helpers. Connection errors are retried with a delay; rumqttc re-connects
//! on the next poll.

use crate::config::MqttConfig;
use crate::constants::{CHANNEL_CAPACITY, MQTT_RECONNECT_DELAY_MS};
use crate::error::{BridgeError, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One message received from the broker
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Handle to the connected MQTT client
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    qos: QoS,
}

fn qos_from_config(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Connect to the broker and spawn the event-loop task
///
/// Returns the client handle and the channel of inbound publishes. The task
/// runs until `shutdown` is set or the channel receiver is dropped.
pub fn connect(
    config: &MqttConfig,
    shutdown: Arc<AtomicBool>,
) -> (MqttClient, mpsc::Receiver<MqttMessage>) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    let (client, mut event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);
    let (tx, rx) = mpsc::channel::<MqttMessage>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to MQTT broker");
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = MqttMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    };
                    if tx.send(message).await.is_err() {
                        // Receiver gone, gateway is shutting down
                        break;
                    }
                }
                Ok(event) => {
                    debug!("mqtt event: {:?}", event);
                }
                Err(e) => {
                    warn!("MQTT connection error: {}, retrying", e);
                    tokio::time::sleep(Duration::from_millis(MQTT_RECONNECT_DELAY_MS)).await;
                }
            }
        }
    });

    (
        MqttClient {
            client,
            qos: qos_from_config(config.qos),
        },
        rx,
    )
}

impl MqttClient {
    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, self.qos)
            .await
            .map_err(|e| BridgeError::Mqtt {
                message: format!("subscribe '{}' failed: {}", topic, e),
            })
    }

    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>, retain: bool) -> Result<()> {
        self.client
            .publish(topic, self.qos, retain, payload.into())
            .await
            .map_err(|e| BridgeError::Mqtt {
                message: format!("publish '{}' failed: {}", topic, e),
            })
    }

    /// Publish a JSON value
    pub async fn publish_json(
        &self,
        topic: &str,
        value: &serde_json::Value,
        retain: bool,
    ) -> Result<()> {
        self.publish(topic, value.to_string().into_bytes(), retain)
            .await
    }
}
