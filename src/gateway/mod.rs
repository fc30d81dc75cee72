//! Gateway orchestration
//!
//! Wires the pieces together: serial bytes feed the frame decoder, decoded
//! telegrams go through the translator, reports are published to MQTT, and
//! MQTT commands come back down the same path in reverse.
//!
//! Error policy: framing and per-telegram errors are logged and counted, the
//! loop keeps running. Only transport loss or shutdown ends the run.

pub mod equipment;
pub mod publisher;
pub mod translator;

pub use equipment::{Equipment, EquipmentRegistry, LearnState};
pub use translator::{EquipmentTranslator, Inbound, SignalQuality, TranslationError};

use crate::codec::{encode_frame, FrameDecoder, PacketType, Telegram};
use crate::config::GatewayConfig;
use crate::constants::SHUTDOWN_POLL_INTERVAL_MS;
use crate::error::Result;
use crate::mqtt::{MqttClient, MqttMessage};
use crate::transport::TransportChannels;
use bytes::Bytes;
use publisher::{
    format_data_message, parse_command_payload, TopicLayout, LAST_SEEN_TOPIC_KEY,
    REPEATED_TOPIC_KEY, RSSI_TOPIC_KEY,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The running gateway: translator + topic layout + publish policy
pub struct Gateway {
    translator: Arc<EquipmentTranslator>,
    topics: TopicLayout,
    use_key_shortcut: bool,
    publish_internal: bool,
}

impl Gateway {
    pub fn new(translator: Arc<EquipmentTranslator>, config: &GatewayConfig) -> Self {
        Self {
            translator,
            topics: TopicLayout::new(&config.topic_prefix),
            use_key_shortcut: config.use_key_shortcut,
            publish_internal: config.publish_internal,
        }
    }

    pub fn topics(&self) -> &TopicLayout {
        &self.topics
    }

    /// Run until shutdown or transport loss
    pub async fn run(
        &self,
        serial: TransportChannels,
        mqtt: MqttClient,
        mut commands: mpsc::Receiver<MqttMessage>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        let TransportChannels {
            rx: mut serial_rx,
            tx: serial_tx,
        } = serial;

        self.announce(&mqtt).await;

        let mut decoder = FrameDecoder::new();
        let mut framing_errors: u64 = 0;

        loop {
            tokio::select! {
                biased;

                // Periodic shutdown check
                _ = tokio::time::sleep(Duration::from_millis(SHUTDOWN_POLL_INTERVAL_MS)) => {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                }

                // Adapter -> MQTT
                chunk = serial_rx.recv() => match chunk {
                    Some(bytes) => {
                        decoder.extend(&bytes);
                        self.drain_telegrams(&mut decoder, &mqtt, &mut framing_errors).await;
                    }
                    None => {
                        warn!("serial transport stopped");
                        break;
                    }
                },

                // MQTT -> adapter
                command = commands.recv() => match command {
                    Some(message) => self.handle_command(message, &serial_tx, &mqtt).await,
                    None => {
                        warn!("MQTT event loop stopped");
                        break;
                    }
                },
            }
        }

        if self.publish_internal {
            let _ = mqtt.publish(&self.topics.status(), "OFFLINE", true).await;
        }
        info!(
            "gateway stopped, {} framing errors over the run",
            framing_errors
        );
        Ok(())
    }

    /// Publish startup state and subscribe the command topics
    async fn announce(&self, mqtt: &MqttClient) {
        if let Err(e) = mqtt.subscribe(&self.topics.learn()).await {
            warn!("{}", e);
        }
        for equipment in self.translator.equipment().iter() {
            let topic = self.topics.equipment_request(&equipment.name);
            if let Err(e) = mqtt.subscribe(&topic).await {
                warn!("{}", e);
            }
        }
        if self.publish_internal {
            let _ = mqtt.publish(&self.topics.status(), "ONLINE", true).await;
            let _ = mqtt
                .publish(
                    &self.topics.teach_in(),
                    if self.translator.learn_enabled() { "ON" } else { "OFF" },
                    true,
                )
                .await;
            let equipments: Vec<_> = self
                .translator
                .equipment()
                .iter()
                .map(|e| {
                    json!({
                        "name": e.name,
                        "address": e.address.to_string(),
                        "eep": e.profile.key.to_string(),
                        "description": e.profile.description,
                    })
                })
                .collect();
            let _ = mqtt
                .publish_json(&self.topics.equipments(), &json!(equipments), true)
                .await;
        }
    }

    /// Decode every complete telegram currently buffered
    async fn drain_telegrams(
        &self,
        decoder: &mut FrameDecoder,
        mqtt: &MqttClient,
        framing_errors: &mut u64,
    ) {
        loop {
            match decoder.next_telegram() {
                Ok(Some(telegram)) => self.handle_telegram(telegram, mqtt).await,
                Ok(None) => break,
                Err(e) => {
                    *framing_errors += 1;
                    warn!("framing error: {}", e);
                }
            }
        }
    }

    async fn handle_telegram(&self, telegram: Telegram, mqtt: &MqttClient) {
        match telegram.packet_type {
            PacketType::RadioErp1 => match self.translator.on_inbound(&telegram) {
                Ok(Inbound::Data {
                    equipment,
                    values,
                    signal,
                }) => {
                    let topic = self.topics.equipment(&equipment.name);
                    let message = format_data_message(&values, &signal, self.use_key_shortcut);
                    if let Err(e) = mqtt.publish_json(&topic, &message, false).await {
                        warn!("{}", e);
                    }
                    self.publish_signal_meta(&equipment.name, &signal, mqtt).await;
                }
                Ok(Inbound::TeachIn {
                    equipment,
                    accepted,
                    signal,
                }) => {
                    if accepted {
                        info!("teach-in accepted for {}", equipment);
                        let event = json!({
                            "equipment": equipment.name,
                            "address": equipment.address.to_string(),
                            "at": signal.seen_at.to_rfc3339(),
                        });
                        let _ = mqtt.publish_json(&self.topics.teach_in(), &event, false).await;
                    } else {
                        info!(
                            "teach-in from {} ignored, learn mode is disabled",
                            equipment.address
                        );
                    }
                }
                Err(TranslationError::UnknownEquipment(address)) => {
                    debug!("telegram from unknown address {}, disregarded", address);
                }
                Err(e) => warn!("{}", e),
            },
            PacketType::Response => {
                debug!(
                    "adapter response, return code {:?}",
                    telegram.data.first()
                );
            }
            PacketType::Event => {
                info!("adapter event: {:?}", telegram.data);
            }
            other => {
                debug!("unsupported packet type {:?}, skipped", other);
            }
        }
    }

    async fn publish_signal_meta(&self, name: &str, signal: &SignalQuality, mqtt: &MqttClient) {
        if let Some(rssi) = signal.rssi_dbm {
            let topic = self.topics.equipment_meta(name, RSSI_TOPIC_KEY);
            let _ = mqtt.publish(&topic, rssi.to_string(), false).await;
        }
        let topic = self.topics.equipment_meta(name, REPEATED_TOPIC_KEY);
        let _ = mqtt.publish(&topic, signal.repeated.to_string(), false).await;
        let topic = self.topics.equipment_meta(name, LAST_SEEN_TOPIC_KEY);
        let _ = mqtt
            .publish(&topic, signal.seen_at.to_rfc3339(), false)
            .await;
    }

    /// Handle one inbound MQTT message (learn toggle or equipment command)
    async fn handle_command(
        &self,
        message: MqttMessage,
        serial_tx: &mpsc::Sender<Bytes>,
        mqtt: &MqttClient,
    ) {
        if message.topic == self.topics.learn() {
            self.handle_learn_request(&message.payload, mqtt).await;
            return;
        }

        let Some(name) = self.topics.equipment_from_request(&message.topic) else {
            debug!("message on unexpected topic {}", message.topic);
            return;
        };
        let Some(equipment) = self.translator.equipment().by_name(name) else {
            warn!("command for unknown equipment '{}'", name);
            return;
        };
        let values = match parse_command_payload(&message.payload) {
            Ok(values) => values,
            Err(reason) => {
                warn!("rejected command for '{}': {}", name, reason);
                return;
            }
        };
        let telegram = match self.translator.build_outbound(&equipment, &values) {
            Ok(telegram) => telegram,
            Err(e) => {
                warn!("rejected command: {}", e);
                return;
            }
        };
        match encode_frame(&telegram) {
            Ok(bytes) => {
                debug!("sending {} byte frame to {}", bytes.len(), equipment);
                if serial_tx.try_send(Bytes::from(bytes)).is_err() {
                    warn!("serial transmit queue full, command dropped");
                }
            }
            Err(e) => warn!("cannot frame outbound telegram: {}", e),
        }
    }

    async fn handle_learn_request(&self, payload: &[u8], mqtt: &MqttClient) {
        let command = String::from_utf8_lossy(payload).trim().to_uppercase();
        match command.as_str() {
            "ON" => {
                self.translator.set_learn_enabled(true);
                info!("gateway teach-in mode enabled");
            }
            "OFF" => {
                self.translator.set_learn_enabled(false);
                info!("gateway teach-in mode disabled");
            }
            other => {
                warn!("unsupported learn command: {}", other);
                return;
            }
        }
        if self.publish_internal {
            let _ = mqtt.publish(&self.topics.teach_in(), command, true).await;
        }
    }
}
