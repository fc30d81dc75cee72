//! Configuration management
//!
//! One TOML file with `[serial]`, `[mqtt]` and `[gateway]` sections plus a
//! `[[equipment]]` array binding radio addresses to profiles:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//!
//! [mqtt]
//! host = "localhost"
//!
//! [[equipment]]
//! address = "01:A2:B3:C4"
//! eep = "A5-02-05"
//! name = "office_temp"
//! ```

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_MQTT_KEEPALIVE_SECS, DEFAULT_MQTT_PORT, DEFAULT_SENDER_ADDRESS,
    DEFAULT_TOPIC_PREFIX,
};
use crate::error::{BridgeError, Result};
use crate::profile::ProfileKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub mqtt: MqttConfig,
    pub gateway: GatewayConfig,
    pub equipment: Vec<EquipmentEntry>,
}

// =============================================================================
// Serial
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port of the EnOcean adapter (e.g. "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

// =============================================================================
// MQTT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    /// Client id; a fixed default keeps broker-side state stable
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// QoS for publishes and subscriptions (0, 1 or 2)
    pub qos: u8,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_MQTT_PORT,
            client_id: "eno-bridge".to_string(),
            username: None,
            password: None,
            keep_alive_secs: DEFAULT_MQTT_KEEPALIVE_SECS,
            qos: 1,
        }
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Topic prefix for every published/subscribed topic
    pub topic_prefix: String,
    /// Sender address stamped on outbound telegrams (the adapter's base id)
    pub sender_address: String,
    /// Publish field shortcuts as JSON keys instead of descriptions
    pub use_key_shortcut: bool,
    /// Publish gateway status/equipment topics under `_gateway/`
    pub publish_internal: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            sender_address: DEFAULT_SENDER_ADDRESS.to_string(),
            use_key_shortcut: false,
            publish_internal: true,
        }
    }
}

// =============================================================================
// Equipment
// =============================================================================

/// One configured device binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentEntry {
    /// Radio address, `AA:BB:CC:DD` or `AABBCCDD`
    pub address: String,
    /// Profile code, `RR-FF-TT` (e.g. "A5-02-05")
    pub eep: String,
    /// Topic name; the address is used when absent
    #[serde(default)]
    pub name: Option<String>,
}

impl EquipmentEntry {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.address.clone())
    }

    /// Parse the `eep` code into a registry key
    pub fn profile_key(&self) -> std::result::Result<ProfileKey, String> {
        let parts: Vec<&str> = self.eep.split('-').collect();
        if parts.len() != 3 {
            return Err(format!("invalid eep '{}': expected RR-FF-TT", self.eep));
        }
        let parse = |part: &str| {
            u8::from_str_radix(part, 16)
                .map_err(|_| format!("invalid eep '{}': not hexadecimal", self.eep))
        };
        Ok(ProfileKey::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
        ))
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and validate the config file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = toml::from_str(&content).map_err(|e| BridgeError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.serial.port.is_empty() {
        return Err(BridgeError::ConfigValidation {
            field: "serial.port",
            reason: "no serial port configured".into(),
        });
    }
    if config.mqtt.qos > 2 {
        return Err(BridgeError::ConfigValidation {
            field: "mqtt.qos",
            reason: format!("{} is not a valid QoS level", config.mqtt.qos),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
