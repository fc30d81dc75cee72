//! MQTT topic layout and payload formatting
//!
//! One topic per equipment under a common prefix, JSON value maps as
//! payloads, `$`-prefixed metadata sub-topics, and the gateway's own state
//! under `_gateway/`. The `_`/`$` prefixes keep internal keys clear of any
//! profile field name.

use super::translator::SignalQuality;
use crate::profile::{DecodedValue, FieldValue};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const GATEWAY_STATUS_TOPIC: &str = "_gateway/status";
pub const GATEWAY_TEACH_IN_TOPIC: &str = "_gateway/teach-in";
pub const GATEWAY_EQUIPMENTS_TOPIC: &str = "_gateway/equipments";
pub const REQUEST_TOPIC_SUFFIX: &str = "/req";
pub const RSSI_TOPIC_KEY: &str = "$rssi";
pub const REPEATED_TOPIC_KEY: &str = "$repeated";
pub const LAST_SEEN_TOPIC_KEY: &str = "$last_seen";

/// Timestamp key inside JSON messages; underscore-prefixed so it can never
/// collide with a profile field name
const TIMESTAMP_MESSAGE_KEY: &str = "_timestamp";
const RSSI_MESSAGE_KEY: &str = "_rssi";
const REPEATED_MESSAGE_KEY: &str = "_repeated";

/// Topic tree rooted at the configured prefix
#[derive(Debug, Clone)]
pub struct TopicLayout {
    prefix: String,
}

impl TopicLayout {
    /// `prefix` gets a trailing slash when non-empty
    pub fn new(prefix: &str) -> Self {
        let prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        };
        Self { prefix }
    }

    pub fn equipment(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn equipment_request(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, REQUEST_TOPIC_SUFFIX)
    }

    pub fn learn(&self) -> String {
        format!("{}learn", self.prefix)
    }

    pub fn status(&self) -> String {
        format!("{}{}", self.prefix, GATEWAY_STATUS_TOPIC)
    }

    pub fn teach_in(&self) -> String {
        format!("{}{}", self.prefix, GATEWAY_TEACH_IN_TOPIC)
    }

    pub fn equipments(&self) -> String {
        format!("{}{}", self.prefix, GATEWAY_EQUIPMENTS_TOPIC)
    }

    /// Metadata sub-topic of one equipment, e.g. `…/office_temp/$rssi`
    pub fn equipment_meta(&self, name: &str, key: &str) -> String {
        format!("{}{}/{}", self.prefix, name, key)
    }

    /// Extract the equipment name out of a `…/req` command topic
    pub fn equipment_from_request<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(REQUEST_TOPIC_SUFFIX)
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}

/// Format one decoded report as the equipment's JSON message
///
/// Keys are field descriptions (or shortcuts when `use_shortcut`), each value
/// field with a unit gains a `<key>|unit` entry, and the timestamp/signal
/// metadata rides along under underscore keys.
pub fn format_data_message(
    values: &BTreeMap<String, DecodedValue>,
    signal: &SignalQuality,
    use_shortcut: bool,
) -> Value {
    let mut message = Map::new();
    for value in values.values() {
        let key = if use_shortcut {
            value.shortcut.clone()
        } else {
            value.name.clone()
        };
        if let Some(unit) = &value.unit {
            message.insert(format!("{}|unit", key), json!(unit));
        }
        let json_value = match &value.value {
            FieldValue::Number(n) => json!(n),
            FieldValue::Label(l) => json!(l),
        };
        message.insert(key, json_value);
    }
    message.insert(
        TIMESTAMP_MESSAGE_KEY.to_string(),
        json!(signal.seen_at.to_rfc3339()),
    );
    if let Some(rssi) = signal.rssi_dbm {
        message.insert(RSSI_MESSAGE_KEY.to_string(), json!(rssi));
    }
    message.insert(REPEATED_MESSAGE_KEY.to_string(), json!(signal.repeated));
    Value::Object(message)
}

/// Parse an inbound `…/req` JSON payload into a command value map
///
/// Accepts an object of numbers and strings: `{"SP": 21.5, "EB": "pressed"}`.
pub fn parse_command_payload(payload: &[u8]) -> Result<BTreeMap<String, FieldValue>, String> {
    let parsed: Value =
        serde_json::from_slice(payload).map_err(|e| format!("payload is not JSON: {}", e))?;
    let Value::Object(object) = parsed else {
        return Err("payload must be a JSON object".to_string());
    };
    let mut values = BTreeMap::new();
    for (key, value) in object {
        let field_value = match value {
            Value::Number(n) => FieldValue::Number(
                n.as_f64()
                    .ok_or_else(|| format!("value of '{}' is not a finite number", key))?,
            ),
            Value::String(s) => FieldValue::Label(s),
            Value::Bool(b) => FieldValue::Number(if b { 1.0 } else { 0.0 }),
            other => {
                return Err(format!(
                    "value of '{}' must be a number or string, got {}",
                    key, other
                ))
            }
        };
        values.insert(key, field_value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_signal() -> SignalQuality {
        SignalQuality {
            rssi_dbm: Some(-62),
            repeated: false,
            seen_at: chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        }
    }

    fn sample_values() -> BTreeMap<String, DecodedValue> {
        let mut values = BTreeMap::new();
        values.insert(
            "TMP".to_string(),
            DecodedValue {
                shortcut: "TMP".into(),
                name: "Temperature".into(),
                raw: 128,
                value: FieldValue::Number(20.08),
                unit: Some("°C".into()),
            },
        );
        values.insert(
            "EB".to_string(),
            DecodedValue {
                shortcut: "EB".into(),
                name: "Energy bow".into(),
                raw: 1,
                value: FieldValue::Label("pressed".into()),
                unit: None,
            },
        );
        values
    }

    #[test]
    fn test_topic_layout_with_prefix() {
        let topics = TopicLayout::new("enocean");
        assert_eq!(topics.equipment("office_temp"), "enocean/office_temp");
        assert_eq!(
            topics.equipment_request("office_temp"),
            "enocean/office_temp/req"
        );
        assert_eq!(topics.learn(), "enocean/learn");
        assert_eq!(topics.status(), "enocean/_gateway/status");
        assert_eq!(
            topics.equipment_meta("office_temp", RSSI_TOPIC_KEY),
            "enocean/office_temp/$rssi"
        );
    }

    #[test]
    fn test_topic_layout_empty_prefix() {
        let topics = TopicLayout::new("");
        assert_eq!(topics.equipment("door"), "door");
        assert_eq!(topics.learn(), "learn");
    }

    #[test]
    fn test_equipment_from_request_topic() {
        let topics = TopicLayout::new("enocean");
        assert_eq!(
            topics.equipment_from_request("enocean/office_temp/req"),
            Some("office_temp")
        );
        assert_eq!(topics.equipment_from_request("enocean/office_temp"), None);
        assert_eq!(topics.equipment_from_request("other/office_temp/req"), None);
        assert_eq!(topics.equipment_from_request("enocean/req"), None);
    }

    #[test]
    fn test_format_data_message_descriptions() {
        let message = format_data_message(&sample_values(), &sample_signal(), false);
        assert_eq!(message["Temperature"], json!(20.08));
        assert_eq!(message["Temperature|unit"], json!("°C"));
        assert_eq!(message["Energy bow"], json!("pressed"));
        assert_eq!(message["_rssi"], json!(-62));
        assert_eq!(message["_repeated"], json!(false));
        assert!(message["_timestamp"].as_str().unwrap().starts_with("2026-03-14"));
    }

    #[test]
    fn test_format_data_message_shortcuts() {
        let message = format_data_message(&sample_values(), &sample_signal(), true);
        assert_eq!(message["TMP"], json!(20.08));
        assert_eq!(message["TMP|unit"], json!("°C"));
        assert_eq!(message["EB"], json!("pressed"));
        assert!(message.get("Temperature").is_none());
    }

    #[test]
    fn test_parse_command_payload() {
        let values = parse_command_payload(br#"{"SP": 21.5, "EB": "pressed", "ON": true}"#).unwrap();
        assert_eq!(values["SP"], FieldValue::Number(21.5));
        assert_eq!(values["EB"], FieldValue::Label("pressed".into()));
        assert_eq!(values["ON"], FieldValue::Number(1.0));
    }

    #[test]
    fn test_parse_command_payload_rejects_non_object() {
        assert!(parse_command_payload(b"[1, 2]").is_err());
        assert!(parse_command_payload(b"not json").is_err());
    }

    #[test]
    fn test_parse_command_payload_rejects_nested_value() {
        let err = parse_command_payload(br#"{"SP": {"nested": 1}}"#).unwrap_err();
        assert!(err.contains("SP"));
    }
}
