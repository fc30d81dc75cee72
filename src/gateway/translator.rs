//! Equipment translator
//!
//! Composes the frame codec, the equipment table and the profile codec:
//! inbound telegrams become per-equipment value sets with signal metadata,
//! outbound command maps become radio telegrams. Teach-in telegrams are
//! reported as their own variant so the messaging layer can tell them apart
//! from sensor readings.
//!
//! Every operation here is synchronous and error-isolated: a failed telegram
//! never affects the next one.

use super::equipment::{Equipment, EquipmentRegistry};
use crate::codec::telegram::rorg;
use crate::codec::{EnoceanAddress, PacketType, Telegram};
use crate::profile::codec as profile_codec;
use crate::profile::{CodecError, DecodedValue, FieldValue};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-telegram translation errors, reported and never fatal
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Packet type carries no radio telegram to translate
    NotRadioTelegram(PacketType),
    /// Data block too short for the ERP1 layout
    TruncatedTelegram { len: usize },
    /// Sender address matches no configured equipment
    UnknownEquipment(EnoceanAddress),
    DecodeFailed { equipment: String, cause: CodecError },
    EncodeFailed { equipment: String, cause: CodecError },
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRadioTelegram(ty) => {
                write!(f, "packet type {:?} is not a radio telegram", ty)
            }
            Self::TruncatedTelegram { len } => {
                write!(f, "radio telegram data too short ({} bytes)", len)
            }
            Self::UnknownEquipment(address) => {
                write!(f, "no equipment configured for address {}", address)
            }
            Self::DecodeFailed { equipment, cause } => {
                write!(f, "decode failed for '{}': {}", equipment, cause)
            }
            Self::EncodeFailed { equipment, cause } => {
                write!(f, "encode failed for '{}': {}", equipment, cause)
            }
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DecodeFailed { cause, .. } | Self::EncodeFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Signal metadata attached to every inbound report
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuality {
    /// Received signal strength; absent when the optional block is missing
    pub rssi_dbm: Option<i16>,
    /// Whether the telegram came through a repeater
    pub repeated: bool,
    pub seen_at: DateTime<Utc>,
}

/// One translated inbound telegram
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Decoded sensor/actuator report
    Data {
        equipment: Arc<Equipment>,
        values: BTreeMap<String, DecodedValue>,
        signal: SignalQuality,
    },
    /// Teach-in telegram; `accepted` reflects the gateway learn mode
    TeachIn {
        equipment: Arc<Equipment>,
        accepted: bool,
        signal: SignalQuality,
    },
}

/// Translator between telegrams and per-equipment value sets
pub struct EquipmentTranslator {
    equipment: EquipmentRegistry,
    /// Sender address stamped on outbound telegrams (the adapter's own id)
    sender_address: EnoceanAddress,
    learn_enabled: AtomicBool,
}

impl EquipmentTranslator {
    pub fn new(equipment: EquipmentRegistry, sender_address: EnoceanAddress) -> Self {
        Self {
            equipment,
            sender_address,
            learn_enabled: AtomicBool::new(false),
        }
    }

    pub fn equipment(&self) -> &EquipmentRegistry {
        &self.equipment
    }

    /// Gateway-wide learn mode, toggled from the messaging layer
    pub fn set_learn_enabled(&self, enabled: bool) {
        self.learn_enabled.store(enabled, Ordering::Release);
    }

    pub fn learn_enabled(&self) -> bool {
        self.learn_enabled.load(Ordering::Acquire)
    }

    /// Translate one inbound radio telegram
    pub fn on_inbound(&self, telegram: &Telegram) -> Result<Inbound, TranslationError> {
        if telegram.packet_type != PacketType::RadioErp1 {
            return Err(TranslationError::NotRadioTelegram(telegram.packet_type));
        }
        let sender = telegram
            .sender()
            .ok_or(TranslationError::TruncatedTelegram {
                len: telegram.data.len(),
            })?;
        let equipment = self
            .equipment
            .by_address(sender)
            .ok_or(TranslationError::UnknownEquipment(sender))?;

        let signal = SignalQuality {
            rssi_dbm: telegram.dbm(),
            repeated: telegram.is_repeated(),
            seen_at: Utc::now(),
        };

        if telegram.rorg() == Some(rorg::UTE) {
            let accepted = self.learn_enabled();
            if accepted {
                equipment.mark_learned();
            }
            return Ok(Inbound::TeachIn {
                equipment,
                accepted,
                signal,
            });
        }

        let values = profile_codec::decode(&equipment.profile, telegram.user_payload()).map_err(
            |cause| TranslationError::DecodeFailed {
                equipment: equipment.name.clone(),
                cause,
            },
        )?;

        Ok(Inbound::Data {
            equipment,
            values,
            signal,
        })
    }

    /// Build an outbound radio telegram for a command value map
    ///
    /// The data block carries the profile's rorg, the encoded payload, the
    /// gateway sender address and a zero status byte; the equipment address
    /// goes into the optional block as destination.
    pub fn build_outbound(
        &self,
        equipment: &Arc<Equipment>,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<Telegram, TranslationError> {
        let payload = profile_codec::encode(&equipment.profile, values).map_err(|cause| {
            TranslationError::EncodeFailed {
                equipment: equipment.name.clone(),
                cause,
            }
        })?;

        let mut data = Vec::with_capacity(payload.len() + 6);
        data.push(equipment.profile.key.rorg);
        data.extend_from_slice(&payload);
        data.extend_from_slice(self.sender_address.as_bytes());
        data.push(0x00);
        Ok(Telegram::radio(data, equipment.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::equipment::LearnState;
    use crate::profile::catalog;

    fn translator() -> EquipmentTranslator {
        let profiles = catalog::builtin().unwrap();
        let mut registry = EquipmentRegistry::new();
        registry.insert(Equipment::new(
            EnoceanAddress([0x01, 0x02, 0x03, 0x04]),
            "office_temp",
            profiles.lookup(0xA5, 0x02, 0x05).unwrap(),
        ));
        registry.insert(Equipment::new(
            EnoceanAddress([0x05, 0x06, 0x07, 0x08]),
            "wall_switch",
            profiles.lookup(0xF6, 0x02, 0x01).unwrap(),
        ));
        EquipmentTranslator::new(registry, EnoceanAddress([0xFF, 0xD9, 0x6E, 0x02]))
    }

    /// 4BS telegram from office_temp: raw temperature byte 0x80, data bit set
    fn temp_telegram() -> Telegram {
        Telegram::new(
            PacketType::RadioErp1,
            vec![0xA5, 0x00, 0x00, 0x80, 0x08, 0x01, 0x02, 0x03, 0x04, 0x00],
            vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x2D, 0x00],
        )
    }

    fn ute_telegram(sender: [u8; 4]) -> Telegram {
        let mut data = vec![0xD4, 0xA0, 0xFF, 0x3E, 0x00, 0x05, 0x02, 0xA5];
        data.extend_from_slice(&sender);
        data.push(0x00);
        Telegram::new(PacketType::RadioErp1, data, vec![])
    }

    #[test]
    fn test_inbound_data_decodes_through_configured_profile() {
        let translator = translator();
        let inbound = translator.on_inbound(&temp_telegram()).unwrap();
        let Inbound::Data {
            equipment,
            values,
            signal,
        } = inbound
        else {
            panic!("expected data report");
        };
        assert_eq!(equipment.name, "office_temp");
        assert_eq!(values["TMP"].raw, 0x80);
        assert_eq!(signal.rssi_dbm, Some(-45));
        assert!(!signal.repeated);
    }

    #[test]
    fn test_inbound_repeated_flag() {
        let mut telegram = temp_telegram();
        let last = telegram.data.len() - 1;
        telegram.data[last] = 0x01; // one repeater hop
        let translator = translator();
        let Inbound::Data { signal, .. } = translator.on_inbound(&telegram).unwrap() else {
            panic!("expected data report");
        };
        assert!(signal.repeated);
    }

    #[test]
    fn test_inbound_unknown_equipment() {
        let translator = translator();
        let mut telegram = temp_telegram();
        // Rewrite the sender address to something unconfigured
        let len = telegram.data.len();
        telegram.data[len - 5..len - 1].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);

        let err = translator.on_inbound(&telegram).unwrap_err();
        assert_eq!(
            err,
            TranslationError::UnknownEquipment(EnoceanAddress([0xAA, 0xBB, 0xCC, 0xDD]))
        );
        // Subsequent telegrams are unaffected
        assert!(translator.on_inbound(&temp_telegram()).is_ok());
    }

    #[test]
    fn test_inbound_non_radio_packet() {
        let translator = translator();
        let telegram = Telegram::new(PacketType::Response, vec![0x00], vec![]);
        assert_eq!(
            translator.on_inbound(&telegram).unwrap_err(),
            TranslationError::NotRadioTelegram(PacketType::Response)
        );
    }

    #[test]
    fn test_teach_in_accepted_when_learn_enabled() {
        let translator = translator();
        translator.set_learn_enabled(true);
        let inbound = translator
            .on_inbound(&ute_telegram([0x01, 0x02, 0x03, 0x04]))
            .unwrap();
        let Inbound::TeachIn {
            equipment,
            accepted,
            ..
        } = inbound
        else {
            panic!("expected teach-in report");
        };
        assert!(accepted);
        assert_eq!(equipment.learn_state(), LearnState::Learned);
    }

    #[test]
    fn test_teach_in_gated_when_learn_disabled() {
        let translator = translator();
        let inbound = translator
            .on_inbound(&ute_telegram([0x01, 0x02, 0x03, 0x04]))
            .unwrap();
        let Inbound::TeachIn {
            equipment,
            accepted,
            ..
        } = inbound
        else {
            panic!("expected teach-in report");
        };
        assert!(!accepted);
        assert_eq!(equipment.learn_state(), LearnState::Unlearned);
    }

    #[test]
    fn test_decode_failure_names_equipment() {
        let translator = translator();
        // 4BS data block with a truncated payload: rorg + 2 payload bytes
        // + sender + status. TMP needs bits 16..24 of a 2-byte payload.
        let telegram = Telegram::new(
            PacketType::RadioErp1,
            vec![0xA5, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00],
            vec![],
        );
        let err = translator.on_inbound(&telegram).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::DecodeFailed { equipment, cause: CodecError::PayloadTooShort { .. } }
                if equipment == "office_temp"
        ));
    }

    #[test]
    fn test_outbound_telegram_layout() {
        let translator = translator();
        let equipment = translator
            .equipment()
            .by_name("wall_switch")
            .unwrap();
        let mut values = BTreeMap::new();
        values.insert("EB".to_string(), FieldValue::Label("pressed".into()));
        values.insert("R1".to_string(), FieldValue::Label("BO".into()));

        let telegram = translator.build_outbound(&equipment, &values).unwrap();
        assert_eq!(telegram.packet_type, PacketType::RadioErp1);
        assert_eq!(telegram.rorg(), Some(0xF6));
        assert_eq!(telegram.user_payload(), &[0x70]);
        assert_eq!(
            telegram.sender(),
            Some(EnoceanAddress([0xFF, 0xD9, 0x6E, 0x02]))
        );
        assert_eq!(
            telegram.destination(),
            Some(EnoceanAddress([0x05, 0x06, 0x07, 0x08]))
        );
        assert_eq!(telegram.status(), Some(0x00));
    }

    #[test]
    fn test_outbound_encode_failure() {
        let translator = translator();
        let equipment = translator.equipment().by_name("wall_switch").unwrap();
        let mut values = BTreeMap::new();
        values.insert("BOGUS".to_string(), FieldValue::Number(1.0));
        let err = translator.build_outbound(&equipment, &values).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::EncodeFailed { equipment, cause: CodecError::UnknownShortcut { .. } }
                if equipment == "wall_switch"
        ));
    }
}
