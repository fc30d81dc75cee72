//! Payload codec driven by Equipment Profiles
//!
//! Decoding walks the profile's field specs and extracts each bit range from
//! the raw payload; encoding is the exact inverse into a zeroed buffer of the
//! profile's payload size class. Both directions validate strictly: an enum
//! value missing from the table or an integer that does not fit its bit width
//! is an error for that telegram, never a silent default.

use super::bits::{extract_bits, insert_bits};
use super::field::{DecodedValue, FieldSpec, FieldValue};
use super::registry::Profile;
use std::collections::BTreeMap;
use std::fmt;

/// Per-field codec errors
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// A field's bit range reaches past the actual payload
    PayloadTooShort {
        shortcut: String,
        needed_bits: usize,
        payload_bits: usize,
    },
    /// An encode value does not fit the field's bit width
    ValueOutOfRange {
        shortcut: String,
        value: f64,
        bit_len: usize,
    },
    /// A raw integer (decode) or label (encode) absent from the enum table
    UnknownEnumValue { shortcut: String, value: String },
    /// The command names a field the profile does not define
    UnknownShortcut { shortcut: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooShort {
                shortcut,
                needed_bits,
                payload_bits,
            } => write!(
                f,
                "payload too short for field '{}': needs {} bits, payload has {}",
                shortcut, needed_bits, payload_bits
            ),
            Self::ValueOutOfRange {
                shortcut,
                value,
                bit_len,
            } => write!(
                f,
                "value {} for field '{}' does not fit in {} bits",
                value, shortcut, bit_len
            ),
            Self::UnknownEnumValue { shortcut, value } => {
                write!(f, "value '{}' not in enum table of field '{}'", value, shortcut)
            }
            Self::UnknownShortcut { shortcut } => {
                write!(f, "field '{}' not defined by profile", shortcut)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Decode a raw payload into `shortcut -> DecodedValue`
///
/// Field spans are checked against the actual payload length, not the
/// profile's nominal size class — the frame header is authoritative for how
/// many bytes really arrived.
pub fn decode(
    profile: &Profile,
    payload: &[u8],
) -> Result<BTreeMap<String, DecodedValue>, CodecError> {
    let mut values = BTreeMap::new();
    for field in &profile.fields {
        let raw = extract_bits(payload, field.bit_offset, field.bit_len).ok_or_else(|| {
            CodecError::PayloadTooShort {
                shortcut: field.shortcut.clone(),
                needed_bits: field.bit_end(),
                payload_bits: payload.len() * 8,
            }
        })?;

        let value = if let Some(table) = &field.enum_values {
            let label = table
                .get(&raw)
                .ok_or_else(|| CodecError::UnknownEnumValue {
                    shortcut: field.shortcut.clone(),
                    value: raw.to_string(),
                })?;
            FieldValue::Label(label.clone())
        } else if let Some(scale) = &field.scale {
            FieldValue::Number(scale.to_scaled(raw))
        } else {
            FieldValue::Number(raw as f64)
        };

        values.insert(
            field.shortcut.clone(),
            DecodedValue {
                shortcut: field.shortcut.clone(),
                name: field.name.clone(),
                raw,
                value,
                unit: field.unit.clone(),
            },
        );
    }
    Ok(values)
}

/// Encode `shortcut -> value` into a payload of the profile's size class
///
/// Bits not covered by any named field stay zero. Every value is validated
/// against its field's bit width before packing.
pub fn encode(
    profile: &Profile,
    values: &BTreeMap<String, FieldValue>,
) -> Result<Vec<u8>, CodecError> {
    let mut payload = vec![0u8; profile.payload_len];
    for (shortcut, value) in values {
        let field = profile
            .field(shortcut)
            .ok_or_else(|| CodecError::UnknownShortcut {
                shortcut: shortcut.clone(),
            })?;
        let raw = raw_for_field(field, value)?;
        insert_bits(&mut payload, field.bit_offset, field.bit_len, raw);
    }
    Ok(payload)
}

/// Map one encode value to the raw integer for its field
fn raw_for_field(field: &FieldSpec, value: &FieldValue) -> Result<u64, CodecError> {
    let raw_float = match (value, &field.enum_values) {
        (FieldValue::Label(label), Some(table)) => {
            let raw = table
                .iter()
                .find(|(_, l)| l.as_str() == label.as_str())
                .map(|(raw, _)| *raw)
                .ok_or_else(|| CodecError::UnknownEnumValue {
                    shortcut: field.shortcut.clone(),
                    value: label.clone(),
                })?;
            return Ok(raw);
        }
        (FieldValue::Number(n), Some(table)) => {
            // Numeric selection of an enum item must hit the table exactly
            let raw = *n as u64;
            if n.fract() != 0.0 || *n < 0.0 || !table.contains_key(&raw) {
                return Err(CodecError::UnknownEnumValue {
                    shortcut: field.shortcut.clone(),
                    value: n.to_string(),
                });
            }
            return Ok(raw);
        }
        (FieldValue::Label(label), None) => {
            return Err(CodecError::UnknownEnumValue {
                shortcut: field.shortcut.clone(),
                value: label.clone(),
            });
        }
        (FieldValue::Number(n), None) => match &field.scale {
            Some(scale) => scale.to_raw(*n).round(),
            None => n.round(),
        },
    };

    let max = if field.bit_len >= 64 {
        u64::MAX as f64
    } else {
        ((1u64 << field.bit_len) - 1) as f64
    };
    if !raw_float.is_finite() || raw_float < 0.0 || raw_float > max {
        return Err(CodecError::ValueOutOfRange {
            shortcut: field.shortcut.clone(),
            value: raw_float,
            bit_len: field.bit_len,
        });
    }
    Ok(raw_float as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::registry::{Direction, ProfileKey};

    fn two_field_profile() -> Profile {
        Profile::new(
            ProfileKey::new(0xA5, 0x7F, 0x01),
            Direction::Telegram,
            "two plain fields",
            2,
            vec![
                FieldSpec::new("A", "field a", 0, 8),
                FieldSpec::new("B", "field b", 8, 4),
            ],
        )
    }

    fn temperature_profile() -> Profile {
        Profile::new(
            ProfileKey::new(0xA5, 0x02, 0x05),
            Direction::Telegram,
            "temperature 0..40",
            4,
            vec![FieldSpec::new("TMP", "Temperature (linear)", 16, 8)
                .with_scale(0.0, 255.0, 0.0, 40.0)
                .with_unit("°C")],
        )
    }

    fn switch_profile() -> Profile {
        Profile::new(
            ProfileKey::new(0xF6, 0x02, 0x01),
            Direction::Telegram,
            "rocker",
            1,
            vec![FieldSpec::new("EB", "Energy bow", 3, 1)
                .with_enum([(0u64, "released"), (1, "pressed")])],
        )
    }

    #[test]
    fn test_decode_plain_bit_fields() {
        let values = decode(&two_field_profile(), &[0xFF, 0xA0]).unwrap();
        assert_eq!(values["A"].raw, 255);
        assert_eq!(values["A"].value, FieldValue::Number(255.0));
        assert_eq!(values["B"].raw, 10);
        assert_eq!(values["B"].value, FieldValue::Number(10.0));
    }

    #[test]
    fn test_decode_scaled_field() {
        let values = decode(&temperature_profile(), &[0x00, 0x00, 0x80, 0x08]).unwrap();
        let FieldValue::Number(tmp) = &values["TMP"].value else {
            panic!("expected number");
        };
        assert!((tmp - 20.08).abs() < 0.01);
        assert_eq!(values["TMP"].unit.as_deref(), Some("°C"));
    }

    #[test]
    fn test_decode_enum_field() {
        let values = decode(&switch_profile(), &[0b0001_0000]).unwrap();
        assert_eq!(values["EB"].value, FieldValue::Label("pressed".into()));
        assert_eq!(values["EB"].raw, 1);
    }

    #[test]
    fn test_decode_unknown_enum_value() {
        let profile = Profile::new(
            ProfileKey::new(0xF6, 0x7F, 0x02),
            Direction::Telegram,
            "sparse enum",
            1,
            vec![FieldSpec::new("S", "sparse", 0, 4).with_enum([(0u64, "zero"), (3, "three")])],
        );
        let err = decode(&profile, &[0x20]).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownEnumValue {
                shortcut: "S".into(),
                value: "2".into()
            }
        );
    }

    #[test]
    fn test_decode_payload_too_short() {
        let err = decode(&temperature_profile(), &[0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PayloadTooShort { shortcut, needed_bits: 24, payload_bits: 16 }
                if shortcut == "TMP"
        ));
    }

    #[test]
    fn test_encode_plain_fields() {
        let mut values = BTreeMap::new();
        values.insert("A".to_string(), FieldValue::Number(255.0));
        values.insert("B".to_string(), FieldValue::Number(10.0));
        let payload = encode(&two_field_profile(), &values).unwrap();
        assert_eq!(payload, vec![0xFF, 0xA0]);
    }

    #[test]
    fn test_encode_uncovered_bits_stay_zero() {
        let mut values = BTreeMap::new();
        values.insert("B".to_string(), FieldValue::Number(0x0F as f64));
        let payload = encode(&two_field_profile(), &values).unwrap();
        assert_eq!(payload, vec![0x00, 0xF0]);
    }

    #[test]
    fn test_encode_scaled_roundtrip() {
        let profile = temperature_profile();
        let mut values = BTreeMap::new();
        values.insert("TMP".to_string(), FieldValue::Number(20.0));
        let payload = encode(&profile, &values).unwrap();
        let decoded = decode(&profile, &payload).unwrap();
        let FieldValue::Number(tmp) = &decoded["TMP"].value else {
            panic!("expected number");
        };
        // Within one raw quantization step of the 0..40 over 8-bit scale
        assert!((tmp - 20.0).abs() < 40.0 / 255.0);
    }

    #[test]
    fn test_encode_enum_label() {
        let mut values = BTreeMap::new();
        values.insert("EB".to_string(), FieldValue::Label("pressed".into()));
        let payload = encode(&switch_profile(), &values).unwrap();
        assert_eq!(payload, vec![0b0001_0000]);
    }

    #[test]
    fn test_encode_enum_unknown_label() {
        let mut values = BTreeMap::new();
        values.insert("EB".to_string(), FieldValue::Label("held".into()));
        let err = encode(&switch_profile(), &values).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownEnumValue {
                shortcut: "EB".into(),
                value: "held".into()
            }
        );
    }

    #[test]
    fn test_encode_value_out_of_range() {
        let mut values = BTreeMap::new();
        values.insert("B".to_string(), FieldValue::Number(16.0));
        let err = encode(&two_field_profile(), &values).unwrap_err();
        assert!(matches!(
            err,
            CodecError::ValueOutOfRange { shortcut, bit_len: 4, .. } if shortcut == "B"
        ));
    }

    #[test]
    fn test_encode_negative_value_rejected() {
        let mut values = BTreeMap::new();
        values.insert("A".to_string(), FieldValue::Number(-1.0));
        assert!(matches!(
            encode(&two_field_profile(), &values),
            Err(CodecError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_unknown_shortcut_named() {
        let mut values = BTreeMap::new();
        values.insert("NOPE".to_string(), FieldValue::Number(1.0));
        let err = encode(&two_field_profile(), &values).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownShortcut {
                shortcut: "NOPE".into()
            }
        );
    }
}
