//! Field definitions for Equipment Profiles
//!
//! A [`FieldSpec`] names one bit range of a telegram payload and how its raw
//! integer maps to a usable value: an affine scale, an enumeration table, or
//! the raw number itself.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Affine mapping between a raw integer range and a scaled physical range
///
/// Ranges may be inverted (e.g. raw 255..0 mapping to 0..40 °C); the formula
/// handles that without special cases. Out-of-range raw values scale linearly
/// past the declared bounds, no clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub raw_min: f64,
    pub raw_max: f64,
    pub scaled_min: f64,
    pub scaled_max: f64,
}

impl Scale {
    pub fn new(raw_min: f64, raw_max: f64, scaled_min: f64, scaled_max: f64) -> Self {
        Self {
            raw_min,
            raw_max,
            scaled_min,
            scaled_max,
        }
    }

    /// Raw integer to scaled value
    pub fn to_scaled(&self, raw: u64) -> f64 {
        self.scaled_min
            + (raw as f64 - self.raw_min) * (self.scaled_max - self.scaled_min)
                / (self.raw_max - self.raw_min)
    }

    /// Scaled value back to the (unrounded) raw axis
    pub fn to_raw(&self, scaled: f64) -> f64 {
        self.raw_min
            + (scaled - self.scaled_min) * (self.raw_max - self.raw_min)
                / (self.scaled_max - self.scaled_min)
    }
}

/// One named bit range within a profile payload
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Short identifier used as the value key (e.g. "TMP")
    pub shortcut: String,
    /// Human-readable description (e.g. "Temperature (linear)")
    pub name: String,
    /// Bit 0 = most-significant bit of the first payload byte
    pub bit_offset: usize,
    pub bit_len: usize,
    pub scale: Option<Scale>,
    pub enum_values: Option<BTreeMap<u64, String>>,
    pub unit: Option<String>,
}

impl FieldSpec {
    pub fn new(
        shortcut: impl Into<String>,
        name: impl Into<String>,
        bit_offset: usize,
        bit_len: usize,
    ) -> Self {
        Self {
            shortcut: shortcut.into(),
            name: name.into(),
            bit_offset,
            bit_len,
            scale: None,
            enum_values: None,
            unit: None,
        }
    }

    pub fn with_scale(mut self, raw_min: f64, raw_max: f64, scaled_min: f64, scaled_max: f64) -> Self {
        self.scale = Some(Scale::new(raw_min, raw_max, scaled_min, scaled_max));
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_enum<L: Into<String>>(mut self, items: impl IntoIterator<Item = (u64, L)>) -> Self {
        self.enum_values = Some(items.into_iter().map(|(k, v)| (k, v.into())).collect());
        self
    }

    /// End of the bit range, exclusive
    pub fn bit_end(&self) -> usize {
        self.bit_offset + self.bit_len
    }

    /// Whether this field's bit range intersects another's
    pub fn overlaps(&self, other: &FieldSpec) -> bool {
        self.bit_offset < other.bit_end() && other.bit_offset < self.bit_end()
    }
}

/// Decoded field content: a number or an enumeration label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Label(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Label(l) => write!(f, "{}", l),
        }
    }
}

/// One decoded field, handed to the publisher and dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedValue {
    pub shortcut: String,
    pub name: String,
    /// Raw integer as extracted from the payload bits
    pub raw: u64,
    pub value: FieldValue,
    pub unit: Option<String>,
}
