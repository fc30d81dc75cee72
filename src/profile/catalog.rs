//! Built-in Equipment Profile catalog
//!
//! The catalog is constructed once at startup into the immutable registry;
//! nothing is parsed from files per telegram. Layouts follow the published
//! profile definitions: bit offsets count from the most-significant bit of
//! the first payload byte.

use super::field::FieldSpec;
use super::registry::{Direction, Profile, ProfileKey, ProfileRegistry, ProfileRegistryBuilder, RegistryError};
use crate::codec::telegram::rorg;

const ROCKER_ACTIONS: [(u64, &str); 4] = [(0, "AI"), (1, "AO"), (2, "BI"), (3, "BO")];

fn f6_02_01() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::RPS, 0x02, 0x01),
        Direction::Both,
        "Rocker switch, 2 rockers",
        1,
        vec![
            FieldSpec::new("R1", "Rocker 1st action", 0, 3).with_enum(ROCKER_ACTIONS),
            FieldSpec::new("EB", "Energy bow", 3, 1).with_enum([(0u64, "released"), (1, "pressed")]),
            FieldSpec::new("R2", "Rocker 2nd action", 4, 3).with_enum(ROCKER_ACTIONS),
            FieldSpec::new("SA", "2nd action", 7, 1)
                .with_enum([(0u64, "No 2nd action"), (1, "2nd action valid")]),
        ],
    )
}

fn d5_00_01() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::BS1, 0x00, 0x01),
        Direction::Telegram,
        "Single input contact",
        1,
        vec![
            FieldSpec::new("LRN", "Learn button", 4, 1)
                .with_enum([(0u64, "pressed"), (1, "not pressed")]),
            FieldSpec::new("CO", "Contact", 7, 1).with_enum([(0u64, "open"), (1, "closed")]),
        ],
    )
}

fn a5_02_05() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::BS4, 0x02, 0x05),
        Direction::Telegram,
        "Temperature sensor, 0°C to 40°C",
        4,
        vec![
            // Raw range is inverted on the wire: 255 is the cold end
            FieldSpec::new("TMP", "Temperature (linear)", 16, 8)
                .with_scale(255.0, 0.0, 0.0, 40.0)
                .with_unit("°C"),
            FieldSpec::new("LRNB", "Learn bit", 28, 1)
                .with_enum([(0u64, "Teach-in telegram"), (1, "Data telegram")]),
        ],
    )
}

fn a5_04_01() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::BS4, 0x04, 0x01),
        Direction::Telegram,
        "Temperature and humidity sensor",
        4,
        vec![
            FieldSpec::new("HUM", "Relative humidity", 8, 8)
                .with_scale(0.0, 250.0, 0.0, 100.0)
                .with_unit("%"),
            FieldSpec::new("TMP", "Temperature", 16, 8)
                .with_scale(0.0, 250.0, 0.0, 40.0)
                .with_unit("°C"),
            FieldSpec::new("LRNB", "Learn bit", 28, 1)
                .with_enum([(0u64, "Teach-in telegram"), (1, "Data telegram")]),
            FieldSpec::new("TSN", "Temperature sensor", 30, 1)
                .with_enum([(0u64, "not available"), (1, "available")]),
        ],
    )
}

fn a5_10_03() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::BS4, 0x10, 0x03),
        Direction::Telegram,
        "Room operating panel, temperature and set point",
        4,
        vec![
            FieldSpec::new("SP", "Set point", 8, 8),
            FieldSpec::new("TMP", "Temperature", 16, 8)
                .with_scale(255.0, 0.0, 0.0, 40.0)
                .with_unit("°C"),
            FieldSpec::new("LRNB", "Learn bit", 28, 1)
                .with_enum([(0u64, "Teach-in telegram"), (1, "Data telegram")]),
        ],
    )
}

fn a5_12_01() -> Profile {
    Profile::new(
        ProfileKey::new(rorg::BS4, 0x12, 0x01),
        Direction::Telegram,
        "Automated meter reading, electricity",
        4,
        vec![
            FieldSpec::new("MR", "Meter reading", 0, 24).with_unit("kWh"),
            FieldSpec::new("TI", "Tariff info", 24, 4),
            FieldSpec::new("LRNB", "Learn bit", 28, 1)
                .with_enum([(0u64, "Teach-in telegram"), (1, "Data telegram")]),
            FieldSpec::new("DT", "Data type", 29, 1)
                .with_enum([(0u64, "Cumulative value"), (1, "Current value")]),
            FieldSpec::new("DIV", "Divisor", 30, 2)
                .with_enum([(0u64, "x/1"), (1, "x/10"), (2, "x/100"), (3, "x/1000")]),
        ],
    )
}

/// Build the registry with every built-in profile
///
/// Construction errors are startup-fatal for the process; a malformed catalog
/// must not serve wrong data.
pub fn builtin() -> Result<ProfileRegistry, RegistryError> {
    let mut builder = ProfileRegistryBuilder::new();
    builder.register(f6_02_01())?;
    builder.register(d5_00_01())?;
    builder.register(a5_02_05())?;
    builder.register(a5_04_01())?;
    builder.register(a5_10_03())?;
    builder.register(a5_12_01())?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::codec::decode;
    use crate::profile::field::FieldValue;

    #[test]
    fn test_builtin_catalog_builds() {
        let registry = builtin().unwrap();
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_catalog_lookup_by_triple() {
        let registry = builtin().unwrap();
        let profile = registry.lookup(0xA5, 0x02, 0x05).unwrap();
        assert_eq!(profile.description, "Temperature sensor, 0°C to 40°C");
        assert!(registry.lookup(0xA5, 0x02, 0xFF).is_none());
    }

    #[test]
    fn test_rocker_switch_decode() {
        let registry = builtin().unwrap();
        let profile = registry.lookup(0xF6, 0x02, 0x01).unwrap();
        // 0x70: R1=BO pressed (011 1 000 0)
        let values = decode(&profile, &[0x70]).unwrap();
        assert_eq!(values["R1"].value, FieldValue::Label("BO".into()));
        assert_eq!(values["EB"].value, FieldValue::Label("pressed".into()));
        assert_eq!(values["SA"].value, FieldValue::Label("No 2nd action".into()));
    }

    #[test]
    fn test_contact_decode() {
        let registry = builtin().unwrap();
        let profile = registry.lookup(0xD5, 0x00, 0x01).unwrap();
        // 0x09: learn not pressed, contact closed
        let values = decode(&profile, &[0x09]).unwrap();
        assert_eq!(values["LRN"].value, FieldValue::Label("not pressed".into()));
        assert_eq!(values["CO"].value, FieldValue::Label("closed".into()));
    }

    #[test]
    fn test_temperature_decode_inverted_scale() {
        let registry = builtin().unwrap();
        let profile = registry.lookup(0xA5, 0x02, 0x05).unwrap();
        // Raw 0 on an inverted 255..0 range is the hot end
        let values = decode(&profile, &[0x00, 0x00, 0x00, 0x08]).unwrap();
        let FieldValue::Number(tmp) = &values["TMP"].value else {
            panic!("expected number");
        };
        assert!((tmp - 40.0).abs() < f64::EPSILON);
        assert_eq!(values["LRNB"].value, FieldValue::Label("Data telegram".into()));
    }

    #[test]
    fn test_meter_decode() {
        let registry = builtin().unwrap();
        let profile = registry.lookup(0xA5, 0x12, 0x01).unwrap();
        // MR=0x00012C (300), TI=0, LRNB=1 (data), DT=current, DIV=x/10
        let values = decode(&profile, &[0x00, 0x01, 0x2C, 0b0000_1101]).unwrap();
        assert_eq!(values["MR"].raw, 300);
        assert_eq!(values["DT"].value, FieldValue::Label("Current value".into()));
        assert_eq!(values["DIV"].value, FieldValue::Label("x/10".into()));
    }
}
