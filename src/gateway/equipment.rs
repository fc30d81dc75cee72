//! Configured equipment and the address lookup table
//!
//! An Equipment binds a radio address to its configured profile. The profile
//! is assigned by configuration, not read from telegrams: the same physical
//! device always decodes through the same field layout.
//!
//! The registry is built from configuration at startup and injected into the
//! translator; the only runtime-mutable piece of an Equipment is its learn
//! state.

use crate::codec::EnoceanAddress;
use crate::config::EquipmentEntry;
use crate::profile::{Profile, ProfileRegistry};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Teach-in binding state of one equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnState {
    Unlearned,
    Learned,
}

/// One configured device
#[derive(Debug)]
pub struct Equipment {
    pub address: EnoceanAddress,
    pub name: String,
    pub profile: Arc<Profile>,
    learned: AtomicBool,
}

impl Equipment {
    pub fn new(address: EnoceanAddress, name: impl Into<String>, profile: Arc<Profile>) -> Self {
        Self {
            address,
            name: name.into(),
            profile,
            learned: AtomicBool::new(false),
        }
    }

    pub fn learn_state(&self) -> LearnState {
        if self.learned.load(Ordering::Acquire) {
            LearnState::Learned
        } else {
            LearnState::Unlearned
        }
    }

    /// Transition to LEARNED (teach-in accepted)
    pub fn mark_learned(&self) {
        self.learned.store(true, Ordering::Release);
    }
}

impl fmt::Display for Equipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.address, self.profile.key)
    }
}

/// Address -> equipment table, read-only after construction
#[derive(Default)]
pub struct EquipmentRegistry {
    by_address: HashMap<EnoceanAddress, Arc<Equipment>>,
}

impl EquipmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config entries, resolving each profile in the registry
    ///
    /// Entries with an unparseable address or an unknown profile are skipped
    /// with a warning, matching the per-equipment (not fatal) error policy.
    pub fn from_config(entries: &[EquipmentEntry], profiles: &ProfileRegistry) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            let address: EnoceanAddress = match entry.address.parse() {
                Ok(addr) => addr,
                Err(reason) => {
                    warn!("skipping equipment '{}': {}", entry.name(), reason);
                    continue;
                }
            };
            let key = match entry.profile_key() {
                Ok(key) => key,
                Err(reason) => {
                    warn!("skipping equipment '{}': {}", entry.name(), reason);
                    continue;
                }
            };
            let Some(profile) = profiles.get(&key) else {
                warn!(
                    "skipping equipment '{}': profile {} not in catalog",
                    entry.name(),
                    key
                );
                continue;
            };
            registry.insert(Equipment::new(address, entry.name(), profile));
        }
        registry
    }

    pub fn insert(&mut self, equipment: Equipment) {
        self.by_address
            .insert(equipment.address, Arc::new(equipment));
    }

    pub fn by_address(&self, address: EnoceanAddress) -> Option<Arc<Equipment>> {
        self.by_address.get(&address).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Equipment>> {
        self.by_address.values().find(|e| e.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Equipment>> {
        self.by_address.values()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::catalog;

    fn entry(address: &str, eep: &str, name: &str) -> EquipmentEntry {
        EquipmentEntry {
            address: address.to_string(),
            eep: eep.to_string(),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_from_config_resolves_profiles() {
        let profiles = catalog::builtin().unwrap();
        let entries = vec![
            entry("01:02:03:04", "A5-02-05", "office_temp"),
            entry("05:06:07:08", "F6-02-01", "wall_switch"),
        ];
        let registry = EquipmentRegistry::from_config(&entries, &profiles);
        assert_eq!(registry.len(), 2);

        let equipment = registry
            .by_address("01:02:03:04".parse().unwrap())
            .unwrap();
        assert_eq!(equipment.name, "office_temp");
        assert_eq!(equipment.profile.key.to_string(), "A5-02-05");
    }

    #[test]
    fn test_from_config_skips_unknown_profile() {
        let profiles = catalog::builtin().unwrap();
        let entries = vec![
            entry("01:02:03:04", "A5-FF-FF", "ghost"),
            entry("05:06:07:08", "D5-00-01", "door"),
        ];
        let registry = EquipmentRegistry::from_config(&entries, &profiles);
        assert_eq!(registry.len(), 1);
        assert!(registry.by_name("door").is_some());
        assert!(registry.by_name("ghost").is_none());
    }

    #[test]
    fn test_from_config_skips_bad_address() {
        let profiles = catalog::builtin().unwrap();
        let entries = vec![entry("not-an-address", "D5-00-01", "broken")];
        let registry = EquipmentRegistry::from_config(&entries, &profiles);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_learn_state_transitions() {
        let profiles = catalog::builtin().unwrap();
        let profile = profiles.lookup(0xD5, 0x00, 0x01).unwrap();
        let equipment = Equipment::new("01:02:03:04".parse().unwrap(), "door", profile);
        assert_eq!(equipment.learn_state(), LearnState::Unlearned);
        equipment.mark_learned();
        assert_eq!(equipment.learn_state(), LearnState::Learned);
    }
}
