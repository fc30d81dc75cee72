//! Equipment Profile registry
//!
//! Profiles are registered once at startup through the builder, validated,
//! then frozen. The frozen registry is shared by `Arc` and never mutates, so
//! concurrent lookup needs no locking.

use super::field::FieldSpec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// (rorg, func, type) profile classification key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub rorg: u8,
    pub func: u8,
    pub variant: u8,
}

impl ProfileKey {
    pub fn new(rorg: u8, func: u8, variant: u8) -> Self {
        Self {
            rorg,
            func,
            variant,
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.rorg, self.func, self.variant)
    }
}

/// Which way a profile's telegrams flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device reports (device -> gateway)
    Telegram,
    /// Command/response form (gateway -> device)
    Response,
    Both,
}

/// Immutable field layout for one equipment profile
#[derive(Debug, Clone)]
pub struct Profile {
    pub key: ProfileKey,
    pub direction: Direction,
    pub description: String,
    /// Payload size class in bytes; sizes encode output and bounds field spans
    pub payload_len: usize,
    pub fields: Vec<FieldSpec>,
}

impl Profile {
    pub fn new(
        key: ProfileKey,
        direction: Direction,
        description: impl Into<String>,
        payload_len: usize,
        fields: Vec<FieldSpec>,
    ) -> Self {
        Self {
            key,
            direction,
            description: description.into(),
            payload_len,
            fields,
        }
    }

    /// Find a field by shortcut
    pub fn field(&self, shortcut: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.shortcut == shortcut)
    }
}

/// Registry construction errors, fatal at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A profile with this key is already registered
    DuplicateKey(ProfileKey),
    /// Two fields of one profile claim intersecting bit ranges
    OverlappingFields {
        key: ProfileKey,
        first: String,
        second: String,
    },
    /// A field's bit range reaches past the profile's payload size class
    FieldSpanExceedsPayload {
        key: ProfileKey,
        shortcut: String,
        payload_len: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "profile {} registered twice", key),
            Self::OverlappingFields { key, first, second } => write!(
                f,
                "profile {}: fields '{}' and '{}' overlap in bit range",
                key, first, second
            ),
            Self::FieldSpanExceedsPayload {
                key,
                shortcut,
                payload_len,
            } => write!(
                f,
                "profile {}: field '{}' exceeds the {}-byte payload",
                key, shortcut, payload_len
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Mutable registration phase of the registry
#[derive(Default)]
pub struct ProfileRegistryBuilder {
    profiles: HashMap<ProfileKey, Arc<Profile>>,
}

impl ProfileRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register one profile
    pub fn register(&mut self, profile: Profile) -> Result<(), RegistryError> {
        if self.profiles.contains_key(&profile.key) {
            return Err(RegistryError::DuplicateKey(profile.key));
        }
        for field in &profile.fields {
            if field.bit_end() > profile.payload_len * 8 {
                return Err(RegistryError::FieldSpanExceedsPayload {
                    key: profile.key,
                    shortcut: field.shortcut.clone(),
                    payload_len: profile.payload_len,
                });
            }
        }
        for (i, a) in profile.fields.iter().enumerate() {
            for b in &profile.fields[i + 1..] {
                if a.overlaps(b) {
                    return Err(RegistryError::OverlappingFields {
                        key: profile.key,
                        first: a.shortcut.clone(),
                        second: b.shortcut.clone(),
                    });
                }
            }
        }
        self.profiles.insert(profile.key, Arc::new(profile));
        Ok(())
    }

    /// Freeze into the read-only registry
    pub fn build(self) -> ProfileRegistry {
        ProfileRegistry {
            profiles: self.profiles,
        }
    }
}

/// Read-only profile catalog, built once at startup
pub struct ProfileRegistry {
    profiles: HashMap<ProfileKey, Arc<Profile>>,
}

impl ProfileRegistry {
    pub fn lookup(&self, rorg: u8, func: u8, variant: u8) -> Option<Arc<Profile>> {
        self.get(&ProfileKey::new(rorg, func, variant))
    }

    pub fn get(&self, key: &ProfileKey) -> Option<Arc<Profile>> {
        self.profiles.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
