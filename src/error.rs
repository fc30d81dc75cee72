//! Centralized error types for the gateway glue
//!
//! The codec layers carry their own error enums (`FramingError`,
//! `RegistryError`, `CodecError`, `TranslationError`); this module covers the
//! surrounding process concerns. Use `Result<T>` as shorthand for
//! `std::result::Result<T, BridgeError>`.

use crate::profile::RegistryError;
use std::fmt;
use std::path::PathBuf;

/// All gateway-level errors
#[derive(Debug)]
pub enum BridgeError {
    // === Transport ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },

    // === Config ===
    /// Failed to read the config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file did not parse or failed validation
    ConfigValidation { field: &'static str, reason: String },

    // === Messaging ===
    /// MQTT client operation failed
    Mqtt { message: String },

    // === Startup ===
    /// Profile catalog failed to build; fatal
    Registry { source: RegistryError },
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. } | Self::ConfigRead { source, .. } => Some(source),
            Self::Registry { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, .. } => write!(f, "Cannot open serial port: {}", port),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Mqtt { message } => write!(f, "MQTT error: {}", message),
            Self::Registry { source } => write!(f, "Profile catalog error: {}", source),
        }
    }
}

impl From<RegistryError> for BridgeError {
    fn from(source: RegistryError) -> Self {
        Self::Registry { source }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
