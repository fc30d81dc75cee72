//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Serial
// =============================================================================

/// Default baud rate of ESP3 adapters (TCM310 and friends)
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Serial read buffer size
pub const SERIAL_READ_BUFFER_SIZE: usize = 1024;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// MQTT
// =============================================================================

/// Default MQTT broker port
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default MQTT keep-alive interval (seconds)
pub const DEFAULT_MQTT_KEEPALIVE_SECS: u64 = 60;

/// Delay before re-polling the MQTT event loop after a connection error
/// (milliseconds)
pub const MQTT_RECONNECT_DELAY_MS: u64 = 5000;

// =============================================================================
// Gateway
// =============================================================================

/// Default MQTT topic prefix
pub const DEFAULT_TOPIC_PREFIX: &str = "enocean";

/// Default sender address stamped on outbound telegrams when the
/// configuration does not name one
pub const DEFAULT_SENDER_ADDRESS: &str = "FF:FF:00:00";

/// Interval of the shutdown-flag poll in the gateway select loop
/// (milliseconds)
pub const SHUTDOWN_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// Buffers
// =============================================================================

/// Channel capacity for async message passing
pub const CHANNEL_CAPACITY: usize = 256;
