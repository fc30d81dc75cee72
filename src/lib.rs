//! EnOcean to MQTT gateway
//!
//! Bridges ESP3 radio telegrams from a serial EnOcean adapter to an MQTT
//! broker and back. The codec core (framing, profiles, translation) is pure
//! and synchronous; serial and MQTT I/O live at the edges.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod mqtt;
pub mod profile;
pub mod transport;
