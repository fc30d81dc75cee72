//! ESP3 wire codec
//!
//! Separates the framing layer from everything above it:
//! - **frame**: sync scan, header/data checksums, stream resynchronization
//! - **telegram**: the decoded frame unit and its ERP1 field layout
//! - **crc8**: the checksum both layers share
//!
//! The codec is synchronous and I/O-free; the transport feeds it bytes and
//! the gateway drains telegrams.

pub mod crc8;
pub mod frame;
pub mod telegram;

pub use frame::{encode_frame, FrameDecoder, FramingError, MAX_BUFFER_SIZE, SYNC_BYTE};
pub use telegram::{EnoceanAddress, PacketType, Telegram};
