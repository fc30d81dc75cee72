//! ESP3 frame codec
//!
//! Wire layout of one frame:
//!
//! ```text
//! 0x55 | data_len (u16 BE) | opt_len (u8) | packet_type (u8) | CRC8(header)
//!      | data (data_len bytes) | optional (opt_len bytes) | CRC8(data ++ optional)
//! ```
//!
//! The decoder accumulates raw serial bytes and yields complete telegrams.
//! Checksum and framing failures are recoverable: the decoder drops the
//! offending bytes, resynchronizes on the next sync marker and keeps going.

use super::crc8::crc8;
use super::telegram::{PacketType, Telegram};
use bytes::BytesMut;
use std::fmt;

/// Frame sync marker
pub const SYNC_BYTE: u8 = 0x55;

/// Header length including the sync marker and the header checksum
const HEADER_LEN: usize = 6;

/// Default cap on buffered bytes before the decoder declares itself lost
pub const MAX_BUFFER_SIZE: usize = 16 * 1024;

/// Framing layer errors
///
/// All variants except `PayloadTooLarge` are produced by the decoder and are
/// recoverable: the stream position has already been advanced past the bad
/// bytes when the error is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Buffered more than the threshold without completing a frame
    Desynchronized,
    /// Header checksum mismatch, header bytes discarded
    HeaderChecksumInvalid,
    /// Data checksum mismatch, whole frame dropped
    DataChecksumInvalid,
    /// Telegram too large to encode (data > 65535 or optional > 255 bytes)
    PayloadTooLarge { data: usize, optional: usize },
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desynchronized => write!(f, "stream desynchronized, scanning for sync marker"),
            Self::HeaderChecksumInvalid => write!(f, "frame header checksum invalid"),
            Self::DataChecksumInvalid => write!(f, "frame data checksum invalid"),
            Self::PayloadTooLarge { data, optional } => write!(
                f,
                "telegram too large to frame: {} data bytes, {} optional bytes",
                data, optional
            ),
        }
    }
}

impl std::error::Error for FramingError {}

/// Streaming frame decoder
///
/// Feed raw bytes with [`extend`](Self::extend), then drain telegrams with
/// [`next_telegram`](Self::next_telegram) until it returns `Ok(None)`.
/// Errors are per-frame: after an `Err` the decoder is already positioned
/// for the next call.
pub struct FrameDecoder {
    buf: BytesMut,
    max_buffer: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_buffer(MAX_BUFFER_SIZE)
    }

    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
            max_buffer,
        }
    }

    /// Append raw bytes from the transport
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to decode the next telegram out of the buffer
    ///
    /// Returns `Ok(None)` when more bytes are needed. Returns `Err` for a
    /// corrupt or lost frame; the caller reports it and simply calls again.
    pub fn next_telegram(&mut self) -> Result<Option<Telegram>, FramingError> {
        // Drop anything before the first sync marker
        match self.buf.iter().position(|&b| b == SYNC_BYTE) {
            Some(0) => {}
            Some(pos) => {
                let _ = self.buf.split_to(pos);
            }
            None => {
                self.buf.clear();
                return Ok(None);
            }
        }

        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = &self.buf[1..5];
        if crc8(header) != self.buf[5] {
            // Not a real frame start. Skip this sync byte and rescan.
            let _ = self.buf.split_to(1);
            return Err(FramingError::HeaderChecksumInvalid);
        }

        let data_len = u16::from_be_bytes([self.buf[1], self.buf[2]]) as usize;
        let opt_len = self.buf[3] as usize;
        let packet_type = PacketType::from(self.buf[4]);
        let frame_len = HEADER_LEN + data_len + opt_len + 1;

        if self.buf.len() < frame_len {
            if self.buf.len() >= self.max_buffer {
                // A header this plausible should have completed long ago.
                // Drop the sync byte and hunt for the next marker.
                let _ = self.buf.split_to(1);
                return Err(FramingError::Desynchronized);
            }
            return Ok(None);
        }

        let frame = self.buf.split_to(frame_len);
        let body = &frame[HEADER_LEN..frame_len - 1];
        if crc8(body) != frame[frame_len - 1] {
            return Err(FramingError::DataChecksumInvalid);
        }

        let data = body[..data_len].to_vec();
        let optional = body[data_len..].to_vec();
        Ok(Some(Telegram::new(packet_type, data, optional)))
    }
}

/// Serialize a telegram into a complete frame
///
/// Exact inverse of the decoder: `decode(encode(t)) == t` for any telegram
/// whose data and optional blocks fit their length fields.
pub fn encode_frame(telegram: &Telegram) -> Result<Vec<u8>, FramingError> {
    if telegram.data.len() > u16::MAX as usize || telegram.optional.len() > u8::MAX as usize {
        return Err(FramingError::PayloadTooLarge {
            data: telegram.data.len(),
            optional: telegram.optional.len(),
        });
    }

    let data_len = telegram.data.len() as u16;
    let mut out = Vec::with_capacity(HEADER_LEN + telegram.data.len() + telegram.optional.len() + 1);
    out.push(SYNC_BYTE);
    out.extend_from_slice(&data_len.to_be_bytes());
    out.push(telegram.optional.len() as u8);
    out.push(telegram.packet_type.code());
    out.push(crc8(&out[1..5]));
    out.extend_from_slice(&telegram.data);
    out.extend_from_slice(&telegram.optional);
    out.push(crc8(&out[HEADER_LEN..]));
    Ok(out)
}
