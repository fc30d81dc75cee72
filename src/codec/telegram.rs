//! ESP3 telegram model
//!
//! A telegram is one framed protocol unit: a packet type plus the data and
//! optional-data blocks carried between the two checksums of the frame.
//!
//! For RADIO_ERP1 telegrams the data block is laid out as
//! `rorg ++ user payload ++ sender(4) ++ status(1)` and the optional block as
//! `sub_tel_num(1) ++ destination(4) ++ dBm(1) ++ security(1)`. The accessors
//! below expose that layout without copying.

use std::fmt;
use std::str::FromStr;

/// ESP3 packet type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    RadioErp1,
    Response,
    RadioSubTel,
    Event,
    CommonCommand,
    SmartAckCommand,
    RemoteManCommand,
    RadioMessage,
    RadioErp2,
    /// Any code we do not interpret (forwarded, never rejected)
    Unknown(u8),
}

impl PacketType {
    /// Wire code of this packet type
    pub fn code(self) -> u8 {
        match self {
            Self::RadioErp1 => 0x01,
            Self::Response => 0x02,
            Self::RadioSubTel => 0x03,
            Self::Event => 0x04,
            Self::CommonCommand => 0x05,
            Self::SmartAckCommand => 0x06,
            Self::RemoteManCommand => 0x07,
            Self::RadioMessage => 0x09,
            Self::RadioErp2 => 0x0A,
            Self::Unknown(code) => code,
        }
    }
}

impl From<u8> for PacketType {
    fn from(code: u8) -> Self {
        match code {
            0x01 => Self::RadioErp1,
            0x02 => Self::Response,
            0x03 => Self::RadioSubTel,
            0x04 => Self::Event,
            0x05 => Self::CommonCommand,
            0x06 => Self::SmartAckCommand,
            0x07 => Self::RemoteManCommand,
            0x09 => Self::RadioMessage,
            0x0A => Self::RadioErp2,
            other => Self::Unknown(other),
        }
    }
}

/// Radio ORG codes (first byte of an ERP1 data block)
pub mod rorg {
    /// Repeated switch (rocker) telegram
    pub const RPS: u8 = 0xF6;
    /// 1-byte sensor telegram
    pub const BS1: u8 = 0xD5;
    /// 4-byte sensor telegram
    pub const BS4: u8 = 0xA5;
    /// Variable-length data telegram
    pub const VLD: u8 = 0xD2;
    /// Universal teach-in telegram
    pub const UTE: u8 = 0xD4;
}

/// 4-byte EnOcean radio identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnoceanAddress(pub [u8; 4]);

impl EnoceanAddress {
    /// Broadcast address (all devices)
    pub const BROADCAST: EnoceanAddress = EnoceanAddress([0xFF, 0xFF, 0xFF, 0xFF]);

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<u32> for EnoceanAddress {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<EnoceanAddress> for u32 {
    fn from(addr: EnoceanAddress) -> Self {
        u32::from_be_bytes(addr.0)
    }
}

impl fmt::Display for EnoceanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl FromStr for EnoceanAddress {
    type Err = String;

    /// Parse `AA:BB:CC:DD` or `AABBCCDD`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != ':').collect();
        if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("invalid address '{}': expected 4 hex bytes", s));
        }
        let mut bytes = [0u8; 4];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| format!("invalid address '{}': not hexadecimal", s))?;
        }
        Ok(Self(bytes))
    }
}

/// One framed protocol unit, as produced by the frame decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    pub packet_type: PacketType,
    pub data: Vec<u8>,
    pub optional: Vec<u8>,
}

/// Default optional block for outbound radio telegrams:
/// 3 sub-telegrams, broadcast destination, max dBm, no security
const DEFAULT_RADIO_OPTIONAL: [u8; 7] = [0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

impl Telegram {
    pub fn new(packet_type: PacketType, data: Vec<u8>, optional: Vec<u8>) -> Self {
        Self {
            packet_type,
            data,
            optional,
        }
    }

    /// Build an outbound RADIO_ERP1 telegram
    ///
    /// `data` must already carry the full ERP1 layout (rorg, payload, sender,
    /// status). The optional block is the default one with `destination` set.
    pub fn radio(data: Vec<u8>, destination: EnoceanAddress) -> Self {
        let mut optional = DEFAULT_RADIO_OPTIONAL.to_vec();
        optional[1..5].copy_from_slice(destination.as_bytes());
        Self {
            packet_type: PacketType::RadioErp1,
            data,
            optional,
        }
    }

    // =========================================================================
    // ERP1 accessors
    // =========================================================================

    /// Radio ORG byte (first data byte)
    pub fn rorg(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// The profile-decoded portion of the data block (between rorg and sender)
    pub fn user_payload(&self) -> &[u8] {
        if self.data.len() < 6 {
            return &[];
        }
        &self.data[1..self.data.len() - 5]
    }

    /// Sender address (trailing 4 address bytes of the data block)
    pub fn sender(&self) -> Option<EnoceanAddress> {
        if self.data.len() < 6 {
            return None;
        }
        let tail = &self.data[self.data.len() - 5..self.data.len() - 1];
        Some(EnoceanAddress([tail[0], tail[1], tail[2], tail[3]]))
    }

    /// ERP1 status byte (last data byte)
    pub fn status(&self) -> Option<u8> {
        if self.data.len() < 6 {
            return None;
        }
        self.data.last().copied()
    }

    /// Repeater hop count (low nibble of the status byte)
    pub fn repeater_count(&self) -> u8 {
        self.status().map(|s| s & 0x0F).unwrap_or(0)
    }

    /// Whether this telegram went through at least one repeater
    pub fn is_repeated(&self) -> bool {
        // 0xF means "shall not be repeated", not a hop count
        matches!(self.repeater_count(), 1..=0x0E)
    }

    /// Destination address from the optional block
    pub fn destination(&self) -> Option<EnoceanAddress> {
        if self.optional.len() < 5 {
            return None;
        }
        Some(EnoceanAddress([
            self.optional[1],
            self.optional[2],
            self.optional[3],
            self.optional[4],
        ]))
    }

    /// Received signal strength in dBm (stored negated on the wire)
    pub fn dbm(&self) -> Option<i16> {
        self.optional.get(5).map(|&raw| -(raw as i16))
    }
}
