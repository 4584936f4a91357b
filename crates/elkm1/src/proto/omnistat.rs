//! Omnistat2 thermostat sub-protocol
//!
//! The panel tunnels the Omnistat2 binary protocol through one message
//! kind: a `t2` request wraps an outgoing packet, a `T2` reply carries the
//! thermostat's answer. The payload is ASCII hex for 18 raw bytes:
//!
//! ```text
//! NN L|T D[L] CC padding
//! ```
//!
//! `NN` holds the device number in the low seven bits with the high bit
//! set on replies. The next byte packs the data length in its high nibble
//! and the message type in its low nibble. `CC` is an additive checksum
//! over everything before it; zero padding fills the packet out to a fixed
//! width.

use crate::error::FrameError;

use super::frame::Frame;
use super::message::MessageKind;

/// Total packet width in raw bytes (36 hex characters on the wire).
pub const PACKET_BYTES: usize = 18;

/// Maximum data bytes a packet can carry.
pub const MAX_DATA: usize = 14;

/// Request: read a run of registers (`data = [start, count]`).
pub const REQ_POLL_REGISTERS: u8 = 0;
/// Requests: poll the three predefined register groups.
pub const REQ_POLL_GROUP_1: u8 = 2;
pub const REQ_POLL_GROUP_2: u8 = 3;
pub const REQ_POLL_GROUP_3: u8 = 4;
/// Response: register data (`data = [start, values..]`).
pub const RESP_DATA: u8 = 2;
/// Responses to the group polls. The serial expander is known to eat
/// group 1 in the field, so nothing may depend on receiving it.
pub const RESP_GROUP_1: u8 = 3;
pub const RESP_GROUP_2: u8 = 4;
pub const RESP_GROUP_3: u8 = 5;

/// Registers the runtime decodes. Everything else is logged and ignored.
pub mod registers {
    /// Model identification
    pub const MODEL: u8 = 0x49;
    /// Current temperature, Omni temperature format
    pub const CURRENT_TEMP: u8 = 0x40;
    /// Outside temperature
    pub const OUTSIDE_TEMP: u8 = 0x44;
    /// Auxiliary temperature sensor 3
    pub const TEMP_3: u8 = 0x45;
    /// Auxiliary temperature sensor 4
    pub const TEMP_4: u8 = 0x46;
    /// Indoor relative humidity, percent
    pub const HUMIDITY: u8 = 0x47;
}

/// Convert an Omni-format temperature byte to degrees Celsius.
pub fn omni_temp_c(raw: u8) -> f32 {
    -40.0 + 0.5 * f32::from(raw)
}

/// Convert an Omni-format temperature byte to degrees Fahrenheit.
pub fn omni_temp_f(raw: u8) -> f32 {
    omni_temp_c(raw) * 9.0 / 5.0 + 32.0
}

/// One Omnistat2 packet, request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Device number (low seven bits of the address byte)
    pub device: u8,
    /// Set on packets coming back from the thermostat
    pub reply: bool,
    /// Message type nibble
    pub msg_type: u8,
    pub data: Vec<u8>,
}

impl Packet {
    /// Request polling one of the predefined register groups (1..=3).
    pub fn poll_group(device: u8, group: u8) -> Self {
        let msg_type = match group {
            1 => REQ_POLL_GROUP_1,
            2 => REQ_POLL_GROUP_2,
            _ => REQ_POLL_GROUP_3,
        };
        Self { device, reply: false, msg_type, data: Vec::new() }
    }

    /// Request reading `count` registers starting at `start`.
    pub fn poll_registers(device: u8, start: u8, count: u8) -> Self {
        Self {
            device,
            reply: false,
            msg_type: REQ_POLL_REGISTERS,
            data: vec![start, count],
        }
    }

    /// Serialize to the fixed-width ASCII-hex payload of a `t2`/`T2` frame.
    pub fn encode(&self) -> String {
        let address = if self.reply { self.device | 0x80 } else { self.device };
        let len = self.data.len().min(MAX_DATA) as u8;
        let mut bytes = Vec::with_capacity(PACKET_BYTES);
        bytes.push(address);
        bytes.push((len << 4) | (self.msg_type & 0x0F));
        bytes.extend_from_slice(&self.data[..len as usize]);
        let checksum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        bytes.push(checksum);
        bytes.resize(PACKET_BYTES, 0);
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }

    /// Wrap into an outgoing `t2` frame.
    pub fn to_frame(&self) -> Frame {
        Frame::with_data(MessageKind::Omnistat2Request, self.encode())
    }

    /// Decode the ASCII-hex payload of a `T2` reply.
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        if payload.len() < 6 || payload.len() % 2 != 0 {
            return Err(FrameError::ShortPayload("T2"));
        }
        let mut bytes = Vec::with_capacity(payload.len() / 2);
        for i in (0..payload.len()).step_by(2) {
            let b = u8::from_str_radix(&payload[i..i + 2], 16)
                .map_err(|_| FrameError::BadField("T2 hex"))?;
            bytes.push(b);
        }
        let len = (bytes[1] >> 4) as usize;
        if len > MAX_DATA || bytes.len() < 2 + len + 1 {
            return Err(FrameError::BadField("T2 length"));
        }
        let data = bytes[2..2 + len].to_vec();
        let sum = bytes[..2 + len].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != bytes[2 + len] {
            return Err(FrameError::BadField("T2 checksum"));
        }
        Ok(Self {
            device: bytes[0] & 0x7F,
            reply: bytes[0] & 0x80 != 0,
            msg_type: bytes[1] & 0x0F,
            data,
        })
    }

    /// Register values carried by a data or group response.
    ///
    /// The first data byte names the starting register; the rest are the
    /// values of consecutive registers. Empty for other message types.
    pub fn register_values(&self) -> Vec<(u8, u8)> {
        let carries_registers = self.reply
            && matches!(self.msg_type, RESP_DATA | RESP_GROUP_1 | RESP_GROUP_2 | RESP_GROUP_3);
        if !carries_registers || self.data.len() < 2 {
            return Vec::new();
        }
        let start = self.data[0];
        self.data[1..]
            .iter()
            .enumerate()
            .map(|(i, &v)| (start.wrapping_add(i as u8), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let packet = Packet {
            device: 3,
            reply: true,
            msg_type: RESP_DATA,
            data: vec![registers::CURRENT_TEMP, 0xA0, 0x32],
        };
        let hex = packet.encode();
        assert_eq!(hex.len(), PACKET_BYTES * 2);
        assert_eq!(Packet::decode(&hex).unwrap(), packet);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let mut hex = Packet::poll_group(1, 1).encode();
        // Corrupt the checksum byte (offset 4, no data bytes).
        hex.replace_range(4..6, "FF");
        assert!(Packet::decode(&hex).is_err());
    }

    #[test]
    fn register_values_walk_consecutively() {
        let packet = Packet {
            device: 1,
            reply: true,
            msg_type: RESP_GROUP_2,
            data: vec![registers::OUTSIDE_TEMP, 0x90, 0x91, 0x2A],
        };
        let values = packet.register_values();
        assert_eq!(
            values,
            vec![
                (registers::OUTSIDE_TEMP, 0x90),
                (registers::TEMP_3, 0x91),
                (registers::TEMP_4, 0x2A),
            ]
        );
    }

    #[test]
    fn requests_never_report_registers() {
        let poll = Packet::poll_registers(2, registers::MODEL, 1);
        assert!(poll.register_values().is_empty());
    }

    #[test]
    fn omni_temperature_conversion() {
        assert_eq!(omni_temp_c(0), -40.0);
        assert_eq!(omni_temp_c(160), 40.0);
        assert!((omni_temp_f(144) - 89.6).abs() < 1e-4);
    }
}
