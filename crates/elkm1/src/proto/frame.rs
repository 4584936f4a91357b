//! Frame codec: length prefix, checksum, and the two dehex dialects
//!
//! On-the-wire form (CR-LF stripped by the transport):
//!
//! ```text
//! LL TT D* RR CC
//! ```
//!
//! `LL` is the ASCII-hex count of characters from `TT` through `CC`
//! inclusive, `TT` the message tag, `D*` the payload, `RR` two reserved
//! characters (nominally `00`), `CC` the ASCII-hex checksum over
//! everything before it. The alarm-memory report (`AM`) predates the
//! reserved field and omits it entirely.

use crate::error::FrameError;

use super::message::MessageKind;

/// Reserved trailer carried by every frame except `AM`.
const RESERVED: &str = "00";

/// A validated frame: message kind plus raw ASCII payload.
///
/// Payload bytes are kept as received; the typed decoders in
/// [`super::message`] interpret them per tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub data: String,
}

impl Frame {
    /// Frame with an empty payload.
    pub fn new(kind: MessageKind) -> Self {
        Self { kind, data: String::new() }
    }

    /// Frame with the given payload.
    pub fn with_data(kind: MessageKind, data: impl Into<String>) -> Self {
        Self { kind, data: data.into() }
    }

    /// Parse and validate one line from the wire.
    ///
    /// Checks ASCII-ness, the length field, the checksum, and that the tag
    /// is a known message kind. Any failure drops the frame upstream.
    pub fn parse(line: &str) -> Result<Self, FrameError> {
        if !line.is_ascii() {
            return Err(FrameError::NonAscii);
        }
        if line.len() < 6 {
            return Err(FrameError::TooShort(line.len()));
        }
        let field = usize::from_str_radix(&line[..2], 16)
            .map_err(|_| FrameError::BadLength { field: 0, actual: line.len() })?;
        if field != line.len() - 2 {
            return Err(FrameError::BadLength { field, actual: line.len() });
        }

        let computed = checksum(&line[..line.len() - 2]);
        let expected = &line[line.len() - 2..];
        if !computed.eq_ignore_ascii_case(expected) {
            return Err(FrameError::BadChecksum {
                expected: expected.to_string(),
                computed,
            });
        }

        let tag = &line[2..4];
        let kind = MessageKind::from_tag(tag)
            .ok_or_else(|| FrameError::UnknownTag(tag.to_string()))?;

        // AM carries no reserved trailer; everything else ends with RR CC.
        let trailer = if kind == MessageKind::AlarmMemory { 2 } else { 4 };
        if line.len() < 4 + trailer {
            return Err(FrameError::TooShort(line.len()));
        }
        let data = line[4..line.len() - trailer].to_string();

        Ok(Self { kind, data })
    }

    /// Serialize to the wire form (without CR-LF).
    pub fn to_wire(&self) -> String {
        let reserved = if self.kind == MessageKind::AlarmMemory { "" } else { RESERVED };
        let body_len = 2 + self.data.len() + reserved.len() + 2;
        let mut out = format!("{:02X}{}{}{}", body_len, self.kind.tag(), self.data, reserved);
        let cc = checksum(&out);
        out.push_str(&cc);
        out
    }

    /// Decode the payload as true ASCII hex: `'0'..'9'` then `'A'..'F'`.
    pub fn dehex(&self) -> Vec<u8> {
        self.data
            .bytes()
            .map(|c| {
                let v = c.saturating_sub(b'0');
                if v > 9 { v - 7 } else { v }
            })
            .collect()
    }

    /// Decode the payload in the wider "fake hex" alphabet, where every
    /// character is simply offset from `'0'` (so `':'` is 10, `';'` 11,
    /// `'A'` 17 and so on).
    pub fn dehex_fake(&self) -> Vec<u8> {
        self.data.bytes().map(|c| c.saturating_sub(b'0')).collect()
    }

    /// Tag and payload concatenated, the form expected-reply prefixes are
    /// matched against.
    pub fn match_key(&self) -> String {
        format!("{}{}", self.kind.tag(), self.data)
    }
}

/// Additive checksum: sum of bytes mod 256, ones-complemented, plus one,
/// rendered as two uppercase hex digits.
pub fn checksum(data: &str) -> String {
    let sum: u32 = data.bytes().map(u32::from).sum();
    let cc = ((sum % 256) ^ 0xFF).wrapping_add(1) & 0xFF;
    format!("{cc:02X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_known_vector() {
        // "06as00" sums to 410; ((410 % 256) ^ 0xFF) + 1 = 0x66
        assert_eq!(checksum("06as00"), "66");
    }

    #[test]
    fn round_trips_every_kind_shape() {
        let frames = [
            Frame::new(MessageKind::ArmingStatusRequest),
            Frame::with_data(MessageKind::ZoneUpdate, "0050C"),
            Frame::with_data(MessageKind::ArmForceStay, "1001234"),
            Frame::with_data(MessageKind::AlarmMemory, "10000000"),
            Frame::with_data(MessageKind::DescriptionRequest, "00001"),
        ];
        for frame in frames {
            let wire = frame.to_wire();
            assert_eq!(Frame::parse(&wire).unwrap(), frame, "wire: {wire}");
        }
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        let mut wire = Frame::new(MessageKind::ArmingStatusRequest).to_wire();
        wire.replace_range(wire.len() - 2.., "00");
        assert!(matches!(
            Frame::parse(&wire),
            Err(FrameError::BadChecksum { .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_length_field() {
        // Valid frame with the length field bumped by one.
        let wire = Frame::new(MessageKind::ArmingStatusRequest).to_wire();
        let tampered = format!("07{}", &wire[2..]);
        assert!(matches!(
            Frame::parse(&tampered),
            Err(FrameError::BadLength { .. })
        ));
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        let body = "06qq00";
        let wire = format!("{body}{}", checksum(body));
        assert!(matches!(Frame::parse(&wire), Err(FrameError::UnknownTag(_))));
    }

    #[test]
    fn parse_rejects_non_ascii() {
        assert_eq!(Frame::parse("06a\u{df}00FF"), Err(FrameError::NonAscii));
    }

    #[test]
    fn am_frame_has_no_reserved_field() {
        let frame = Frame::with_data(MessageKind::AlarmMemory, "10000000");
        let wire = frame.to_wire();
        // 2 tag + 8 data + 2 checksum, no reserved trailer
        assert_eq!(usize::from_str_radix(&wire[..2], 16).unwrap(), 12);
        assert_eq!(Frame::parse(&wire).unwrap().data, "10000000");
    }

    #[test]
    fn dehex_dialects_differ_above_nine() {
        let frame = Frame::with_data(MessageKind::ZoneStatusReport, "9:A");
        assert_eq!(frame.dehex(), vec![9, 3, 10]);
        assert_eq!(frame.dehex_fake(), vec![9, 10, 17]);
    }

    #[test]
    fn colon_tag_is_a_legal_kind() {
        let frame = Frame::with_data(MessageKind::ArmForceStay, "1001234");
        let wire = frame.to_wire();
        assert_eq!(&wire[2..4], "a:");
        assert_eq!(Frame::parse(&wire).unwrap().kind, MessageKind::ArmForceStay);
    }
}
