//! Frame wire format: build and parse.
//!
//! Every message on the wire is one frame. All multi-byte integers are
//! big-endian:
//!
//! ```text
//! +---------+---------+---------+-------------+-----------+----------+
//! | version |  type   |   seq   |   length    |  payload  | checksum |
//! | 1 byte  | 1 byte  | 1 byte  | 2 bytes BE  | len bytes |  1 byte  |
//! +---------+---------+---------+-------------+-----------+----------+
//! ```
//!
//! - `version` is the constant [`VERSION`]; it is carried and exposed but
//!   not rejected on parse.
//! - `type` is 0 = DATA, 1 = ACK, 2 = NACK. ACK/NACK frames carry
//!   `length = 0` and no payload.
//! - `checksum` holds the low n bits of the register CRC over
//!   header‖payload, where n is the generator width (1–8).
//!
//! Parsing never fails on a checksum mismatch: that is a protocol signal
//! (the receiver answers with a NACK), not a codec failure, so it comes
//! back as the [`Frame::crc_ok`] flag instead.

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{bits, register, GeneratorPoly};
use crate::error::{FrameError, Result};

/// Protocol version carried in every frame header.
pub const VERSION: u8 = 1;

/// The smallest parseable frame: header plus checksum byte.
pub const MIN_FRAME_LEN: usize = FrameHeader::SIZE + 1;

/// Frame type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Carries a payload; answered with ACK or NACK.
    Data = 0,
    /// Positive acknowledgment of a sequence number.
    Ack = 1,
    /// Negative acknowledgment: frame arrived, checksum did not match.
    Nack = 2,
}

impl FrameType {
    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(FrameType::Data),
            1 => Some(FrameType::Ack),
            2 => Some(FrameType::Nack),
            _ => None,
        }
    }

    /// Short name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Ack => "ACK",
            FrameType::Nack => "NACK",
        }
    }
}

/// Fixed-size frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub frame_type: FrameType,
    pub seq: u8,
    pub len: u16,
}

impl FrameHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 5;

    fn new(frame_type: FrameType, seq: u8, len: u16) -> Self {
        Self {
            version: VERSION,
            frame_type,
            seq,
            len,
        }
    }

    /// Encode the header into a buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.frame_type as u8);
        buf.put_u8(self.seq);
        buf.put_u16(self.len);
    }
}

/// A parsed frame: decoded fields plus the checksum comparison.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    /// Payload bytes (empty for ACK/NACK)
    pub payload: Bytes,
    /// True iff the recomputed checksum matches the received one
    pub crc_ok: bool,
    /// Received checksum, masked to the generator width
    pub crc_recv: u8,
    /// Locally recomputed checksum
    pub crc_calc: u8,
}

impl Frame {
    /// Check if this is a DATA frame
    pub fn is_data(&self) -> bool {
        self.header.frame_type == FrameType::Data
    }

    /// Check if this is an ACK or NACK frame
    pub fn is_reply(&self) -> bool {
        matches!(self.header.frame_type, FrameType::Ack | FrameType::Nack)
    }

    /// The checksum-covered bytes (header ‖ payload), re-encoded.
    ///
    /// Feed this to [`crate::crc::division::explain`] to show the long
    /// division for a received frame.
    pub fn checked_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + self.payload.len());
        self.header.encode(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Human-readable field and bit breakdown, for display panels and
    /// logs. No protocol role.
    pub fn bit_report(&self, poly: &GeneratorPoly) -> String {
        let n = poly.width();
        format!(
            "type: {} seq={} len={}\n\
             crc received:  {:0n$b}\n\
             crc computed:  {:0n$b}\n\
             header bits:   {}\n\
             payload bits:  {}\n\
             generator:     {}",
            self.header.frame_type.as_str(),
            self.header.seq,
            self.header.len,
            self.crc_recv,
            self.crc_calc,
            bits::bit_string(&self.checked_bytes()[..FrameHeader::SIZE]),
            bits::bit_string(&self.payload),
            poly.as_bits(),
            n = n,
        )
    }
}

/// Build a DATA frame for `payload` with the given sequence number.
///
/// The checksum covers header and payload; retransmissions reuse the
/// returned bytes verbatim.
pub fn build_data(payload: &[u8], poly: &GeneratorPoly, seq: u8) -> Result<Bytes> {
    if payload.len() > u16::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
        }
        .into());
    }
    let header = FrameHeader::new(FrameType::Data, seq, payload.len() as u16);

    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload.len() + 1);
    header.encode(&mut buf);
    buf.extend_from_slice(payload);
    let crc = register::remainder(&buf, poly)?;
    buf.put_u8(crc);
    Ok(buf.freeze())
}

/// Build an ACK (`positive`) or NACK frame for a sequence number.
///
/// Reply frames never carry a payload; the checksum covers the header
/// alone.
pub fn build_reply(seq: u8, positive: bool, poly: &GeneratorPoly) -> Result<Bytes> {
    let frame_type = if positive {
        FrameType::Ack
    } else {
        FrameType::Nack
    };
    let header = FrameHeader::new(frame_type, seq, 0);

    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + 1);
    header.encode(&mut buf);
    let crc = register::remainder(&buf, poly)?;
    buf.put_u8(crc);
    Ok(buf.freeze())
}

/// Parse a frame and verify its checksum.
///
/// Fails on structural problems only: a frame shorter than
/// [`MIN_FRAME_LEN`], a length field that disagrees with the payload
/// actually present, or an unknown type byte. A checksum mismatch is
/// reported through [`Frame::crc_ok`], never as an error.
pub fn parse(bytes: Bytes, poly: &GeneratorPoly) -> Result<Frame> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort { len: bytes.len() }.into());
    }

    let version = bytes[0];
    let frame_type = FrameType::from_byte(bytes[1])
        .ok_or(FrameError::UnknownType { value: bytes[1] })?;
    let seq = bytes[2];
    let len = u16::from_be_bytes([bytes[3], bytes[4]]);

    let payload = bytes.slice(FrameHeader::SIZE..bytes.len() - 1);
    if payload.len() != len as usize {
        return Err(FrameError::LengthMismatch {
            declared: len as usize,
            actual: payload.len(),
        }
        .into());
    }

    let mask = register::width_mask(poly.width().min(register::MAX_WIDTH));
    let crc_recv = bytes[bytes.len() - 1] & mask;
    let crc_calc = register::remainder(&bytes[..bytes.len() - 1], poly)?;

    Ok(Frame {
        header: FrameHeader {
            version,
            frame_type,
            seq,
            len,
        },
        payload,
        crc_ok: crc_recv == crc_calc,
        crc_recv,
        crc_calc,
    })
}

/// Turn user input into payload bytes.
///
/// Raw bit strings (only 0/1 and spaces) are packed MSB-first into bytes;
/// anything else is sent as UTF-8 text.
pub fn payload_from_text(text: &str) -> Bytes {
    if bits::is_bitstring(text) {
        Bytes::from(bits::parse_bitstring(text))
    } else {
        Bytes::copy_from_slice(text.as_bytes())
    }
}
