//! Frame encoding and decoding for the ARQ layer.
//!
//! Wire format (big-endian):
//! ```text
//! Data: +----------------+------------------+-------------------+
//!       | MAGIC_DATA     | Sequence Number  | Payload           |
//!       | 4 bytes        | 4 bytes          | variable          |
//!       +----------------+------------------+-------------------+
//! Ack:  +----------------+------------------+
//!       | MAGIC_ACK      | Sequence Number  |
//!       | 4 bytes        | 4 bytes          |
//!       +----------------+------------------+
//! ```
//!
//! Decoding never fails. Buffers shorter than the header, or whose magic
//! matches neither frame type, are handed back untouched as
//! [`Decoded::PassThrough`] so the codec can share a transport with other
//! protocols.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::seq::SequenceNumber;
use crate::core::constants::{FRAME_HEADER_SIZE, MAGIC_ACK, MAGIC_DATA};

/// A sequenced application payload.
///
/// Immutable after creation; retransmissions reuse the same payload and
/// sequence number. Cloning is cheap (the payload is reference counted).
#[derive(Clone, PartialEq, Eq)]
pub struct DataFrame {
    sequence_number: SequenceNumber,
    payload: Bytes,
}

impl DataFrame {
    /// Create a new data frame.
    pub fn new(sequence_number: SequenceNumber, payload: Bytes) -> Self {
        Self {
            sequence_number,
            payload,
        }
    }

    /// Sequence number of this frame.
    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Application payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the frame, returning the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Total wire size.
    pub fn wire_size(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    /// Encode into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.wire_size());
        buf.put_u32(MAGIC_DATA);
        buf.put_slice(&self.sequence_number.to_bytes());
        buf.put_slice(&self.payload);
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

impl fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFrame")
            .field("sequence_number", &self.sequence_number)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Cumulative acknowledgment.
///
/// Acknowledges every data frame up to and including `sequence_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    sequence_number: SequenceNumber,
}

impl AckFrame {
    /// Create a new ack frame.
    pub fn new(sequence_number: SequenceNumber) -> Self {
        Self { sequence_number }
    }

    /// Highest sequence number covered by this ack.
    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Encode into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(FRAME_HEADER_SIZE);
        buf.put_u32(MAGIC_ACK);
        buf.put_slice(&self.sequence_number.to_bytes());
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Any frame of the ARQ protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArqFrame {
    /// Sequenced payload.
    Data(DataFrame),
    /// Cumulative acknowledgment.
    Ack(AckFrame),
}

impl ArqFrame {
    /// Sequence number carried by the frame.
    pub fn sequence_number(&self) -> SequenceNumber {
        match self {
            ArqFrame::Data(data) => data.sequence_number(),
            ArqFrame::Ack(ack) => ack.sequence_number(),
        }
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Bytes {
        match self {
            ArqFrame::Data(data) => data.encode(),
            ArqFrame::Ack(ack) => ack.encode(),
        }
    }

    /// Decode a buffer; see [`decode`].
    pub fn decode(buf: Bytes) -> Decoded {
        decode(buf)
    }
}

impl From<DataFrame> for ArqFrame {
    fn from(frame: DataFrame) -> Self {
        ArqFrame::Data(frame)
    }
}

impl From<AckFrame> for ArqFrame {
    fn from(frame: AckFrame) -> Self {
        ArqFrame::Ack(frame)
    }
}

/// Outcome of decoding an inbound buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The buffer carried an ARQ frame.
    Frame(ArqFrame),
    /// Not an ARQ frame; the buffer is returned unmodified.
    PassThrough(Bytes),
}

/// Decode an inbound buffer.
///
/// The payload of a data frame is a slice of `buf`; no bytes are copied.
/// Trailing bytes after an ack header are ignored.
pub fn decode(buf: Bytes) -> Decoded {
    if buf.len() < FRAME_HEADER_SIZE {
        return Decoded::PassThrough(buf);
    }

    let mut header = &buf[..FRAME_HEADER_SIZE];
    let magic = header.get_u32();
    let sequence_number = SequenceNumber::new(header.get_u32());

    match magic {
        MAGIC_DATA => {
            let payload = buf.slice(FRAME_HEADER_SIZE..);
            Decoded::Frame(ArqFrame::Data(DataFrame::new(sequence_number, payload)))
        }
        MAGIC_ACK => Decoded::Frame(ArqFrame::Ack(AckFrame::new(sequence_number))),
        _ => Decoded::PassThrough(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_data_wire_format() {
        let frame = DataFrame::new(SequenceNumber::new(0x0102_0304), Bytes::from_static(b"hi"));
        let encoded = frame.encode();

        assert_eq!(encoded.len(), frame.wire_size());
        assert_eq!(&encoded[..4], &MAGIC_DATA.to_be_bytes());
        assert_eq!(hex::encode(&encoded[4..]), "010203046869");
    }

    #[test]
    fn test_encode_ack_wire_format() {
        let frame = AckFrame::new(SequenceNumber::new(0xdead_beef));
        let encoded = frame.encode();

        assert_eq!(encoded.len(), FRAME_HEADER_SIZE);
        assert_eq!(&encoded[..4], &MAGIC_ACK.to_be_bytes());
        assert_eq!(hex::encode(&encoded[4..]), "deadbeef");
    }

    #[test]
    fn test_decode_data() {
        let frame = DataFrame::new(SequenceNumber::new(9), Bytes::from_static(b"payload"));

        match decode(frame.encode()) {
            Decoded::Frame(ArqFrame::Data(decoded)) => {
                assert_eq!(decoded.sequence_number(), SequenceNumber::new(9));
                assert_eq!(decoded.payload().as_ref(), b"payload");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_data_payload_is_not_copied() {
        let encoded = DataFrame::new(SequenceNumber::new(1), Bytes::from_static(b"abc")).encode();
        let start = encoded.as_ptr();

        let Decoded::Frame(ArqFrame::Data(frame)) = decode(encoded) else {
            panic!("expected data frame");
        };

        // the payload points into the original allocation
        assert_eq!(frame.payload().as_ptr(), start.wrapping_add(FRAME_HEADER_SIZE));
    }

    #[test]
    fn test_decode_empty_data_payload() {
        let encoded = DataFrame::new(SequenceNumber::new(3), Bytes::new()).encode();
        assert_eq!(encoded.len(), FRAME_HEADER_SIZE);

        let Decoded::Frame(ArqFrame::Data(frame)) = decode(encoded) else {
            panic!("expected data frame");
        };
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_decode_ack() {
        let encoded = AckFrame::new(SequenceNumber::MAX).encode();
        assert_eq!(
            decode(encoded),
            Decoded::Frame(ArqFrame::Ack(AckFrame::new(SequenceNumber::MAX)))
        );
    }

    #[test]
    fn test_short_buffer_passes_through() {
        let buf = Bytes::from_static(&[0x15, 0x75, 0xa4, 0x90, 0x00, 0x00, 0x01]);
        assert_eq!(decode(buf.clone()), Decoded::PassThrough(buf));
    }

    #[test]
    fn test_unknown_magic_passes_through() {
        let buf = Bytes::from_static(b"GET / HTTP/1.1\r\n");
        assert_eq!(decode(buf.clone()), Decoded::PassThrough(buf));
    }

    #[test]
    fn test_frame_enum_conversions() {
        let frame: ArqFrame = AckFrame::new(SequenceNumber::new(4)).into();
        assert_eq!(frame.sequence_number(), SequenceNumber::new(4));
        assert_eq!(ArqFrame::decode(frame.encode()), Decoded::Frame(frame));
    }
}
