//! Wire codec for the four message kinds exchanged between peers.
//!
//! All numbers are in network byte order (BE). Every datagram starts with a single discriminator
//!  byte identifying the message kind, so that a decoder expecting one kind of message detects a
//!  different one rather than misinterpreting its bytes:
//!
//! ```ascii
//! 0x01 hello (long header)
//!      flags (u8), dest cid (len u8 + 8 bytes), src cid (len u8 + 0 or 8 bytes),
//!      packet number (u64)
//! 0x02 data packet
//!      flags (u8), dest cid (len u8 + 8 bytes), packet number (u64),
//!      number of frames (u32), frames
//! 0x03 ack
//!      ack number (u64), ack delay in microseconds (u32)
//! 0x08 stream frame (nested in data packets, or standalone)
//!      stream id (u32), offset (u64), finished (u8, 0 or 1), payload (len u32 + bytes)
//! ```
//!
//! Decoding is all-or-nothing: an empty or truncated buffer, an unexpected discriminator or bytes
//!  left over after the message are a [DecodeError].

pub mod ack;
pub mod connection_id;
pub mod data_packet;
pub mod long_header;
pub mod stream_frame;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::DecodeError;
use crate::util::buf_ext::BufExt;

pub use ack::Ack;
pub use connection_id::ConnectionId;
pub use data_packet::Packet;
pub use long_header::LongHeader;
pub use stream_frame::StreamFrame;

/// Header flag marking a handshake packet.
pub const LONG_HEADER_FLAG: u8 = 1;
/// Header flag for packets sent after the handshake.
pub const SHORT_HEADER_FLAG: u8 = 0;

#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageKind {
    Hello = 0x01,
    Data = 0x02,
    Ack = 0x03,
    StreamFrame = 0x08,
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Hello => "hello",
            MessageKind::Data => "data",
            MessageKind::Ack => "ack",
            MessageKind::StreamFrame => "stream frame",
        }
    }

    pub fn peek(buf: &[u8]) -> Result<MessageKind, DecodeError> {
        let raw = *buf.first()
            .ok_or(DecodeError::Empty)?;
        MessageKind::try_from_primitive(raw)
            .map_err(|_| DecodeError::UnknownKind(raw))
    }

    fn deser_expected(buf: &mut impl Buf, expected: MessageKind) -> Result<(), DecodeError> {
        let raw = buf.checked_get_u8()?;
        let actual = MessageKind::try_from_primitive(raw)
            .map_err(|_| DecodeError::UnknownKind(raw))?;
        if actual != expected {
            return Err(DecodeError::UnexpectedKind {
                expected: expected.name(),
                actual: actual.name(),
            });
        }
        Ok(())
    }
}

/// A self-describing message: its serialized form is the [MessageKind] discriminator followed
///  by the kind specific body.
pub trait WireMessage: Sized {
    const KIND: MessageKind;

    fn ser_body(&self, buf: &mut BytesMut);

    fn deser_body(buf: &mut impl Buf) -> Result<Self, DecodeError>;

    fn ser(&self, buf: &mut BytesMut) {
        buf.put_u8(Self::KIND.into());
        self.ser_body(buf);
    }

    /// reads one message of this kind from the buffer's start, leaving the rest in place
    fn deser(buf: &mut impl Buf) -> Result<Self, DecodeError> {
        MessageKind::deser_expected(buf, Self::KIND)?;
        Self::deser_body(buf)
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.ser(&mut buf);
        buf.freeze()
    }

    /// decodes a complete datagram that must contain exactly one message of this kind
    fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        if datagram.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut buf = datagram;
        let result = Self::deser(&mut buf)?;
        if !buf.is_empty() {
            return Err(DecodeError::TrailingBytes(buf.len()));
        }
        Ok(result)
    }
}
