use bytes::{Buf, BufMut, BytesMut};

use crate::error::DecodeError;
use crate::packet::{MessageKind, WireMessage};
use crate::util::buf_ext::BufExt;

/// Acknowledges exactly one data packet, echoing its packet number.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Ack {
    pub ack_number: u64,
    /// time between receiving the packet and sending this ack, in microseconds
    pub ack_delay: u32,
}

impl WireMessage for Ack {
    const KIND: MessageKind = MessageKind::Ack;

    fn ser_body(&self, buf: &mut BytesMut) {
        buf.put_u64(self.ack_number);
        buf.put_u32(self.ack_delay);
    }

    fn deser_body(buf: &mut impl Buf) -> Result<Ack, DecodeError> {
        let ack_number = buf.checked_get_u64()?;
        let ack_delay = buf.checked_get_u32()?;
        Ok(Ack {
            ack_number,
            ack_delay,
        })
    }
}
