use bytes::{Buf, BufMut, BytesMut};

use crate::error::DecodeError;
use crate::packet::{ConnectionId, MessageKind, WireMessage, LONG_HEADER_FLAG};
use crate::util::buf_ext::BufExt;

/// The 'hello' message of the connection-id exchange.
///
/// The client sends its own freshly generated id as `dest_cid` and no `src_cid`. The server
///  answers with its own id as `dest_cid`, echoing the client's id as `src_cid` and the client's
///  packet number.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LongHeader {
    pub flags: u8,
    pub dest_cid: ConnectionId,
    pub src_cid: Option<ConnectionId>,
    pub packet_number: u64,
}

impl LongHeader {
    pub const CLIENT_HELLO_PACKET_NUMBER: u64 = 1;

    pub fn client_hello(local_cid: ConnectionId) -> LongHeader {
        LongHeader {
            flags: LONG_HEADER_FLAG,
            dest_cid: local_cid,
            src_cid: None,
            packet_number: Self::CLIENT_HELLO_PACKET_NUMBER,
        }
    }

    pub fn server_hello(local_cid: ConnectionId, client_hello: &LongHeader) -> LongHeader {
        LongHeader {
            flags: LONG_HEADER_FLAG,
            dest_cid: local_cid,
            src_cid: Some(client_hello.dest_cid),
            packet_number: client_hello.packet_number,
        }
    }
}

impl WireMessage for LongHeader {
    const KIND: MessageKind = MessageKind::Hello;

    fn ser_body(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags);
        self.dest_cid.ser(buf);
        ConnectionId::ser_optional(self.src_cid, buf);
        buf.put_u64(self.packet_number);
    }

    fn deser_body(buf: &mut impl Buf) -> Result<LongHeader, DecodeError> {
        let flags = buf.checked_get_u8()?;
        let dest_cid = ConnectionId::deser(buf)?;
        let src_cid = ConnectionId::deser_optional(buf)?;
        let packet_number = buf.checked_get_u64()?;
        Ok(LongHeader {
            flags,
            dest_cid,
            src_cid,
            packet_number,
        })
    }
}
