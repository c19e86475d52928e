use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::packet::{MessageKind, WireMessage};
use crate::util::buf_ext::{BufExt, BufMutExt};
use crate::util::safe_converter::PrecheckedCast;

/// One stream's chunk inside a data packet.
///
/// NB: `offset` is the running total of bytes of this stream *including* this frame's payload,
///  not the position of the payload's first byte.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreamFrame {
    pub stream_id: u32,
    pub offset: u64,
    /// `true` iff this frame's payload reaches the end of the stream
    pub finished: bool,
    pub data: Bytes,
}

impl StreamFrame {
    pub fn length(&self) -> u32 {
        self.data.len().prechecked_cast()
    }

    /// A frame from the client's request, announcing one stream by id.
    pub fn stream_request(stream_id: u32) -> StreamFrame {
        let data = Bytes::from(format!("Request{}", stream_id));
        StreamFrame {
            stream_id,
            offset: data.len() as u64,
            finished: false,
            data,
        }
    }
}

impl WireMessage for StreamFrame {
    const KIND: MessageKind = MessageKind::StreamFrame;

    fn ser_body(&self, buf: &mut BytesMut) {
        buf.put_u32(self.stream_id);
        buf.put_u64(self.offset);
        buf.put_u8(self.finished.into());
        buf.put_len_prefixed(&self.data);
    }

    fn deser_body(buf: &mut impl Buf) -> Result<StreamFrame, DecodeError> {
        let stream_id = buf.checked_get_u32()?;
        let offset = buf.checked_get_u64()?;
        let finished = match buf.checked_get_u8()? {
            0 => false,
            1 => true,
            n => return Err(DecodeError::InvalidFinishedFlag(n)),
        };
        let data = buf.checked_get_len_prefixed()?;
        Ok(StreamFrame {
            stream_id,
            offset,
            finished,
            data,
        })
    }
}
