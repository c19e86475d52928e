use bytes::{Buf, BufMut, BytesMut};

use crate::error::DecodeError;
use crate::packet::{ConnectionId, MessageKind, StreamFrame, WireMessage};
use crate::util::buf_ext::BufExt;
use crate::util::safe_converter::{PrecheckedCast, SafeCast};

/// A data packet, carrying one [StreamFrame] per stream in ascending stream id order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Packet {
    pub flags: u8,
    pub dest_cid: ConnectionId,
    pub packet_number: u64,
    pub frames: Vec<StreamFrame>,
}

impl Packet {
    /// `true` if every frame in this packet is marked as finished.
    ///
    /// NB: This is a per-packet criterion - streams that were seen in earlier packets but are
    ///  missing from this one are not considered. A packet without frames counts as finished.
    pub fn all_finished(&self) -> bool {
        self.frames.iter()
            .all(|f| f.finished)
    }

    pub fn payload_len(&self) -> usize {
        self.frames.iter()
            .map(|f| f.data.len())
            .sum()
    }
}

impl WireMessage for Packet {
    const KIND: MessageKind = MessageKind::Data;

    fn ser_body(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags);
        self.dest_cid.ser(buf);
        buf.put_u64(self.packet_number);
        buf.put_u32(self.frames.len().prechecked_cast());
        for frame in &self.frames {
            frame.ser(buf);
        }
    }

    fn deser_body(buf: &mut impl Buf) -> Result<Packet, DecodeError> {
        let flags = buf.checked_get_u8()?;
        let dest_cid = ConnectionId::deser(buf)?;
        let packet_number = buf.checked_get_u64()?;

        let num_frames: usize = buf.checked_get_u32()?.safe_cast();
        // every frame has at least a fixed 18 byte prefix, so don't trust the count for
        //  pre-allocation beyond what the buffer can hold
        let mut frames = Vec::with_capacity(num_frames.min(buf.remaining() / 18));
        for _ in 0..num_frames {
            frames.push(StreamFrame::deser(buf)?);
        }

        Ok(Packet {
            flags,
            dest_cid,
            packet_number,
            frames,
        })
    }
}
