use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::packet::{Packet, StreamFrame};

/// Receiver side accounting for a single stream. Payload bytes are counted, not kept.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReceiveStream {
    pub id: u32,
    /// payload length of the first frame received for this stream
    pub chunk_size: u32,
    pub bytes_received: u64,
    /// frames with a non-empty payload
    pub data_frames_received: u64,
    /// all frames including empty padding frames
    pub frames_received: u64,
    /// Time since the start of the transfer at which the latest finished frame arrived. Padding
    ///  frames of an exhausted stream are flagged as finished, so they move this forward.
    pub finish_time: Option<Duration>,
}

impl ReceiveStream {
    fn new(first_frame: &StreamFrame) -> ReceiveStream {
        ReceiveStream {
            id: first_frame.stream_id,
            chunk_size: first_frame.length(),
            bytes_received: 0,
            data_frames_received: 0,
            frames_received: 0,
            finish_time: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    fn on_frame(&mut self, frame: &StreamFrame, elapsed: Duration) {
        self.frames_received += 1;
        if frame.length() > 0 {
            self.data_frames_received += 1;
        }
        self.bytes_received += frame.length() as u64;

        if frame.offset != self.bytes_received {
            warn!(stream_id = self.id, offset = frame.offset, bytes_received = self.bytes_received, "frame offset does not match the bytes received so far");
        }

        if frame.finished {
            if self.finish_time.is_none() {
                debug!(stream_id = self.id, bytes = self.bytes_received, ?elapsed, "stream finished");
            }
            self.finish_time = Some(elapsed);
        }
    }
}

/// Per-stream receive state, created lazily when a stream id is first seen.
#[derive(Debug, Default)]
pub struct Reassembly {
    streams: FxHashMap<u32, ReceiveStream>,
}

impl Reassembly {
    pub fn new() -> Reassembly {
        Default::default()
    }

    pub fn on_frame(&mut self, frame: &StreamFrame, elapsed: Duration) {
        self.streams.entry(frame.stream_id)
            .or_insert_with(|| ReceiveStream::new(frame))
            .on_frame(frame, elapsed);
    }

    /// Processes all frames of a packet, returning `true` if every one of them was marked as
    ///  finished, i.e. if the receiver should consider the transfer complete.
    pub fn on_packet(&mut self, packet: &Packet, elapsed: Duration) -> bool {
        for frame in &packet.frames {
            self.on_frame(frame, elapsed);
        }
        packet.all_finished()
    }

    pub fn stream(&self, stream_id: u32) -> Option<&ReceiveStream> {
        self.streams.get(&stream_id)
    }

    /// all streams seen so far, in ascending id order
    pub fn streams(&self) -> Vec<&ReceiveStream> {
        let mut result = self.streams.values().collect::<Vec<_>>();
        result.sort_by_key(|s| s.id);
        result
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.streams.values()
            .map(|s| s.bytes_received)
            .sum()
    }
}
