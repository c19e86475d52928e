use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::TransferConfig;
use crate::packet::{ConnectionId, Packet, StreamFrame, SHORT_HEADER_FLAG};
use crate::util::random::Random;

/// Sender side view of a stream: its complete payload and the fixed chunk size it is cut into.
#[derive(Debug, Clone)]
pub struct SendStream {
    pub id: u32,
    data: Bytes,
    chunk_size: usize,
    bytes_sent: u64,
}

impl SendStream {
    pub fn new(id: u32, data: Bytes, chunk_size: usize) -> SendStream {
        assert!(chunk_size > 0, "chunk size must be positive");
        SendStream {
            id,
            data,
            chunk_size,
            bytes_sent: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// number of frames with actual payload, i.e. `ceil(len / chunk_size)`
    pub fn num_chunks(&self) -> u64 {
        self.data.len().div_ceil(self.chunk_size) as u64
    }

    /// The frame for the `packet_index`th packet.
    ///
    /// Once the stream is exhausted, this is an empty frame flagged as finished (if `pad` is set),
    ///  or no frame at all.
    fn frame_for_packet(&mut self, packet_index: u64, pad: bool) -> Option<StreamFrame> {
        let start = (self.chunk_size as u64).saturating_mul(packet_index);
        let len = self.data.len() as u64;

        if start >= len {
            if !pad {
                return None;
            }
            return Some(StreamFrame {
                stream_id: self.id,
                offset: self.bytes_sent,
                finished: true,
                data: Bytes::new(),
            });
        }

        let remaining = (self.chunk_size as u64).min(len - start);
        let end = start + remaining;
        let data = self.data.slice(start as usize..end as usize);
        self.bytes_sent += remaining;

        Some(StreamFrame {
            stream_id: self.id,
            offset: self.bytes_sent,
            finished: end >= len,
            data,
        })
    }
}

/// Produces the sequence of data packets for a set of streams.
///
/// Packet `p` (numbered from 0) carries one frame per stream in ascending stream id order, the
///  frame holding the stream's `p`th chunk. There are as many packets as the stream with the
///  most chunks needs, so streams with fewer chunks are exhausted before the last packet.
pub struct Multiplexer {
    dest_cid: ConnectionId,
    streams: Vec<SendStream>,
    pad_exhausted_streams: bool,
    next_packet_number: u64,
    max_packets: u64,
}

impl Multiplexer {
    pub fn new(dest_cid: ConnectionId, mut streams: Vec<SendStream>, pad_exhausted_streams: bool) -> Multiplexer {
        streams.sort_by_key(|s| s.id);

        // at least one packet: the receiver only stops at a packet whose frames are all finished,
        //  and a packet without frames (no streams, or only empty ones) is such a packet
        let max_packets = streams.iter()
            .map(|s| s.num_chunks())
            .max()
            .unwrap_or(0)
            .max(1);

        debug!(num_streams = streams.len(), max_packets, "multiplexing streams");
        Multiplexer {
            dest_cid,
            streams,
            pad_exhausted_streams,
            next_packet_number: 0,
            max_packets,
        }
    }

    /// Stream `i` gets `payloads[i]` as its data, and a chunk size picked uniformly from the
    ///  configured range.
    pub fn with_random_chunk_sizes<R: Random>(dest_cid: ConnectionId, payloads: Vec<Bytes>, config: &TransferConfig) -> Multiplexer {
        let streams = payloads.into_iter()
            .enumerate()
            .map(|(id, data)| {
                let chunk_size = R::gen_usize_range(config.chunk_size_range());
                debug!(stream_id = id, len = data.len(), chunk_size, "prepared send stream");
                SendStream::new(id as u32, data, chunk_size)
            })
            .collect();

        Self::new(dest_cid, streams, config.pad_exhausted_streams)
    }

    pub fn max_packets(&self) -> u64 {
        self.max_packets
    }

    pub fn streams(&self) -> &[SendStream] {
        &self.streams
    }
}

impl Iterator for Multiplexer {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        if self.next_packet_number >= self.max_packets {
            return None;
        }

        let packet_number = self.next_packet_number;
        self.next_packet_number += 1;

        let pad = self.pad_exhausted_streams;
        let frames = self.streams.iter_mut()
            .filter_map(|s| s.frame_for_packet(packet_number, pad))
            .collect::<Vec<_>>();

        trace!(packet_number, num_frames = frames.len(), "built packet");
        Some(Packet {
            flags: SHORT_HEADER_FLAG,
            dest_cid: self.dest_cid,
            packet_number,
            frames,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.max_packets - self.next_packet_number) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Multiplexer {
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::util::random::{MockRandom, MOCK_RANDOM_MUTEX};
    use super::*;

    fn payload(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    fn frames_of_stream(packets: &[Packet], stream_id: u32) -> Vec<StreamFrame> {
        packets.iter()
            .flat_map(|p| p.frames.iter())
            .filter(|f| f.stream_id == stream_id)
            .cloned()
            .collect()
    }

    #[rstest]
    #[case::exact_multiple(10_000, 2000)]
    #[case::partial_last_chunk(10_001, 2000)]
    #[case::single_partial_chunk(999, 1000)]
    #[case::single_full_chunk(1000, 1000)]
    #[case::odd_sizes(1_048_576, 1337)]
    fn test_chunk_coverage_single_stream(#[case] len: usize, #[case] chunk_size: usize) {
        let data = payload(len);
        let packets = Multiplexer::new(ConnectionId(1), vec![SendStream::new(0, data.clone(), chunk_size)], true)
            .collect::<Vec<_>>();
        let frames = frames_of_stream(&packets, 0);

        assert_eq!(frames.len(), len.div_ceil(chunk_size));
        assert_eq!(frames.iter().map(|f| f.length() as usize).sum::<usize>(), len);
        assert_eq!(frames.iter().filter(|f| f.finished).count(), 1);
        assert!(frames.last().unwrap().finished);

        let reassembled = frames.iter()
            .flat_map(|f| f.data.iter().copied())
            .collect::<Vec<_>>();
        assert_eq!(reassembled, data.as_ref());
    }

    #[test]
    fn test_offsets_are_running_totals() {
        let packets = Multiplexer::new(ConnectionId(1), vec![SendStream::new(0, payload(2500), 1000)], true)
            .collect::<Vec<_>>();
        let frames = frames_of_stream(&packets, 0);

        assert_eq!(frames.iter().map(|f| f.offset).collect::<Vec<_>>(), vec![1000, 2000, 2500]);
        assert_eq!(frames.iter().map(|f| f.length()).collect::<Vec<_>>(), vec![1000, 1000, 500]);
        assert_eq!(frames.iter().map(|f| f.finished).collect::<Vec<_>>(), vec![false, false, true]);
    }

    #[test]
    fn test_packet_layout() {
        let streams = vec![
            SendStream::new(1, payload(3000), 1000),
            SendStream::new(0, payload(1500), 1000),
        ];
        let packets = Multiplexer::new(ConnectionId(0xabc), streams, true)
            .collect::<Vec<_>>();

        assert_eq!(packets.len(), 3);
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.packet_number, i as u64);
            assert_eq!(packet.dest_cid, ConnectionId(0xabc));
            assert_eq!(packet.flags, SHORT_HEADER_FLAG);
            assert_eq!(packet.frames.iter().map(|f| f.stream_id).collect::<Vec<_>>(), vec![0, 1]);
        }

        assert!(!packets[0].all_finished());
        assert!(!packets[1].all_finished());
        assert!(packets[2].all_finished());
    }

    /// An exhausted stream keeps occupying a frame slot in every later packet: the frame is
    ///  empty, keeps the final offset, and is flagged as finished again.
    #[test]
    fn test_exhausted_stream_is_padded() {
        let streams = vec![
            SendStream::new(0, payload(1000), 1000),
            SendStream::new(1, payload(3000), 1000),
        ];
        let packets = Multiplexer::new(ConnectionId(1), streams, true)
            .collect::<Vec<_>>();
        let frames = frames_of_stream(&packets, 0);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].length(), 1000);
        assert!(frames[0].finished);
        for padding in &frames[1..] {
            assert_eq!(padding.length(), 0);
            assert_eq!(padding.offset, 1000);
            assert!(padding.finished);
        }

        let data_frames = frames.iter().filter(|f| f.length() > 0).count();
        assert_eq!(data_frames, 1);
    }

    #[test]
    fn test_exhausted_stream_without_padding() {
        let streams = vec![
            SendStream::new(0, payload(1000), 1000),
            SendStream::new(1, payload(3000), 1000),
        ];
        let packets = Multiplexer::new(ConnectionId(1), streams, false)
            .collect::<Vec<_>>();

        assert_eq!(packets.iter().map(|p| p.frames.len()).collect::<Vec<_>>(), vec![2, 1, 1]);
        let frames = frames_of_stream(&packets, 0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.iter().filter(|f| f.finished).count(), 1);
    }

    #[test]
    fn test_no_streams_yields_single_empty_packet() {
        let mut mux = Multiplexer::new(ConnectionId(1), vec![], true);
        assert_eq!(mux.max_packets(), 1);

        let packet = mux.next().unwrap();
        assert_eq!(packet.packet_number, 0);
        assert!(packet.frames.is_empty());
        assert!(packet.all_finished());
        assert!(mux.next().is_none());
    }

    #[rstest]
    #[case::padded(true, 1)]
    #[case::unpadded(false, 0)]
    fn test_empty_stream_yields_single_finished_packet(#[case] pad: bool, #[case] num_frames: usize) {
        let packets = Multiplexer::new(ConnectionId(1), vec![SendStream::new(0, Bytes::new(), 1000)], pad)
            .collect::<Vec<_>>();

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].frames.len(), num_frames);
        assert!(packets[0].all_finished());
    }

    #[test]
    fn test_exact_size() {
        let mut mux = Multiplexer::new(ConnectionId(1), vec![SendStream::new(0, payload(5000), 1000)], true);
        assert_eq!(mux.len(), 5);
        mux.next();
        assert_eq!(mux.len(), 4);
    }

    #[test]
    fn test_bytes_sent() {
        let mut mux = Multiplexer::new(ConnectionId(1), vec![SendStream::new(0, payload(2500), 1000)], true);
        mux.by_ref().for_each(drop);
        assert_eq!(mux.streams()[0].bytes_sent(), 2500);
    }

    #[test]
    fn test_with_random_chunk_sizes() {
        let _lock = MOCK_RANDOM_MUTEX.lock();

        let ctx = MockRandom::gen_usize_range_context();
        ctx.expect()
            .withf(|range| *range == (1000..=2000))
            .times(2)
            .returning(|_| 1500);

        let mux = Multiplexer::with_random_chunk_sizes::<MockRandom>(
            ConnectionId(1),
            vec![payload(3000), payload(4500)],
            &TransferConfig::default(),
        );
        assert_eq!(mux.streams().iter().map(|s| (s.id, s.chunk_size())).collect::<Vec<_>>(), vec![(0, 1500), (1, 1500)]);
        assert_eq!(mux.max_packets(), 3);
    }
}
