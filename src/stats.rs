//! Throughput figures derived from the receiver's per-stream counters.
//!
//! Packet counts are not counted but inferred as `ceil(bytes / chunk size)` with the chunk size
//!  taken from the first frame of each stream. Rates are relative to the time from the start of
//!  the transfer until the stream's latest finished frame, so they are `None` for a stream that
//!  never finished (or finished at time zero).

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::stream::{Reassembly, ReceiveStream};

const SEPARATOR: &str = "---------------------------------------------------------------";

#[derive(Debug, Clone, PartialEq)]
pub struct StreamStats {
    pub stream_id: u32,
    pub bytes_received: u64,
    pub chunk_size: u32,
    pub packets_received: u64,
    pub finish_time: Option<Duration>,
}

impl StreamStats {
    pub fn new(stream_id: u32, bytes_received: u64, chunk_size: u32, finish_time: Option<Duration>) -> StreamStats {
        let packets_received = if chunk_size == 0 {
            0
        }
        else {
            bytes_received.div_ceil(chunk_size as u64)
        };

        StreamStats {
            stream_id,
            bytes_received,
            chunk_size,
            packets_received,
            finish_time,
        }
    }

    fn finish_secs(&self) -> Option<f64> {
        self.finish_time
            .map(|t| t.as_secs_f64())
            .filter(|&secs| secs > 0.0)
    }

    /// bytes per second
    pub fn throughput(&self) -> Option<f64> {
        self.finish_secs()
            .map(|secs| self.bytes_received as f64 / secs)
    }

    /// packets per second, rounded up
    pub fn packet_rate(&self) -> Option<u64> {
        self.finish_secs()
            .map(|secs| (self.packets_received as f64 / secs).ceil() as u64)
    }
}

impl From<&ReceiveStream> for StreamStats {
    fn from(value: &ReceiveStream) -> Self {
        StreamStats::new(value.id, value.bytes_received, value.chunk_size, value.finish_time)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferStats {
    /// in ascending stream id order
    pub streams: Vec<StreamStats>,
}

impl TransferStats {
    pub fn new(mut streams: Vec<StreamStats>) -> TransferStats {
        streams.sort_by_key(|s| s.stream_id);
        TransferStats { streams }
    }

    pub fn total_bytes(&self) -> u64 {
        self.streams.iter()
            .map(|s| s.bytes_received)
            .sum()
    }

    pub fn total_packets(&self) -> u64 {
        self.streams.iter()
            .map(|s| s.packets_received)
            .sum()
    }

    /// the latest finish time of all streams
    pub fn elapsed(&self) -> Option<Duration> {
        self.streams.iter()
            .filter_map(|s| s.finish_time)
            .max()
    }

    /// total bytes per second, relative to the latest finish time
    pub fn throughput(&self) -> Option<f64> {
        self.elapsed()
            .map(|t| t.as_secs_f64())
            .filter(|&secs| secs > 0.0)
            .map(|secs| self.total_bytes() as f64 / secs)
    }
}

impl From<&Reassembly> for TransferStats {
    fn from(value: &Reassembly) -> Self {
        TransferStats::new(value.streams()
            .into_iter()
            .map(StreamStats::from)
            .collect())
    }
}

struct Rate(Option<f64>);
impl Display for Rate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(rate) => write!(f, "{:.2}", rate),
            None => write!(f, "n/a"),
        }
    }
}

impl Display for TransferStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Number of bytes received in each stream:")?;
        for s in &self.streams {
            writeln!(f, "Stream {} received {} bytes", s.stream_id, s.bytes_received)?;
        }
        writeln!(f, "{}", SEPARATOR)?;

        writeln!(f, "Number of packets received in each stream:")?;
        for s in &self.streams {
            writeln!(f, "Stream {} received {} packets", s.stream_id, s.packets_received)?;
        }
        writeln!(f, "{}", SEPARATOR)?;

        writeln!(f, "Bandwidth of each stream:")?;
        for s in &self.streams {
            let pps = s.packet_rate()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(f, "Stream {} bandwidth: {} B/s, {} packets per second", s.stream_id, Rate(s.throughput()), pps)?;
        }
        writeln!(f, "{}", SEPARATOR)?;

        writeln!(f, "Total bandwidth: {} B/s", Rate(self.throughput()))?;
        writeln!(f, "{}", SEPARATOR)?;

        write!(f, "Total packets received: {} packets", self.total_packets())
    }
}
