//! Raw packets as they arrive from the drone link

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Which of the two drone streams a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Navigation,
    Video,
}

impl PacketKind {
    /// Tag byte used by the recording format.
    pub const fn tag(self) -> u8 {
        match self {
            PacketKind::Navigation => 1,
            PacketKind::Video => 2,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(PacketKind::Navigation),
            2 => Some(PacketKind::Video),
            _ => None,
        }
    }
}

/// Immutable packet payload plus arrival metadata.
///
/// The payload is shared via `Arc` so the recorder tap and a decoder worker
/// can hold the same packet without copying it.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub kind: PacketKind,

    /// Per-stream monotonically increasing sequence number
    pub sequence: u64,

    /// Arrival time on the host
    pub timestamp: Instant,

    pub data: Arc<[u8]>,
}

impl RawPacket {
    pub fn new(kind: PacketKind, sequence: u64, timestamp: Instant, data: Vec<u8>) -> Self {
        Self { kind, sequence, timestamp, data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Stamps packets of one stream with sequence numbers and arrival time.
///
/// Shared between producer threads; numbering stays gap-free and strictly
/// increasing regardless of how many threads call [`stamp`](Self::stamp).
#[derive(Debug)]
pub struct PacketSequencer {
    kind: PacketKind,
    next: AtomicU64,
}

impl PacketSequencer {
    pub fn new(kind: PacketKind) -> Self {
        Self { kind, next: AtomicU64::new(0) }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Wrap `data` into a packet arriving now.
    pub fn stamp(&self, data: Vec<u8>) -> RawPacket {
        self.stamp_at(data, Instant::now())
    }

    pub fn stamp_at(&self, data: Vec<u8>, timestamp: Instant) -> RawPacket {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        RawPacket::new(self.kind, sequence, timestamp, data)
    }

    /// Number of packets stamped so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kind_tags_round_trip_and_reject_unknown() {
        for kind in [PacketKind::Navigation, PacketKind::Video] {
            assert_eq!(PacketKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(PacketKind::from_tag(0), None);
        assert_eq!(PacketKind::from_tag(0xFF), None);
    }

    #[test]
    fn sequencer_is_gap_free_across_threads() {
        let sequencer = Arc::new(PacketSequencer::new(PacketKind::Video));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sequencer = Arc::clone(&sequencer);
                std::thread::spawn(move || {
                    (0..250).map(|_| sequencer.stamp(vec![0]).sequence).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                assert!(seen.insert(seq), "duplicate sequence {seq}");
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(sequencer.issued(), 1000);
        assert!(seen.iter().all(|&s| s < 1000));
    }

    #[test]
    fn packet_payload_is_shared_not_copied() {
        let packet = RawPacket::new(PacketKind::Navigation, 7, Instant::now(), vec![1, 2, 3]);
        let copy = packet.clone();
        assert!(Arc::ptr_eq(&packet.data, &copy.data));
        assert_eq!(copy.len(), 3);
        assert!(!copy.is_empty());
    }
}
