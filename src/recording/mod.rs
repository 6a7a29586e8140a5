//! Packet recording and playback.
//!
//! [`PacketRecorder`] taps both packet streams and appends them, in arrival
//! order, to any [`Write`](std::io::Write) sink. [`Player`] reads such a
//! recording back and republishes the packets with their original spacing.
//!
//! ```rust
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use dronewire::recording::{PacketRecorder, Player, PlayerState, RecordingReader};
//! use dronewire::types::{PacketKind, PacketSequencer, RawPacket};
//! use dronewire::worker::Notifier;
//!
//! # fn main() -> dronewire::Result<()> {
//! let mut recorder = PacketRecorder::new(Vec::new(), Notifier::disabled());
//! recorder.start()?;
//! let stream = PacketSequencer::new(PacketKind::Navigation);
//! recorder.enqueue(stream.stamp(vec![1, 2, 3]));
//! recorder.stop();
//! let bytes = recorder.join().expect("recorder thread");
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<RawPacket>();
//! let mut player = Player::new(Arc::new(tx), 1.0, Notifier::disabled())?;
//! player.play(RecordingReader::new(Cursor::new(bytes)))?;
//! assert_eq!(player.join(), PlayerState::Finished);
//! assert_eq!(&rx.try_recv().expect("replayed").data[..], &[1, 2, 3]);
//! # Ok(())
//! # }
//! ```

pub mod format;
mod player;
mod recorder;

pub use format::{
    MAX_PAYLOAD, RECORDING_EXTENSION, RecordedEntry, RecordingReader, TICKS_PER_SECOND,
    recording_path,
};
pub use player::{Player, PlayerState};
pub use recorder::PacketRecorder;
