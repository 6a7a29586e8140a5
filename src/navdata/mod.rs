//! Navigation telemetry decoding.
//!
//! [`decode`] turns a navigation packet payload into a [`NavdataRecord`], or
//! returns [`DroneError::MalformedPacket`](crate::DroneError::MalformedPacket).
//! It has no side effects, so callers keep their last good record when a
//! packet fails to decode.
//!
//! ```rust
//! use dronewire::navdata::{self, ControlPhase};
//!
//! let garbage = [0u8; 8];
//! assert!(navdata::decode(&garbage).is_err());
//!
//! let word = 0x0004_0000u32;
//! let state = navdata::ControlState::from_word(word);
//! assert_eq!(state.phase, ControlPhase::Hovering);
//! ```

mod format;
mod record;
mod state;

pub use format::{
    HEADER_SIZE, MIN_PACKET_SIZE, NAVDATA_MAGIC, TAG_CHECKSUM, TAG_DEMO, checksum, decode, encode,
};
pub use record::NavdataRecord;
pub use state::{ControlPhase, ControlState, DroneState, FlyingState, flags};
