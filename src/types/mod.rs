//! Core data types shared by every stage of the pipeline.
//!
//! - [`RawPacket`] is the unit that flows from the network into the workers
//! - [`FlightCommand`] and [`DiscreteAction`] flow the other way, to the drone
//! - [`VideoFrame`] is what the video worker publishes
//! - [`Describe`] lists fields of telemetry types for display
//!
//! ```rust
//! use dronewire::types::{FlightCommand, PacketKind, PacketSequencer};
//!
//! let navigation = PacketSequencer::new(PacketKind::Navigation);
//! let first = navigation.stamp(vec![0x88, 0x77, 0x66, 0x55]);
//! let second = navigation.stamp(vec![0x88, 0x77, 0x66, 0x55]);
//! assert!(second.sequence > first.sequence);
//!
//! let command = FlightCommand::new(-0.9, 0.0, 0.0, 1.7);
//! assert_eq!(command.gaz(), 1.0);
//! ```

mod command;
mod describe;
mod frame;
mod packet;
mod update_rate;

pub use command::{DiscreteAction, FlightCommand};
pub use describe::{Describe, Field, FieldValue, render_fields};
pub use frame::{PixelLayout, VideoFrame};
pub use packet::{PacketKind, PacketSequencer, RawPacket};
pub use update_rate::UpdateRate;
