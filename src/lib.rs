//! Control and telemetry pipeline for AR.Drone-class quadrotors.
//!
//! dronewire ingests the drone's two packet streams (navigation telemetry and
//! compressed video), decodes them on dedicated worker threads, records and
//! replays them with their original timing, and flies timed objectives from
//! an autopilot queue.
//!
//! # Features
//!
//! - **Packet workers**: one thread and one unbounded FIFO per stream
//! - **Navdata decoding**: pure, side-effect free, fuzz tested
//! - **Latest-value telemetry**: single-writer slots with throttled streams
//! - **Record and replay**: one interleaved file, cooperative cancellation
//! - **Autopilot**: time-boxed objectives composed of per-axis intents
//!
//! The network transport and the video codec are collaborators supplied by
//! the host through [`client::DroneClient`] and [`video::VideoDecoder`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dronewire::config::Config;
//! use dronewire::pipeline::Pipeline;
//! use dronewire::recording::Player;
//! use dronewire::worker::Notifier;
//! # use dronewire::types::PixelLayout;
//! # use dronewire::video::{DecodedPicture, VideoDecoder};
//! # struct MyDecoder;
//! # impl VideoDecoder for MyDecoder {
//! #     fn pixel_layout(&self) -> PixelLayout { PixelLayout::Bgr24 }
//! #     fn decode(&mut self, _: &[u8]) -> dronewire::Result<Option<DecodedPicture>> { Ok(None) }
//! # }
//!
//! # fn main() -> dronewire::Result<()> {
//! let config = Config::load("dronewire.yaml")?;
//! dronewire::logging::init_logging(&config.logging);
//!
//! let (notifier, _notifications) = Notifier::channel();
//! let pipeline = Pipeline::start(&config, MyDecoder, notifier.clone())?;
//!
//! let mut player = Player::new(Arc::new(pipeline.inlet()), config.playback.rate, notifier)?;
//! player.play_file("flight.ardrone")?;
//! player.join();
//!
//! if let Some(record) = pipeline.navdata().get() {
//!     println!("battery {}%", record.battery);
//! }
//! pipeline.shutdown();
//! # Ok(())
//! # }
//! ```

mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Ingest and decoding
pub mod navdata;
pub mod pipeline;
pub mod stream;
pub mod telemetry;
pub mod video;
pub mod worker;

// Recording and control
pub mod autopilot;
pub mod client;
pub mod control;
pub mod recording;

// Ambient
pub mod config;
pub mod logging;

pub use error::{DroneError, Result};
