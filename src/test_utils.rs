//! Test doubles and fixture builders shared by unit tests, integration tests
//! and benches.
//!
//! Nothing here talks to a drone: navigation buffers are built with the
//! crate's own encoder, the video decoder fills frames with the first byte
//! of each unit, and the drone client records what it was asked to do.

#![cfg(any(test, feature = "benchmark"))]

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::client::DroneClient;
use crate::navdata::{self, ControlPhase, ControlState, DroneState, FlyingState, NavdataRecord, flags};
use crate::types::{DiscreteAction, FlightCommand, PixelLayout};
use crate::video::pave::{self, FrameType, PAVE_HEADER_SIZE, PaveHeader};
use crate::video::{DecodedPicture, VideoDecoder};
use crate::{DroneError, Result};

/// A hovering drone one metre up, heading 45 degrees, drifting slightly.
pub fn sample_navdata() -> NavdataRecord {
    NavdataRecord {
        drone_state: DroneState(flags::FLYING | flags::VIDEO_ENABLED | flags::NAVDATA_DEMO),
        sequence: 1,
        vision_defined: 0,
        control: ControlState { phase: ControlPhase::Hovering, flying: FlyingState::Ok },
        battery: 87,
        theta: 1_500.0,
        phi: -800.0,
        psi: 45_000.0,
        altitude: 1_000,
        vx: 120.0,
        vy: -40.0,
        vz: 5.0,
        frame_index: 0,
    }
}

/// Wire bytes for a record, checksum included.
pub fn navdata_bytes(record: &NavdataRecord) -> Vec<u8> {
    navdata::encode(record)
}

/// A video payload wrapped in a PaVE header.
pub fn pave_packet(frame_number: u32, frame_type: FrameType, payload: &[u8]) -> Vec<u8> {
    let header = PaveHeader {
        header_size: PAVE_HEADER_SIZE as u16,
        payload_size: payload.len() as u32,
        width: 640,
        height: 360,
        frame_number,
        frame_type,
    };
    pave::encode(&header, payload)
}

/// First byte that makes [`FakeDecoder`] reject a unit.
pub const REJECT_MARKER: u8 = 0xEE;

/// Decoder producing solid RGB frames filled with the unit's first byte.
///
/// Empty units complete no picture; units starting with [`REJECT_MARKER`]
/// are rejected.
#[derive(Debug)]
pub struct FakeDecoder {
    width: u32,
    height: u32,
    decoded: usize,
    rejected: usize,
}

impl FakeDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, decoded: 0, rejected: 0 }
    }

    pub fn decoded(&self) -> usize {
        self.decoded
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl VideoDecoder for FakeDecoder {
    fn pixel_layout(&self) -> PixelLayout {
        PixelLayout::Rgb24
    }

    fn decode(&mut self, unit: &[u8]) -> Result<Option<DecodedPicture>> {
        let Some(&fill) = unit.first() else {
            return Ok(None);
        };
        if fill == REJECT_MARKER {
            self.rejected += 1;
            return Err(DroneError::decoder_failure("unit carries the reject marker"));
        }

        self.decoded += 1;
        let len = self.width as usize * self.height as usize * PixelLayout::Rgb24.bytes_per_pixel();
        Ok(Some(DecodedPicture { width: self.width, height: self.height, pixels: vec![fill; len] }))
    }
}

#[derive(Debug, Default)]
struct ClientLog {
    commands: Vec<FlightCommand>,
    actions: Vec<DiscreteAction>,
    navdata: Option<Arc<NavdataRecord>>,
}

/// Drone client that records every call.
#[derive(Debug, Default)]
pub struct RecordingClient {
    log: Mutex<ClientLog>,
    reject_commands: bool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose `send_command` always fails; actions still succeed.
    pub fn rejecting_commands() -> Self {
        Self { reject_commands: true, ..Self::default() }
    }

    pub fn with_navdata(record: NavdataRecord) -> Self {
        let client = Self::new();
        client.set_navdata(Some(record));
        client
    }

    pub fn set_navdata(&self, record: Option<NavdataRecord>) {
        self.lock().navdata = record.map(Arc::new);
    }

    pub fn commands(&self) -> Vec<FlightCommand> {
        self.lock().commands.clone()
    }

    pub fn actions(&self) -> Vec<DiscreteAction> {
        self.lock().actions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DroneClient for RecordingClient {
    fn send_command(&self, command: FlightCommand) -> Result<()> {
        if self.reject_commands {
            return Err(DroneError::sink_io("send command", io::Error::other("link down")));
        }
        self.lock().commands.push(command);
        Ok(())
    }

    fn send_action(&self, action: DiscreteAction) -> Result<()> {
        self.lock().actions.push(action);
        Ok(())
    }

    fn navdata(&self) -> Option<Arc<NavdataRecord>> {
        self.lock().navdata.clone()
    }
}

/// In-memory recording sink that stays readable after the recorder takes
/// ownership of a clone.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
