//! Status words carried in navigation packets
//!
//! The demo option packs the controller state into one 32-bit word: the high
//! half is the control phase, the low half the flying state. The header also
//! carries a 32-bit drone-state bitfield.

use serde::{Deserialize, Serialize};

use crate::types::{Describe, Field};

/// High-level controller mode (high 16 bits of the control-state word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlPhase {
    Default,
    Init,
    Landed,
    Flying,
    Hovering,
    Test,
    TakingOff,
    GotoFix,
    Landing,
    Looping,
    Unknown(u16),
}

impl ControlPhase {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => ControlPhase::Default,
            1 => ControlPhase::Init,
            2 => ControlPhase::Landed,
            3 => ControlPhase::Flying,
            4 => ControlPhase::Hovering,
            5 => ControlPhase::Test,
            6 => ControlPhase::TakingOff,
            7 => ControlPhase::GotoFix,
            8 => ControlPhase::Landing,
            9 => ControlPhase::Looping,
            other => ControlPhase::Unknown(other),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            ControlPhase::Default => 0,
            ControlPhase::Init => 1,
            ControlPhase::Landed => 2,
            ControlPhase::Flying => 3,
            ControlPhase::Hovering => 4,
            ControlPhase::Test => 5,
            ControlPhase::TakingOff => 6,
            ControlPhase::GotoFix => 7,
            ControlPhase::Landing => 8,
            ControlPhase::Looping => 9,
            ControlPhase::Unknown(raw) => raw,
        }
    }

    /// Airborne phases: the drone accepts progressive flight commands.
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            ControlPhase::Flying
                | ControlPhase::Hovering
                | ControlPhase::GotoFix
                | ControlPhase::Looping
                | ControlPhase::Landing
        )
    }
}

/// Fine-grained flight state (low 16 bits of the control-state word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlyingState {
    Ok,
    LostAltitude,
    LostAltitudeGoDown,
    AltitudeOutOfZone,
    CombinedYaw,
    Brake,
    NoVision,
    Unknown(u16),
}

impl FlyingState {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => FlyingState::Ok,
            1 => FlyingState::LostAltitude,
            2 => FlyingState::LostAltitudeGoDown,
            3 => FlyingState::AltitudeOutOfZone,
            4 => FlyingState::CombinedYaw,
            5 => FlyingState::Brake,
            6 => FlyingState::NoVision,
            other => FlyingState::Unknown(other),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            FlyingState::Ok => 0,
            FlyingState::LostAltitude => 1,
            FlyingState::LostAltitudeGoDown => 2,
            FlyingState::AltitudeOutOfZone => 3,
            FlyingState::CombinedYaw => 4,
            FlyingState::Brake => 5,
            FlyingState::NoVision => 6,
            FlyingState::Unknown(raw) => raw,
        }
    }
}

/// Both halves of the control-state word, always unpacked together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlState {
    pub phase: ControlPhase,
    pub flying: FlyingState,
}

impl ControlState {
    pub fn from_word(word: u32) -> Self {
        Self {
            phase: ControlPhase::from_raw((word >> 16) as u16),
            flying: FlyingState::from_raw((word & 0xFFFF) as u16),
        }
    }

    pub fn word(self) -> u32 {
        (u32::from(self.phase.raw()) << 16) | u32::from(self.flying.raw())
    }
}

/// Drone-state bitfield masks from the navigation header.
pub mod flags {
    pub const FLYING: u32 = 1 << 0;
    pub const VIDEO_ENABLED: u32 = 1 << 1;
    pub const VISION_ENABLED: u32 = 1 << 2;
    pub const CONTROL_EULER: u32 = 1 << 3;
    pub const ALTITUDE_CONTROL: u32 = 1 << 4;
    pub const COMMAND_ACK: u32 = 1 << 6;
    pub const CAMERA_READY: u32 = 1 << 7;
    pub const NAVDATA_DEMO: u32 = 1 << 10;
    pub const NAVDATA_BOOTSTRAP: u32 = 1 << 11;
    pub const MOTORS_PROBLEM: u32 = 1 << 12;
    pub const COMMUNICATION_LOST: u32 = 1 << 13;
    pub const SOFTWARE_FAULT: u32 = 1 << 14;
    pub const BATTERY_LOW: u32 = 1 << 15;
    pub const USER_EMERGENCY: u32 = 1 << 16;
    pub const MAGNETO_NEEDS_CALIBRATION: u32 = 1 << 18;
    pub const ANGLES_OUT_OF_RANGE: u32 = 1 << 19;
    pub const TOO_MUCH_WIND: u32 = 1 << 20;
    pub const ULTRASOUND_DEAF: u32 = 1 << 21;
    pub const CUTOUT: u32 = 1 << 22;
    pub const COMMUNICATION_WATCHDOG: u32 = 1 << 30;
    pub const EMERGENCY: u32 = 1 << 31;
}

/// Drone-state bitfield from the navigation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DroneState(pub u32);

impl DroneState {
    pub fn has_flag(&self, mask: u32) -> bool {
        self.0 & mask != 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_flying(&self) -> bool {
        self.has_flag(flags::FLYING)
    }

    pub fn is_emergency(&self) -> bool {
        self.has_flag(flags::EMERGENCY)
    }

    pub fn battery_low(&self) -> bool {
        self.has_flag(flags::BATTERY_LOW)
    }

    pub fn communication_lost(&self) -> bool {
        self.has_flag(flags::COMMUNICATION_LOST)
    }
}

impl Describe for DroneState {
    fn describe(&self) -> Vec<Field> {
        vec![
            Field::new("raw", format!("{:#010x}", self.0)),
            Field::new("flying", self.is_flying()),
            Field::new("video", self.has_flag(flags::VIDEO_ENABLED)),
            Field::new("vision", self.has_flag(flags::VISION_ENABLED)),
            Field::new("battery_low", self.battery_low()),
            Field::new("communication_lost", self.communication_lost()),
            Field::new("emergency", self.is_emergency()),
        ]
    }
}
