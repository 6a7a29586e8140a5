//! Outbound control vectors and discrete actions

use serde::{Deserialize, Serialize};

/// One tick's worth of flight control.
///
/// Every axis is clamped to `[-1, 1]`; non-finite inputs become `0.0`.
/// Negative pitch moves the drone forward, positive roll moves it right,
/// positive yaw turns clockwise, positive gaz climbs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlightCommand {
    pitch: f32,
    roll: f32,
    yaw: f32,
    gaz: f32,
}

impl FlightCommand {
    /// All axes neutral: the drone holds position.
    pub const HOVER: FlightCommand = FlightCommand { pitch: 0.0, roll: 0.0, yaw: 0.0, gaz: 0.0 };

    pub fn new(pitch: f32, roll: f32, yaw: f32, gaz: f32) -> Self {
        Self { pitch: bound(pitch), roll: bound(roll), yaw: bound(yaw), gaz: bound(gaz) }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Vertical speed.
    pub fn gaz(&self) -> f32 {
        self.gaz
    }

    pub fn with_pitch(self, pitch: f32) -> Self {
        Self { pitch: bound(pitch), ..self }
    }

    pub fn with_roll(self, roll: f32) -> Self {
        Self { roll: bound(roll), ..self }
    }

    pub fn with_yaw(self, yaw: f32) -> Self {
        Self { yaw: bound(yaw), ..self }
    }

    pub fn with_gaz(self, gaz: f32) -> Self {
        Self { gaz: bound(gaz), ..self }
    }

    pub fn is_hover(&self) -> bool {
        *self == Self::HOVER
    }
}

fn bound(value: f32) -> f32 {
    if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 }
}

/// One-shot commands the drone client understands besides progressive flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscreteAction {
    Takeoff,
    Land,
    /// Recalibrate the horizontal reference; only meaningful on the ground
    FlatTrim,
    Hover,
}
