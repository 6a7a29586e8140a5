//! Intents: single-axis control goals

use std::f32::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::navdata::NavdataRecord;

/// The four axes of a [`FlightCommand`](crate::types::FlightCommand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Pitch,
    Roll,
    Yaw,
    /// Vertical speed
    Gaz,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Pitch, Axis::Roll, Axis::Yaw, Axis::Gaz];
}

/// What an intent wants this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentOutput {
    /// Axis value in [-1, 1]
    pub value: f32,
    /// The goal is currently met
    pub satisfied: bool,
}

impl IntentOutput {
    pub const IDLE: IntentOutput = IntentOutput { value: 0.0, satisfied: false };

    fn new(value: f32, satisfied: bool) -> Self {
        Self { value: value.clamp(-1.0, 1.0), satisfied }
    }
}

/// A control goal on one axis.
///
/// Evaluated once per autopilot tick against the latest navigation record,
/// which may be older than the tick or missing entirely.
pub trait Intent: Send + Sync + fmt::Debug {
    fn axis(&self) -> Axis;

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput;
}

/// Full yaw command at 45 degrees of heading error.
const HEADING_GAIN: f32 = 4.0 / PI;
const HEADING_TOLERANCE: f32 = 3.0 * PI / 180.0;

/// Full climb command at one metre of altitude error.
const ALTITUDE_GAIN: f32 = 1.0;
const ALTITUDE_TOLERANCE: f32 = 0.1;

/// Full tilt at 2 m/s of velocity error.
const VELOCITY_GAIN: f32 = 0.5;
const VELOCITY_TOLERANCE: f32 = 0.1;

/// Wrap an angle into (-pi, pi].
pub fn wrap_angle(radians: f32) -> f32 {
    let wrapped = (radians + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

macro_rules! constant_intent {
    ($(#[$doc:meta])* $name:ident, $axis:expr) => {
        $(#[$doc])*
        ///
        /// A hold has no completion condition and never reports satisfied.
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub value: f32,
        }

        impl $name {
            pub fn new(value: f32) -> Self {
                Self { value }
            }
        }

        impl Intent for $name {
            fn axis(&self) -> Axis {
                $axis
            }

            fn evaluate(&self, _navdata: Option<&NavdataRecord>) -> IntentOutput {
                IntentOutput::new(self.value, false)
            }
        }
    };
}

constant_intent!(
    /// Constant pitch; negative tilts forward.
    PitchHold,
    Axis::Pitch
);
constant_intent!(
    /// Constant roll; positive tilts right.
    RollHold,
    Axis::Roll
);
constant_intent!(
    /// Constant yaw rate; positive turns clockwise.
    YawRate,
    Axis::Yaw
);
constant_intent!(
    /// Constant vertical speed; positive climbs.
    VerticalSpeed,
    Axis::Gaz
);

/// Turn to a heading in radians.
///
/// With `can_be_obtained` unset the intent keeps steering but never reports
/// satisfied, so it cannot end an objective early.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub target: f32,
    #[serde(default = "default_true")]
    pub can_be_obtained: bool,
}

fn default_true() -> bool {
    true
}

impl Heading {
    pub fn new(target: f32, can_be_obtained: bool) -> Self {
        Self { target, can_be_obtained }
    }
}

impl Intent for Heading {
    fn axis(&self) -> Axis {
        Axis::Yaw
    }

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput {
        let Some(navdata) = navdata else { return IntentOutput::IDLE };
        let error = wrap_angle(self.target - navdata.yaw());
        let reached = error.abs() < HEADING_TOLERANCE;
        IntentOutput::new(error * HEADING_GAIN, self.can_be_obtained && reached)
    }
}

/// Climb or descend to an altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Altitude {
    pub target: f32,
}

impl Altitude {
    pub fn new(target: f32) -> Self {
        Self { target }
    }
}

impl Intent for Altitude {
    fn axis(&self) -> Axis {
        Axis::Gaz
    }

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput {
        let Some(navdata) = navdata else { return IntentOutput::IDLE };
        let error = self.target - navdata.altitude_m();
        IntentOutput::new(error * ALTITUDE_GAIN, error.abs() < ALTITUDE_TOLERANCE)
    }
}

/// Reach a forward velocity in m/s by pitching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityX {
    pub target: f32,
}

impl VelocityX {
    pub fn new(target: f32) -> Self {
        Self { target }
    }
}

impl Intent for VelocityX {
    fn axis(&self) -> Axis {
        Axis::Pitch
    }

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput {
        let Some(navdata) = navdata else { return IntentOutput::IDLE };
        let error = self.target - navdata.velocity_x();
        // nose down to speed up
        IntentOutput::new(-error * VELOCITY_GAIN, error.abs() < VELOCITY_TOLERANCE)
    }
}

/// Reach a lateral velocity in m/s by rolling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityY {
    pub target: f32,
}

impl VelocityY {
    pub fn new(target: f32) -> Self {
        Self { target }
    }
}

impl Intent for VelocityY {
    fn axis(&self) -> Axis {
        Axis::Roll
    }

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput {
        let Some(navdata) = navdata else { return IntentOutput::IDLE };
        let error = self.target - navdata.velocity_y();
        IntentOutput::new(error * VELOCITY_GAIN, error.abs() < VELOCITY_TOLERANCE)
    }
}

/// The built-in intents in a form missions can name in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuiltinIntent {
    PitchHold(PitchHold),
    RollHold(RollHold),
    YawRate(YawRate),
    VerticalSpeed(VerticalSpeed),
    Heading(Heading),
    Altitude(Altitude),
    VelocityX(VelocityX),
    VelocityY(VelocityY),
}

impl BuiltinIntent {
    fn inner(&self) -> &dyn Intent {
        match self {
            BuiltinIntent::PitchHold(i) => i,
            BuiltinIntent::RollHold(i) => i,
            BuiltinIntent::YawRate(i) => i,
            BuiltinIntent::VerticalSpeed(i) => i,
            BuiltinIntent::Heading(i) => i,
            BuiltinIntent::Altitude(i) => i,
            BuiltinIntent::VelocityX(i) => i,
            BuiltinIntent::VelocityY(i) => i,
        }
    }
}

impl Intent for BuiltinIntent {
    fn axis(&self) -> Axis {
        self.inner().axis()
    }

    fn evaluate(&self, navdata: Option<&NavdataRecord>) -> IntentOutput {
        self.inner().evaluate(navdata)
    }
}
