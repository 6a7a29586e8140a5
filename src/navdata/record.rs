//! Decoded navigation record

use serde::{Deserialize, Serialize};

use super::state::{ControlState, DroneState};
use crate::types::{Describe, Field};

/// One decoded navigation packet.
///
/// Fields hold the wire values unchanged (angles in millidegrees, altitude in
/// millimetres, velocities in mm/s) so a record re-encodes to the same bytes.
/// Use the accessor methods for SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavdataRecord {
    pub drone_state: DroneState,
    pub sequence: u32,
    pub vision_defined: u32,
    pub control: ControlState,
    /// Battery charge in percent
    pub battery: u32,
    /// Pitch (theta) in millidegrees
    pub theta: f32,
    /// Roll (phi) in millidegrees
    pub phi: f32,
    /// Yaw (psi) in millidegrees
    pub psi: f32,
    /// Altitude in millimetres
    pub altitude: i32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub frame_index: u32,
}

fn millidegrees_to_radians(value: f32) -> f32 {
    (value / 1000.0).to_radians()
}

impl NavdataRecord {
    pub fn pitch(&self) -> f32 {
        millidegrees_to_radians(self.theta)
    }

    pub fn roll(&self) -> f32 {
        millidegrees_to_radians(self.phi)
    }

    /// Heading in radians.
    pub fn yaw(&self) -> f32 {
        millidegrees_to_radians(self.psi)
    }

    /// Altitude in metres.
    pub fn altitude_m(&self) -> f32 {
        self.altitude as f32 / 1000.0
    }

    /// Forward velocity in m/s.
    pub fn velocity_x(&self) -> f32 {
        self.vx / 1000.0
    }

    /// Lateral velocity in m/s.
    pub fn velocity_y(&self) -> f32 {
        self.vy / 1000.0
    }

    pub fn velocity_z(&self) -> f32 {
        self.vz / 1000.0
    }

    /// True when either the header flag or the control phase says airborne.
    pub fn is_flying(&self) -> bool {
        self.drone_state.is_flying() || self.control.phase.is_airborne()
    }
}

impl Describe for NavdataRecord {
    fn describe(&self) -> Vec<Field> {
        vec![
            Field::new("sequence", self.sequence),
            Field::group("state", self.drone_state.describe()),
            Field::new("control_phase", format!("{:?}", self.control.phase)),
            Field::new("flying_state", format!("{:?}", self.control.flying)),
            Field::new("battery", self.battery),
            Field::group(
                "attitude",
                vec![
                    Field::new("pitch", self.pitch()),
                    Field::new("roll", self.roll()),
                    Field::new("yaw", self.yaw()),
                ],
            ),
            Field::new("altitude", self.altitude_m()),
            Field::group(
                "velocity",
                vec![
                    Field::new("x", self.velocity_x()),
                    Field::new("y", self.velocity_y()),
                    Field::new("z", self.velocity_z()),
                ],
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::state::{ControlPhase, FlyingState};

    fn sample() -> NavdataRecord {
        NavdataRecord {
            drone_state: DroneState(0),
            sequence: 1,
            vision_defined: 0,
            control: ControlState { phase: ControlPhase::Hovering, flying: FlyingState::Ok },
            battery: 80,
            theta: 0.0,
            phi: 0.0,
            psi: 90_000.0,
            altitude: 1500,
            vx: 250.0,
            vy: -100.0,
            vz: 0.0,
            frame_index: 0,
        }
    }

    #[test]
    fn accessors_convert_to_si_units() {
        let record = sample();
        assert!((record.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((record.altitude_m() - 1.5).abs() < f32::EPSILON);
        assert!((record.velocity_x() - 0.25).abs() < f32::EPSILON);
        assert!((record.velocity_y() + 0.1).abs() < f32::EPSILON);
        assert!(record.is_flying());
    }

    #[test]
    fn describe_lists_phase_names() {
        let fields = sample().describe();
        let phase = fields.iter().find(|f| f.name == "control_phase").unwrap();
        assert_eq!(phase.value.to_string(), "Hovering");
    }
}
