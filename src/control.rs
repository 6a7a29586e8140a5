//! Manual flight control
//!
//! Sensitivity is session state owned by the caller and passed into every
//! dispatch, so two sessions never share mode flags.
//!
//! ```rust
//! use dronewire::control::{ManualInput, PilotSession, Sensitivity};
//!
//! let mut session = PilotSession::default();
//! assert_eq!(session.command(ManualInput::Forward).pitch(), -0.9);
//!
//! session.toggle_sensitivity();
//! assert_eq!(session.sensitivity, Sensitivity::Precise);
//! assert_eq!(session.command(ManualInput::Up).gaz(), 0.25);
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Result;
use crate::client::DroneClient;
use crate::types::FlightCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    #[default]
    Normal,
    Precise,
}

impl Sensitivity {
    /// Magnitude applied to the driven axis.
    pub fn magnitude(self) -> f32 {
        match self {
            Sensitivity::Normal => 0.9,
            Sensitivity::Precise => 0.25,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Sensitivity::Normal => Sensitivity::Precise,
            Sensitivity::Precise => Sensitivity::Normal,
        }
    }
}

/// One held control key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualInput {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    TurnLeft,
    TurnRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PilotSession {
    pub sensitivity: Sensitivity,
}

impl PilotSession {
    pub fn new(sensitivity: Sensitivity) -> Self {
        Self { sensitivity }
    }

    pub fn toggle_sensitivity(&mut self) -> Sensitivity {
        self.sensitivity = self.sensitivity.toggled();
        self.sensitivity
    }

    /// Command for one input; every other axis is neutral.
    pub fn command(&self, input: ManualInput) -> FlightCommand {
        let m = self.sensitivity.magnitude();
        let hover = FlightCommand::HOVER;
        match input {
            ManualInput::Forward => hover.with_pitch(-m),
            ManualInput::Backward => hover.with_pitch(m),
            ManualInput::Left => hover.with_roll(-m),
            ManualInput::Right => hover.with_roll(m),
            ManualInput::Up => hover.with_gaz(m),
            ManualInput::Down => hover.with_gaz(-m),
            ManualInput::TurnLeft => hover.with_yaw(-m),
            ManualInput::TurnRight => hover.with_yaw(m),
        }
    }
}

/// Send the command for a pressed input.
pub fn dispatch(
    client: &dyn DroneClient,
    session: &PilotSession,
    input: ManualInput,
) -> Result<()> {
    let command = session.command(input);
    trace!(?input, ?command, "Manual command");
    client.send_command(command)
}

/// Return to hover when the input is released.
pub fn release(client: &dyn DroneClient) -> Result<()> {
    client.send_command(FlightCommand::HOVER)
}
