//! Drone client trait
//!
//! The network transport is not part of this crate. Anything that can send
//! commands to the drone and report its latest telemetry implements
//! [`DroneClient`]; the autopilot and the manual-control helpers only talk
//! to this trait.

use std::sync::Arc;

use crate::Result;
use crate::navdata::NavdataRecord;
use crate::types::{DiscreteAction, FlightCommand};

/// Command sink and telemetry source for one drone.
///
/// Called from the autopilot thread, so implementations must be cheap and
/// non-blocking:
/// - `send_command`: queue one progressive command
/// - `send_action`: queue a discrete action (takeoff, land, ...)
/// - `navdata`: the most recent record, which may be stale or absent
pub trait DroneClient: Send + Sync {
    fn send_command(&self, command: FlightCommand) -> Result<()>;

    fn send_action(&self, action: DiscreteAction) -> Result<()>;

    fn navdata(&self) -> Option<Arc<NavdataRecord>>;
}

impl<C: DroneClient + ?Sized> DroneClient for Arc<C> {
    fn send_command(&self, command: FlightCommand) -> Result<()> {
        (**self).send_command(command)
    }

    fn send_action(&self, action: DiscreteAction) -> Result<()> {
        (**self).send_action(action)
    }

    fn navdata(&self) -> Option<Arc<NavdataRecord>> {
        (**self).navdata()
    }
}
