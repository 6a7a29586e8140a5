//! Missions: objective lists loaded from YAML
//!
//! ```yaml
//! objectives:
//!   - action: flat_trim
//!     duration_ms: 1000
//!   - action: takeoff
//!     duration_ms: 3500
//!   - label: climb
//!     duration_ms: 3000
//!     early_exit: true
//!     intents:
//!       - type: altitude
//!         target: 1.0
//!   - action: land
//!     duration_ms: 5000
//! ```

use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::intent::{Altitude, BuiltinIntent, Heading, Intent, VelocityX, VelocityY, wrap_angle};
use super::objective::Objective;
use crate::navdata::NavdataRecord;
use crate::types::DiscreteAction;
use crate::{DroneError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<DiscreteAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intents: Vec<BuiltinIntent>,
    #[serde(default)]
    pub early_exit: bool,
}

impl MissionStep {
    fn intents(duration_ms: u64, intents: Vec<BuiltinIntent>) -> Self {
        Self { label: None, duration_ms, action: None, intents, early_exit: false }
    }

    fn action(duration_ms: u64, action: DiscreteAction) -> Self {
        Self {
            label: None,
            duration_ms,
            action: Some(action),
            intents: Vec::new(),
            early_exit: false,
        }
    }

    pub fn to_objective(&self) -> Result<Objective> {
        let budget = Duration::from_millis(self.duration_ms);
        let objective = match self.action {
            Some(_) if !self.intents.is_empty() => {
                return Err(DroneError::config(
                    "a mission step has either an action or intents, not both",
                ));
            }
            Some(action) => Objective::action(budget, action),
            None => {
                let intents =
                    self.intents.iter().map(|i| Arc::new(*i) as Arc<dyn Intent>).collect();
                Objective::from_intents(budget, intents)?.with_early_exit(self.early_exit)
            }
        };
        Ok(match &self.label {
            Some(label) => objective.with_label(label.as_str()),
            None => objective,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub objectives: Vec<MissionStep>,
}

impl Mission {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mission: Mission = serde_yaml_ng::from_str(yaml)?;
        // surface axis conflicts at load time
        mission.objectives()?;
        Ok(mission)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            DroneError::config(format!("cannot read mission {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn objectives(&self) -> Result<Vec<Objective>> {
        self.objectives.iter().map(MissionStep::to_objective).collect()
    }

    /// The sample mission: look around if already flying, otherwise trim
    /// and take off; then hold one metre for three seconds and land.
    pub fn demo(navdata: &NavdataRecord) -> Self {
        let mut steps = Vec::new();

        if navdata.is_flying() {
            let heading = navdata.yaw();
            let turn = PI / 5.0;
            for target in [heading + turn, heading - turn, heading] {
                let intent = BuiltinIntent::Heading(Heading::new(wrap_angle(target), true));
                steps.push(MissionStep::intents(2000, vec![intent]));
            }
        } else {
            steps.push(MissionStep::action(1000, DiscreteAction::FlatTrim));
            steps.push(MissionStep::action(3500, DiscreteAction::Takeoff));
        }

        steps.push(MissionStep::intents(
            3000,
            vec![
                BuiltinIntent::VelocityX(VelocityX::new(0.0)),
                BuiltinIntent::VelocityY(VelocityY::new(0.0)),
                BuiltinIntent::Altitude(Altitude::new(1.0)),
            ],
        ));
        steps.push(MissionStep::action(5000, DiscreteAction::Land));

        Self { objectives: steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::Axis;
    use crate::navdata::{ControlPhase, ControlState, FlyingState};
    use crate::test_utils::sample_navdata;

    const MODULE_EXAMPLE: &str = "\
objectives:
  - action: flat_trim
    duration_ms: 1000
  - action: takeoff
    duration_ms: 3500
  - label: climb
    duration_ms: 3000
    early_exit: true
    intents:
      - type: altitude
        target: 1.0
  - action: land
    duration_ms: 5000
";

    #[test]
    fn parses_documented_example() {
        let mission = Mission::from_yaml_str(MODULE_EXAMPLE).unwrap();
        let objectives = mission.objectives().unwrap();

        assert_eq!(objectives.len(), 4);
        assert_eq!(objectives[0].action_to_send(), Some(DiscreteAction::FlatTrim));
        assert_eq!(objectives[2].label(), "climb");
        assert!(objectives[2].early_exit());
        assert_eq!(objectives[2].intents()[0].axis(), Axis::Gaz);
        assert_eq!(objectives[3].budget(), Duration::from_secs(5));
    }

    #[test]
    fn axis_conflicts_fail_at_load() {
        let yaml = "\
objectives:
  - duration_ms: 100
    intents:
      - type: yaw_rate
        value: 0.5
      - type: heading
        target: 1.0
";
        let err = Mission::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, DroneError::AxisConflict { axis: Axis::Yaw }));
    }

    #[test]
    fn action_with_intents_is_rejected() {
        let yaml = "\
objectives:
  - duration_ms: 100
    action: hover
    intents:
      - type: altitude
        target: 1.0
";
        assert!(matches!(Mission::from_yaml_str(yaml), Err(DroneError::Config { .. })));
    }

    #[test]
    fn demo_on_the_ground_trims_and_takes_off() {
        let mut navdata = sample_navdata();
        navdata.drone_state.0 = 0;
        navdata.control = ControlState { phase: ControlPhase::Landed, flying: FlyingState::Ok };

        let objectives = Mission::demo(&navdata).objectives().unwrap();
        let actions: Vec<_> = objectives.iter().map(Objective::action_to_send).collect();
        assert_eq!(
            actions,
            vec![
                Some(DiscreteAction::FlatTrim),
                Some(DiscreteAction::Takeoff),
                None,
                Some(DiscreteAction::Land)
            ]
        );
        assert_eq!(objectives[2].intents().len(), 3);
    }

    #[test]
    fn demo_in_the_air_looks_around() {
        let mut navdata = sample_navdata();
        navdata.control = ControlState { phase: ControlPhase::Hovering, flying: FlyingState::Ok };
        navdata.psi = 170_000.0;

        let mission = Mission::demo(&navdata);
        assert_eq!(mission.objectives.len(), 5);

        let BuiltinIntent::Heading(first) = mission.objectives[0].intents[0] else {
            panic!("expected a heading intent");
        };
        // 170 + 36 wraps to -154 degrees
        assert!((first.target.to_degrees() + 154.0).abs() < 0.01);
    }

    #[test]
    fn yaml_round_trip() {
        let mission = Mission::demo(&sample_navdata());
        let yaml = mission.to_yaml_string().unwrap();
        assert_eq!(Mission::from_yaml_str(&yaml).unwrap(), mission);
    }
}
