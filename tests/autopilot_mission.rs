//! Fly a short YAML mission against a mock drone client.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dronewire::Result;
use dronewire::autopilot::{Autopilot, AutopilotEvent, Mission, RetireReason};
use dronewire::client::DroneClient;
use dronewire::config::AutopilotConfig;
use dronewire::navdata::{ControlPhase, ControlState, DroneState, FlyingState, NavdataRecord};
use dronewire::types::{DiscreteAction, FlightCommand};
use dronewire::worker::{Notification, Notifier};
use tokio::sync::mpsc::UnboundedReceiver;

const MISSION: &str = "\
objectives:
  - action: flat_trim
    duration_ms: 30
  - action: takeoff
    duration_ms: 30
  - label: climb
    duration_ms: 80
    intents:
      - type: altitude
        target: 1.0
      - type: heading
        target: 0.0
  - action: land
    duration_ms: 30
";

#[derive(Default)]
struct MockDrone {
    commands: Mutex<Vec<FlightCommand>>,
    actions: Mutex<Vec<DiscreteAction>>,
    navdata: Mutex<Option<Arc<NavdataRecord>>>,
}

impl DroneClient for MockDrone {
    fn send_command(&self, command: FlightCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }

    fn send_action(&self, action: DiscreteAction) -> Result<()> {
        self.actions.lock().unwrap().push(action);
        Ok(())
    }

    fn navdata(&self) -> Option<Arc<NavdataRecord>> {
        self.navdata.lock().unwrap().clone()
    }
}

fn low_and_level() -> NavdataRecord {
    NavdataRecord {
        drone_state: DroneState(0),
        sequence: 0,
        vision_defined: 0,
        control: ControlState { phase: ControlPhase::Landed, flying: FlyingState::Ok },
        battery: 100,
        theta: 0.0,
        phi: 0.0,
        psi: 0.0,
        altitude: 200,
        vx: 0.0,
        vy: 0.0,
        vz: 0.0,
        frame_index: 0,
    }
}

fn autopilot_events_until_idle(
    rx: &mut UnboundedReceiver<Notification>,
    timeout: Duration,
) -> Vec<AutopilotEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while Instant::now() < deadline {
        match rx.try_recv() {
            Ok(Notification::Autopilot(event)) => {
                let done = event == AutopilotEvent::OutOfObjectives;
                events.push(event);
                if done {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => std::thread::sleep(Duration::from_millis(2)),
        }
    }
    events
}

#[test]
fn yaml_mission_runs_to_completion() -> anyhow::Result<()> {
    let drone = Arc::new(MockDrone::default());
    *drone.navdata.lock().unwrap() = Some(Arc::new(low_and_level()));

    let (notifier, mut rx) = Notifier::channel();
    let mut autopilot = Autopilot::new(&AutopilotConfig { tick_interval_ms: 5 }, notifier)?;
    autopilot.bind_to_client(drone.clone());

    let mission = Mission::from_yaml_str(MISSION)?;
    assert_eq!(autopilot.load_mission(&mission)?, 4);
    autopilot.start()?;
    autopilot.set_active(true);

    let events = autopilot_events_until_idle(&mut rx, Duration::from_secs(5));
    autopilot.stop();
    autopilot.join();

    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AutopilotEvent::ObjectiveStarted { label } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, ["FlatTrim", "Takeoff", "climb", "Land"]);
    assert!(events.iter().all(|e| !matches!(
        e,
        AutopilotEvent::ObjectiveRetired { reason: RetireReason::Satisfied, .. }
    )));
    assert_eq!(events.last(), Some(&AutopilotEvent::OutOfObjectives));

    assert_eq!(
        *drone.actions.lock().unwrap(),
        [DiscreteAction::FlatTrim, DiscreteAction::Takeoff, DiscreteAction::Land]
    );

    let commands = drone.commands.lock().unwrap();
    assert!(
        commands.iter().any(|c| (c.gaz() - 0.8).abs() < 1e-3 && c.yaw() == 0.0),
        "climb toward one metre: {commands:?}"
    );
    assert_eq!(commands.last(), Some(&FlightCommand::HOVER));
    assert!(!autopilot.is_active());
    Ok(())
}

#[test]
fn demo_mission_for_a_grounded_drone() -> anyhow::Result<()> {
    let mission = Mission::demo(&low_and_level());
    let autopilot = Autopilot::new(&AutopilotConfig::default(), Notifier::disabled())?;

    assert_eq!(autopilot.load_mission(&mission)?, 4);
    assert_eq!(autopilot.pending_objectives(), 4);

    autopilot.clear_objectives();
    assert_eq!(autopilot.pending_objectives(), 0);
    Ok(())
}

#[test]
fn deactivating_sends_hover_to_the_bound_client() -> anyhow::Result<()> {
    let drone = Arc::new(MockDrone::default());
    let autopilot = Autopilot::new(&AutopilotConfig::default(), Notifier::disabled())?;
    autopilot.bind_to_client(drone.clone());

    autopilot.set_active(true);
    autopilot.set_active(false);

    assert_eq!(*drone.commands.lock().unwrap(), [FlightCommand::HOVER]);
    Ok(())
}
