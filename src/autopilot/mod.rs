//! Objective-queue autopilot.
//!
//! Missions are queues of [`Objective`]s. Each objective is a time budget
//! plus either a set of [`Intent`]s (one per axis) or a single discrete
//! action. While active, a control thread ticks at a fixed cadence, composes
//! the head objective's intents into a [`FlightCommand`] and sends it to the
//! bound [`DroneClient`].
//!
//! ```text
//!   enqueue ──► [queue] ──► head in progress ──► budget elapsed / satisfied ──► retired
//!                                                                  │
//!                                    queue empty ──► Idle + OutOfObjectives
//! ```
//!
//! The state machine itself is [`AutopilotCore`] and has no threads or
//! clocks; [`Autopilot`] runs it on a dedicated thread.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dronewire::autopilot::{Altitude, Autopilot, Objective};
//! use dronewire::client::DroneClient;
//! use dronewire::config::AutopilotConfig;
//! use dronewire::worker::Notifier;
//!
//! # fn fly(client: Arc<dyn DroneClient>) -> dronewire::Result<()> {
//! let mut autopilot = Autopilot::new(&AutopilotConfig::default(), Notifier::disabled())?;
//! autopilot.bind_to_client(client);
//! autopilot.start()?;
//! autopilot.enqueue_objective(Objective::takeoff(Duration::from_millis(3500)));
//! autopilot.enqueue_objective(Objective::create(Duration::from_secs(3), [Altitude::new(1.0)])?);
//! autopilot.enqueue_objective(Objective::land(Duration::from_secs(5)));
//! autopilot.set_active(true);
//! # Ok(())
//! # }
//! ```

mod intent;
mod machine;
mod mission;
mod objective;

pub use machine::{AutopilotCore, AutopilotEvent, AutopilotStatus, RetireReason, TickOutput};
pub use intent::{
    Altitude, Axis, BuiltinIntent, Heading, Intent, IntentOutput, PitchHold, RollHold,
    VelocityX, VelocityY, VerticalSpeed, YawRate, wrap_angle,
};
pub use mission::{Mission, MissionStep};
pub use objective::{Evaluation, Objective};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::DroneClient;
use crate::config::AutopilotConfig;
use crate::types::{DiscreteAction, FlightCommand};
use crate::worker::{Notification, Notifier};
use crate::{DroneError, Result};

const WORKER_NAME: &str = "autopilot";

/// State shared between the control thread and callers.
///
/// The core lock is never held while talking to the client.
struct Shared {
    core: Mutex<AutopilotCore>,
    client: RwLock<Option<Arc<dyn DroneClient>>>,
}

impl Shared {
    fn core(&self) -> MutexGuard<'_, AutopilotCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn client(&self) -> Option<Arc<dyn DroneClient>> {
        self.client.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_client(&self, client: Option<Arc<dyn DroneClient>>) -> Option<Arc<dyn DroneClient>> {
        let mut slot = self.client.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, client)
    }

    fn step(&self, now: Instant, notifier: &Notifier) {
        let client = self.client();
        let navdata = client.as_ref().and_then(|c| c.navdata());
        let output = self.core().tick(now, navdata.as_deref());

        for event in output.events {
            match &event {
                AutopilotEvent::ObjectiveStarted { label } => info!(%label, "Objective started"),
                AutopilotEvent::ObjectiveRetired { label, reason } => {
                    info!(%label, ?reason, "Objective retired")
                }
                AutopilotEvent::OutOfObjectives => info!("Out of objectives, autopilot idle"),
            }
            notifier.notify(Notification::Autopilot(event));
        }

        let Some(client) = client else {
            if output.command.is_some() || output.action.is_some() {
                trace!("Autopilot unbound, output discarded");
            }
            return;
        };

        if let Some(action) = output.action {
            if let Err(err) = client.send_action(action) {
                warn!(?action, "Failed to send action: {}", err);
            }
        }
        if let Some(command) = output.command {
            if let Err(err) = client.send_command(command) {
                warn!("Failed to send command, falling back to hover: {}", err);
                if let Err(err) = client.send_action(DiscreteAction::Hover) {
                    warn!("Hover fallback failed: {}", err);
                }
            }
        }
    }
}

/// Threaded autopilot driving one [`DroneClient`].
pub struct Autopilot {
    shared: Arc<Shared>,
    tick_interval: Duration,
    notifier: Notifier,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Autopilot {
    pub fn new(config: &AutopilotConfig, notifier: Notifier) -> Result<Self> {
        let tick_interval = config.tick_interval();
        if tick_interval.is_zero() {
            return Err(DroneError::config("autopilot tick interval must be non-zero"));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(AutopilotCore::new()),
                client: RwLock::new(None),
            }),
            tick_interval,
            notifier,
            cancel: CancellationToken::new(),
            thread: None,
        })
    }

    /// Attach the command sink and telemetry source, replacing any previous
    /// client.
    pub fn bind_to_client(&self, client: Arc<dyn DroneClient>) {
        if self.shared.set_client(Some(client)).is_some() {
            debug!("Autopilot rebound to a new client");
        } else {
            info!("Autopilot bound to client");
        }
    }

    /// Detach from the client. Safe to call when never bound.
    pub fn unbind_from_client(&self) {
        if self.shared.set_client(None).is_some() {
            info!("Autopilot unbound from client");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.shared.client().is_some()
    }

    /// The bound client, for sending commands outside the control loop.
    pub fn client(&self) -> Result<Arc<dyn DroneClient>> {
        self.shared.client().ok_or(DroneError::NotBound)
    }

    /// Spawn the control thread.
    pub fn start(&mut self) -> Result<()> {
        if self.is_alive() {
            return Err(DroneError::worker_state(WORKER_NAME, "already running"));
        }
        self.join();

        self.cancel = CancellationToken::new();
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let notifier = self.notifier.clone();
        let period = self.tick_interval;

        let thread = std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run_loop(shared, cancel, notifier, period))
            .map_err(|e| {
                DroneError::worker_state(WORKER_NAME, format!("failed to spawn thread: {e}"))
            })?;
        self.thread = Some(thread);
        info!(period_ms = period.as_millis() as u64, "Autopilot started");
        Ok(())
    }

    /// Ask the control thread to exit after its current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Autopilot thread panicked");
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn enqueue_objective(&self, objective: Objective) {
        debug!(label = %objective.label(), "Objective queued");
        self.shared.core().enqueue(objective);
    }

    /// Replace the queue with a mission's objectives. Returns how many were
    /// queued.
    pub fn load_mission(&self, mission: &Mission) -> Result<usize> {
        let objectives = mission.objectives()?;
        let count = objectives.len();
        let mut core = self.shared.core();
        core.clear();
        for objective in objectives {
            core.enqueue(objective);
        }
        Ok(count)
    }

    /// Discard every queued objective, including the one in progress.
    ///
    /// While running, the control thread replaces the cleared objective's
    /// command with hover on its next tick.
    pub fn clear_objectives(&self) {
        self.shared.core().clear();
        debug!("Objectives cleared");
    }

    pub fn set_active(&self, active: bool) {
        self.shared.core().set_active(active);
        if !active {
            if let Ok(client) = self.client() {
                if let Err(err) = client.send_command(FlightCommand::HOVER) {
                    warn!("Failed to send hover on deactivation: {}", err);
                }
            }
        }
        debug!(active, "Autopilot activity changed");
    }

    pub fn is_active(&self) -> bool {
        self.shared.core().is_active()
    }

    pub fn pending_objectives(&self) -> usize {
        self.shared.core().pending()
    }

    pub fn status(&self) -> AutopilotStatus {
        self.shared.core().status(Instant::now())
    }
}

impl Drop for Autopilot {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_loop(shared: Arc<Shared>, cancel: CancellationToken, notifier: Notifier, period: Duration) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Failed to build autopilot runtime: {}", e);
            notifier.notify(Notification::WorkerStopped {
                worker: WORKER_NAME.to_string(),
                error: e.to_string(),
            });
            return;
        }
    };

    runtime.block_on(async {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => shared.step(Instant::now(), &notifier),
            }
        }
    });
    info!("Autopilot stopped");
}
