//! Objectives: time-boxed sets of intents

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::intent::{Axis, Intent};
use crate::navdata::NavdataRecord;
use crate::types::{DiscreteAction, FlightCommand};
use crate::{DroneError, Result};

/// A unit of autonomous flight.
///
/// An objective either drives axes through its intents or fires a single
/// [`DiscreteAction`] when it becomes active. Either way it stays at the head
/// of the queue for its time budget. With early exit enabled, an objective
/// with intents retires as soon as every intent reports satisfied.
#[derive(Clone)]
pub struct Objective {
    label: Option<Arc<str>>,
    budget: Duration,
    intents: Vec<Arc<dyn Intent>>,
    action: Option<DiscreteAction>,
    early_exit: bool,
}

/// Composed output of one objective for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub command: FlightCommand,
    /// Early exit is enabled and every intent is satisfied
    pub complete: bool,
}

impl Objective {
    /// Build an intent-driven objective. Each axis may be driven by at most
    /// one intent.
    pub fn create<I>(budget: Duration, intents: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Intent + 'static,
    {
        Self::from_intents(
            budget,
            intents.into_iter().map(|i| Arc::new(i) as Arc<dyn Intent>).collect(),
        )
    }

    /// Like [`create`](Self::create) for intents of mixed types.
    pub fn from_intents(budget: Duration, intents: Vec<Arc<dyn Intent>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for intent in &intents {
            let axis = intent.axis();
            if !seen.insert(axis) {
                return Err(DroneError::AxisConflict { axis });
            }
        }
        Ok(Self { label: None, budget, intents, action: None, early_exit: false })
    }

    /// An objective that sends `action` once and then waits out `budget`.
    pub fn action(budget: Duration, action: DiscreteAction) -> Self {
        Self { label: None, budget, intents: Vec::new(), action: Some(action), early_exit: false }
    }

    pub fn takeoff(budget: Duration) -> Self {
        Self::action(budget, DiscreteAction::Takeoff)
    }

    pub fn land(budget: Duration) -> Self {
        Self::action(budget, DiscreteAction::Land)
    }

    pub fn flat_trim(budget: Duration) -> Self {
        Self::action(budget, DiscreteAction::FlatTrim)
    }

    pub fn hover(budget: Duration) -> Self {
        Self::action(budget, DiscreteAction::Hover)
    }

    pub fn with_early_exit(mut self, early_exit: bool) -> Self {
        self.early_exit = early_exit;
        self
    }

    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn action_to_send(&self) -> Option<DiscreteAction> {
        self.action
    }

    pub fn early_exit(&self) -> bool {
        self.early_exit
    }

    pub fn intents(&self) -> &[Arc<dyn Intent>] {
        &self.intents
    }

    /// Explicit label, or one derived from the contents.
    pub fn label(&self) -> String {
        if let Some(label) = &self.label {
            return label.to_string();
        }
        match self.action {
            Some(action) => format!("{action:?}"),
            None if self.intents.is_empty() => "neutral".to_string(),
            None => {
                let axes: Vec<String> =
                    self.intents.iter().map(|i| format!("{:?}", i.axis())).collect();
                axes.join("+")
            }
        }
    }

    /// Compose the intents into one command. Axes without an intent are
    /// neutral.
    pub fn evaluate(&self, navdata: Option<&NavdataRecord>) -> Evaluation {
        let mut command = FlightCommand::HOVER;
        let mut all_satisfied = true;

        for intent in &self.intents {
            let out = intent.evaluate(navdata);
            all_satisfied &= out.satisfied;
            command = match intent.axis() {
                Axis::Pitch => command.with_pitch(out.value),
                Axis::Roll => command.with_roll(out.value),
                Axis::Yaw => command.with_yaw(out.value),
                Axis::Gaz => command.with_gaz(out.value),
            };
        }

        let complete = self.early_exit && !self.intents.is_empty() && all_satisfied;
        Evaluation { command, complete }
    }
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Objective")
            .field("label", &self.label())
            .field("budget", &self.budget)
            .field("intents", &self.intents)
            .field("action", &self.action)
            .field("early_exit", &self.early_exit)
            .finish()
    }
}
