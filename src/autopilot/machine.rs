//! The autopilot state machine, free of threads and clocks.
//!
//! [`AutopilotCore::tick`] takes the current time and the latest navigation
//! record and returns what to send and what happened. The threaded
//! [`Autopilot`](super::Autopilot) calls it on a fixed cadence; tests call it
//! with synthetic instants.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::objective::Objective;
use crate::navdata::NavdataRecord;
use crate::types::{Describe, DiscreteAction, Field, FlightCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    BudgetElapsed,
    /// Early exit: every intent reported satisfied
    Satisfied,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutopilotEvent {
    ObjectiveStarted { label: String },
    ObjectiveRetired { label: String, reason: RetireReason },
    /// The last objective retired and the autopilot deactivated itself
    OutOfObjectives,
}

/// What one tick wants sent to the drone, plus what happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub command: Option<FlightCommand>,
    pub action: Option<DiscreteAction>,
    pub events: Vec<AutopilotEvent>,
}

/// Snapshot for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotStatus {
    pub active: bool,
    pub pending: usize,
    pub current: Option<String>,
    pub elapsed: Option<Duration>,
}

impl Describe for AutopilotStatus {
    fn describe(&self) -> Vec<Field> {
        vec![
            Field::new("active", self.active),
            Field::new("pending", self.pending),
            Field::new("current", self.current.as_deref().unwrap_or("-")),
            Field::new("elapsed_ms", self.elapsed.map_or(0, |e| e.as_millis() as u64)),
        ]
    }
}

/// Objective queue plus the Idle/Active flag.
#[derive(Debug, Default)]
pub struct AutopilotCore {
    queue: VecDeque<Objective>,
    /// Start time of the head objective once it is in progress
    started: Option<Instant>,
    active: bool,
    /// An in-progress objective was cleared; the next tick sends hover
    hover_pending: bool,
}

impl AutopilotCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, objective: Objective) {
        self.queue.push_back(objective);
    }

    /// Drop every objective, including the one in progress. Nothing is
    /// retired and no event is raised for them. If an objective was being
    /// flown, the next tick sends one hover command in its place.
    pub fn clear(&mut self) {
        self.hover_pending |= self.active && self.started.is_some();
        self.queue.clear();
        self.started = None;
    }

    /// Deactivating abandons the in-progress marker; the head objective
    /// starts its budget afresh when reactivated.
    pub fn set_active(&mut self, active: bool) {
        if !active {
            self.started = None;
            self.hover_pending = false;
        }
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn in_progress(&self) -> Option<&Objective> {
        self.started.and(self.queue.front())
    }

    pub fn status(&self, now: Instant) -> AutopilotStatus {
        AutopilotStatus {
            active: self.active,
            pending: self.queue.len(),
            current: self.in_progress().map(Objective::label),
            elapsed: self.started.map(|s| now.saturating_duration_since(s)),
        }
    }

    /// Advance the state machine by one control tick.
    pub fn tick(&mut self, now: Instant, navdata: Option<&NavdataRecord>) -> TickOutput {
        let mut out = TickOutput::default();
        if !self.active {
            return out;
        }
        if std::mem::take(&mut self.hover_pending) {
            // replaced below if a new objective is already queued
            out.command = Some(FlightCommand::HOVER);
        }
        let Some(objective) = self.queue.front() else {
            return out;
        };

        let started = match self.started {
            Some(started) => started,
            None => {
                self.started = Some(now);
                out.events.push(AutopilotEvent::ObjectiveStarted { label: objective.label() });
                if let Some(action) = objective.action_to_send() {
                    // clear whatever the previous objective was commanding
                    out.command = Some(FlightCommand::HOVER);
                    out.action = Some(action);
                }
                now
            }
        };

        let mut complete = false;
        if objective.action_to_send().is_none() {
            let evaluation = objective.evaluate(navdata);
            out.command = Some(evaluation.command);
            complete = evaluation.complete;
        }

        let reason = if now.saturating_duration_since(started) >= objective.budget() {
            Some(RetireReason::BudgetElapsed)
        } else if complete {
            Some(RetireReason::Satisfied)
        } else {
            None
        };

        if let Some(reason) = reason {
            let label = objective.label();
            self.queue.pop_front();
            self.started = None;
            out.events.push(AutopilotEvent::ObjectiveRetired { label, reason });

            if self.queue.is_empty() {
                self.active = false;
                out.command = Some(FlightCommand::HOVER);
                out.events.push(AutopilotEvent::OutOfObjectives);
            }
        }

        out
    }
}
