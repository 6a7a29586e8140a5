//! Supervisor notifications
//!
//! Workers and the autopilot never decide how a failure is shown to the user.
//! They post a [`Notification`] to a single supervisor channel and carry on.

use tokio::sync::mpsc;
use tracing::trace;

use crate::autopilot::AutopilotEvent;

/// Something the host may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A handler failed or panicked; the worker keeps running
    WorkerFault { worker: String, details: String },

    /// A fatal sink/source failure stopped the worker
    WorkerStopped { worker: String, error: String },

    Autopilot(AutopilotEvent),

    /// Player reached end of recording
    PlaybackFinished { entries: u64 },
}

/// Sending half of the supervisor channel.
///
/// Cloned into every worker. Once the supervisor drops its receiver,
/// notifying is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Create a notifier and the receiver the supervisor reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn notify(&self, notification: Notification) {
        if let Some(tx) = &self.tx {
            if let Err(err) = tx.send(notification) {
                trace!("Supervisor gone, dropping {:?}", err.0);
            }
        }
    }
}
