//! Recording playback
//!
//! The player reads entries on its own thread and republishes each payload
//! into a [`PacketSink`] as if it had just arrived from the network. Entries
//! are released at `start + offset / rate`, so the gaps between packets match
//! the recording (halved at rate 2.0) and scheduling delay does not
//! accumulate over a long file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::format::RecordingReader;
use crate::types::{PacketKind, PacketSequencer};
use crate::worker::{Notification, Notifier, PacketSink};
use crate::{DroneError, Result};

const WORKER_NAME: &str = "packet-player";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    /// End of recording reached
    Finished,
    /// Stopped before the end
    Cancelled,
    /// The recording could not be read
    Failed,
}

impl PlayerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlayerState::Finished | PlayerState::Cancelled | PlayerState::Failed)
    }
}

pub struct Player {
    sink: Arc<dyn PacketSink>,
    rate: f64,
    notifier: Notifier,
    state: Arc<watch::Sender<PlayerState>>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Player {
    /// `rate` scales playback speed; 1.0 reproduces the recorded timing.
    pub fn new(sink: Arc<dyn PacketSink>, rate: f64, notifier: Notifier) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DroneError::config(format!(
                "playback rate must be positive and finite, got {rate}"
            )));
        }
        let (state, _) = watch::channel(PlayerState::Idle);
        Ok(Self {
            sink,
            rate,
            notifier,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            thread: None,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Start playing `reader` from its current position.
    ///
    /// A finished or stopped player can be started again with a new reader.
    pub fn play<R: Read + Send + 'static>(&mut self, reader: RecordingReader<R>) -> Result<()> {
        if self.is_alive() {
            return Err(DroneError::worker_state(WORKER_NAME, "already playing"));
        }
        self.join();

        self.cancel = CancellationToken::new();
        self.state.send_replace(PlayerState::Playing);

        let context = PlaybackContext {
            sink: Arc::clone(&self.sink),
            rate: self.rate,
            notifier: self.notifier.clone(),
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || context.run(reader));
        match spawned {
            Ok(thread) => {
                self.thread = Some(thread);
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(PlayerState::Failed);
                Err(DroneError::worker_state(WORKER_NAME, format!("failed to spawn thread: {e}")))
            }
        }
    }

    pub fn play_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DroneError::sink_io(format!("opening {}", path.display()), e))?;
        info!(path = %path.display(), rate = self.rate, "Playing recording");
        self.play(RecordingReader::new(BufReader::new(file)))
    }

    /// Cancel playback, interrupting any pending wait.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the playback thread to exit and return the final state.
    pub fn join(&mut self) -> PlayerState {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(worker = WORKER_NAME, "Playback thread panicked");
                self.state.send_replace(PlayerState::Failed);
            }
        }
        self.state()
    }

    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn state(&self) -> PlayerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn state_changes(&self) -> watch::Receiver<PlayerState> {
        self.state.subscribe()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
            self.join();
        }
    }
}

struct PlaybackContext {
    sink: Arc<dyn PacketSink>,
    rate: f64,
    notifier: Notifier,
    state: Arc<watch::Sender<PlayerState>>,
    cancel: CancellationToken,
}

impl PlaybackContext {
    fn run<R: Read>(self, mut reader: RecordingReader<R>) {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(worker = WORKER_NAME, "Failed to build playback runtime: {}", e);
                self.fail(e.to_string());
                return;
            }
        };

        match runtime.block_on(self.replay(&mut reader)) {
            Ok(Some(entries)) => {
                info!(entries, "Playback finished");
                self.state.send_replace(PlayerState::Finished);
                self.notifier.notify(Notification::PlaybackFinished { entries });
            }
            Ok(None) => {
                info!(entries = reader.entries_read(), "Playback cancelled");
                self.state.send_replace(PlayerState::Cancelled);
            }
            Err(err) => {
                warn!(entries = reader.entries_read(), "Playback failed: {}", err);
                self.fail(err.to_string());
            }
        }
    }

    /// Returns the number of entries replayed, or `None` if cancelled.
    async fn replay<R: Read>(&self, reader: &mut RecordingReader<R>) -> Result<Option<u64>> {
        let navigation = PacketSequencer::new(PacketKind::Navigation);
        let video = PacketSequencer::new(PacketKind::Video);
        let started = tokio::time::Instant::now();
        let mut replayed = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            let Some(entry) = reader.next_entry()? else {
                return Ok(Some(replayed));
            };

            let due = scale(entry.offset(), self.rate)
                .and_then(|delay| started.checked_add(delay))
                .ok_or_else(|| {
                    DroneError::malformed(
                        "recording timestamp",
                        format!("offset {:?} at rate {} is out of range", entry.offset(), self.rate),
                    )
                })?;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep_until(due) => {}
            }

            let sequencer = match entry.kind {
                PacketKind::Navigation => &navigation,
                PacketKind::Video => &video,
            };
            let packet = sequencer.stamp(entry.payload);
            trace!(kind = ?packet.kind, sequence = packet.sequence, "Replaying packet");
            if !self.sink.accept(packet) {
                debug!("Sink declined a replayed packet");
            }
            replayed += 1;
        }
    }

    fn fail(&self, error: String) {
        self.state.send_replace(PlayerState::Failed);
        self.notifier.notify(Notification::WorkerStopped { worker: WORKER_NAME.to_string(), error });
    }
}

fn scale(offset: Duration, rate: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(offset.as_secs_f64() / rate).ok()
}
