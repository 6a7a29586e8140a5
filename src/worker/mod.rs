//! Background packet workers.
//!
//! A [`PacketWorker`] owns one dedicated thread and one unbounded FIFO queue.
//! Producers (network callbacks, the player) enqueue without blocking; the
//! worker thread pops packets in arrival order and hands each one to its
//! [`PacketHandler`].
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──► start ──► running ──► stop ──► (drains queue) ──► join ──► handler returned
//!                        │
//!                        └── fatal handler error ──► stopped, WorkerStopped notification
//! ```
//!
//! ## Failure policy
//!
//! - absorbed errors (malformed data, decoder rejections): dropped silently
//! - other errors and panics: reported once as [`Notification::WorkerFault`],
//!   the thread keeps consuming
//! - fatal errors (sink I/O): the worker stops and reports
//!   [`Notification::WorkerStopped`]
//!
//! ```rust
//! use dronewire::types::{PacketKind, PacketSequencer, RawPacket};
//! use dronewire::worker::{Notifier, PacketHandler, PacketWorker};
//!
//! struct Counter(usize);
//!
//! impl PacketHandler for Counter {
//!     fn handle(&mut self, _packet: RawPacket) -> dronewire::Result<()> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> dronewire::Result<()> {
//! let mut worker = PacketWorker::new("counter", Counter(0), Notifier::disabled());
//! worker.start()?;
//! let stream = PacketSequencer::new(PacketKind::Video);
//! for _ in 0..3 {
//!     worker.enqueue(stream.stamp(vec![0]));
//! }
//! worker.stop();
//! let counter = worker.join().expect("worker thread returned its handler");
//! assert_eq!(counter.0, 3);
//! # Ok(())
//! # }
//! ```

mod notify;
mod sink;

pub use notify::{Notification, Notifier};
pub use sink::PacketSink;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::types::RawPacket;
use crate::{DroneError, Result};

/// Per-specialization packet processing, run on the worker thread.
pub trait PacketHandler: Send + 'static {
    fn handle(&mut self, packet: RawPacket) -> Result<()>;

    /// Called once after the last packet, before the thread exits.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

enum Message {
    Packet(RawPacket),
    Stop,
}

/// Cloneable producer side of a worker queue.
#[derive(Clone)]
pub struct WorkerHandle {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Message>,
    accepting: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Queue a packet. Never blocks; returns `false` if the worker is not
    /// running.
    pub fn enqueue(&self, packet: RawPacket) -> bool {
        if !self.accepting.load(Ordering::Acquire) {
            trace!(worker = %self.name, sequence = packet.sequence, "Worker not accepting, packet dropped");
            return false;
        }
        self.tx.send(Message::Packet(packet)).is_ok()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PacketSink for WorkerHandle {
    fn accept(&self, packet: RawPacket) -> bool {
        self.enqueue(packet)
    }
}

/// A background thread consuming one packet queue.
pub struct PacketWorker<H: PacketHandler> {
    name: Arc<str>,
    handler: Option<H>,
    tx: mpsc::UnboundedSender<Message>,
    rx: Option<mpsc::UnboundedReceiver<Message>>,
    accepting: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    thread: Option<JoinHandle<H>>,
    notifier: Notifier,
}

impl<H: PacketHandler> PacketWorker<H> {
    pub fn new(name: impl Into<Arc<str>>, handler: H, notifier: Notifier) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            handler: Some(handler),
            tx,
            rx: Some(rx),
            accepting: Arc::new(AtomicBool::new(false)),
            alive: Arc::new(AtomicBool::new(false)),
            thread: None,
            notifier,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the consumer thread. A worker starts at most once.
    pub fn start(&mut self) -> Result<()> {
        let (Some(handler), Some(rx)) = (self.handler.take(), self.rx.take()) else {
            return Err(DroneError::worker_state(self.name.as_ref(), "already started"));
        };

        self.accepting.store(true, Ordering::Release);
        self.alive.store(true, Ordering::Release);

        let context = WorkerContext {
            name: Arc::clone(&self.name),
            accepting: Arc::clone(&self.accepting),
            alive: Arc::clone(&self.alive),
            notifier: self.notifier.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name(self.name.to_string())
            .spawn(move || context.run(handler, rx));

        match spawned {
            Ok(thread) => {
                self.thread = Some(thread);
                Ok(())
            }
            Err(e) => {
                self.accepting.store(false, Ordering::Release);
                self.alive.store(false, Ordering::Release);
                Err(DroneError::worker_state(
                    self.name.as_ref(),
                    format!("failed to spawn thread: {e}"),
                ))
            }
        }
    }

    /// Queue a packet for the worker thread.
    pub fn enqueue(&self, packet: RawPacket) -> bool {
        self.handle().enqueue(packet)
    }

    /// Producer handle that can be shared with other threads.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            name: Arc::clone(&self.name),
            tx: self.tx.clone(),
            accepting: Arc::clone(&self.accepting),
        }
    }

    /// Stop accepting packets and wake the consumer.
    ///
    /// Packets queued before the call are still processed.
    pub fn stop(&self) {
        if self.thread.is_none() {
            return;
        }
        self.accepting.store(false, Ordering::Release);
        if self.tx.send(Message::Stop).is_err() {
            trace!(worker = %self.name, "Worker already exited");
        }
        debug!(worker = %self.name, "Stop requested");
    }

    /// Block until the consumer thread exits and take back the handler.
    ///
    /// Returns `None` if the worker never started or its thread panicked
    /// outside the handler. Call [`stop`](Self::stop) first, otherwise this
    /// waits until a fatal error ends the thread.
    pub fn join(&mut self) -> Option<H> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(handler) => Some(handler),
            Err(_) => {
                error!(worker = %self.name, "Worker thread panicked");
                None
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl<H: PacketHandler> Drop for PacketWorker<H> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
            self.join();
        }
    }
}

struct WorkerContext {
    name: Arc<str>,
    accepting: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    notifier: Notifier,
}

impl WorkerContext {
    fn run<H: PacketHandler>(self, mut handler: H, mut rx: mpsc::UnboundedReceiver<Message>) -> H {
        let _alive = AliveGuard(Arc::clone(&self.alive));
        info!(worker = %self.name, "Packet worker started");

        let mut processed = 0u64;
        let mut faults = 0u64;
        let mut stopped_by_fault = false;

        while let Some(message) = rx.blocking_recv() {
            let packet = match message {
                Message::Packet(packet) => packet,
                Message::Stop => break,
            };
            let sequence = packet.sequence;

            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(packet))) {
                Ok(Ok(())) => processed += 1,
                Ok(Err(err)) if err.is_absorbed() => {
                    trace!(worker = %self.name, sequence, "Dropped packet: {}", err);
                }
                Ok(Err(err)) if err.is_fatal() => {
                    error!(worker = %self.name, sequence, "Fatal handler error, stopping: {}", err);
                    self.accepting.store(false, Ordering::Release);
                    self.notifier.notify(Notification::WorkerStopped {
                        worker: self.name.to_string(),
                        error: err.to_string(),
                    });
                    stopped_by_fault = true;
                    break;
                }
                Ok(Err(err)) => {
                    faults += 1;
                    warn!(worker = %self.name, sequence, "Handler error: {}", err);
                    self.notifier.notify(Notification::WorkerFault {
                        worker: self.name.to_string(),
                        details: err.to_string(),
                    });
                }
                Err(payload) => {
                    faults += 1;
                    let details = panic_message(payload.as_ref());
                    error!(worker = %self.name, sequence, "Handler panicked: {}", details);
                    self.notifier.notify(Notification::WorkerFault {
                        worker: self.name.to_string(),
                        details,
                    });
                }
            }
        }

        self.accepting.store(false, Ordering::Release);
        rx.close();
        let discarded = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|m| matches!(m, Message::Packet(_)))
            .count();
        if discarded > 0 {
            debug!(worker = %self.name, discarded, "Discarded packets queued after stop");
        }

        if let Err(err) = handler.finish() {
            error!(worker = %self.name, "Handler failed to finish: {}", err);
            // a worker already stopped by a fault has reported it
            if !stopped_by_fault {
                self.notifier.notify(Notification::WorkerStopped {
                    worker: self.name.to_string(),
                    error: err.to_string(),
                });
            }
        }

        info!(worker = %self.name, processed, faults, "Packet worker stopped");
        handler
    }
}

/// Clears the alive flag when the thread exits, however it exits.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PacketKind, PacketSequencer};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records (kind, sequence) in processing order.
    struct Collect(Arc<Mutex<Vec<(PacketKind, u64)>>>);

    impl PacketHandler for Collect {
        fn handle(&mut self, packet: RawPacket) -> Result<()> {
            self.0.lock().unwrap().push((packet.kind, packet.sequence));
            Ok(())
        }
    }

    #[test]
    fn preserves_per_stream_order_across_producers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut worker = PacketWorker::new("collect", Collect(Arc::clone(&seen)), Notifier::disabled());
        worker.start().unwrap();

        let producers: Vec<_> = [PacketKind::Navigation, PacketKind::Video]
            .into_iter()
            .map(|kind| {
                let handle = worker.handle();
                std::thread::spawn(move || {
                    let stream = PacketSequencer::new(kind);
                    for _ in 0..500 {
                        assert!(handle.enqueue(stream.stamp(vec![1, 2, 3])));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        worker.stop();
        assert!(worker.join().is_some());
        assert!(!worker.is_alive());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1000);
        for kind in [PacketKind::Navigation, PacketKind::Video] {
            let sequences: Vec<u64> =
                seen.iter().filter(|(k, _)| *k == kind).map(|(_, s)| *s).collect();
            assert_eq!(sequences, (0..500).collect::<Vec<_>>());
        }
    }

    #[test]
    fn rejects_packets_before_start_and_after_stop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut worker = PacketWorker::new("gate", Collect(Arc::clone(&seen)), Notifier::disabled());
        let stream = PacketSequencer::new(PacketKind::Navigation);

        assert!(!worker.enqueue(stream.stamp(vec![])));
        worker.start().unwrap();
        assert!(worker.enqueue(stream.stamp(vec![])));
        worker.stop();
        assert!(!worker.enqueue(stream.stamp(vec![])));
        worker.join();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn starting_twice_is_an_error() {
        let mut worker =
            PacketWorker::new("twice", Collect(Arc::default()), Notifier::disabled());
        worker.start().unwrap();
        let err = worker.start().unwrap_err();
        assert!(matches!(err, DroneError::WorkerState { .. }));
        worker.stop();
        worker.join();
    }

    #[test]
    fn stop_wakes_an_idle_worker() {
        let mut worker = PacketWorker::new("idle", Collect(Arc::default()), Notifier::disabled());
        worker.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(worker.is_alive());
        worker.stop();
        assert!(worker.join().is_some());
        assert!(!worker.is_alive());
    }

    struct Flaky;

    impl PacketHandler for Flaky {
        fn handle(&mut self, packet: RawPacket) -> Result<()> {
            match packet.sequence {
                0 => panic!("boom at zero"),
                1 => Err(DroneError::WorkerFault { worker: "flaky".into(), details: "odd".into() }),
                2 => Err(DroneError::malformed("test", "ignored")),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn faults_are_reported_once_and_worker_survives() {
        let (notifier, mut rx) = Notifier::channel();
        let mut worker = PacketWorker::new("flaky", Flaky, notifier);
        worker.start().unwrap();

        let stream = PacketSequencer::new(PacketKind::Video);
        for _ in 0..4 {
            worker.enqueue(stream.stamp(vec![]));
        }
        worker.stop();
        worker.join();

        let mut notes = Vec::new();
        while let Ok(note) = rx.try_recv() {
            notes.push(note);
        }
        assert_eq!(notes.len(), 2, "{notes:?}");
        assert!(matches!(&notes[0], Notification::WorkerFault { details, .. } if details.contains("boom")));
        assert!(matches!(&notes[1], Notification::WorkerFault { .. }));
    }

    struct FailingSink;

    impl PacketHandler for FailingSink {
        fn handle(&mut self, _packet: RawPacket) -> Result<()> {
            Err(DroneError::sink_io("write", std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn fatal_errors_stop_only_that_worker() {
        let (notifier, mut rx) = Notifier::channel();
        let mut worker = PacketWorker::new("sink", FailingSink, notifier);
        worker.start().unwrap();

        let stream = PacketSequencer::new(PacketKind::Navigation);
        worker.enqueue(stream.stamp(vec![]));

        // the thread exits by itself; join does not need stop()
        assert!(worker.join().is_some());
        assert!(!worker.is_alive());
        assert!(!worker.enqueue(stream.stamp(vec![])));

        let note = rx.try_recv().unwrap();
        let Notification::WorkerStopped { worker, error } = note else {
            panic!("unexpected notification {note:?}");
        };
        assert_eq!(worker, "sink");
        assert!(error.contains("disk full"), "{error}");
    }
}
