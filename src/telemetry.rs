//! Latest-value telemetry slots and the navigation decode worker.
//!
//! Each slot has exactly one writer (the worker that decodes into it) and any
//! number of readers. Writers publish by replacing an `Arc`, so a reader sees
//! either the previous record or the new one, never a mix.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::navdata::{self, NavdataRecord};
use crate::stream::ThrottleExt;
use crate::types::{PacketKind, RawPacket, UpdateRate};
use crate::worker::{Notifier, PacketHandler, PacketWorker, WorkerHandle};
use crate::{DroneError, Result};

/// Navigation packet rate in demo mode.
pub const NAVDATA_DEMO_HZ: f64 = 15.0;

/// Nominal video frame rate.
pub const VIDEO_HZ: f64 = 30.0;

pub(crate) type SlotSender<T> = watch::Sender<Option<Arc<T>>>;

/// Create a slot writer and its first read handle.
pub(crate) fn slot<T>(source_hz: f64) -> (SlotSender<T>, Latest<T>) {
    let (tx, rx) = watch::channel(None);
    (tx, Latest { rx, source_hz })
}

/// Read handle on a single-writer slot.
pub struct Latest<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
    source_hz: f64,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self { rx: self.rx.clone(), source_hz: self.source_hz }
    }
}

impl<T: Send + Sync + 'static> Latest<T> {
    /// Most recently published value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    /// Every published value, starting with the current one if present.
    pub fn updates(&self) -> BoxStream<'static, Arc<T>> {
        WatchStream::new(self.rx.clone()).filter_map(|opt| async move { opt }).boxed()
    }

    /// Published values at no more than `rate`, latest wins.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, Arc<T>> {
        match rate.throttle_interval(self.source_hz) {
            None => self.updates(),
            Some(period) => self.updates().throttle(period).boxed(),
        }
    }

    pub fn source_hz(&self) -> f64 {
        self.source_hz
    }
}

struct NavdataHandler {
    slot: SlotSender<NavdataRecord>,
    rejected: u64,
}

impl PacketHandler for NavdataHandler {
    fn handle(&mut self, packet: RawPacket) -> Result<()> {
        if packet.kind != PacketKind::Navigation {
            return Err(DroneError::malformed("navdata worker", "received a video packet"));
        }

        match navdata::decode(&packet.data) {
            Ok(record) => {
                self.slot.send_replace(Some(Arc::new(record)));
                Ok(())
            }
            Err(err) => {
                self.rejected += 1;
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.rejected > 0 {
            debug!(rejected = self.rejected, "Navdata packets rejected during session");
        }
        Ok(())
    }
}

/// Decodes navigation packets on its own thread into the latest-record slot.
///
/// Malformed packets are dropped and the previous record stays published.
pub struct NavdataWorker {
    worker: PacketWorker<NavdataHandler>,
    latest: Latest<NavdataRecord>,
}

impl NavdataWorker {
    pub fn new(notifier: Notifier) -> Self {
        let (tx, latest) = slot(NAVDATA_DEMO_HZ);
        let handler = NavdataHandler { slot: tx, rejected: 0 };
        Self { worker: PacketWorker::new("navdata-decoder", handler, notifier), latest }
    }

    pub fn start(&mut self) -> Result<()> {
        self.worker.start()
    }

    pub fn enqueue(&self, packet: RawPacket) -> bool {
        self.worker.enqueue(packet)
    }

    pub fn handle(&self) -> WorkerHandle {
        self.worker.handle()
    }

    pub fn stop(&self) {
        self.worker.stop();
    }

    pub fn join(&mut self) {
        self.worker.join();
    }

    pub fn is_alive(&self) -> bool {
        self.worker.is_alive()
    }

    pub fn latest(&self) -> Latest<NavdataRecord> {
        self.latest.clone()
    }
}
