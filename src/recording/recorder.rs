//! Packet recorder worker

use std::io::{BufWriter, Write};
use std::time::Instant;

use tracing::{debug, info};

use super::format::{self, MAX_PAYLOAD};
use crate::types::RawPacket;
use crate::worker::{Notifier, PacketHandler, PacketWorker, WorkerHandle};
use crate::{DroneError, Result};

struct RecorderHandler<W: Write> {
    out: BufWriter<W>,
    started: Instant,
    entries: u64,
    bytes: u64,
}

impl<W: Write + Send + 'static> PacketHandler for RecorderHandler<W> {
    fn handle(&mut self, packet: RawPacket) -> Result<()> {
        if packet.len() > MAX_PAYLOAD {
            return Err(DroneError::malformed(
                "recorder",
                format!("{} byte packet is too large to record", packet.len()),
            ));
        }

        let ticks =
            format::ticks_from_duration(packet.timestamp.saturating_duration_since(self.started));
        format::write_entry(&mut self.out, packet.kind, ticks, &packet.data)
            .map_err(|e| DroneError::sink_io("recording write", e))?;

        self.entries += 1;
        self.bytes += packet.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().map_err(|e| DroneError::sink_io("recording flush", e))?;
        info!(entries = self.entries, payload_bytes = self.bytes, "Recording closed");
        Ok(())
    }
}

/// Appends both packet streams, interleaved in arrival order, to one sink.
///
/// Timestamps are taken relative to the recorder's start time. `stop()`
/// followed by `join()` flushes everything and hands the sink back.
pub struct PacketRecorder<W: Write + Send + 'static> {
    worker: PacketWorker<RecorderHandler<W>>,
}

impl<W: Write + Send + 'static> PacketRecorder<W> {
    pub fn new(sink: W, notifier: Notifier) -> Self {
        Self::with_start(sink, Instant::now(), notifier)
    }

    /// Record with timestamps relative to `started` instead of now.
    pub fn with_start(sink: W, started: Instant, notifier: Notifier) -> Self {
        let handler = RecorderHandler { out: BufWriter::new(sink), started, entries: 0, bytes: 0 };
        Self { worker: PacketWorker::new("packet-recorder", handler, notifier) }
    }

    pub fn start(&mut self) -> Result<()> {
        self.worker.start()?;
        debug!("Recording started");
        Ok(())
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

    /// Wait for the writer thread and take back the sink.
    ///
    /// Everything accepted before `stop()` has been written and flushed
    /// unless the sink failed, in which case a `WorkerStopped` notification
    /// was already sent.
    pub fn join(&mut self) -> Option<W> {
        let handler = self.worker.join()?;
        let (sink, _unflushed) = handler.out.into_parts();
        Some(sink)
    }

    pub fn is_alive(&self) -> bool {
        self.worker.is_alive()
    }
}
