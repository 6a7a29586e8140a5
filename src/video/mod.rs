//! Video decoding worker.
//!
//! The codec itself lives behind [`VideoDecoder`]. The worker strips PaVE
//! framing, feeds each unit to the decoder and publishes whatever comes out
//! as the latest [`VideoFrame`]. Rejected units are dropped; nothing is
//! queued for consumers, who only ever see the newest complete frame.

pub mod pave;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::telemetry::{self, Latest, SlotSender};
use crate::types::{PacketKind, PixelLayout, RawPacket, VideoFrame};
use crate::worker::{Notifier, PacketHandler, PacketWorker, WorkerHandle};
use crate::{DroneError, Result};

pub use pave::{FrameType, PaveHeader, VideoUnit};

/// Pixels produced by a decoder for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPicture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// External video codec.
///
/// Configured with its output pixel layout when constructed. `decode`
/// returns `Ok(None)` when the unit was accepted but completed no picture,
/// and [`DroneError::DecoderFailure`] when the unit is rejected.
pub trait VideoDecoder: Send + 'static {
    fn pixel_layout(&self) -> PixelLayout;

    fn decode(&mut self, unit: &[u8]) -> Result<Option<DecodedPicture>>;
}

impl<D: VideoDecoder + ?Sized> VideoDecoder for Box<D> {
    fn pixel_layout(&self) -> PixelLayout {
        (**self).pixel_layout()
    }

    fn decode(&mut self, unit: &[u8]) -> Result<Option<DecodedPicture>> {
        (**self).decode(unit)
    }
}

struct VideoHandler<D> {
    decoder: D,
    layout: PixelLayout,
    slot: SlotSender<VideoFrame>,
    next_number: u64,
    resync_on_keyframe: bool,
    awaiting_keyframe: bool,
    rejected: u64,
    skipped: u64,
}

impl<D: VideoDecoder> PacketHandler for VideoHandler<D> {
    fn handle(&mut self, packet: RawPacket) -> Result<()> {
        if packet.kind != PacketKind::Video {
            return Err(DroneError::malformed("video worker", "received a navigation packet"));
        }

        let unit = pave::parse(&packet.data)?;
        if self.awaiting_keyframe {
            match unit.is_keyframe() {
                Some(false) => {
                    self.skipped += 1;
                    trace!(sequence = packet.sequence, "Skipping predicted frame until keyframe");
                    return Ok(());
                }
                Some(true) => self.awaiting_keyframe = false,
                None => {}
            }
        }

        let picture = match self.decoder.decode(unit.payload()) {
            Ok(Some(picture)) => picture,
            Ok(None) => return Ok(()),
            Err(err) => {
                self.rejected += 1;
                self.awaiting_keyframe = self.resync_on_keyframe;
                return Err(err);
            }
        };

        let frame = VideoFrame::new(
            self.next_number,
            picture.width,
            picture.height,
            self.layout,
            picture.pixels,
        )?;
        self.next_number += 1;
        self.slot.send_replace(Some(Arc::new(frame)));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        debug!(
            published = self.next_number,
            rejected = self.rejected,
            skipped = self.skipped,
            "Video decoding finished"
        );
        Ok(())
    }
}

/// Decodes video packets on its own thread into the latest-frame slot.
///
/// Frame numbers are assigned by the worker, start at zero and increase by
/// one for every published frame.
pub struct VideoDecoderWorker<D: VideoDecoder> {
    worker: PacketWorker<VideoHandler<D>>,
    latest: Latest<VideoFrame>,
}

impl<D: VideoDecoder> VideoDecoderWorker<D> {
    /// With `resync_on_keyframe`, predicted frames are skipped before the
    /// first keyframe and after every rejected unit.
    pub fn new(decoder: D, resync_on_keyframe: bool, notifier: Notifier) -> Self {
        let (tx, latest) = telemetry::slot(telemetry::VIDEO_HZ);
        let handler = VideoHandler {
            layout: decoder.pixel_layout(),
            decoder,
            slot: tx,
            next_number: 0,
            resync_on_keyframe,
            awaiting_keyframe: resync_on_keyframe,
            rejected: 0,
            skipped: 0,
        };
        Self { worker: PacketWorker::new("video-decoder", handler, notifier), latest }
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

    /// Wait for the thread and take back the decoder.
    pub fn join(&mut self) -> Option<D> {
        self.worker.join().map(|handler| handler.decoder)
    }

    pub fn is_alive(&self) -> bool {
        self.worker.is_alive()
    }

    pub fn latest(&self) -> Latest<VideoFrame> {
        self.latest.clone()
    }
}
