//! Ingest pipeline: the decode workers plus an optional recorder tap.
//!
//! ```text
//!   network / player ──► PacketInlet ──┬──► recorder tap (both kinds, optional)
//!                                      ├──► NavdataWorker ──► Latest<NavdataRecord>
//!                                      └──► VideoDecoderWorker ──► Latest<VideoFrame>
//! ```
//!
//! The inlet is cheap to clone and safe to call from the network threads.
//! Recording can be started and stopped while packets are flowing.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::navdata::NavdataRecord;
use crate::recording::{PacketRecorder, recording_path};
use crate::telemetry::{Latest, NavdataWorker};
use crate::types::{PacketKind, RawPacket, UpdateRate, VideoFrame};
use crate::video::{VideoDecoder, VideoDecoderWorker};
use crate::worker::{Notifier, PacketSink, WorkerHandle};
use crate::{DroneError, Result};

/// Boxed sink a recording writes to.
pub type RecordingSink = Box<dyn Write + Send>;

type Tap = Arc<RwLock<Option<WorkerHandle>>>;

/// Producer side of the pipeline.
///
/// A packet goes to the recorder tap first, if one is attached, and then to
/// the decoder for its kind. Acceptance reflects the decoder only.
#[derive(Clone)]
pub struct PacketInlet {
    navdata: WorkerHandle,
    video: WorkerHandle,
    tap: Tap,
}

impl PacketInlet {
    pub fn push(&self, packet: RawPacket) -> bool {
        {
            let tap = self.tap.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(recorder) = tap.as_ref() {
                recorder.enqueue(packet.clone());
            }
        }

        match packet.kind {
            PacketKind::Navigation => self.navdata.enqueue(packet),
            PacketKind::Video => self.video.enqueue(packet),
        }
    }
}

impl PacketSink for PacketInlet {
    fn accept(&self, packet: RawPacket) -> bool {
        self.push(packet)
    }
}

/// Running decode workers and the recording tap.
pub struct Pipeline<D: VideoDecoder> {
    navdata: NavdataWorker,
    video: VideoDecoderWorker<D>,
    recorder: Option<PacketRecorder<RecordingSink>>,
    tap: Tap,
    ui_rate: UpdateRate,
    notifier: Notifier,
}

impl<D: VideoDecoder> Pipeline<D> {
    /// Validate `config`, then start the navigation and video workers.
    ///
    /// The decoder must already produce `config.video.pixel_layout`.
    pub fn start(config: &Config, decoder: D, notifier: Notifier) -> Result<Self> {
        config.validate()?;
        let layout = decoder.pixel_layout();
        if layout != config.video.pixel_layout {
            return Err(DroneError::config(format!(
                "video.pixel_layout is {:?} but the decoder produces {:?}",
                config.video.pixel_layout, layout
            )));
        }

        let mut navdata = NavdataWorker::new(notifier.clone());
        navdata.start()?;
        let mut video =
            VideoDecoderWorker::new(decoder, config.video.resync_on_keyframe, notifier.clone());
        if let Err(err) = video.start() {
            navdata.stop();
            navdata.join();
            return Err(err);
        }

        info!(?layout, ui_rate = ?config.telemetry.ui_rate, "Pipeline started");
        Ok(Self {
            navdata,
            video,
            recorder: None,
            tap: Arc::new(RwLock::new(None)),
            ui_rate: config.telemetry.ui_rate,
            notifier,
        })
    }

    pub fn inlet(&self) -> PacketInlet {
        PacketInlet {
            navdata: self.navdata.handle(),
            video: self.video.handle(),
            tap: Arc::clone(&self.tap),
        }
    }

    pub fn navdata(&self) -> Latest<NavdataRecord> {
        self.navdata.latest()
    }

    pub fn frames(&self) -> Latest<VideoFrame> {
        self.video.latest()
    }

    /// Navigation records at the configured UI rate.
    pub fn navdata_updates(&self) -> BoxStream<'static, Arc<NavdataRecord>> {
        self.navdata.latest().subscribe(self.ui_rate)
    }

    /// Decoded frames at the configured UI rate.
    pub fn frame_updates(&self) -> BoxStream<'static, Arc<VideoFrame>> {
        self.video.latest().subscribe(self.ui_rate)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.as_ref().is_some_and(PacketRecorder::is_alive)
    }

    /// Start tapping both streams into `sink`.
    ///
    /// A recorder that already stopped on a sink failure is reaped first.
    pub fn start_recording(&mut self, sink: RecordingSink) -> Result<()> {
        if self.recorder.as_ref().is_some_and(|r| !r.is_alive()) {
            debug!("Reaping stopped recorder");
            self.stop_recording();
        }
        if self.recorder.is_some() {
            return Err(DroneError::worker_state("packet-recorder", "already recording"));
        }

        let mut recorder = PacketRecorder::new(sink, self.notifier.clone());
        recorder.start()?;
        *self.tap.write().unwrap_or_else(PoisonError::into_inner) = Some(recorder.handle());
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Record into a file, adding the `.ardrone` extension when missing.
    ///
    /// Returns the path actually written.
    pub fn start_recording_file(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = recording_path(path);
        let file = File::create(&path)
            .map_err(|e| DroneError::sink_io(format!("create {}", path.display()), e))?;
        self.start_recording(Box::new(file))?;
        info!(path = %path.display(), "Recording to file");
        Ok(path)
    }

    /// Detach the tap, flush everything recorded so far and hand the sink
    /// back. `None` if nothing was recording.
    pub fn stop_recording(&mut self) -> Option<RecordingSink> {
        let mut recorder = self.recorder.take()?;
        self.tap.write().unwrap_or_else(PoisonError::into_inner).take();
        recorder.stop();
        let sink = recorder.join();
        if sink.is_none() {
            warn!("Recorder thread did not return its sink");
        }
        sink
    }

    /// Stop every worker, draining what is queued, and take back the decoder.
    pub fn shutdown(mut self) -> Option<D> {
        if let Some(mut sink) = self.stop_recording() {
            if let Err(err) = sink.flush() {
                warn!("Recording sink failed to flush on shutdown: {}", err);
            }
        }
        self.navdata.stop();
        self.video.stop();
        self.navdata.join();
        let decoder = self.video.join();
        debug!("Pipeline shut down");
        decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordedEntry, RecordingReader};
    use crate::test_utils::{FakeDecoder, SharedBuffer, navdata_bytes, sample_navdata};
    use crate::types::{PacketSequencer, PixelLayout};
    use std::io::Cursor;

    fn config() -> Config {
        let mut config = Config::default();
        config.video.pixel_layout = PixelLayout::Rgb24;
        config.video.resync_on_keyframe = false;
        config
    }

    #[test]
    fn layout_mismatch_is_a_config_error() {
        let mut config = config();
        config.video.pixel_layout = PixelLayout::Bgra32;
        let err = Pipeline::start(&config, FakeDecoder::new(2, 2), Notifier::disabled()).err();
        assert!(matches!(err, Some(DroneError::Config { .. })));
    }

    #[test]
    fn routes_packets_by_kind() {
        let pipeline = Pipeline::start(&config(), FakeDecoder::new(2, 2), Notifier::disabled()).unwrap();
        let navdata = pipeline.navdata();
        let frames = pipeline.frames();
        let inlet = pipeline.inlet();

        let nav = PacketSequencer::new(PacketKind::Navigation);
        let video = PacketSequencer::new(PacketKind::Video);
        assert!(inlet.accept(nav.stamp(navdata_bytes(&sample_navdata()))));
        assert!(inlet.accept(video.stamp(vec![9])));

        let decoder = pipeline.shutdown().unwrap();
        assert_eq!(decoder.decoded(), 1);
        assert_eq!(navdata.get().unwrap().battery, sample_navdata().battery);
        assert_eq!(frames.get().unwrap().pixels()[0], 9);
        assert!(!inlet.accept(nav.stamp(vec![])), "workers stopped");
    }

    #[test]
    fn recording_taps_both_streams_in_arrival_order() {
        let mut pipeline =
            Pipeline::start(&config(), FakeDecoder::new(1, 1), Notifier::disabled()).unwrap();
        let inlet = pipeline.inlet();
        let nav = PacketSequencer::new(PacketKind::Navigation);
        let video = PacketSequencer::new(PacketKind::Video);

        inlet.accept(video.stamp(vec![1]));
        let buffer = SharedBuffer::default();
        pipeline.start_recording(Box::new(buffer.clone())).unwrap();
        assert!(pipeline.is_recording());
        assert!(pipeline.start_recording(Box::new(Vec::new())).is_err());

        inlet.accept(nav.stamp(vec![0xAA]));
        inlet.accept(video.stamp(vec![2]));
        assert!(pipeline.stop_recording().is_some());
        assert!(!pipeline.is_recording());
        inlet.accept(video.stamp(vec![3]));
        pipeline.shutdown();

        let entries: Vec<RecordedEntry> =
            RecordingReader::new(Cursor::new(buffer.contents())).collect::<Result<_>>().unwrap();
        let recorded: Vec<_> = entries.iter().map(|e| (e.kind, e.payload.clone())).collect();
        assert_eq!(
            recorded,
            vec![(PacketKind::Navigation, vec![0xAA]), (PacketKind::Video, vec![2])]
        );
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn recording_restarts_after_sink_failure() {
        let mut pipeline =
            Pipeline::start(&config(), FakeDecoder::new(1, 1), Notifier::disabled()).unwrap();
        let inlet = pipeline.inlet();
        let video = PacketSequencer::new(PacketKind::Video);

        pipeline.start_recording(Box::new(FullDisk)).unwrap();
        // larger than the recorder's buffer so the write reaches the sink
        inlet.accept(video.stamp(vec![5; 64 * 1024]));
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while pipeline.is_recording() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(!pipeline.is_recording());

        let buffer = SharedBuffer::default();
        pipeline.start_recording(Box::new(buffer.clone())).unwrap();
        assert!(pipeline.is_recording());
        inlet.accept(video.stamp(vec![6]));
        assert!(pipeline.stop_recording().is_some());
        pipeline.shutdown();

        let entries: Vec<RecordedEntry> =
            RecordingReader::new(Cursor::new(buffer.contents())).collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload, vec![6]);
    }

    #[test]
    fn stop_recording_without_recorder_is_none() {
        let mut pipeline =
            Pipeline::start(&config(), FakeDecoder::new(1, 1), Notifier::disabled()).unwrap();
        assert!(pipeline.stop_recording().is_none());
    }
}
