//! Recording file layout
//!
//! A recording is a bare sequence of entries with no file header or footer.
//! Both packet streams share one append order so replay can reproduce the
//! timing between them.
//!
//! ```text
//! offset  size  field
//!      0     1  kind tag (1 = navigation, 2 = video)
//!      1     8  timestamp, 100 ns ticks since recording start (u64 LE)
//!      9     4  payload length (u32 LE)
//!     13     n  payload
//! ```
//!
//! End of stream is end of source. A source ending inside an entry is a
//! truncated recording and reported as an I/O failure.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::PacketKind;
use crate::{DroneError, Result};

pub const RECORDING_EXTENSION: &str = "ardrone";

pub const TICKS_PER_SECOND: u64 = 10_000_000;

pub const ENTRY_HEADER_SIZE: usize = 13;

/// Largest payload accepted when reading or writing.
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

const NANOS_PER_TICK: u128 = 100;

pub fn ticks_from_duration(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos() / NANOS_PER_TICK).unwrap_or(u64::MAX)
}

pub fn duration_from_ticks(ticks: u64) -> Duration {
    let subsec_ticks = (ticks % TICKS_PER_SECOND) as u32;
    Duration::new(ticks / TICKS_PER_SECOND, subsec_ticks * NANOS_PER_TICK as u32)
}

/// Give `path` the recording extension unless it already has one.
pub fn recording_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(RECORDING_EXTENSION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEntry {
    pub kind: PacketKind,
    pub ticks: u64,
    pub payload: Vec<u8>,
}

impl RecordedEntry {
    /// Time since recording start.
    pub fn offset(&self) -> Duration {
        duration_from_ticks(self.ticks)
    }
}

pub fn write_entry<W: Write>(
    out: &mut W,
    kind: PacketKind,
    ticks: u64,
    payload: &[u8],
) -> io::Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload of {} bytes exceeds {}", payload.len(), MAX_PAYLOAD),
        ));
    }

    let mut header = [0u8; ENTRY_HEADER_SIZE];
    header[0] = kind.tag();
    header[1..9].copy_from_slice(&ticks.to_le_bytes());
    header[9..13].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out.write_all(&header)?;
    out.write_all(payload)
}

/// Sequential reader over a recording.
///
/// Also an [`Iterator`] over `Result<RecordedEntry>`; iteration ends after
/// the first error.
pub struct RecordingReader<R> {
    inner: R,
    entries: u64,
    failed: bool,
}

impl<R: Read> RecordingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, entries: 0, failed: false }
    }

    /// Next entry, or `None` at a clean end of stream.
    pub fn next_entry(&mut self) -> Result<Option<RecordedEntry>> {
        let mut header = [0u8; ENTRY_HEADER_SIZE];
        let filled = read_full(&mut self.inner, &mut header)
            .map_err(|e| DroneError::sink_io("recording read", e))?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < ENTRY_HEADER_SIZE {
            return Err(DroneError::sink_io(
                "recording read",
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry {} header truncated after {} bytes", self.entries, filled),
                ),
            ));
        }

        let kind = PacketKind::from_tag(header[0]).ok_or_else(|| {
            DroneError::malformed(
                "recording entry",
                format!("entry {} has unknown kind tag {}", self.entries, header[0]),
            )
        })?;
        let mut ticks = [0u8; 8];
        ticks.copy_from_slice(&header[1..9]);
        let ticks = u64::from_le_bytes(ticks);
        let length = u32::from_le_bytes([header[9], header[10], header[11], header[12]]) as usize;
        if length > MAX_PAYLOAD {
            return Err(DroneError::malformed(
                "recording entry",
                format!("entry {} declares {} payload bytes", self.entries, length),
            ));
        }

        let mut payload = vec![0u8; length];
        self.inner
            .read_exact(&mut payload)
            .map_err(|e| DroneError::sink_io("recording read", e))?;

        self.entries += 1;
        Ok(Some(RecordedEntry { kind, ticks, payload }))
    }

    pub fn entries_read(&self) -> u64 {
        self.entries
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for RecordingReader<R> {
    type Item = Result<RecordedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_entry().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

/// Read until `buf` is full or the source ends. Returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
