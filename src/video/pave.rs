//! PaVE video encapsulation
//!
//! The drone wraps every encoded video unit in a little-endian header:
//!
//! ```text
//! offset  size  field
//!      0     4  signature "PaVE"
//!      4     1  version
//!      5     1  codec
//!      6     2  header size
//!      8     4  payload size
//!     12     2  encoded width
//!     14     2  encoded height
//!     20     4  frame number
//!     30     1  frame type (1 = IDR, 2 = I, 3 = P)
//! ```
//!
//! Units without the signature are handed to the decoder unchanged.

use crate::{DroneError, Result};

pub const PAVE_SIGNATURE: [u8; 4] = *b"PaVE";

/// Smallest header that still carries the frame type byte.
pub const PAVE_MIN_HEADER: usize = 32;

/// Header size written by [`encode`], matching the drone firmware.
pub const PAVE_HEADER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Idr,
    Intra,
    Predicted,
    Unknown(u8),
}

impl FrameType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => FrameType::Idr,
            2 => FrameType::Intra,
            3 => FrameType::Predicted,
            other => FrameType::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            FrameType::Idr => 1,
            FrameType::Intra => 2,
            FrameType::Predicted => 3,
            FrameType::Unknown(raw) => raw,
        }
    }

    /// A unit the decoder can start from without prior state.
    pub fn is_keyframe(self) -> bool {
        matches!(self, FrameType::Idr | FrameType::Intra)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaveHeader {
    pub header_size: u16,
    pub payload_size: u32,
    pub width: u16,
    pub height: u16,
    pub frame_number: u32,
    pub frame_type: FrameType,
}

/// A video packet split into what the decoder should see.
#[derive(Debug, PartialEq)]
pub enum VideoUnit<'a> {
    Framed { header: PaveHeader, payload: &'a [u8] },
    Raw(&'a [u8]),
}

impl<'a> VideoUnit<'a> {
    pub fn payload(&self) -> &'a [u8] {
        match self {
            VideoUnit::Framed { payload, .. } => payload,
            VideoUnit::Raw(payload) => payload,
        }
    }

    /// `None` when the unit is not framed and its type is unknown.
    pub fn is_keyframe(&self) -> Option<bool> {
        match self {
            VideoUnit::Framed { header, .. } => Some(header.frame_type.is_keyframe()),
            VideoUnit::Raw(_) => None,
        }
    }
}

pub fn parse(data: &[u8]) -> Result<VideoUnit<'_>> {
    if !data.starts_with(&PAVE_SIGNATURE) {
        return Ok(VideoUnit::Raw(data));
    }
    if data.len() < PAVE_MIN_HEADER {
        return Err(DroneError::malformed(
            "PaVE header",
            format!("{} bytes, need at least {}", data.len(), PAVE_MIN_HEADER),
        ));
    }

    let header_size = read_u16(data, 6);
    let payload_size = read_u32(data, 8);
    if (header_size as usize) < PAVE_MIN_HEADER {
        return Err(DroneError::malformed(
            "PaVE header",
            format!("declared header size {} is too small", header_size),
        ));
    }

    let start = header_size as usize;
    let end = start.saturating_add(payload_size as usize);
    if end > data.len() {
        return Err(DroneError::malformed(
            "PaVE payload",
            format!(
                "declares {} bytes after {}-byte header, packet has {}",
                payload_size,
                start,
                data.len()
            ),
        ));
    }

    let header = PaveHeader {
        header_size,
        payload_size,
        width: read_u16(data, 12),
        height: read_u16(data, 14),
        frame_number: read_u32(data, 20),
        frame_type: FrameType::from_raw(data[30]),
    };

    Ok(VideoUnit::Framed { header, payload: &data[start..end] })
}

// callers have checked `data` holds at least PAVE_MIN_HEADER bytes
fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Wrap `payload` in a PaVE header. Header size and payload size in
/// `header` are ignored and recomputed.
pub fn encode(header: &PaveHeader, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; PAVE_HEADER_SIZE];
    out[0..4].copy_from_slice(&PAVE_SIGNATURE);
    out[4] = 3;
    out[5] = 4;
    out[6..8].copy_from_slice(&(PAVE_HEADER_SIZE as u16).to_le_bytes());
    out[8..12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out[12..14].copy_from_slice(&header.width.to_le_bytes());
    out[14..16].copy_from_slice(&header.height.to_le_bytes());
    out[16..18].copy_from_slice(&header.width.to_le_bytes());
    out[18..20].copy_from_slice(&header.height.to_le_bytes());
    out[20..24].copy_from_slice(&header.frame_number.to_le_bytes());
    out[30] = header.frame_type.raw();
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(frame_type: FrameType) -> PaveHeader {
        PaveHeader {
            header_size: 0,
            payload_size: 0,
            width: 640,
            height: 360,
            frame_number: 12,
            frame_type,
        }
    }

    #[test]
    fn framed_units_strip_the_header() {
        let bytes = encode(&header(FrameType::Idr), &[9, 8, 7]);
        let unit = parse(&bytes).unwrap();

        assert_eq!(unit.payload(), &[9, 8, 7]);
        assert_eq!(unit.is_keyframe(), Some(true));
        let VideoUnit::Framed { header, .. } = unit else { panic!("expected framed unit") };
        assert_eq!(header.header_size as usize, PAVE_HEADER_SIZE);
        assert_eq!((header.width, header.height), (640, 360));
        assert_eq!(header.frame_number, 12);
    }

    #[test]
    fn unsigned_payloads_pass_through() {
        let data = [0x00, 0x00, 0x00, 0x01, 0x67];
        assert_eq!(parse(&data).unwrap(), VideoUnit::Raw(&data));
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut bytes = encode(&header(FrameType::Predicted), &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 1);
        assert!(parse(&bytes).unwrap_err().is_absorbed());

        assert!(parse(b"PaVE\x03").is_err());
    }

    #[test]
    fn frame_types() {
        assert!(FrameType::from_raw(1).is_keyframe());
        assert!(FrameType::from_raw(2).is_keyframe());
        assert!(!FrameType::from_raw(3).is_keyframe());
        assert_eq!(FrameType::from_raw(7), FrameType::Unknown(7));
        assert_eq!(FrameType::Unknown(7).raw(), 7);
    }
}
