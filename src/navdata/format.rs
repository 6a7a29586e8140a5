//! Navigation packet wire format
//!
//! ## Layout (little-endian)
//!
//! 1. **Header** (16 bytes): magic `0x55667788`, drone-state bitfield,
//!    sequence number, vision flag
//! 2. **Options**, each `tag: u16, size: u16, payload` where `size` counts the
//!    4-byte option header
//!    - tag `0x0000`: demo option (control state, battery, attitude,
//!      altitude, velocity)
//!    - tag `0xFFFF`: checksum, the wrapping byte-sum of everything before it
//!    - anything else is skipped
//!
//! Decoding is pure: the same buffer always gives the same result and no
//! state is touched on failure.

use tracing::trace;

use super::record::NavdataRecord;
use super::state::{ControlState, DroneState};
use crate::{DroneError, Result};

pub const NAVDATA_MAGIC: u32 = 0x5566_7788;
pub const HEADER_SIZE: usize = 16;
const OPTION_HEADER_SIZE: usize = 4;

pub const TAG_DEMO: u16 = 0x0000;
pub const TAG_CHECKSUM: u16 = 0xFFFF;

/// Bytes of demo payload this decoder reads; longer demo options are accepted.
const DEMO_PAYLOAD_SIZE: usize = 40;
const CHECKSUM_OPTION_SIZE: usize = OPTION_HEADER_SIZE + 4;

/// Smallest buffer that can hold a header and a demo option.
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + OPTION_HEADER_SIZE + DEMO_PAYLOAD_SIZE;

/// Decode a navigation packet payload.
pub fn decode(data: &[u8]) -> Result<NavdataRecord> {
    if data.len() < MIN_PACKET_SIZE {
        return Err(DroneError::malformed(
            "navdata length",
            format!("{} bytes, need at least {}", data.len(), MIN_PACKET_SIZE),
        ));
    }

    let magic = read_u32(data, 0)?;
    if magic != NAVDATA_MAGIC {
        return Err(DroneError::malformed("navdata header", format!("bad magic {magic:#010x}")));
    }

    let drone_state = DroneState(read_u32(data, 4)?);
    let sequence = read_u32(data, 8)?;
    let vision_defined = read_u32(data, 12)?;

    let mut demo = None;
    let mut offset = HEADER_SIZE;

    while offset + OPTION_HEADER_SIZE <= data.len() {
        let tag = read_u16(data, offset)?;
        let size = read_u16(data, offset + 2)? as usize;

        if size < OPTION_HEADER_SIZE {
            return Err(DroneError::malformed(
                "navdata option",
                format!("option {tag:#06x} at offset {offset} has size {size}"),
            ));
        }
        let end = offset.checked_add(size).filter(|&end| end <= data.len()).ok_or_else(|| {
            DroneError::malformed(
                "navdata option",
                format!("option {tag:#06x} at offset {offset} overruns {} bytes", data.len()),
            )
        })?;
        let payload = &data[offset + OPTION_HEADER_SIZE..end];

        match tag {
            TAG_DEMO => demo = Some(decode_demo(payload)?),
            TAG_CHECKSUM => {
                let expected = read_u32(payload, 0)?;
                let actual = checksum(&data[..offset]);
                if expected != actual {
                    return Err(DroneError::malformed(
                        "navdata checksum",
                        format!("expected {expected:#010x}, computed {actual:#010x}"),
                    ));
                }
                break;
            }
            other => trace!("Skipping navdata option {:#06x} ({} bytes)", other, size),
        }

        offset = end;
    }

    let demo = demo.ok_or_else(|| DroneError::malformed("navdata options", "demo option missing"))?;

    Ok(NavdataRecord {
        drone_state,
        sequence,
        vision_defined,
        control: demo.control,
        battery: demo.battery,
        theta: demo.theta,
        phi: demo.phi,
        psi: demo.psi,
        altitude: demo.altitude,
        vx: demo.vx,
        vy: demo.vy,
        vz: demo.vz,
        frame_index: demo.frame_index,
    })
}

struct Demo {
    control: ControlState,
    battery: u32,
    theta: f32,
    phi: f32,
    psi: f32,
    altitude: i32,
    vx: f32,
    vy: f32,
    vz: f32,
    frame_index: u32,
}

fn decode_demo(payload: &[u8]) -> Result<Demo> {
    if payload.len() < DEMO_PAYLOAD_SIZE {
        return Err(DroneError::malformed(
            "navdata demo option",
            format!("{} payload bytes, need {}", payload.len(), DEMO_PAYLOAD_SIZE),
        ));
    }

    Ok(Demo {
        control: ControlState::from_word(read_u32(payload, 0)?),
        battery: read_u32(payload, 4)?,
        theta: read_f32(payload, 8)?,
        phi: read_f32(payload, 12)?,
        psi: read_f32(payload, 16)?,
        altitude: read_u32(payload, 20)? as i32,
        vx: read_f32(payload, 24)?,
        vy: read_f32(payload, 28)?,
        vz: read_f32(payload, 32)?,
        frame_index: read_u32(payload, 36)?,
    })
}

/// Encode a record as header + demo option + checksum option.
pub fn encode(record: &NavdataRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(MIN_PACKET_SIZE + CHECKSUM_OPTION_SIZE);

    out.extend_from_slice(&NAVDATA_MAGIC.to_le_bytes());
    out.extend_from_slice(&record.drone_state.value().to_le_bytes());
    out.extend_from_slice(&record.sequence.to_le_bytes());
    out.extend_from_slice(&record.vision_defined.to_le_bytes());

    out.extend_from_slice(&TAG_DEMO.to_le_bytes());
    out.extend_from_slice(&((OPTION_HEADER_SIZE + DEMO_PAYLOAD_SIZE) as u16).to_le_bytes());
    out.extend_from_slice(&record.control.word().to_le_bytes());
    out.extend_from_slice(&record.battery.to_le_bytes());
    out.extend_from_slice(&record.theta.to_le_bytes());
    out.extend_from_slice(&record.phi.to_le_bytes());
    out.extend_from_slice(&record.psi.to_le_bytes());
    out.extend_from_slice(&record.altitude.to_le_bytes());
    out.extend_from_slice(&record.vx.to_le_bytes());
    out.extend_from_slice(&record.vy.to_le_bytes());
    out.extend_from_slice(&record.vz.to_le_bytes());
    out.extend_from_slice(&record.frame_index.to_le_bytes());

    let sum = checksum(&out);
    out.extend_from_slice(&TAG_CHECKSUM.to_le_bytes());
    out.extend_from_slice(&(CHECKSUM_OPTION_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&sum.to_le_bytes());
    out
}

/// Wrapping sum of all bytes.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| short_read("u16", offset, data.len()))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| short_read("u32", offset, data.len()))
}

fn read_f32(data: &[u8], offset: usize) -> Result<f32> {
    read_u32(data, offset).map(f32::from_bits)
}

fn short_read(what: &str, offset: usize, len: usize) -> DroneError {
    DroneError::malformed(
        "navdata field",
        format!("no room for {what} at offset {offset} in {len} bytes"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::state::{ControlPhase, FlyingState};
    use crate::test_utils::{navdata_bytes, sample_navdata};
    use proptest::prelude::*;

    #[test]
    fn decodes_encoded_sample() {
        let record = sample_navdata();
        let bytes = encode(&record);
        assert_eq!(bytes.len(), MIN_PACKET_SIZE + CHECKSUM_OPTION_SIZE);
        assert_eq!(decode(&bytes).unwrap(), record);
    }

    #[test]
    fn control_word_splits_high_and_low() {
        let mut record = sample_navdata();
        record.control = ControlState::from_word(0x0002_0001);
        let decoded = decode(&encode(&record)).unwrap();
        assert_eq!(decoded.control.phase, ControlPhase::Landed);
        assert_eq!(decoded.control.flying, FlyingState::LostAltitude);
    }

    #[test]
    fn rejects_short_buffers() {
        let bytes = encode(&sample_navdata());
        let err = decode(&bytes[..MIN_PACKET_SIZE - 1]).unwrap_err();
        assert!(matches!(err, DroneError::MalformedPacket { .. }));
        assert!(err.is_absorbed());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode(&sample_navdata());
        bytes[0] ^= 0xFF;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let mut bytes = encode(&sample_navdata());
        // battery lives inside the checksummed region
        bytes[HEADER_SIZE + OPTION_HEADER_SIZE + 4] ^= 0x01;
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn skips_unknown_options_and_accepts_missing_checksum() {
        let record = sample_navdata();
        let encoded = encode(&record);
        let demo_end = MIN_PACKET_SIZE;

        let mut bytes = encoded[..HEADER_SIZE].to_vec();
        // unknown tag 0x0010 with 4 payload bytes ahead of the demo option
        bytes.extend_from_slice(&0x0010u16.to_le_bytes());
        bytes.extend_from_slice(&8u16.to_le_bytes());
        bytes.extend_from_slice(&[0xAA; 4]);
        bytes.extend_from_slice(&encoded[HEADER_SIZE..demo_end]);

        assert_eq!(decode(&bytes).unwrap(), record);
    }

    #[test]
    fn rejects_packet_without_demo_option() {
        let mut bytes = navdata_bytes(&sample_navdata())[..HEADER_SIZE].to_vec();
        bytes.extend_from_slice(&0x0010u16.to_le_bytes());
        bytes.extend_from_slice(&44u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 40]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("demo option missing"));
    }

    #[test]
    fn rejects_overrunning_and_undersized_options() {
        let mut bytes = encode(&sample_navdata());
        bytes[HEADER_SIZE + 2..HEADER_SIZE + 4].copy_from_slice(&0xFFF0u16.to_le_bytes());
        assert!(decode(&bytes).is_err());

        let mut bytes = encode(&sample_navdata());
        bytes[HEADER_SIZE + 2..HEADER_SIZE + 4].copy_from_slice(&2u16.to_le_bytes());
        assert!(decode(&bytes).is_err());
    }

    prop_compose! {
        /// Finite floats only, so records compare with `PartialEq`.
        fn arb_record()(
            state in any::<u32>(),
            sequence in any::<u32>(),
            vision in any::<u32>(),
            word in any::<u32>(),
            battery in 0u32..=100,
            theta in -180_000.0f32..180_000.0,
            phi in -180_000.0f32..180_000.0,
            psi in -180_000.0f32..180_000.0,
            altitude in any::<i32>(),
            vx in -10_000.0f32..10_000.0,
            vy in -10_000.0f32..10_000.0,
            vz in -10_000.0f32..10_000.0,
            frame_index in any::<u32>(),
        ) -> NavdataRecord {
            NavdataRecord {
                drone_state: DroneState(state),
                sequence,
                vision_defined: vision,
                control: ControlState::from_word(word),
                battery,
                theta,
                phi,
                psi,
                altitude,
                vx,
                vy,
                vz,
                frame_index,
            }
        }
    }

    proptest! {
        #[test]
        fn decode_encode_decode_is_identity(record in arb_record()) {
            let first = decode(&encode(&record)).unwrap();
            let second = decode(&encode(&first)).unwrap();
            prop_assert_eq!(first, record);
            prop_assert_eq!(second, first);
        }

        #[test]
        fn float_bit_patterns_survive_decoding(
            record in arb_record(),
            floats in prop::array::uniform6(any::<u32>().prop_map(f32::from_bits)),
        ) {
            let [theta, phi, psi, vx, vy, vz] = floats;
            let record = NavdataRecord { theta, phi, psi, vx, vy, vz, ..record };
            let decoded = decode(&encode(&record)).unwrap();
            let bits = |r: &NavdataRecord| [r.theta, r.phi, r.psi, r.vx, r.vy, r.vz].map(f32::to_bits);
            prop_assert_eq!(bits(&decoded), bits(&record));
            prop_assert_eq!(encode(&decoded), encode(&record));
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&bytes);
        }

        #[test]
        fn arbitrary_bytes_behind_valid_header_never_panic(
            tail in prop::collection::vec(any::<u8>(), 0..256)
        ) {
            let mut bytes = NAVDATA_MAGIC.to_le_bytes().to_vec();
            bytes.extend_from_slice(&[0u8; 12]);
            bytes.extend_from_slice(&tail);
            if let Err(err) = decode(&bytes) {
                prop_assert!(err.is_absorbed());
            }
        }
    }
}
