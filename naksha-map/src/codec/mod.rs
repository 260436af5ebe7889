//! Binary frame codec.
//!
//! # Frame Format
//!
//! ```text
//! base64 text [, companion key]
//!   └─ AES-256-CBC (only when a key is known)
//!        └─ zlib
//!             ├─ header   27 bytes, see [`FrameHeader`]
//!             ├─ bitmap   width × height bytes
//!             └─ JSON     trailing metadata, see [`FrameMetadata`]
//! ```
//!
//! Cloud storage delivers frames with URL-safe base64, the local RPC with the
//! standard alphabet. Both are accepted.

mod crypto;
mod encode;
mod header;
mod metadata;
mod path;

pub use crypto::{IV_LEN, derive_key};
pub use encode::encode;
pub use header::{FrameHeader, HEADER_SIZE};
pub use metadata::{
    ActiveAreasMeta, FrameMetadata, LineSetsMeta, NumberList, RestrictionsMeta, SegmentInfoMeta,
};
pub use path::{format_path, parse_path};

use crate::core::{Dimensions, Pose};
use crate::error::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, general_purpose};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Base64 engine accepting input with or without padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Frame flavour, from header byte 4
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Complete map, rebuilds from scratch
    Initial,
    /// Delta against the previous frame of the same map
    Partial,
    /// Wifi signal map
    Wifi,
}

impl FrameType {
    /// Header byte
    pub fn code(self) -> u8 {
        match self {
            FrameType::Initial => b'I',
            FrameType::Partial => b'P',
            FrameType::Wifi => b'W',
        }
    }

    /// Parse a header byte
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'I' => Some(FrameType::Initial),
            b'P' => Some(FrameType::Partial),
            b'W' => Some(FrameType::Wifi),
            _ => None,
        }
    }
}

/// One decoded device frame
#[derive(Clone, Debug, PartialEq)]
pub struct PartialFrame {
    pub map_id: u32,
    pub frame_id: u32,
    pub frame_type: FrameType,
    pub robot: Pose,
    pub charger: Pose,
    /// Region covered by `raw_bitmap`
    pub dimensions: Dimensions,
    /// Device bytes, one per pixel, row-major
    pub raw_bitmap: Vec<u8>,
    pub metadata: FrameMetadata,
    pub timestamp_ms: Option<u64>,
}

impl PartialFrame {
    /// Sequencing key
    pub fn key(&self) -> (u32, u32) {
        (self.map_id, self.frame_id)
    }
}

/// Decode one frame.
///
/// `key` is the vendor key for encrypted frames. Input of the form
/// `data,key` carries its own key, used when none is supplied.
pub fn decode(raw: &str, iv: Option<&str>, key: Option<&str>) -> Result<PartialFrame, DecodeError> {
    let (data, companion) = match raw.trim().split_once(',') {
        Some((data, companion)) => (data, Some(companion.trim())),
        None => (raw.trim(), None),
    };
    let key = key.or(companion).filter(|k| !k.is_empty());

    let cleaned: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '_' => '/',
            '-' => '+',
            c => c,
        })
        .collect();
    if cleaned.len() < 3 {
        return Err(DecodeError::Malformed(format!(
            "input too short ({} chars)",
            cleaned.len()
        )));
    }
    let mut bytes = LENIENT_BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| DecodeError::Malformed(format!("base64: {}", e)))?;

    if let Some(key) = key {
        bytes = crypto::decrypt(&bytes, key, iv)?;
    }

    let mut inflated = Vec::new();
    ZlibDecoder::new(bytes.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| DecodeError::Malformed(format!("zlib: {}", e)))?;

    decode_inflated(&inflated)
}

/// Decode an already inflated frame
pub fn decode_inflated(bytes: &[u8]) -> Result<PartialFrame, DecodeError> {
    let header = FrameHeader::parse(bytes)?;

    let frame_type = FrameType::from_code(header.frame_type).ok_or_else(|| {
        DecodeError::UnsupportedFrameShape(format!(
            "unknown frame type byte 0x{:02x}",
            header.frame_type
        ))
    })?;

    if !header.dimensions.fits_world() {
        let d = header.dimensions;
        return Err(DecodeError::UnsupportedFrameShape(format!(
            "grid {}x{} at ({}, {}) with grid size {} leaves the coordinate range",
            d.width, d.height, d.left, d.top, d.grid_size
        )));
    }

    let bitmap_end = HEADER_SIZE
        .checked_add(header.bitmap_len())
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            DecodeError::Malformed(format!(
                "bitmap {}x{} exceeds {} available bytes",
                header.dimensions.width,
                header.dimensions.height,
                bytes.len() - HEADER_SIZE
            ))
        })?;

    let metadata = FrameMetadata::parse(&bytes[bitmap_end..]);
    let timestamp_ms = metadata.timestamp_ms;

    log::trace!(
        "Decoded frame {}/{} type {:?} {}x{}",
        header.map_id,
        header.frame_id,
        frame_type,
        header.dimensions.width,
        header.dimensions.height
    );

    Ok(PartialFrame {
        map_id: header.map_id as u32,
        frame_id: header.frame_id as u32,
        frame_type,
        robot: header.robot,
        charger: header.charger,
        dimensions: header.dimensions,
        raw_bitmap: bytes[HEADER_SIZE..bitmap_end].to_vec(),
        metadata,
        timestamp_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> PartialFrame {
        PartialFrame {
            map_id: 3,
            frame_id: 9,
            frame_type: FrameType::Partial,
            robot: Pose::new(10, 20, 90),
            charger: Pose::new(0, 0, 0),
            dimensions: Dimensions::new(-100, 50, 3, 2, 50),
            raw_bitmap: vec![1, 2, 3, 4, 5, 6],
            metadata: FrameMetadata {
                cs: Some(1),
                ..Default::default()
            },
            timestamp_ms: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn test_round_trip_plain() {
        let mut frame = sample_frame();
        let raw = encode(&frame, None, None).unwrap();
        let decoded = decode(&raw, None, None).unwrap();
        frame.metadata.timestamp_ms = frame.timestamp_ms;
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_url_safe_alphabet() {
        let frame = sample_frame();
        let raw = encode(&frame, None, None).unwrap();
        let url_safe: String = raw
            .chars()
            .map(|c| match c {
                '/' => '_',
                '+' => '-',
                c => c,
            })
            .filter(|c| *c != '=')
            .collect();
        assert_eq!(decode(&url_safe, None, None).unwrap().frame_id, 9);
    }

    #[test]
    fn test_companion_key() {
        let frame = sample_frame();
        let raw = encode(&frame, Some("vendor"), None).unwrap();
        let decoded = decode(&format!("{},vendor", raw), None, None).unwrap();
        assert_eq!(decoded.raw_bitmap, frame.raw_bitmap);
    }

    #[test]
    fn test_short_input() {
        assert!(matches!(decode("ab", None, None), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_short_data_with_companion_key() {
        assert!(matches!(
            decode("a b,vendorkey", None, None),
            Err(DecodeError::Malformed(m)) if m.contains("too short")
        ));
    }

    #[test]
    fn test_not_zlib() {
        assert!(matches!(
            decode("aGVsbG8gd29ybGQ=", None, None),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_bitmap() {
        let mut bytes = Vec::new();
        let header = FrameHeader {
            map_id: 1,
            frame_id: 1,
            frame_type: b'I',
            robot: Pose::default(),
            charger: Pose::default(),
            dimensions: Dimensions::new(0, 0, 100, 100, 50),
        };
        header.write(&mut bytes);
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(matches!(decode_inflated(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_grid_beyond_coordinate_range() {
        let mut bytes = Vec::new();
        let header = FrameHeader {
            map_id: 1,
            frame_id: 1,
            frame_type: b'I',
            robot: Pose::default(),
            charger: Pose::default(),
            dimensions: Dimensions::new(0, 0, 40_000, 1, 60_000),
        };
        header.write(&mut bytes);
        bytes.resize(HEADER_SIZE + 40_000, 0);
        assert!(matches!(
            decode_inflated(&bytes),
            Err(DecodeError::UnsupportedFrameShape(_))
        ));
    }

    #[test]
    fn test_unknown_frame_type() {
        let mut bytes = Vec::new();
        let header = FrameHeader {
            map_id: 1,
            frame_id: 1,
            frame_type: b'Z',
            robot: Pose::default(),
            charger: Pose::default(),
            dimensions: Dimensions::new(0, 0, 0, 0, 50),
        };
        header.write(&mut bytes);
        assert!(matches!(
            decode_inflated(&bytes),
            Err(DecodeError::UnsupportedFrameShape(_))
        ));
    }
}
