//! Frame encoder, the inverse of [`decode`](super::decode).
//!
//! Devices never receive frames, so this exists to synthesize frames for
//! replay tooling and tests.

use super::crypto;
use super::header::FrameHeader;
use super::PartialFrame;
use crate::error::DecodeError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// Encode a frame as codec input text (standard base64).
///
/// The frame's `timestamp_ms` is written into the metadata.
pub fn encode(
    frame: &PartialFrame,
    key: Option<&str>,
    iv: Option<&str>,
) -> Result<String, DecodeError> {
    if frame.raw_bitmap.len() != frame.dimensions.cell_count() {
        return Err(DecodeError::Malformed(format!(
            "bitmap has {} bytes, dimensions need {}",
            frame.raw_bitmap.len(),
            frame.dimensions.cell_count()
        )));
    }
    if frame.map_id > u16::MAX as u32 || frame.frame_id > u16::MAX as u32 {
        return Err(DecodeError::UnsupportedFrameShape(format!(
            "ids {}/{} do not fit the header",
            frame.map_id, frame.frame_id
        )));
    }

    let header = FrameHeader {
        map_id: frame.map_id as u16,
        frame_id: frame.frame_id as u16,
        frame_type: frame.frame_type.code(),
        robot: frame.robot,
        charger: frame.charger,
        dimensions: frame.dimensions,
    };
    let mut plain = Vec::with_capacity(super::HEADER_SIZE + frame.raw_bitmap.len());
    header.write(&mut plain);
    plain.extend_from_slice(&frame.raw_bitmap);

    let mut metadata = frame.metadata.clone();
    if frame.timestamp_ms.is_some() {
        metadata.timestamp_ms = frame.timestamp_ms;
    }
    let json = serde_json::to_vec(&metadata)
        .map_err(|e| DecodeError::Malformed(format!("metadata: {}", e)))?;
    plain.extend_from_slice(&json);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&plain)
        .and_then(|_| encoder.flush())
        .map_err(|e| DecodeError::Malformed(format!("zlib: {}", e)))?;
    let mut bytes = encoder
        .finish()
        .map_err(|e| DecodeError::Malformed(format!("zlib: {}", e)))?;

    if let Some(key) = key {
        bytes = crypto::encrypt(&bytes, key, iv)?;
    }
    Ok(BASE64.encode(bytes))
}
