//! Initial frames: build a map from scratch.

use super::splice::splice_grids;
use super::{MapBuilder, apply_metadata, apply_segment_metadata, check_flags, preserve_edits};
use crate::codec::{self, FrameType, PartialFrame, parse_path};
use crate::core::{Pixel, PixelCodec};
use crate::error::Result;
use crate::map::{MapState, PixelGrid, extract_segments};

/// Build a map from an Initial frame.
///
/// Metadata keys the frame omits are carried over from `prev` only when the
/// frame restores or recovers the same map; otherwise they start empty.
/// With `allow_embedded`, a saved map carried in `rism` is decoded and
/// spliced underneath the live pixels.
pub(super) fn build(
    builder: &MapBuilder,
    prev: Option<&MapState>,
    frame: &PartialFrame,
    allow_embedded: bool,
) -> Result<MapState> {
    let meta = &frame.metadata;
    if !check_flags(meta, builder.vslam)
        && let Some(prev) = prev
    {
        return Ok(prev.clone());
    }

    let same_map = prev.filter(|p| p.map_id == frame.map_id);
    let keep_previous = same_map.filter(|_| meta.is_restored() || meta.is_recovery());

    let codec = PixelCodec::select(meta.fsm, meta.ris, builder.vslam);
    let mut dimensions = frame.dimensions;
    let mut grid = PixelGrid::from_raw(
        dimensions.width,
        dimensions.height,
        &frame.raw_bitmap,
        codec,
    );

    let saved = match meta.rism.as_deref() {
        Some(rism) if allow_embedded => decode_embedded(builder, rism),
        _ => None,
    };
    if let Some(saved) = &saved {
        match splice_grids(saved, &grid, &dimensions) {
            Some((spliced, union)) => {
                grid = spliced;
                dimensions = union;
            }
            None => log::warn!(
                "Embedded saved map {} does not align with live map {}, not spliced",
                saved.map_id,
                frame.map_id
            ),
        }
    }

    let mut state = MapState {
        map_id: frame.map_id,
        frame_id: frame.frame_id,
        timestamp_ms: frame.timestamp_ms.unwrap_or(0),
        dimensions,
        pixel_grid: grid,
        pixel_codec: codec,
        robot_position: Some(frame.robot),
        charger_position: Some(frame.charger),
        ..Default::default()
    };
    state.recompute_carpet_pixels();
    state.segments = extract_segments(&state.pixel_grid, &state.dimensions);

    let carry: Vec<&MapState> = keep_previous.into_iter().chain(saved.as_ref()).collect();
    apply_segment_metadata(&mut state.segments, meta, &carry);
    apply_metadata(&mut state, meta, keep_previous.or(saved.as_ref()));

    state.path = meta.tr.as_deref().map(parse_path).unwrap_or_default();
    state.saved_map_status = meta
        .ris
        .or_else(|| keep_previous.and_then(|p| p.saved_map_status));
    state.temporary_map = meta.is_temporary();
    state.restored_map = meta.is_restored() || saved.is_some();
    state.recovery_map = meta.is_recovery();
    state.empty_map = state.pixel_grid.iter().all(|(_, p)| p == Pixel::OUTSIDE);

    if let Some(prev) = same_map {
        state.name = prev.name.clone();
        state.last_edited_frame_id = prev.last_edited_frame_id;
        if prev.edited_since(frame.frame_id) {
            preserve_edits(&mut state, prev);
        }
    }

    log::debug!(
        "Built map {}/{}: {}x{} px, {} segments, codec {:?}",
        state.map_id,
        state.frame_id,
        state.dimensions.width,
        state.dimensions.height,
        state.segments.len(),
        codec
    );
    Ok(state)
}

/// Decode a saved map embedded in an Initial frame (one level deep)
fn decode_embedded(builder: &MapBuilder, rism: &str) -> Option<MapState> {
    let frame = match codec::decode(rism, builder.iv.as_deref(), builder.key.as_deref()) {
        Ok(frame) => frame,
        Err(e) => {
            log::warn!("Embedded saved map could not be decoded: {}", e);
            return None;
        }
    };
    if frame.frame_type != FrameType::Initial {
        log::warn!(
            "Embedded saved map has frame type {:?}, expected Initial",
            frame.frame_type
        );
        return None;
    }
    match build(builder, None, &frame, false) {
        Ok(mut saved) => {
            saved.saved_map = true;
            Some(saved)
        }
        Err(e) => {
            log::warn!("Embedded saved map could not be built: {}", e);
            None
        }
    }
}

/// Build a standalone wifi map.
///
/// Wifi pixels carry signal strength, so no segments are extracted.
pub(super) fn build_wifi(frame: &PartialFrame) -> MapState {
    let dimensions = frame.dimensions;
    let grid = PixelGrid::from_raw(
        dimensions.width,
        dimensions.height,
        &frame.raw_bitmap,
        PixelCodec::StandardBits,
    );
    MapState {
        map_id: frame.map_id,
        frame_id: frame.frame_id,
        timestamp_ms: frame.timestamp_ms.unwrap_or(0),
        dimensions,
        empty_map: grid.raw_bytes().iter().all(|b| *b == 0),
        pixel_grid: grid,
        robot_position: Some(frame.robot),
        charger_position: Some(frame.charger),
        wifi_map: true,
        ..Default::default()
    }
}
