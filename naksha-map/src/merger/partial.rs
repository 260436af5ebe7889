//! Partial frames: patch the previous map with a delta.
//!
//! The delta covers a sub-rectangle of the map, possibly extending past the
//! previous bounds. Each delta byte is added (wrapping) to the raw byte below
//! it; a zero byte means "unchanged".

use super::{MapBuilder, apply_metadata, apply_segment_metadata, preserve_edits};
use crate::codec::{PartialFrame, parse_path};
use crate::core::{GridCoord, PixelCodec};
use crate::error::{DecodeError, Error, Result};
use crate::map::{MapState, extract_segments};
use std::collections::BTreeSet;

pub(super) fn apply(
    builder: &MapBuilder,
    prev: Option<&MapState>,
    frame: &PartialFrame,
) -> Result<MapState> {
    let prev = match prev {
        Some(prev) if prev.map_id == frame.map_id => prev,
        _ => {
            return Err(Error::MissingBaseMap {
                map_id: frame.map_id,
                frame_id: frame.frame_id,
            });
        }
    };
    if frame.frame_id <= prev.frame_id {
        log::debug!(
            "Partial frame {}/{} already applied (at {})",
            frame.map_id,
            frame.frame_id,
            prev.frame_id
        );
        return Ok(prev.clone());
    }

    let delta_dims = frame.dimensions;
    let has_pixels = delta_dims.cell_count() > 0;
    if has_pixels && delta_dims.grid_size != prev.dimensions.grid_size {
        return Err(DecodeError::UnsupportedFrameShape(format!(
            "partial grid size {} does not match map grid size {}",
            delta_dims.grid_size, prev.dimensions.grid_size
        ))
        .into());
    }

    let meta = &frame.metadata;
    let codec = if meta.fsm == Some(1) {
        PixelCodec::FrameMapBits
    } else if builder.vslam {
        PixelCodec::StandardBits
    } else if meta.ris.is_some() {
        PixelCodec::select(meta.fsm, meta.ris, false)
    } else {
        prev.pixel_codec
    };

    let mut state = prev.clone();
    state.frame_id = frame.frame_id;
    if let Some(ts) = frame.timestamp_ms {
        state.timestamp_ms = ts;
    }
    state.pixel_codec = codec;
    state.robot_position = Some(frame.robot);
    state.charger_position = Some(frame.charger);

    if has_pixels {
        let union = prev.dimensions.union(&delta_dims).ok_or_else(|| {
            DecodeError::UnsupportedFrameShape(format!(
                "partial frame at ({}, {}) is not aligned with the map grid",
                delta_dims.left, delta_dims.top
            ))
        })?;
        let prev_offset = union.offset_of(&prev.dimensions).unwrap_or_default();
        let delta_offset = union.offset_of(&delta_dims).unwrap_or_default();

        if union != prev.dimensions {
            log::debug!(
                "Map {} resized from {}x{} to {}x{}",
                prev.map_id,
                prev.dimensions.width,
                prev.dimensions.height,
                union.width,
                union.height
            );
            state.pixel_grid = prev
                .pixel_grid
                .reallocated(union.width, union.height, prev_offset);
            state.carpet_pixels = prev.carpet_pixels.iter().map(|c| *c + prev_offset).collect();
            state.dimensions = union;
        }

        let mut touched = BTreeSet::new();
        let width = delta_dims.width as usize;
        for (i, delta) in frame.raw_bitmap.iter().enumerate() {
            if *delta == 0 {
                continue;
            }
            let coord = GridCoord::new((i % width) as i32, (i / width) as i32) + delta_offset;
            let byte = state.pixel_grid.raw(coord).wrapping_add(*delta);
            if state.pixel_grid.set_raw(coord, byte, codec) {
                touched.insert(coord);
            }
        }
        for coord in &touched {
            if state.pixel_grid.get(*coord).is_carpet() {
                state.carpet_pixels.insert(*coord);
            } else {
                state.carpet_pixels.remove(coord);
            }
        }

        if !touched.is_empty() {
            state.segments = extract_segments(&state.pixel_grid, &state.dimensions);
            apply_segment_metadata(&mut state.segments, meta, &[prev]);
        }
        state.empty_map = false;
    } else if meta.seg_inf.is_some() || meta.cleanset.is_some() {
        apply_segment_metadata(&mut state.segments, meta, &[]);
    }

    apply_metadata(&mut state, meta, Some(prev));
    if let Some(tr) = meta.tr.as_deref() {
        state.path.extend(parse_path(tr));
    }
    if prev.edited_since(frame.frame_id) {
        preserve_edits(&mut state, prev);
    }

    log::trace!(
        "Applied partial {}/{} over {}",
        frame.map_id,
        frame.frame_id,
        prev.frame_id
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FrameMetadata, FrameType};
    use crate::core::{Dimensions, Pixel, Pose};
    use crate::map::PixelGrid;

    fn base() -> MapState {
        let dims = Dimensions::new(0, 0, 2, 2, 50);
        let grid = PixelGrid::from_raw(2, 2, &[1, 1, 1, 63], PixelCodec::StandardBits);
        MapState {
            map_id: 1,
            frame_id: 5,
            segments: extract_segments(&grid, &dims),
            dimensions: dims,
            pixel_grid: grid,
            ..Default::default()
        }
    }

    fn delta(frame_id: u32, dims: Dimensions, bitmap: Vec<u8>) -> PartialFrame {
        PartialFrame {
            map_id: 1,
            frame_id,
            frame_type: FrameType::Partial,
            robot: Pose::new(10, 10, 0),
            charger: Pose::default(),
            dimensions: dims,
            raw_bitmap: bitmap,
            metadata: FrameMetadata::default(),
            timestamp_ms: None,
        }
    }

    #[test]
    fn test_additive_delta() {
        // 1 + 1 = segment 2 at (0, 0)
        let f = delta(6, Dimensions::new(0, 0, 1, 1, 50), vec![1]);
        let state = apply(&MapBuilder::default(), Some(&base()), &f).unwrap();
        assert_eq!(state.pixel_grid.get(GridCoord::new(0, 0)), Pixel(2));
        assert_eq!(state.pixel_grid.get(GridCoord::new(1, 0)), Pixel(1));
        assert!(state.segments.contains_key(&2));
        assert_eq!(state.frame_id, 6);
    }

    #[test]
    fn test_wrapping_delta() {
        // 63 + 0xC2 wraps to 0x01
        let f = delta(6, Dimensions::new(50, 50, 1, 1, 50), vec![0xC2]);
        let state = apply(&MapBuilder::default(), Some(&base()), &f).unwrap();
        assert_eq!(state.pixel_grid.raw(GridCoord::new(1, 1)), 0x01);
    }

    #[test]
    fn test_requires_base() {
        let f = delta(6, Dimensions::new(0, 0, 1, 1, 50), vec![1]);
        assert!(matches!(
            apply(&MapBuilder::default(), None, &f),
            Err(Error::MissingBaseMap { map_id: 1, frame_id: 6 })
        ));
    }

    #[test]
    fn test_grid_size_mismatch() {
        let f = delta(6, Dimensions::new(0, 0, 1, 1, 25), vec![1]);
        assert!(matches!(
            apply(&MapBuilder::default(), Some(&base()), &f),
            Err(Error::Decode(DecodeError::UnsupportedFrameShape(_)))
        ));
    }

    #[test]
    fn test_already_applied_is_noop() {
        let prev = base();
        let f = delta(5, Dimensions::new(0, 0, 1, 1, 50), vec![1]);
        assert_eq!(apply(&MapBuilder::default(), Some(&prev), &f).unwrap(), prev);
    }

    #[test]
    fn test_carpet_set_follows_resize() {
        let mut prev = base();
        prev.pixel_grid = PixelGrid::from_raw(2, 2, &[1 | 0x40, 1, 1, 63], PixelCodec::StandardBits);
        prev.recompute_carpet_pixels();
        // Extend one column to the left and carpet the new pixel
        let f = delta(6, Dimensions::new(-50, 0, 1, 1, 50), vec![2 | 0x40]);
        let state = apply(&MapBuilder::default(), Some(&prev), &f).unwrap();
        assert_eq!(state.dimensions, Dimensions::new(-50, 0, 3, 2, 50));
        assert_eq!(
            state.carpet_pixels,
            BTreeSet::from([GridCoord::new(0, 0), GridCoord::new(1, 0)])
        );
        let mut expected = state.clone();
        expected.recompute_carpet_pixels();
        assert_eq!(state.carpet_pixels, expected.carpet_pixels);
    }
}
