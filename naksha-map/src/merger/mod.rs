//! Frame merger: folds decoded frames into [`MapState`].
//!
//! - **Initial** frames rebuild the map from scratch ([`initial`]), splicing
//!   in an embedded saved map when one is present ([`splice`]).
//! - **Partial** frames patch the previous state ([`partial`]).
//! - **Wifi** frames build a standalone wifi map.
//!
//! Merging is a pure function of `(prev, frame)`: no clocks, no I/O.

mod initial;
mod partial;
mod splice;

pub use splice::splice_grids;

use crate::codec::{FrameMetadata, FrameType, NumberList, PartialFrame};
use crate::core::{Area, Line};
use crate::error::Result;
use crate::map::{CleaningSettings, Furniture, MapState, Obstacle, Segment, assign_colors};
use std::collections::{BTreeMap, BTreeSet};

/// Merge parameters fixed per device
#[derive(Clone, Debug, Default)]
pub struct MapBuilder {
    /// Vision-SLAM device
    pub vslam: bool,
    /// Vendor key for embedded saved maps
    pub key: Option<String>,
    /// AES IV for embedded saved maps
    pub iv: Option<String>,
}

impl MapBuilder {
    pub fn new(vslam: bool) -> Self {
        Self {
            vslam,
            ..Default::default()
        }
    }

    /// Set the frame encryption key and IV
    pub fn with_encryption(mut self, key: Option<String>, iv: Option<String>) -> Self {
        self.key = key;
        self.iv = iv;
        self
    }

    /// Fold one frame into the previous state
    pub fn merge(&self, prev: Option<&MapState>, frame: &PartialFrame) -> Result<MapState> {
        match frame.frame_type {
            FrameType::Initial => initial::build(self, prev, frame, true),
            FrameType::Wifi => Ok(initial::build_wifi(frame)),
            FrameType::Partial => partial::apply(self, prev, frame),
        }
    }
}

/// Fold one frame into the previous state with default encryption settings
pub fn merge(prev: Option<&MapState>, frame: &PartialFrame, vslam: bool) -> Result<MapState> {
    MapBuilder::new(vslam).merge(prev, frame)
}

fn rects(entries: &[NumberList]) -> Vec<Area> {
    entries.iter().filter_map(|e| e.rect()).map(Area::from_rect).collect()
}

fn lines(entries: &[NumberList]) -> Vec<Line> {
    entries.iter().filter_map(|e| e.rect()).map(Line::from_array).collect()
}

/// Replace `target` with the metadata value when present, otherwise with the
/// carried value (or empty when nothing is carried).
fn merge_field<T: Clone + Default>(target: &mut T, value: Option<T>, carry: Option<&T>) {
    *target = match value {
        Some(v) => v,
        None => carry.cloned().unwrap_or_default(),
    };
}

/// Zones, obstacles, furniture and other optional metadata.
///
/// `carry` supplies values for keys the frame omits; `None` clears them.
fn apply_metadata(state: &mut MapState, meta: &FrameMetadata, carry: Option<&MapState>) {
    let vw = meta.vw.as_ref();
    merge_field(
        &mut state.zones.virtual_walls,
        vw.and_then(|v| v.line.as_deref()).map(lines),
        carry.map(|c| &c.zones.virtual_walls),
    );
    merge_field(
        &mut state.zones.no_go_areas,
        vw.and_then(|v| v.rect.as_deref()).map(rects),
        carry.map(|c| &c.zones.no_go_areas),
    );
    merge_field(
        &mut state.zones.no_mopping_areas,
        vw.and_then(|v| v.mop.as_deref()).map(rects),
        carry.map(|c| &c.zones.no_mopping_areas),
    );
    merge_field(
        &mut state.zones.active_areas,
        meta.da2.as_ref().and_then(|d| d.areas.as_deref()).map(rects),
        carry.map(|c| &c.zones.active_areas),
    );

    let vws = meta.vws.as_ref();
    merge_field(
        &mut state.zones.thresholds,
        vws.and_then(|v| v.vwsl.as_deref()).map(lines),
        carry.map(|c| &c.zones.thresholds),
    );
    merge_field(
        &mut state.zones.ramps,
        vws.and_then(|v| v.ramp.as_deref()).map(lines),
        carry.map(|c| &c.zones.ramps),
    );
    merge_field(
        &mut state.zones.curtains,
        vws.and_then(|v| v.curtain.as_deref()).map(lines),
        carry.map(|c| &c.zones.curtains),
    );
    merge_field(
        &mut state.zones.carpets,
        meta.carpet_info.as_deref().map(rects),
        carry.map(|c| &c.zones.carpets),
    );

    merge_field(
        &mut state.active_segments,
        meta.sa.as_ref().map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.int(0))
                .filter(|id| (1..=62).contains(id))
                .map(|id| id as u8)
                .collect()
        }),
        carry.map(|c| &c.active_segments),
    );

    merge_field(
        &mut state.obstacles,
        meta.ai_obstacle.as_ref().map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(i, e)| Obstacle::from_meta(e, i))
                .map(|o| (o.id, o))
                .collect::<BTreeMap<_, _>>()
        }),
        carry.map(|c| &c.obstacles),
    );
    merge_field(
        &mut state.furniture,
        meta.ai_furniture.as_ref().map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(i, e)| Furniture::from_meta(e, i))
                .map(|f| (f.id, f))
                .collect::<BTreeMap<_, _>>()
        }),
        carry.map(|c| &c.furniture),
    );

    merge_field(&mut state.rotation, meta.mra, carry.map(|c| &c.rotation));
    state.cleaning = meta
        .is_cleaning()
        .unwrap_or_else(|| carry.is_some_and(|c| c.cleaning));
}

/// Apply `seg_inf` and `cleanset`, inheriting attributes from `carry` first.
fn apply_segment_metadata(
    segments: &mut BTreeMap<u8, Segment>,
    meta: &FrameMetadata,
    carry: &[&MapState],
) {
    let ids: BTreeSet<u8> = segments.keys().copied().collect();
    let mut carried_neighbors = false;
    for (id, segment) in segments.iter_mut() {
        if let Some(prev) = carry.iter().find_map(|c| c.segments.get(id)) {
            segment.inherit(prev);
            // Reported adjacency outlives a pixel rebuild until seg_inf is resent
            if prev.reported_neighbors {
                segment.neighbors = prev.neighbors.intersection(&ids).copied().collect();
                segment.reported_neighbors = true;
                carried_neighbors = true;
            }
        }
        let key = id.to_string();
        if let Some(info) = meta.seg_inf.as_ref().and_then(|m| m.get(&key)) {
            segment.apply_info(info);
        }
        if let Some(entry) = meta.cleanset.as_ref().and_then(|m| m.get(&key)) {
            segment.cleaning = Some(CleaningSettings::from_meta(entry));
        }
        segment.refresh_name();
    }
    if meta.seg_inf.is_some() || carried_neighbors {
        assign_colors(segments);
    }
}

/// Put back fields the user edited after the device produced this frame.
///
/// Only device-owned data (pose, pixels, path, detections) comes from a
/// frame the local edits are newer than.
fn preserve_edits(state: &mut MapState, prev: &MapState) {
    for (id, segment) in state.segments.iter_mut() {
        if let Some(p) = prev.segments.get(id) {
            segment.custom_name = p.custom_name.clone();
            segment.room_type = p.room_type;
            segment.index = p.index;
            segment.visible = p.visible;
            segment.cleaning = p.cleaning;
            segment.refresh_name();
        }
    }
    state.zones.no_go_areas = prev.zones.no_go_areas.clone();
    state.zones.no_mopping_areas = prev.zones.no_mopping_areas.clone();
    state.zones.active_areas = prev.zones.active_areas.clone();
    state.zones.virtual_walls = prev.zones.virtual_walls.clone();
    state.active_segments = prev.active_segments.clone();
    state.rotation = prev.rotation;
    for obstacle in state.obstacles.values_mut() {
        if let Some(p) = prev.obstacles.get(&obstacle.id) {
            obstacle.ignored = p.ignored;
        }
    }
}

/// Log metadata combinations the pixel codec selection does not expect.
///
/// Returns false when the frame's `ris` should not replace the previous one.
fn check_flags(meta: &FrameMetadata, vslam: bool) -> bool {
    match (meta.ris, vslam) {
        (Some(ris), _) if !(0..=2).contains(&ris) => {
            log::warn!("Unexpected saved map status {} (vslam={}), keeping previous", ris, vslam);
            false
        }
        (Some(ris @ (0 | 1)), true) => {
            log::warn!("Saved map status {} on a vslam device, legacy layout ignored", ris);
            true
        }
        _ => true,
    }
}
