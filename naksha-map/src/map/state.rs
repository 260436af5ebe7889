//! Reconstructed map state.

use super::grid::PixelGrid;
use super::objects::{Furniture, Obstacle, PathPoint};
use super::segment::{CleaningSettings, FloorMaterial, Segment};
use crate::core::{Area, Dimensions, GridCoord, Line, MAX_SEGMENT_ID, Pixel, PixelCodec, Point, Pose};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// User-drawn and detected zones, all in world coordinates
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Zones {
    pub no_go_areas: Vec<Area>,
    pub no_mopping_areas: Vec<Area>,
    pub active_areas: Vec<Area>,
    pub virtual_walls: Vec<Line>,
    pub thresholds: Vec<Line>,
    pub ramps: Vec<Line>,
    pub curtains: Vec<Line>,
    /// Carpet rectangles reported by the device
    pub carpets: Vec<Area>,
}

/// One device map, as reconstructed from its frames.
///
/// Contains no wall-clock data, so two states built from the same frames
/// compare equal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapState {
    pub map_id: u32,
    pub frame_id: u32,
    pub timestamp_ms: u64,
    pub dimensions: Dimensions,
    pub pixel_grid: PixelGrid,
    /// Layout the raw bytes of `pixel_grid` were decoded with
    pub pixel_codec: PixelCodec,
    /// Grid coordinates of carpeted pixels
    pub carpet_pixels: BTreeSet<GridCoord>,
    pub segments: BTreeMap<u8, Segment>,
    pub robot_position: Option<Pose>,
    pub charger_position: Option<Pose>,
    pub zones: Zones,
    /// Segments selected for the next cleaning run
    pub active_segments: Vec<u8>,
    pub obstacles: BTreeMap<u32, Obstacle>,
    pub furniture: BTreeMap<u32, Furniture>,
    /// Path since the last Initial frame
    pub path: Vec<PathPoint>,
    /// Display rotation in degrees
    pub rotation: i32,
    /// Raw `ris` value of the last frame that carried one
    pub saved_map_status: Option<i64>,
    /// Display name, for maps from the saved map list
    pub name: Option<String>,
    pub saved_map: bool,
    pub temporary_map: bool,
    pub restored_map: bool,
    pub recovery_map: bool,
    pub empty_map: bool,
    pub wifi_map: bool,
    /// Device was cleaning when the last frame was produced
    pub cleaning: bool,
    /// Frame id current when the user last edited this map
    pub last_edited_frame_id: Option<u32>,
}

impl MapState {
    /// Pixel at a world position
    pub fn pixel_at(&self, point: Point) -> Pixel {
        self.pixel_grid.get(self.dimensions.to_grid(point))
    }

    /// Segment containing a world position
    pub fn segment_at(&self, point: Point) -> Option<&Segment> {
        self.pixel_at(point)
            .segment_id()
            .and_then(|id| self.segments.get(&id))
    }

    /// Lowest segment id not in use
    pub fn next_free_segment_id(&self) -> Option<u8> {
        (1..=MAX_SEGMENT_ID).find(|id| !self.segments.contains_key(id))
    }

    /// Rebuild the carpet pixel set from the grid
    pub fn recompute_carpet_pixels(&mut self) {
        self.carpet_pixels = self
            .pixel_grid
            .iter()
            .filter(|(_, p)| p.is_carpet())
            .map(|(c, _)| c)
            .collect();
    }

    /// Was the map edited locally at or after this frame?
    pub fn edited_since(&self, frame_id: u32) -> bool {
        self.last_edited_frame_id.is_some_and(|w| frame_id <= w)
    }

    /// Serializable overview of the map
    pub fn summary(&self) -> MapSummary {
        MapSummary {
            map_id: self.map_id,
            frame_id: self.frame_id,
            timestamp_ms: self.timestamp_ms,
            dimensions: self.dimensions,
            robot_position: self.robot_position,
            charger_position: self.charger_position,
            segments: self
                .segments
                .values()
                .map(|s| SegmentSummary {
                    id: s.id,
                    name: s.name.clone(),
                    center: s.center,
                    color_index: s.color_index,
                    neighbors: s.neighbors.iter().copied().collect(),
                    visible: s.visible,
                    floor_material: s.floor_material,
                    cleaning: s.cleaning,
                })
                .collect(),
            active_segments: self.active_segments.clone(),
            zones: self.zones.clone(),
            obstacle_count: self.obstacles.len(),
            furniture_count: self.furniture.len(),
            path_points: self.path.len(),
            carpet_pixels: self.carpet_pixels.len(),
            rotation: self.rotation,
            saved_map: self.saved_map,
            temporary_map: self.temporary_map,
            restored_map: self.restored_map,
            recovery_map: self.recovery_map,
            empty_map: self.empty_map,
            wifi_map: self.wifi_map,
        }
    }
}

/// Per-segment part of [`MapSummary`]
#[derive(Clone, Debug, Serialize)]
pub struct SegmentSummary {
    pub id: u8,
    pub name: String,
    pub center: Point,
    pub color_index: u8,
    pub neighbors: Vec<u8>,
    pub visible: bool,
    pub floor_material: FloorMaterial,
    pub cleaning: Option<CleaningSettings>,
}

/// Compact JSON-friendly view of a [`MapState`]
#[derive(Clone, Debug, Serialize)]
pub struct MapSummary {
    pub map_id: u32,
    pub frame_id: u32,
    pub timestamp_ms: u64,
    pub dimensions: Dimensions,
    pub robot_position: Option<Pose>,
    pub charger_position: Option<Pose>,
    pub segments: Vec<SegmentSummary>,
    pub active_segments: Vec<u8>,
    pub zones: Zones,
    pub obstacle_count: usize,
    pub furniture_count: usize,
    pub path_points: usize,
    pub carpet_pixels: usize,
    pub rotation: i32,
    pub saved_map: bool,
    pub temporary_map: bool,
    pub restored_map: bool,
    pub recovery_map: bool,
    pub empty_map: bool,
    pub wifi_map: bool,
}
