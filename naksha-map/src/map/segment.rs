//! Segments (rooms): extraction from the pixel grid and derived fields.

use super::grid::PixelGrid;
use crate::codec::{NumberList, SegmentInfoMeta};
use crate::core::{Bounds, Dimensions, GridCoord, MAX_SEGMENT_ID, PixelClass, Point};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default room names by type code
const ROOM_TYPE_NAMES: [&str; 16] = [
    "Room",
    "Living Room",
    "Primary Bedroom",
    "Study",
    "Kitchen",
    "Dining Hall",
    "Bathroom",
    "Balcony",
    "Corridor",
    "Utility Room",
    "Closet",
    "Meeting Room",
    "Office",
    "Fitness Area",
    "Recreation Area",
    "Secondary Bedroom",
];

/// Palette size targeted by color assignment
pub const PALETTE_SIZE: u8 = 4;

/// Default name for a room type
pub fn room_type_name(room_type: u8) -> &'static str {
    ROOM_TYPE_NAMES
        .get(room_type as usize)
        .copied()
        .unwrap_or(ROOM_TYPE_NAMES[0])
}

/// Segment floor material
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloorMaterial {
    #[default]
    Unspecified,
    Tile,
    Wood,
    Carpet,
}

impl FloorMaterial {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => FloorMaterial::Tile,
            2 => FloorMaterial::Wood,
            3 => FloorMaterial::Carpet,
            _ => FloorMaterial::Unspecified,
        }
    }
}

/// Per-segment cleaning settings, the device's `cleanset` entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningSettings {
    /// 0 quiet .. 3 max
    pub suction_level: u8,
    /// 1 low .. 3 high
    pub water_volume: u8,
    /// 1..=3 passes
    pub cleaning_times: u8,
    /// Position in the cleaning sequence, 0 when unordered
    pub order: u32,
    /// Sweep/mop mode, on devices that report one
    pub mode: Option<u8>,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            suction_level: 1,
            water_volume: 3,
            cleaning_times: 1,
            order: 0,
            mode: None,
        }
    }
}

impl CleaningSettings {
    /// Parse `[suction, water, repeats, order, (mode)]`, filling gaps with defaults
    pub fn from_meta(entry: &NumberList) -> Self {
        let d = Self::default();
        Self {
            suction_level: entry.int(0).map(|v| v as u8).unwrap_or(d.suction_level),
            water_volume: entry.int(1).map(|v| v as u8).unwrap_or(d.water_volume),
            cleaning_times: entry.int(2).map(|v| v as u8).unwrap_or(d.cleaning_times),
            order: entry.int(3).map(|v| v.max(0) as u32).unwrap_or(d.order),
            mode: entry.int(4).map(|v| v as u8),
        }
    }

    /// Device array encoding
    pub fn to_array(&self) -> Vec<u32> {
        let mut out = vec![
            self.suction_level as u32,
            self.water_volume as u32,
            self.cleaning_times as u32,
            self.order,
        ];
        if let Some(mode) = self.mode {
            out.push(mode as u32);
        }
        out
    }
}

/// One room
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Pixel value, `1..=62`
    pub id: u8,
    /// World bounds of the segment's pixel centers
    pub bounding_box: Bounds,
    /// Label anchor, always on a segment pixel
    pub center: Point,
    /// Display name, derived from type/index unless customized
    pub name: String,
    /// User-given name
    pub custom_name: Option<String>,
    /// Room type code
    pub room_type: u8,
    /// Suffix for repeated room types
    pub index: u32,
    pub visible: bool,
    pub color_index: u8,
    pub neighbors: BTreeSet<u8>,
    /// `neighbors` came from the device (`seg_inf.nei_id`), not the bitmap
    #[serde(default)]
    pub reported_neighbors: bool,
    /// `None` until the device reports or the user edits settings
    pub cleaning: Option<CleaningSettings>,
    pub floor_material: FloorMaterial,
    pub pixel_count: usize,
    pub carpet_pixel_count: usize,
}

impl Segment {
    fn new(id: u8) -> Self {
        Self {
            id,
            bounding_box: Bounds::default(),
            center: Point::default(),
            name: String::new(),
            custom_name: None,
            room_type: 0,
            index: 0,
            visible: true,
            color_index: 0,
            neighbors: BTreeSet::new(),
            reported_neighbors: false,
            cleaning: None,
            floor_material: FloorMaterial::Unspecified,
            pixel_count: 0,
            carpet_pixel_count: 0,
        }
    }

    /// Position in the cleaning sequence (`None` when unordered)
    pub fn order(&self) -> Option<u32> {
        self.cleaning.map(|c| c.order).filter(|o| *o > 0)
    }

    /// Cleaning settings, creating the default entry on first use
    pub fn cleaning_mut(&mut self) -> &mut CleaningSettings {
        self.cleaning.get_or_insert_with(CleaningSettings::default)
    }

    /// Apply a `seg_inf` entry
    pub fn apply_info(&mut self, info: &SegmentInfoMeta) {
        if let Some(room_type) = info.room_type {
            self.room_type = room_type;
        }
        if let Some(index) = info.index {
            self.index = index;
        }
        if let Some(visible) = info.visible {
            self.visible = visible != 0;
        }
        if let Some(name) = &info.name {
            self.custom_name = decode_name(name);
        }
        if let Some(material) = info.material {
            self.floor_material = FloorMaterial::from_code(material);
        }
        if let Some(neighbors) = &info.nei_id {
            self.neighbors = neighbors
                .iter()
                .copied()
                .filter(|n| *n != self.id && (1..=MAX_SEGMENT_ID).contains(n))
                .collect();
            self.reported_neighbors = true;
        }
    }

    /// Copy user-facing attributes from an earlier version of this segment
    pub fn inherit(&mut self, prev: &Segment) {
        self.custom_name = prev.custom_name.clone();
        self.room_type = prev.room_type;
        self.index = prev.index;
        self.visible = prev.visible;
        self.cleaning = prev.cleaning;
        if prev.floor_material != FloorMaterial::Unspecified {
            self.floor_material = prev.floor_material;
        }
    }

    /// Recompute `name` from custom name, type and index
    pub fn refresh_name(&mut self) {
        self.name = match &self.custom_name {
            Some(custom) if !custom.is_empty() => custom.clone(),
            _ if self.room_type == 0 => format!("{} {}", room_type_name(0), self.id),
            _ if self.index > 0 => format!("{} {}", room_type_name(self.room_type), self.index),
            _ => room_type_name(self.room_type).to_string(),
        };
    }

    /// Carpet when no material is reported and most pixels are carpeted
    fn infer_material(&mut self) {
        if self.floor_material == FloorMaterial::Unspecified
            && self.carpet_pixel_count * 2 > self.pixel_count
        {
            self.floor_material = FloorMaterial::Carpet;
        }
    }
}

fn decode_name(encoded: &str) -> Option<String> {
    if encoded.is_empty() {
        return None;
    }
    match BASE64.decode(encoded.trim()) {
        Ok(bytes) => String::from_utf8(bytes).ok().filter(|s| !s.is_empty()),
        Err(_) => {
            log::debug!("Segment name is not base64: {:?}", encoded);
            None
        }
    }
}

/// Encode a custom name the way the device stores it
pub fn encode_name(name: &str) -> String {
    BASE64.encode(name.as_bytes())
}

struct Extent {
    min: GridCoord,
    max: GridCoord,
    pixels: usize,
    carpet: usize,
}

/// Scan the grid and build one segment per pixel value.
///
/// Geometry, pixel counts, neighbors (from the bitmap) and colors are
/// filled in; names and settings are left at their defaults.
pub fn extract_segments(grid: &PixelGrid, dims: &Dimensions) -> BTreeMap<u8, Segment> {
    let mut extents: BTreeMap<u8, Extent> = BTreeMap::new();
    for (coord, pixel) in grid.iter() {
        let Some(id) = pixel.segment_id() else {
            continue;
        };
        let e = extents.entry(id).or_insert(Extent {
            min: coord,
            max: coord,
            pixels: 0,
            carpet: 0,
        });
        e.min.x = e.min.x.min(coord.x);
        e.min.y = e.min.y.min(coord.y);
        e.max.x = e.max.x.max(coord.x);
        e.max.y = e.max.y.max(coord.y);
        e.pixels += 1;
        if pixel.is_carpet() {
            e.carpet += 1;
        }
    }

    let adjacency = bitmap_neighbors(grid);
    let mut segments: BTreeMap<u8, Segment> = extents
        .into_iter()
        .map(|(id, e)| {
            let mut segment = Segment::new(id);
            segment.bounding_box = Bounds::new(dims.to_world(e.min), dims.to_world(e.max));
            segment.center = dims.to_world(segment_center(grid, id, e.min, e.max));
            segment.pixel_count = e.pixels;
            segment.carpet_pixel_count = e.carpet;
            segment.neighbors = adjacency.get(&id).cloned().unwrap_or_default();
            segment.infer_material();
            segment.refresh_name();
            (id, segment)
        })
        .collect();
    assign_colors(&mut segments);
    segments
}

/// Midpoint of the longest run of `id` pixels along a row.
///
/// Rows strictly inside the segment's extent are preferred so the anchor
/// does not sit on an edge; ties go to the topmost, then leftmost, run.
fn segment_center(grid: &PixelGrid, id: u8, min: GridCoord, max: GridCoord) -> GridCoord {
    let interior = max.y - min.y >= 2;
    let mut best: Option<(bool, i32, GridCoord)> = None;

    for y in min.y..=max.y {
        let inner = !interior || (y > min.y && y < max.y);
        let mut x = min.x;
        while x <= max.x {
            if grid.get(GridCoord::new(x, y)).segment_id() != Some(id) {
                x += 1;
                continue;
            }
            let start = x;
            while x <= max.x && grid.get(GridCoord::new(x, y)).segment_id() == Some(id) {
                x += 1;
            }
            let len = x - start;
            let candidate = (inner, len, GridCoord::new(start + (len - 1) / 2, y));
            let better = match best {
                None => true,
                Some((b_inner, b_len, _)) => (inner, len) > (b_inner, b_len),
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best.map(|(_, _, c)| c).unwrap_or(min)
}

/// Segments touching each other or separated by one non-floor pixel
pub fn bitmap_neighbors(grid: &PixelGrid) -> BTreeMap<u8, BTreeSet<u8>> {
    let mut adjacency: BTreeMap<u8, BTreeSet<u8>> = BTreeMap::new();
    let mut link = |a: u8, b: u8| {
        if a != b {
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }
    };

    for (coord, pixel) in grid.iter() {
        let Some(id) = pixel.segment_id() else {
            continue;
        };
        for step in [GridCoord::new(1, 0), GridCoord::new(0, 1)] {
            let next = grid.get(coord + step);
            match next.class() {
                PixelClass::Segment(other) => link(id, other),
                PixelClass::Wall | PixelClass::Outside | PixelClass::Unknown => {
                    if let Some(other) = grid.get(coord + step + step).segment_id() {
                        link(id, other);
                    }
                }
                PixelClass::Floor => {}
            }
        }
    }
    adjacency
}

/// Greedy coloring in ascending id order.
///
/// Each segment takes the lowest palette index unused by its already
/// colored neighbors; more than [`PALETTE_SIZE`] indices are used only when
/// the neighborhood forces it.
pub fn assign_colors(segments: &mut BTreeMap<u8, Segment>) {
    let mut colors: BTreeMap<u8, u8> = BTreeMap::new();
    for (id, segment) in segments.iter() {
        let used: BTreeSet<u8> = segment
            .neighbors
            .iter()
            .filter_map(|n| colors.get(n).copied())
            .collect();
        let color = (0u8..).find(|c| !used.contains(c)).unwrap_or(0);
        colors.insert(*id, color);
    }
    for (id, color) in colors {
        if let Some(segment) = segments.get_mut(&id) {
            segment.color_index = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Pixel, PixelCodec};

    fn grid(width: u32, rows: &[&[u8]]) -> PixelGrid {
        let bytes: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        PixelGrid::from_raw(width, rows.len() as u32, &bytes, PixelCodec::StandardBits)
    }

    #[test]
    fn test_extract_with_wall() {
        let g = grid(4, &[&[1, 1, 1, 1], &[1, 1, 1, 1], &[1, 1, 63, 1], &[1, 1, 1, 1]]);
        let dims = Dimensions::new(0, 0, 4, 4, 50);
        let segments = extract_segments(&g, &dims);
        assert_eq!(segments.len(), 1);
        let s = &segments[&1];
        assert_eq!(s.pixel_count, 15);
        assert_eq!(s.bounding_box, Bounds::new(Point::new(25, 25), Point::new(175, 175)));
        assert!(s.bounding_box.contains(s.center));
        assert_eq!(g.get(dims.to_grid(s.center)).segment_id(), Some(1));
        assert_eq!(s.name, "Room 1");
    }

    #[test]
    fn test_center_prefers_interior_row() {
        // Top row is widest but lies on the edge
        let g = grid(5, &[&[2, 2, 2, 2, 2], &[0, 2, 2, 0, 0], &[0, 2, 0, 0, 0]]);
        let dims = Dimensions::new(0, 0, 5, 3, 10);
        let s = &extract_segments(&g, &dims)[&2];
        assert_eq!(dims.to_grid(s.center), GridCoord::new(1, 1));
    }

    #[test]
    fn test_center_is_deterministic_on_concave_shape() {
        let g = grid(3, &[&[3, 3, 3], &[3, 0, 0], &[3, 3, 3]]);
        let dims = Dimensions::new(0, 0, 3, 3, 10);
        let first = extract_segments(&g, &dims)[&3].center;
        for _ in 0..3 {
            assert_eq!(extract_segments(&g, &dims)[&3].center, first);
        }
        assert_eq!(g.get(dims.to_grid(first)).segment_id(), Some(3));
    }

    #[test]
    fn test_neighbors_across_wall() {
        let g = grid(5, &[&[1, 1, 63, 2, 2], &[1, 1, 63, 63, 63], &[63, 63, 63, 3, 3]]);
        let adjacency = bitmap_neighbors(&g);
        assert!(adjacency[&1].contains(&2));
        assert!(!adjacency[&1].contains(&3));
        // 2 sits one wall pixel above 3
        assert!(adjacency[&2].contains(&3));
    }

    #[test]
    fn test_greedy_colors() {
        let g = grid(3, &[&[1, 2, 3]]);
        let dims = Dimensions::new(0, 0, 3, 1, 10);
        let segments = extract_segments(&g, &dims);
        assert_eq!(segments[&1].color_index, 0);
        assert_eq!(segments[&2].color_index, 1);
        assert_eq!(segments[&3].color_index, 0);
    }

    #[test]
    fn test_apply_info_and_naming() {
        let mut s = Segment::new(4);
        s.apply_info(&SegmentInfoMeta {
            room_type: Some(4),
            index: Some(2),
            nei_id: Some(vec![4, 5, 99]),
            ..Default::default()
        });
        s.refresh_name();
        assert_eq!(s.name, "Kitchen 2");
        assert_eq!(s.neighbors, BTreeSet::from([5]));

        s.apply_info(&SegmentInfoMeta {
            name: Some(encode_name("Pantry")),
            ..Default::default()
        });
        s.refresh_name();
        assert_eq!(s.name, "Pantry");
    }

    #[test]
    fn test_cleaning_defaults() {
        let mut s = Segment::new(3);
        assert!(s.cleaning.is_none());
        s.cleaning_mut().suction_level = 2;
        assert_eq!(s.cleaning.unwrap().to_array(), vec![2, 3, 1, 0]);
        assert_eq!(s.order(), None);
    }

    #[test]
    fn test_carpet_material() {
        let carpet = 5 | 0x40;
        let g = grid(3, &[&[carpet, carpet, 5]]);
        let dims = Dimensions::new(0, 0, 3, 1, 10);
        let s = &extract_segments(&g, &dims)[&5];
        assert_eq!(s.carpet_pixel_count, 2);
        assert_eq!(s.floor_material, FloorMaterial::Carpet);
        assert!(g.get(GridCoord::new(0, 0)).is_carpet());
        assert_ne!(g.get(GridCoord::new(2, 0)), Pixel::OUTSIDE);
    }
}
