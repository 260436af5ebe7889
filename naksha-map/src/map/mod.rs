//! Map data model.

mod grid;
mod objects;
mod segment;
mod state;

pub use grid::PixelGrid;
pub use objects::{Furniture, Obstacle, PathPoint, PathType};
pub use segment::{
    CleaningSettings, FloorMaterial, PALETTE_SIZE, Segment, assign_colors, bitmap_neighbors,
    encode_name, extract_segments, room_type_name,
};
pub use state::{MapState, MapSummary, SegmentSummary, Zones};
