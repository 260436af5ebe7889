//! Geometry and pixel primitives shared by the codec and the map model.

mod pixel;
mod types;

pub use pixel::{MAX_SEGMENT_ID, Pixel, PixelClass, PixelCodec};
pub use types::{Area, Bounds, Dimensions, GridCoord, Line, Point, Pose};
