//! Saved map splicing for restore scenarios.

use crate::core::{Dimensions, Pixel};
use crate::map::{MapState, PixelGrid};

/// Lay `live` over `saved` in their union rectangle.
///
/// Saved pixels form the base; every live pixel that is not outside replaces
/// them. The raw layer holds live bytes only, since later partial frames
/// patch the live map.
///
/// Returns `None` when the two grids do not share a pixel lattice.
pub fn splice_grids(
    saved: &MapState,
    live: &PixelGrid,
    live_dims: &Dimensions,
) -> Option<(PixelGrid, Dimensions)> {
    let union = saved.dimensions.union(live_dims)?;
    let live_offset = union.offset_of(live_dims)?;
    let saved_offset = union.offset_of(&saved.dimensions)?;

    let mut out = live.reallocated(union.width, union.height, live_offset);
    for (coord, pixel) in saved.pixel_grid.iter() {
        let target = coord + saved_offset;
        if pixel != Pixel::OUTSIDE && out.get(target) == Pixel::OUTSIDE {
            out.set(target, pixel);
        }
    }
    Some((out, union))
}
