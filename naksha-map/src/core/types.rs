//! Point, area and grid geometry types.
//!
//! Two coordinate spaces are in play:
//! - **World** coordinates (`Point`), in device units (millimetres), shared by
//!   every frame of a map.
//! - **Grid** coordinates (`GridCoord`), pixel indices into one particular
//!   frame's bitmap. Row 0 is the first row of the bitmap.
//!
//! [`Dimensions`] converts between the two.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// World coordinates (device units)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Position with heading, as reported in the frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// X coordinate (world)
    pub x: i32,
    /// Y coordinate (world)
    pub y: i32,
    /// Heading in degrees
    pub angle: i32,
}

impl Pose {
    /// Create a new pose
    #[inline]
    pub const fn new(x: i32, y: i32, angle: i32) -> Self {
        Self { x, y, angle }
    }

    /// Position without heading
    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Grid coordinates (pixel indices)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridCoord {
    /// X coordinate (column index)
    pub x: i32,
    /// Y coordinate (row index)
    pub y: i32,
}

impl GridCoord {
    /// Create a new grid coordinate
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for GridCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        GridCoord::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for GridCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        GridCoord::new(self.x - other.x, self.y - other.y)
    }
}

/// Line segment in world coordinates (virtual walls, thresholds, curtains).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Line {
    /// Start point
    pub start: Point,
    /// End point
    pub end: Point,
}

impl Line {
    /// Create a new line
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Build from the device's `[x0, y0, x1, y1]` encoding
    pub fn from_array(v: [i32; 4]) -> Self {
        Self::new(Point::new(v[0], v[1]), Point::new(v[2], v[3]))
    }

    /// Device `[x0, y0, x1, y1]` encoding
    pub fn to_array(&self) -> [i32; 4] {
        [self.start.x, self.start.y, self.end.x, self.end.y]
    }

    /// Which side of the directed line a point lies on.
    ///
    /// Positive is left of `start → end`, negative is right, zero is on the line.
    pub fn side(&self, p: Point) -> i64 {
        let dx = (self.end.x - self.start.x) as i64;
        let dy = (self.end.y - self.start.y) as i64;
        let px = (p.x - self.start.x) as i64;
        let py = (p.y - self.start.y) as i64;
        dx * py - dy * px
    }
}

/// Quadrilateral zone in world coordinates (no-go, no-mop, active areas).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Area {
    /// Corner points in drawing order
    pub corners: [Point; 4],
}

impl Area {
    /// Axis-aligned rectangle from the device's `[x0, y0, x1, y1]` encoding
    pub fn from_rect(v: [i32; 4]) -> Self {
        Self {
            corners: [
                Point::new(v[0], v[1]),
                Point::new(v[2], v[1]),
                Point::new(v[2], v[3]),
                Point::new(v[0], v[3]),
            ],
        }
    }

    /// Bounding rectangle as `[x0, y0, x1, y1]`
    pub fn to_rect(&self) -> [i32; 4] {
        let b = self.bounds();
        [b.min.x, b.min.y, b.max.x, b.max.y]
    }

    /// Axis-aligned bounds of the corners
    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::from_point(self.corners[0]);
        for corner in &self.corners[1..] {
            bounds.expand_to_include(*corner);
        }
        bounds
    }
}

/// Axis-aligned bounding box in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Point,
    /// Maximum corner
    pub max: Point,
}

impl Bounds {
    /// Create a bounding box from min and max corners
    #[inline]
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Bounds of a single point
    #[inline]
    pub fn from_point(point: Point) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Grow to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Inclusive containment check
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Center of the box
    #[inline]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }
}

/// Pixel-grid to world transform of one map or frame.
///
/// Pixel `(x, y)` covers the world square starting at
/// `(left + x * grid_size, top + y * grid_size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// World X of the grid's first column
    pub left: i32,
    /// World Y of the grid's first row
    pub top: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// World units per pixel
    pub grid_size: u32,
}

impl Dimensions {
    /// Create new dimensions
    pub const fn new(left: i32, top: i32, width: u32, height: u32, grid_size: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
            grid_size,
        }
    }

    /// Total number of pixels
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// World X one past the last column, saturating
    #[inline]
    pub fn right(&self) -> i32 {
        saturate(self.extent(self.left, self.width))
    }

    /// World Y one past the last row, saturating
    #[inline]
    pub fn bottom(&self) -> i32 {
        saturate(self.extent(self.top, self.height))
    }

    fn extent(&self, origin: i32, cells: u32) -> i64 {
        i64::from(origin) + i64::from(cells) * i64::from(self.grid_size)
    }

    /// Whether every pixel edge is representable in world coordinates
    pub fn fits_world(&self) -> bool {
        let range = i64::from(i32::MIN)..=i64::from(i32::MAX);
        range.contains(&self.extent(self.left, self.width))
            && range.contains(&self.extent(self.top, self.height))
    }

    /// Is the grid coordinate inside this grid?
    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    /// World position of a pixel's center
    pub fn to_world(&self, coord: GridCoord) -> Point {
        let g = i64::from(self.grid_size);
        let axis = |origin: i32, c: i32| saturate(i64::from(origin) + i64::from(c) * g + g / 2);
        Point::new(axis(self.left, coord.x), axis(self.top, coord.y))
    }

    /// Pixel containing a world position (may lie outside the grid)
    pub fn to_grid(&self, point: Point) -> GridCoord {
        let g = i64::from(self.grid_size.max(1));
        let axis = |p: i32, origin: i32| saturate((i64::from(p) - i64::from(origin)).div_euclid(g));
        GridCoord::new(axis(point.x, self.left), axis(point.y, self.top))
    }

    /// Pixel offset of `other`'s first pixel inside this grid.
    ///
    /// Returns `None` when the grid sizes differ or the origins are not
    /// aligned on a pixel boundary.
    pub fn offset_of(&self, other: &Dimensions) -> Option<GridCoord> {
        if self.grid_size == 0 || self.grid_size != other.grid_size {
            return None;
        }
        let g = i64::from(self.grid_size);
        let dx = i64::from(other.left) - i64::from(self.left);
        let dy = i64::from(other.top) - i64::from(self.top);
        if dx % g != 0 || dy % g != 0 {
            return None;
        }
        Some(GridCoord::new(saturate(dx / g), saturate(dy / g)))
    }

    /// Smallest grid covering both `self` and `other`.
    ///
    /// Returns `None` when the two cannot share a pixel lattice.
    pub fn union(&self, other: &Dimensions) -> Option<Dimensions> {
        // Alignment check only; the offset itself is recomputed against the union
        self.offset_of(other)?;
        if self.cell_count() == 0 {
            return Some(*other);
        }
        if other.cell_count() == 0 {
            return Some(*self);
        }
        let g = self.grid_size;
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        let span = |lo: i32, hi: i32| ((i64::from(hi) - i64::from(lo)) / i64::from(g)) as u32;
        Some(Dimensions::new(left, top, span(left, right), span(top, bottom), g))
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_covers_both() {
        let a = Dimensions::new(0, 0, 4, 4, 50);
        let b = Dimensions::new(150, -100, 4, 2, 50);
        let u = a.union(&b).unwrap();
        assert_eq!(u, Dimensions::new(0, -100, 7, 6, 50));
        assert_eq!(u.offset_of(&a), Some(GridCoord::new(0, 2)));
        assert_eq!(u.offset_of(&b), Some(GridCoord::new(3, 0)));
    }

    #[test]
    fn test_union_rejects_misaligned() {
        let a = Dimensions::new(0, 0, 4, 4, 50);
        let b = Dimensions::new(25, 0, 4, 4, 50);
        assert!(a.union(&b).is_none());
        let c = Dimensions::new(0, 0, 4, 4, 25);
        assert!(a.union(&c).is_none());
    }

    #[test]
    fn test_world_grid_conversion() {
        let d = Dimensions::new(-200, 100, 10, 10, 50);
        let p = d.to_world(GridCoord::new(2, 3));
        assert_eq!(p, Point::new(-75, 275));
        assert_eq!(d.to_grid(p), GridCoord::new(2, 3));
        assert_eq!(d.to_grid(Point::new(-201, 100)), GridCoord::new(-1, 0));
    }

    #[test]
    fn test_huge_grid_saturates() {
        let d = Dimensions::new(0, 0, 40_000, 1, 60_000);
        assert!(!d.fits_world());
        assert_eq!(d.right(), i32::MAX);
        assert_eq!(d.to_world(GridCoord::new(39_999, 0)).x, i32::MAX);
        assert!(Dimensions::new(-200, 100, 10, 10, 50).fits_world());
    }

    #[test]
    fn test_line_side() {
        let line = Line::new(Point::new(0, 0), Point::new(0, 10));
        assert!(line.side(Point::new(-5, 5)) > 0);
        assert!(line.side(Point::new(5, 5)) < 0);
        assert_eq!(line.side(Point::new(0, 3)), 0);
    }

    #[test]
    fn test_area_rect_round_trip() {
        let area = Area::from_rect([10, 20, 110, 220]);
        assert_eq!(area.to_rect(), [10, 20, 110, 220]);
        assert!(area.bounds().contains(Point::new(50, 50)));
    }
}
