//! Obstacles, furniture and the robot path.

use crate::codec::NumberList;
use crate::core::Point;
use serde::{Deserialize, Serialize};

/// Kind of movement a path point ends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathType {
    /// Pen-up move (start of a new stroke)
    Move,
    /// Travel without cleaning
    Line,
    /// Vacuuming
    Sweep,
    /// Mopping
    Mop,
    /// Vacuuming and mopping at once
    SweepAndMop,
}

impl PathType {
    /// Path string operator
    pub fn op(self) -> char {
        match self {
            PathType::Move => 'M',
            PathType::Line => 'L',
            PathType::Sweep => 'S',
            PathType::Mop => 'W',
            PathType::SweepAndMop => 'l',
        }
    }

    /// Parse a path string operator
    pub fn from_op(op: char) -> Option<Self> {
        match op {
            'M' => Some(PathType::Move),
            'L' => Some(PathType::Line),
            'S' => Some(PathType::Sweep),
            'W' => Some(PathType::Mop),
            'l' => Some(PathType::SweepAndMop),
            _ => None,
        }
    }
}

/// One robot path vertex in world coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: i32,
    pub y: i32,
    pub path_type: PathType,
}

impl PathPoint {
    pub const fn new(x: i32, y: i32, path_type: PathType) -> Self {
        Self { x, y, path_type }
    }
}

/// AI-detected obstacle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub position: Point,
    /// Vendor obstacle type code
    pub obstacle_type: u32,
    /// Detection confidence, 0..1
    pub confidence: f64,
    /// User asked the robot to ignore this obstacle
    pub ignored: bool,
}

impl Obstacle {
    /// Parse `[x, y, type, confidence, id, ignore]`.
    ///
    /// Entries without an id are numbered by position.
    pub fn from_meta(entry: &NumberList, index: usize) -> Option<Self> {
        let x = entry.int(0)?;
        let y = entry.int(1)?;
        let mut confidence = entry.float(3).unwrap_or(0.0);
        if confidence > 1.0 {
            // Some firmware reports percentages
            confidence /= 100.0;
        }
        Some(Self {
            id: entry.int(4).map(|id| id as u32).unwrap_or(index as u32 + 1),
            position: Point::new(x as i32, y as i32),
            obstacle_type: entry.int(2).unwrap_or(0) as u32,
            confidence,
            ignored: entry.int(5).unwrap_or(0) != 0,
        })
    }
}

/// AI-detected piece of furniture
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Furniture {
    pub id: u32,
    pub position: Point,
    pub furniture_type: u32,
    pub width: i32,
    pub height: i32,
    /// Rotation in degrees
    pub angle: f64,
    pub confidence: f64,
}

impl Furniture {
    /// Parse `[x, y, type, width, height, angle, confidence]`
    pub fn from_meta(entry: &NumberList, index: usize) -> Option<Self> {
        Some(Self {
            id: index as u32 + 1,
            position: Point::new(entry.int(0)? as i32, entry.int(1)? as i32),
            furniture_type: entry.int(2).unwrap_or(0) as u32,
            width: entry.int(3).unwrap_or(0) as i32,
            height: entry.int(4).unwrap_or(0) as i32,
            angle: entry.float(5).unwrap_or(0.0),
            confidence: entry.float(6).unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_from_meta() {
        let entry = NumberList(vec![100.0, -50.0, 3.0, 87.0, 12.0, 1.0]);
        let obstacle = Obstacle::from_meta(&entry, 0).unwrap();
        assert_eq!(obstacle.id, 12);
        assert_eq!(obstacle.position, Point::new(100, -50));
        assert!(obstacle.ignored);
        approx::assert_relative_eq!(obstacle.confidence, 0.87);
    }

    #[test]
    fn test_obstacle_defaults_id() {
        let obstacle = Obstacle::from_meta(&NumberList(vec![1.0, 2.0]), 4).unwrap();
        assert_eq!(obstacle.id, 5);
        assert!(!obstacle.ignored);
        assert!(Obstacle::from_meta(&NumberList(vec![1.0]), 0).is_none());
    }

    #[test]
    fn test_furniture_from_meta() {
        let entry = NumberList(vec![500.0, 600.0, 2.0, 1200.0, 800.0, 90.0, 0.5]);
        let furniture = Furniture::from_meta(&entry, 1).unwrap();
        assert_eq!(furniture.id, 2);
        assert_eq!(furniture.width, 1200);
        approx::assert_relative_eq!(furniture.angle, 90.0);
    }

    #[test]
    fn test_path_ops() {
        for t in [
            PathType::Move,
            PathType::Line,
            PathType::Sweep,
            PathType::Mop,
            PathType::SweepAndMop,
        ] {
            assert_eq!(PathType::from_op(t.op()), Some(t));
        }
        assert_eq!(PathType::from_op('X'), None);
    }
}
