//! Robot path string.
//!
//! A path is a run of `<op><x>,<y>` tokens. `M` moves to an absolute
//! position; every other operator is a delta from the previous vertex.

use crate::map::{PathPoint, PathType};

/// Parse a path string. Malformed tokens are skipped.
pub fn parse_path(input: &str) -> Vec<PathPoint> {
    let mut points = Vec::new();
    let (mut x, mut y) = (0i32, 0i32);
    let mut rest = input.trim();

    while let Some(op) = rest.chars().next() {
        rest = &rest[op.len_utf8()..];
        let end = rest
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (args, tail) = rest.split_at(end);
        rest = tail;

        let Some(path_type) = PathType::from_op(op) else {
            log::debug!("Skipping unknown path operator {:?}", op);
            continue;
        };
        let mut coords = args.split(',').map(|v| v.trim().parse::<i32>());
        let (Some(Ok(dx)), Some(Ok(dy))) = (coords.next(), coords.next()) else {
            log::debug!("Skipping malformed path token {}{}", op, args);
            continue;
        };

        if path_type == PathType::Move {
            x = dx;
            y = dy;
        } else {
            x = x.saturating_add(dx);
            y = y.saturating_add(dy);
        }
        points.push(PathPoint::new(x, y, path_type));
    }
    points
}

/// Encode points as a path string (inverse of [`parse_path`])
pub fn format_path(points: &[PathPoint]) -> String {
    let mut out = String::new();
    let (mut x, mut y) = (0i32, 0i32);
    for p in points {
        if p.path_type == PathType::Move {
            out.push_str(&format!("M{},{}", p.x, p.y));
        } else {
            let (dx, dy) = (i64::from(p.x) - i64::from(x), i64::from(p.y) - i64::from(y));
            out.push_str(&format!("{}{},{}", p.path_type.op(), dx, dy));
        }
        x = p.x;
        y = p.y;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_ops() {
        let points = parse_path("M100,200L10,0S0,-20W5,5l-1,1");
        assert_eq!(
            points,
            vec![
                PathPoint::new(100, 200, PathType::Move),
                PathPoint::new(110, 200, PathType::Line),
                PathPoint::new(110, 180, PathType::Sweep),
                PathPoint::new(115, 185, PathType::Mop),
                PathPoint::new(114, 186, PathType::SweepAndMop),
            ]
        );
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        let points = parse_path("M0,0Lx,1S5,5Q1,1L1");
        assert_eq!(points, vec![
            PathPoint::new(0, 0, PathType::Move),
            PathPoint::new(5, 5, PathType::Sweep),
        ]);
        assert!(parse_path("").is_empty());
    }

    #[test]
    fn test_huge_deltas_clamp() {
        let points = parse_path("M2147483000,0L2147483000,-5L-1,0");
        assert_eq!(points[1], PathPoint::new(i32::MAX, -5, PathType::Line));
        assert_eq!(points[2], PathPoint::new(i32::MAX - 1, -5, PathType::Line));

        let far = [
            PathPoint::new(i32::MIN, 0, PathType::Move),
            PathPoint::new(i32::MAX, 0, PathType::Line),
        ];
        assert_eq!(format_path(&far), format!("M{},0L{},0", i32::MIN, u32::MAX));
    }

    #[test]
    fn test_format_matches_parse() {
        let input = "M-50,20S30,0S0,30M400,400W-10,-10";
        assert_eq!(format_path(&parse_path(input)), input);
    }
}
