//! Merger integration tests: frames go through the encoder and decoder
//! before being folded, as they would coming off the wire.

mod common;

use std::collections::BTreeMap;

use common::{FLOOR, WALL, empty_partial, frame, raw, room_with_pillar, two_rooms};

use naksha_map::codec::{FrameMetadata, NumberList, RestrictionsMeta, SegmentInfoMeta};
use naksha_map::core::{Dimensions, GridCoord, Pixel, PixelClass, Point};
use naksha_map::{FrameType, MapState, PartialFrame, decode, merge};

fn wire(frame: &PartialFrame) -> PartialFrame {
    decode(&raw(frame), None, None).unwrap()
}

fn build(frame: &PartialFrame) -> MapState {
    merge(None, &wire(frame), false).unwrap()
}

#[test]
fn test_pillar_room() {
    let state = build(&room_with_pillar(1, 1));

    assert_eq!(state.segments.len(), 1);
    let room = &state.segments[&1];
    assert_eq!(room.pixel_count, 15);
    assert_eq!(state.pixel_grid.get(GridCoord::new(2, 2)), Pixel::WALL);
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 0)).segment_id(), Some(1));

    // Deterministic center inside the bounding box
    let b = room.bounding_box;
    assert!(room.center.x >= b.min.x && room.center.x <= b.max.x);
    assert!(room.center.y >= b.min.y && room.center.y <= b.max.y);
    assert_eq!(build(&room_with_pillar(1, 1)).segments[&1].center, room.center);
}

#[test]
fn test_initial_is_idempotent() {
    let prev = build(&two_rooms(1, 1));
    let next = wire(&room_with_pillar(1, 2));

    let a = merge(Some(&prev), &next, false).unwrap();
    let b = merge(Some(&prev), &next, false).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_applied_partial_is_noop() {
    let base = build(&room_with_pillar(1, 5));
    let again = wire(&frame(
        FrameType::Partial,
        1,
        5,
        Dimensions::new(0, 0, 1, 1, 50),
        vec![1],
    ));
    assert_eq!(merge(Some(&base), &again, false).unwrap(), base);
}

#[test]
fn test_partial_grows_right_and_down() {
    let base = build(&room_with_pillar(1, 1));
    // 2×2 floor patch at grid (4, 4), outside the 4×4 base
    let delta = wire(&frame(
        FrameType::Partial,
        1,
        2,
        Dimensions::new(200, 200, 2, 2, 50),
        vec![FLOOR; 4],
    ));
    let state = merge(Some(&base), &delta, false).unwrap();

    assert_eq!(state.dimensions, Dimensions::new(0, 0, 6, 6, 50));
    assert_eq!(state.frame_id, 2);
    // Old corners and center stay put
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 0)).segment_id(), Some(1));
    assert_eq!(state.pixel_grid.get(GridCoord::new(3, 3)).segment_id(), Some(1));
    assert_eq!(state.pixel_grid.get(GridCoord::new(2, 2)), Pixel::WALL);
    // New region
    assert_eq!(state.pixel_grid.get(GridCoord::new(5, 5)).class(), PixelClass::Floor);
    assert_eq!(state.pixel_grid.get(GridCoord::new(5, 0)), Pixel::OUTSIDE);
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 5)), Pixel::OUTSIDE);
}

#[test]
fn test_partial_grows_left_and_up() {
    let base = build(&room_with_pillar(1, 1));
    let delta = wire(&frame(
        FrameType::Partial,
        1,
        2,
        Dimensions::new(-100, -50, 1, 1, 50),
        vec![3],
    ));
    let state = merge(Some(&base), &delta, false).unwrap();

    assert_eq!(state.dimensions, Dimensions::new(-100, -50, 6, 5, 50));
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 0)).segment_id(), Some(3));
    // Base (0, 0) moved to (2, 1), the pillar to (4, 3)
    assert_eq!(state.pixel_grid.get(GridCoord::new(2, 1)).segment_id(), Some(1));
    assert_eq!(state.pixel_grid.get(GridCoord::new(5, 4)).segment_id(), Some(1));
    assert_eq!(state.pixel_grid.get(GridCoord::new(4, 3)), Pixel::WALL);
    // World lookups are unaffected by the resize
    assert_eq!(state.pixel_at(Point::new(125, 125)), Pixel::WALL);
    assert!(state.segments.contains_key(&3));
}

#[test]
fn test_partial_appends_path() {
    let mut initial = room_with_pillar(1, 1);
    initial.metadata.tr = Some("M100,100L50,0".to_string());
    let base = build(&initial);
    assert_eq!(base.path.len(), 2);

    let mut delta = empty_partial(1, 2);
    delta.metadata.tr = Some("M150,100L0,50".to_string());
    let state = merge(Some(&base), &wire(&delta), false).unwrap();
    assert_eq!(state.path.len(), 4);
    assert_eq!((state.path[3].x, state.path[3].y), (150, 150));
}

#[test]
fn test_fresh_initial_clears_zones() {
    let mut initial = room_with_pillar(1, 1);
    initial.metadata.vw = Some(RestrictionsMeta {
        rect: Some(vec![NumberList(vec![0.0, 0.0, 100.0, 100.0])]),
        ..Default::default()
    });
    let with_zone = build(&initial);
    assert_eq!(with_zone.zones.no_go_areas.len(), 1);

    let fresh = merge(Some(&with_zone), &wire(&room_with_pillar(1, 2)), false).unwrap();
    assert!(fresh.zones.no_go_areas.is_empty());
}

#[test]
fn test_restored_initial_keeps_zones() {
    let mut initial = room_with_pillar(1, 1);
    initial.metadata.vw = Some(RestrictionsMeta {
        rect: Some(vec![NumberList(vec![0.0, 0.0, 100.0, 100.0])]),
        ..Default::default()
    });
    let with_zone = build(&initial);

    let mut restore = room_with_pillar(1, 2);
    restore.metadata = FrameMetadata {
        ris: Some(2),
        ..Default::default()
    };
    let restored = merge(Some(&with_zone), &wire(&restore), false).unwrap();
    assert_eq!(restored.zones.no_go_areas, with_zone.zones.no_go_areas);
    assert!(restored.restored_map);
}

#[test]
fn test_embedded_saved_map_spliced() {
    // Saved map: 4×4 of segment 1
    let saved = frame(
        FrameType::Initial,
        9,
        1,
        Dimensions::new(0, 0, 4, 4, 50),
        vec![1; 16],
    );
    // Live map: left half unexplored, right half segment 2, plus one extra row
    let mut bitmap = Vec::new();
    for _ in 0..5 {
        bitmap.extend_from_slice(&[0, 0, 2, 2]);
    }
    let mut live = frame(
        FrameType::Initial,
        3,
        1,
        Dimensions::new(0, 0, 4, 5, 50),
        bitmap,
    );
    live.metadata.rism = Some(raw(&saved));

    let state = build(&live);
    assert_eq!(state.dimensions, Dimensions::new(0, 0, 4, 5, 50));
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 0)).segment_id(), Some(1));
    assert_eq!(state.pixel_grid.get(GridCoord::new(3, 0)).segment_id(), Some(2));
    assert_eq!(state.pixel_grid.get(GridCoord::new(0, 4)), Pixel::OUTSIDE);
    assert!(state.segments.contains_key(&1));
    assert!(state.segments.contains_key(&2));
    assert!(state.restored_map);
}

#[test]
fn test_neighbors_and_colors() {
    let state = build(&two_rooms(1, 1));
    let (a, b) = (&state.segments[&1], &state.segments[&2]);
    assert!(a.neighbors.contains(&2));
    assert!(b.neighbors.contains(&1));
    assert_ne!(a.color_index, b.color_index);
    assert_eq!(state.pixel_grid.get(GridCoord::new(2, 1)).class(), PixelClass::Wall);
    assert_eq!(WALL, 63);
}

#[test]
fn test_wifi_frame_builds_wifi_map() {
    let wifi = frame(
        FrameType::Wifi,
        1,
        1,
        Dimensions::new(0, 0, 2, 1, 50),
        vec![10, 20],
    );
    let state = build(&wifi);
    assert!(state.wifi_map);
    assert!(state.segments.is_empty());
}

#[test]
fn test_oversized_grid() {
    let mut bitmap = vec![0; 40_000];
    bitmap[39_999] = 1;
    let huge = frame(
        FrameType::Initial,
        1,
        1,
        Dimensions::new(0, 0, 40_000, 1, 60_000),
        bitmap,
    );

    // Off the wire the frame is refused outright
    assert!(decode(&raw(&huge), None, None).is_err());

    // Merged directly, coordinates clamp instead of wrapping
    let state = merge(None, &huge, false).unwrap();
    let room = &state.segments[&1];
    assert_eq!(room.center.x, i32::MAX);
    assert!(room.bounding_box.min.x <= room.bounding_box.max.x);
}

#[test]
fn test_reported_neighbors_survive_pixel_update() {
    let mut initial = two_rooms(1, 1);
    let apart = SegmentInfoMeta {
        nei_id: Some(Vec::new()),
        ..Default::default()
    };
    initial.metadata.seg_inf = Some(BTreeMap::from([
        ("1".to_string(), apart.clone()),
        ("2".to_string(), apart),
    ]));
    let state = build(&initial);
    assert!(state.segments[&1].neighbors.is_empty());
    assert_eq!(state.segments[&1].color_index, state.segments[&2].color_index);

    // Wall at (2, 0) becomes floor; no seg_inf in this frame
    let delta = frame(
        FrameType::Partial,
        1,
        2,
        Dimensions::new(100, 0, 1, 1, 50),
        vec![FLOOR.wrapping_sub(WALL)],
    );
    let next = merge(Some(&state), &wire(&delta), false).unwrap();
    assert_eq!(next.pixel_grid.get(GridCoord::new(2, 0)), Pixel::FLOOR);
    assert!(next.segments[&1].neighbors.is_empty());
    assert!(next.segments[&2].reported_neighbors);
    assert_eq!(next.segments[&1].color_index, next.segments[&2].color_index);
}
