//! Optimistic local edits.
//!
//! Edits mutate a [`MapState`] ahead of the device confirming them. Each
//! applied edit stamps `last_edited_frame_id` with the map's current frame
//! id; the merger keeps user-owned fields from any device frame at or below
//! that watermark.
//!
//! Destructive edits (renaming, sequencing, per-segment cleaning settings,
//! merge and split) are skipped while the map is temporary.

use crate::core::{Area, Line, MAX_SEGMENT_ID, Pixel};
use crate::error::{Error, Result};
use crate::map::{CleaningSettings, MapState, bitmap_neighbors, extract_segments, room_type_name};
use std::collections::{BTreeMap, BTreeSet};

/// Result of a successful edit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Not applicable to this map (temporary map)
    Skipped,
}

/// One user edit
#[derive(Clone, Debug, PartialEq)]
pub enum MapEdit {
    SetActiveSegments(Vec<u8>),
    SetActiveAreas(Vec<Area>),
    SetZones {
        no_go_areas: Vec<Area>,
        no_mopping_areas: Vec<Area>,
        virtual_walls: Vec<Line>,
    },
    /// Cleaning order; unlisted segments become unordered
    SetCleaningSequence(Vec<u8>),
    /// Replace the settings of several segments at once
    SetCustomCleaning(BTreeMap<u8, CleaningSettings>),
    SetSegmentSuctionLevel { segment: u8, level: u8 },
    SetSegmentWaterVolume { segment: u8, volume: u8 },
    SetSegmentCleaningTimes { segment: u8, times: u8 },
    SetSegmentCleaningMode { segment: u8, mode: u8 },
    SetSegmentOrder { segment: u8, order: u32 },
    /// `custom_name: None` reverts to the room type's default name
    SetSegmentName {
        segment: u8,
        room_type: u8,
        custom_name: Option<String>,
    },
    SetRotation(i32),
    SetObstacleIgnore { obstacle: u32, ignored: bool },
    /// Relabel `absorb`'s pixels as `keep`
    MergeSegments { keep: u8, absorb: u8 },
    /// Move the pixels left of the directed line into a new segment
    SplitSegment { segment: u8, line: Line },
}

fn check_range(what: &str, value: u8, range: std::ops::RangeInclusive<u8>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!(
            "{} {} outside {}..={}",
            what,
            value,
            range.start(),
            range.end()
        )))
    }
}

fn check_segment(map: &MapState, segment: u8) -> Result<()> {
    if map.segments.contains_key(&segment) {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!("unknown segment {}", segment)))
    }
}

impl MapEdit {
    /// Edits that rewrite room data and are skipped on temporary maps
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            MapEdit::SetCleaningSequence(_)
                | MapEdit::SetCustomCleaning(_)
                | MapEdit::SetSegmentSuctionLevel { .. }
                | MapEdit::SetSegmentWaterVolume { .. }
                | MapEdit::SetSegmentCleaningTimes { .. }
                | MapEdit::SetSegmentCleaningMode { .. }
                | MapEdit::SetSegmentOrder { .. }
                | MapEdit::SetSegmentName { .. }
                | MapEdit::MergeSegments { .. }
                | MapEdit::SplitSegment { .. }
        )
    }

    /// Check arguments against the map without changing it
    pub fn validate(&self, map: &MapState) -> Result<()> {
        match self {
            MapEdit::SetActiveSegments(ids) => {
                ids.iter().try_for_each(|id| check_segment(map, *id))
            }
            MapEdit::SetCleaningSequence(ids) => {
                let unique: BTreeSet<_> = ids.iter().collect();
                if unique.len() != ids.len() {
                    return Err(Error::InvalidValue(
                        "cleaning sequence lists a segment twice".to_string(),
                    ));
                }
                ids.iter().try_for_each(|id| check_segment(map, *id))
            }
            MapEdit::SetCustomCleaning(settings) => {
                for (id, s) in settings {
                    check_segment(map, *id)?;
                    check_range("suction level", s.suction_level, 0..=3)?;
                    check_range("water volume", s.water_volume, 1..=3)?;
                    check_range("cleaning times", s.cleaning_times, 1..=3)?;
                    if let Some(mode) = s.mode {
                        check_range("cleaning mode", mode, 0..=3)?;
                    }
                }
                Ok(())
            }
            MapEdit::SetSegmentSuctionLevel { segment, level } => {
                check_range("suction level", *level, 0..=3)?;
                check_segment(map, *segment)
            }
            MapEdit::SetSegmentWaterVolume { segment, volume } => {
                check_range("water volume", *volume, 1..=3)?;
                check_segment(map, *segment)
            }
            MapEdit::SetSegmentCleaningTimes { segment, times } => {
                check_range("cleaning times", *times, 1..=3)?;
                check_segment(map, *segment)
            }
            MapEdit::SetSegmentCleaningMode { segment, mode } => {
                check_range("cleaning mode", *mode, 0..=3)?;
                check_segment(map, *segment)
            }
            MapEdit::SetSegmentOrder { segment, .. } => check_segment(map, *segment),
            MapEdit::SetSegmentName {
                segment,
                room_type,
                custom_name,
            } => {
                check_range("room type", *room_type, 0..=15)?;
                if custom_name.as_ref().is_some_and(|n| n.trim().is_empty()) {
                    return Err(Error::InvalidValue("segment name is empty".to_string()));
                }
                check_segment(map, *segment)
            }
            MapEdit::SetRotation(degrees) => {
                if degrees % 90 != 0 {
                    return Err(Error::InvalidValue(format!(
                        "rotation {} is not a multiple of 90",
                        degrees
                    )));
                }
                Ok(())
            }
            MapEdit::SetObstacleIgnore { obstacle, .. } => {
                if map.obstacles.contains_key(obstacle) {
                    Ok(())
                } else {
                    Err(Error::InvalidValue(format!("unknown obstacle {}", obstacle)))
                }
            }
            MapEdit::MergeSegments { keep, absorb } => {
                check_segment(map, *keep)?;
                check_segment(map, *absorb)?;
                if keep == absorb {
                    return Err(Error::InvalidAction(format!(
                        "cannot merge segment {} with itself",
                        keep
                    )));
                }
                let adjacent = map.segments[keep].neighbors.contains(absorb)
                    || bitmap_neighbors(&map.pixel_grid)
                        .get(keep)
                        .is_some_and(|n| n.contains(absorb));
                if !adjacent {
                    return Err(Error::InvalidAction(format!(
                        "segments {} and {} are not adjacent",
                        keep, absorb
                    )));
                }
                Ok(())
            }
            MapEdit::SplitSegment { segment, .. } => {
                check_segment(map, *segment)?;
                if map.next_free_segment_id().is_none() {
                    return Err(Error::InvalidAction("no free segment id".to_string()));
                }
                Ok(())
            }
            MapEdit::SetActiveAreas(_) | MapEdit::SetZones { .. } => Ok(()),
        }
    }

    /// Validate and apply the edit
    pub fn apply(&self, map: &mut MapState) -> Result<EditOutcome> {
        self.validate(map)?;
        if map.temporary_map && self.is_destructive() {
            log::debug!("Temporary map {}, skipping {:?}", map.map_id, self);
            return Ok(EditOutcome::Skipped);
        }

        match self {
            MapEdit::SetActiveSegments(ids) => map.active_segments = ids.clone(),
            MapEdit::SetActiveAreas(areas) => map.zones.active_areas = areas.clone(),
            MapEdit::SetZones {
                no_go_areas,
                no_mopping_areas,
                virtual_walls,
            } => {
                map.zones.no_go_areas = no_go_areas.clone();
                map.zones.no_mopping_areas = no_mopping_areas.clone();
                map.zones.virtual_walls = virtual_walls.clone();
            }
            MapEdit::SetCleaningSequence(ids) => {
                for segment in map.segments.values_mut() {
                    let position = ids.iter().position(|id| *id == segment.id);
                    match position {
                        Some(i) => segment.cleaning_mut().order = i as u32 + 1,
                        None => {
                            if let Some(cleaning) = segment.cleaning.as_mut() {
                                cleaning.order = 0;
                            }
                        }
                    }
                }
            }
            MapEdit::SetCustomCleaning(settings) => {
                for (id, s) in settings {
                    if let Some(segment) = map.segments.get_mut(id) {
                        segment.cleaning = Some(*s);
                    }
                }
            }
            MapEdit::SetSegmentSuctionLevel { segment, level } => {
                segment_cleaning(map, *segment)?.suction_level = *level;
            }
            MapEdit::SetSegmentWaterVolume { segment, volume } => {
                segment_cleaning(map, *segment)?.water_volume = *volume;
            }
            MapEdit::SetSegmentCleaningTimes { segment, times } => {
                segment_cleaning(map, *segment)?.cleaning_times = *times;
            }
            MapEdit::SetSegmentCleaningMode { segment, mode } => {
                segment_cleaning(map, *segment)?.mode = Some(*mode);
            }
            MapEdit::SetSegmentOrder { segment, order } => {
                segment_cleaning(map, *segment)?.order = *order;
            }
            MapEdit::SetSegmentName {
                segment,
                room_type,
                custom_name,
            } => {
                if let Some(s) = map.segments.get_mut(segment) {
                    s.room_type = *room_type;
                    s.custom_name = custom_name.as_ref().map(|n| n.trim().to_string());
                    s.refresh_name();
                    log::debug!(
                        "Segment {} renamed to {:?} ({})",
                        segment,
                        s.name,
                        room_type_name(*room_type)
                    );
                }
            }
            MapEdit::SetRotation(degrees) => map.rotation = degrees.rem_euclid(360),
            MapEdit::SetObstacleIgnore { obstacle, ignored } => {
                if let Some(o) = map.obstacles.get_mut(obstacle) {
                    o.ignored = *ignored;
                }
            }
            MapEdit::MergeSegments { keep, absorb } => {
                let moved = map.pixel_grid.relabel(*absorb, *keep);
                map.active_segments.retain(|id| id != absorb);
                rebuild_segments(map);
                log::info!(
                    "Merged segment {} into {} ({} pixels)",
                    absorb,
                    keep,
                    moved
                );
            }
            MapEdit::SplitSegment { segment, line } => split(map, *segment, *line)?,
        }

        map.last_edited_frame_id = Some(map.frame_id);
        Ok(EditOutcome::Applied)
    }
}

fn segment_cleaning(map: &mut MapState, segment: u8) -> Result<&mut CleaningSettings> {
    map.segments
        .get_mut(&segment)
        .map(|s| s.cleaning_mut())
        .ok_or_else(|| Error::InvalidValue(format!("unknown segment {}", segment)))
}

fn split(map: &mut MapState, segment: u8, line: Line) -> Result<()> {
    let new_id = map
        .next_free_segment_id()
        .filter(|id| *id <= MAX_SEGMENT_ID)
        .ok_or_else(|| Error::InvalidAction("no free segment id".to_string()))?;

    let mut left = Vec::new();
    let mut right = 0usize;
    for (coord, pixel) in map.pixel_grid.iter() {
        if pixel.segment_id() != Some(segment) {
            continue;
        }
        if line.side(map.dimensions.to_world(coord)) > 0 {
            left.push((coord, pixel.is_carpet()));
        } else {
            right += 1;
        }
    }
    if left.is_empty() || right == 0 {
        return Err(Error::InvalidAction(format!(
            "split line does not divide segment {}",
            segment
        )));
    }

    for (coord, carpet) in &left {
        map.pixel_grid.set(*coord, Pixel::segment(new_id, *carpet));
    }
    rebuild_segments(map);
    log::info!(
        "Split {} pixels of segment {} into new segment {}",
        left.len(),
        segment,
        new_id
    );
    Ok(())
}

/// Re-derive segment geometry after a pixel relabel, keeping user attributes
fn rebuild_segments(map: &mut MapState) {
    let previous = std::mem::take(&mut map.segments);
    let mut segments = extract_segments(&map.pixel_grid, &map.dimensions);
    for (id, segment) in segments.iter_mut() {
        if let Some(prev) = previous.get(id) {
            segment.inherit(prev);
            segment.refresh_name();
        }
    }
    map.segments = segments;
    map.recompute_carpet_pixels();
}
