//! Frame sequencing and gap recovery.
//!
//! Partial frames only apply on top of their direct predecessor. Frames that
//! arrive early are buffered per map id until the gap closes; gaps that stay
//! open escalate from re-requesting the missing frame to requesting a fresh
//! Initial frame.
//!
//! ```text
//!   Initial ─────────────► apply, drop superseded backlog, flush
//!   Partial, no base ────► buffer + RequestInitialFrame (once)
//!                          backlog > 8: drop backlog
//!   Partial ≤ current ───► Duplicate
//!   Partial, older ts ───► Stale
//!   Partial = current+1 ─► apply, flush
//!   Partial > current+1 ─► buffer + RequestMissingFrame (once per gap)
//!                          backlog > 4: re-request once
//!                          backlog > 8: RequestInitialFrame, drop backlog
//! ```

use crate::codec::{FrameType, PartialFrame};
use crate::config::RecoveryConfig;
use crate::error::Result;
use crate::map::MapState;
use crate::merger::MapBuilder;
use std::collections::{BTreeMap, BTreeSet};

/// Earliest plausible frame timestamp (2020-01-01 UTC, epoch ms).
///
/// Smaller values are device uptime, not wall-clock time.
pub const MIN_VALID_TIMESTAMP_MS: u64 = 1_577_836_800_000;

/// Side effects requested by the sequencer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerAction {
    /// Ask the device to resend one partial frame
    RequestMissingFrame { map_id: u32, frame_id: u32 },
    /// Ask the device for a complete map
    RequestInitialFrame,
}

/// What happened to a pushed frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame (and `flushed` buffered successors) applied; map now at `frame_id`
    Applied { frame_id: u32, flushed: usize },
    /// Waiting for a predecessor or a base map
    Buffered,
    /// Already applied
    Duplicate,
    /// Older than the applied frame
    Stale,
    /// Wifi map replaced
    WifiUpdated,
}

/// Reassembles the frame stream of one device
#[derive(Debug)]
pub struct FrameSequencer {
    builder: MapBuilder,
    recovery: RecoveryConfig,
    current: Option<MapState>,
    wifi: Option<MapState>,
    pending: BTreeMap<u32, BTreeMap<u32, PartialFrame>>,
    requested_missing: BTreeSet<(u32, u32)>,
    rerequested: BTreeSet<(u32, u32)>,
    initial_requested: bool,
    actions: Vec<SequencerAction>,
}

impl FrameSequencer {
    pub fn new(builder: MapBuilder, recovery: RecoveryConfig) -> Self {
        Self {
            builder,
            recovery,
            current: None,
            wifi: None,
            pending: BTreeMap::new(),
            requested_missing: BTreeSet::new(),
            rerequested: BTreeSet::new(),
            initial_requested: false,
            actions: Vec::new(),
        }
    }

    /// Live map
    pub fn current(&self) -> Option<&MapState> {
        self.current.as_ref()
    }

    /// Live map, for local edits
    pub fn current_mut(&mut self) -> Option<&mut MapState> {
        self.current.as_mut()
    }

    /// Latest wifi map
    pub fn wifi(&self) -> Option<&MapState> {
        self.wifi.as_ref()
    }

    /// Buffered frames for a map id
    pub fn pending_count(&self, map_id: u32) -> usize {
        self.pending.get(&map_id).map_or(0, |p| p.len())
    }

    /// Buffered frame ids for a map id, ascending
    pub fn pending_frame_ids(&self, map_id: u32) -> Vec<u32> {
        self.pending
            .get(&map_id)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    /// An Initial frame has been requested and not yet received
    pub fn awaiting_initial(&self) -> bool {
        self.initial_requested
    }

    /// Drain side effects accumulated since the last call
    pub fn take_actions(&mut self) -> Vec<SequencerAction> {
        std::mem::take(&mut self.actions)
    }

    /// Forget everything (map switch or disconnect)
    pub fn reset(&mut self) {
        self.current = None;
        self.wifi = None;
        self.pending.clear();
        self.requested_missing.clear();
        self.rerequested.clear();
        self.initial_requested = false;
        self.actions.clear();
    }

    /// Request a fresh Initial frame unless one is already outstanding
    pub fn request_initial(&mut self) {
        if !self.initial_requested {
            self.initial_requested = true;
            self.actions.push(SequencerAction::RequestInitialFrame);
        }
    }

    /// Stop waiting for a requested Initial frame. Frames keep being
    /// sequenced against whatever base is current.
    pub fn abandon_initial_request(&mut self) {
        if self.initial_requested {
            log::info!("No longer waiting for an Initial frame");
            self.initial_requested = false;
        }
    }

    /// Feed one decoded frame. `received_ms` replaces implausible timestamps.
    pub fn push(&mut self, mut frame: PartialFrame, received_ms: u64) -> Result<FrameOutcome> {
        match frame.timestamp_ms {
            Some(ts) if ts >= MIN_VALID_TIMESTAMP_MS => {}
            _ => frame.timestamp_ms = Some(received_ms),
        }

        match frame.frame_type {
            FrameType::Wifi => {
                self.wifi = Some(self.builder.merge(self.wifi.as_ref(), &frame)?);
                Ok(FrameOutcome::WifiUpdated)
            }
            FrameType::Initial => self.push_initial(frame),
            FrameType::Partial => self.push_partial(frame),
        }
    }

    fn push_initial(&mut self, frame: PartialFrame) -> Result<FrameOutcome> {
        let state = self.builder.merge(self.current.as_ref(), &frame)?;
        let (map_id, frame_id) = (state.map_id, state.frame_id);
        log::info!("Initial frame {}/{} applied", map_id, frame_id);

        self.current = Some(state);
        self.initial_requested = false;
        self.pending.retain(|id, _| *id == map_id);
        if let Some(backlog) = self.pending.get_mut(&map_id) {
            backlog.retain(|id, _| *id > frame_id);
        }
        self.requested_missing.retain(|(m, f)| *m == map_id && *f > frame_id);
        self.rerequested.retain(|(m, f)| *m == map_id && *f > frame_id);

        let flushed = self.flush()?;
        Ok(FrameOutcome::Applied {
            frame_id: self.current_frame_id().unwrap_or(frame_id),
            flushed,
        })
    }

    fn push_partial(&mut self, frame: PartialFrame) -> Result<FrameOutcome> {
        let (map_id, frame_id) = frame.key();
        let Some(current) = self.current.as_ref().filter(|c| c.map_id == map_id) else {
            log::debug!("Partial frame {}/{} has no base map, buffering", map_id, frame_id);
            let backlog = self.pending.entry(map_id).or_default();
            backlog.insert(frame_id, frame);
            if backlog.len() > self.recovery.initial_request_threshold {
                log::warn!(
                    "Map {} has {} frames and no base map, dropping them",
                    map_id,
                    backlog.len()
                );
                self.pending.remove(&map_id);
            }
            self.request_initial();
            return Ok(FrameOutcome::Buffered);
        };

        if frame_id <= current.frame_id {
            log::debug!(
                "Duplicate frame {}/{} (current {})",
                map_id,
                frame_id,
                current.frame_id
            );
            return Ok(FrameOutcome::Duplicate);
        }
        if let Some(ts) = frame.timestamp_ms
            && current.timestamp_ms > 0
            && ts < current.timestamp_ms
        {
            log::debug!(
                "Stale frame {}/{} ({} < {})",
                map_id,
                frame_id,
                ts,
                current.timestamp_ms
            );
            return Ok(FrameOutcome::Stale);
        }

        let expected = current.frame_id + 1;
        if frame_id == expected {
            let state = self.builder.merge(self.current.as_ref(), &frame)?;
            self.current = Some(state);
            let flushed = self.flush()?;
            return Ok(FrameOutcome::Applied {
                frame_id: self.current_frame_id().unwrap_or(frame_id),
                flushed,
            });
        }

        self.pending.entry(map_id).or_default().insert(frame_id, frame);
        self.escalate(map_id, expected);
        Ok(FrameOutcome::Buffered)
    }

    fn escalate(&mut self, map_id: u32, missing: u32) {
        let backlog = self.pending_count(map_id);
        let gap = (map_id, missing);

        if backlog > self.recovery.initial_request_threshold {
            log::warn!(
                "Map {} has {} frames waiting for {}, requesting a new map",
                map_id,
                backlog,
                missing
            );
            self.pending.remove(&map_id);
            self.requested_missing.retain(|(m, _)| *m != map_id);
            self.rerequested.retain(|(m, _)| *m != map_id);
            self.request_initial();
        } else if self.requested_missing.insert(gap) {
            log::info!("Frame {}/{} missing, requesting it", map_id, missing);
            self.actions.push(SequencerAction::RequestMissingFrame {
                map_id,
                frame_id: missing,
            });
        } else if backlog > self.recovery.missing_frame_threshold && self.rerequested.insert(gap) {
            log::info!(
                "Frame {}/{} still missing with {} buffered, re-requesting",
                map_id,
                missing,
                backlog
            );
            self.actions.push(SequencerAction::RequestMissingFrame {
                map_id,
                frame_id: missing,
            });
        }
    }

    /// Apply buffered successors of the current frame
    fn flush(&mut self) -> Result<usize> {
        let mut flushed = 0;
        while let Some(current) = self.current.as_ref() {
            let (map_id, frame_id) = (current.map_id, current.frame_id);
            let Some(backlog) = self.pending.get_mut(&map_id) else {
                break;
            };
            backlog.retain(|id, _| *id > frame_id);
            let Some(next) = backlog.remove(&(frame_id + 1)) else {
                break;
            };
            let state = self.builder.merge(Some(current), &next)?;
            self.current = Some(state);
            flushed += 1;
        }

        if let Some(current) = self.current.as_ref() {
            let (map_id, frame_id) = (current.map_id, current.frame_id);
            self.requested_missing
                .retain(|(m, f)| *m != map_id || *f > frame_id);
            self.rerequested.retain(|(m, f)| *m != map_id || *f > frame_id);
            if self.pending.get(&map_id).is_some_and(|b| b.is_empty()) {
                self.pending.remove(&map_id);
            }
        }
        if flushed > 0 {
            log::debug!("Flushed {} buffered frames", flushed);
        }
        Ok(flushed)
    }

    fn current_frame_id(&self) -> Option<u32> {
        self.current.as_ref().map(|c| c.frame_id)
    }
}
