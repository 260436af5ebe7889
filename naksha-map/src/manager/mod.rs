//! Map Manager: owns the live map of one device.
//!
//! # Threads
//!
//! ```text
//!   caller threads ──► MapManager (edits, handle_raw_frame, current_map)
//!                          │
//!                          ▼
//!                    Mutex<MapStore>   ◄── map-poller thread
//!                          │               (select! on shutdown / interval)
//!                          ▼
//!                    ListenerSet ──► callbacks (outside any lock)
//! ```
//!
//! Network calls never run with the store locked. Frames that finish
//! downloading after [`MapManager::disconnect`] are discarded.
//!
//! # Delivery paths
//!
//! - **Local RPC**: used when a fresh Initial frame is wanted (or no map is
//!   known yet) and the device is reachable on the LAN.
//! - **Cloud**: property history → object name → signed URL → bytes.

mod debounce;
mod listeners;
mod sequencer;
mod source;
mod url_cache;

pub use debounce::Debouncer;
pub use listeners::{
    AvailabilityCallback, ChangeCallback, ErrorCallback, Listener, ListenerSet, SubscriptionId,
    UpdateCallback,
};
pub use sequencer::{FrameOutcome, FrameSequencer, MIN_VALID_TIMESTAMP_MS, SequencerAction};
pub use source::{
    CloudStorage, DeviceRpc, PIID_MAP_DATA, PIID_MAP_LIST, PIID_MAP_REQUEST, PIID_OBJECT_NAME,
    PIID_ROBOT_TIME, PropertyRecord, RpcParameter, RpcResponse,
};
pub use url_cache::UrlCache;

use crate::codec::{self, FrameType};
use crate::config::NakshaConfig;
use crate::core::{Area, Line};
use crate::editor::{EditOutcome, MapEdit};
use crate::error::{Error, Result};
use crate::map::{CleaningSettings, MapState};
use crate::merger::MapBuilder;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, select};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Manager lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Connected, no map yet
    Idle,
    /// A map request or gap recovery is outstanding
    AwaitingFrame,
    /// Live map in sync
    Ready,
}

/// One entry of the device's saved map list
#[derive(Clone, Debug, Deserialize)]
pub struct SavedMapEntry {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Codec input string of the saved map
    pub data: String,
}

/// Everything guarded by the single map mutex
struct MapStore {
    sequencer: FrameSequencer,
    saved: BTreeMap<u32, MapState>,
    selected_map_id: Option<u32>,
    state: ConnectionState,
    /// Explicit request for a fresh Initial frame
    map_requested: bool,
    request_attempts: u32,
    consecutive_failures: u32,
    update_failed: bool,
    available: bool,
    /// Cloud history watermark (epoch seconds) and the value seen at it
    history_time: u64,
    history_value: Option<String>,
}

impl MapStore {
    fn refresh_state(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = if self.map_requested || self.sequencer.awaiting_initial() {
            ConnectionState::AwaitingFrame
        } else if self.sequencer.current().is_some() {
            ConnectionState::Ready
        } else {
            ConnectionState::Idle
        };
    }
}

struct Shared {
    config: NakshaConfig,
    builder: MapBuilder,
    device: Option<Arc<dyn DeviceRpc>>,
    cloud: Option<Arc<dyn CloudStorage>>,
    store: Mutex<MapStore>,
    url_cache: Mutex<UrlCache>,
    listeners: Arc<ListenerSet>,
    disconnected: AtomicBool,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn value_as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Parse a saved map list (`[{id, name, data}, ...]`)
pub fn parse_map_list(value: &str) -> Result<Vec<SavedMapEntry>> {
    Ok(serde_json::from_str(value)?)
}

impl Shared {
    fn local_available(&self) -> bool {
        self.device.is_some() && !self.config.device.cloud_only
    }

    /// Decode, sequence and merge one frame.
    ///
    /// Returns `None` when the manager was torn down while the frame was in
    /// flight. With `follow_up`, missing-frame requests are sent to the
    /// device right away.
    fn ingest(&self, raw: &str, received_ms: u64, follow_up: bool) -> Result<Option<FrameOutcome>> {
        let device = &self.config.device;
        let frame = codec::decode(raw, device.aes_iv.as_deref(), device.aes_key.as_deref())
            .inspect_err(|e| log::warn!("Dropping undecodable frame: {}", e))?;
        let frame_type = frame.frame_type;

        if self.disconnected.load(Ordering::SeqCst) {
            log::debug!("Manager disconnected, discarding frame {:?}", frame.key());
            return Ok(None);
        }

        let (outcome, actions) = {
            let mut store = self.store.lock();
            let outcome = store.sequencer.push(frame, received_ms);
            let actions = store.sequencer.take_actions();
            if let Ok(FrameOutcome::Applied { .. }) = outcome
                && frame_type == FrameType::Initial
            {
                store.map_requested = false;
                store.request_attempts = 0;
            }
            store.refresh_state();
            (outcome, actions)
        };

        let outcome = outcome.inspect_err(|e| log::warn!("Frame rejected: {}", e))?;
        match outcome {
            FrameOutcome::Applied { .. } | FrameOutcome::WifiUpdated => {
                self.listeners.notify_change(false)
            }
            FrameOutcome::Buffered | FrameOutcome::Duplicate | FrameOutcome::Stale => {}
        }
        self.run_actions(actions, follow_up);
        Ok(Some(outcome))
    }

    fn run_actions(&self, actions: Vec<SequencerAction>, follow_up: bool) {
        for action in actions {
            match action {
                SequencerAction::RequestInitialFrame => {
                    let mut store = self.store.lock();
                    if !store.map_requested {
                        log::info!("Requesting a new map on the next poll");
                        store.map_requested = true;
                        store.request_attempts = 0;
                    }
                    store.refresh_state();
                }
                SequencerAction::RequestMissingFrame { map_id, frame_id } => {
                    if !follow_up || !self.local_available() {
                        log::debug!(
                            "Frame {}/{} missing, waiting for it to arrive",
                            map_id,
                            frame_id
                        );
                        continue;
                    }
                    let request = json!({
                        "req_type": 1,
                        "frame_type": "P",
                        "frame_id": frame_id,
                    });
                    if let Err(e) = self.request_local(request, false) {
                        log::warn!("Request for frame {}/{} failed: {}", map_id, frame_id, e);
                    }
                }
            }
        }
    }

    /// Send a map request to the device and ingest whatever it returns
    fn request_local(&self, request: Value, follow_up: bool) -> Result<usize> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| Error::Config("no local device RPC".to_string()))?;
        let response =
            device.request_map(&[RpcParameter::new(PIID_MAP_REQUEST, request.to_string())])?;
        if response.code != 0 {
            return Err(Error::Transport(format!(
                "map request returned code {}",
                response.code
            )));
        }

        let received_ms = response
            .value(PIID_ROBOT_TIME)
            .and_then(value_as_u64)
            .map(|secs| secs * 1000)
            .unwrap_or_else(now_ms);

        if let Some(list) = response.string(PIID_MAP_LIST) {
            self.load_saved_maps(&parse_map_list(list)?);
        }

        if let Some(raw) = response.string(PIID_MAP_DATA) {
            self.ingest(raw, received_ms, follow_up)?;
            Ok(1)
        } else if let Some(object_name) = response.string(PIID_OBJECT_NAME) {
            let raw = self.fetch_object(object_name)?;
            self.ingest(&raw, received_ms, follow_up)?;
            Ok(1)
        } else {
            Err(Error::Transport("map response carried no map data".to_string()))
        }
    }

    /// Download an object through the URL cache
    fn fetch_object(&self, object_name: &str) -> Result<String> {
        let cloud = self
            .cloud
            .as_ref()
            .ok_or_else(|| Error::Config("no cloud storage for object download".to_string()))?;

        let cached = self
            .url_cache
            .lock()
            .get(object_name, Instant::now())
            .map(str::to_string);
        let url = match cached {
            Some(url) => url,
            None => {
                let url = cloud.get_file_url(object_name)?;
                self.url_cache
                    .lock()
                    .insert(object_name, url.clone(), Instant::now());
                url
            }
        };

        match cloud.get_file(&url) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                self.url_cache.lock().invalidate(object_name);
                Err(e)
            }
        }
    }

    /// Walk the map property history after the watermark
    fn poll_cloud(&self) -> Result<usize> {
        let cloud = self
            .cloud
            .as_ref()
            .ok_or_else(|| Error::Config("no cloud storage".to_string()))?;
        let (since, last_value) = {
            let store = self.store.lock();
            (store.history_time, store.history_value.clone())
        };

        let mut records = cloud.get_device_property(
            &self.config.cloud.map_data_key,
            self.config.cloud.history_limit,
            since,
            now_ms() / 1000,
        )?;
        records.sort_by_key(|r| r.time);

        let mut applied = 0;
        for record in records {
            if record.time < since
                || (record.time == since && last_value.as_deref() == Some(record.value.as_str()))
            {
                continue;
            }
            let raw = match serde_json::from_str::<Value>(&record.value) {
                Ok(Value::Array(parts)) => {
                    let object_name = parts.first().and_then(Value::as_str).unwrap_or_default();
                    let data = self.fetch_object(object_name)?;
                    match parts.get(1).and_then(Value::as_str) {
                        Some(key) if !key.is_empty() => format!("{},{}", data.trim(), key),
                        _ => data,
                    }
                }
                Ok(Value::String(inline)) => inline,
                _ => record.value.clone(),
            };

            match self.ingest(&raw, record.time * 1000, true) {
                Ok(Some(FrameOutcome::Applied { .. })) => applied += 1,
                Ok(_) => {}
                Err(Error::Decode(e)) => {
                    log::warn!("Skipping history record at {}: {}", record.time, e)
                }
                Err(e) => return Err(e),
            }

            let mut store = self.store.lock();
            store.history_time = record.time;
            store.history_value = Some(record.value);
        }
        Ok(applied)
    }

    /// One poll tick: fetch, then fold the outcome into the failure counters
    fn poll_once(&self) -> Result<usize> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let want_initial = {
            let store = self.store.lock();
            store.map_requested
                || store.sequencer.current().is_none()
                || store.sequencer.awaiting_initial()
        };

        let result = if (want_initial && self.local_available()) || self.cloud.is_none() {
            if !self.local_available() {
                return Err(Error::Config(
                    "neither local RPC nor cloud storage is available".to_string(),
                ));
            }
            self.request_local(json!({"req_type": 1, "frame_type": "I", "force_type": 1}), true)
        } else {
            self.poll_cloud()
        };

        self.record_poll(&result);
        result
    }

    fn record_poll(&self, result: &Result<usize>) {
        let mut notify_error = None;
        let mut notify_available = None;
        {
            let mut store = self.store.lock();
            match result {
                Ok(_) => {
                    store.consecutive_failures = 0;
                    if store.update_failed {
                        log::info!("Map updates recovered");
                        store.update_failed = false;
                    }
                    if !store.available {
                        store.available = true;
                        notify_available = Some(true);
                    }
                }
                Err(e) => {
                    log::warn!("Map poll failed: {}", e);
                    store.consecutive_failures += 1;
                    if matches!(e, Error::Transport(_)) && self.cloud.is_some() && store.available {
                        store.available = false;
                        notify_available = Some(false);
                    }
                    if store.consecutive_failures >= self.config.polling.failure_budget
                        && !store.update_failed
                    {
                        store.update_failed = true;
                        notify_error = Some(Error::DeviceUpdateFailed(format!(
                            "{} consecutive poll failures, last: {}",
                            store.consecutive_failures, e
                        )));
                    }
                }
            }
            // Applying an Initial clears the request, so anything left counts
            if store.map_requested {
                store.request_attempts += 1;
                if store.request_attempts >= self.config.recovery.request_retry_budget {
                    log::warn!(
                        "Giving up on map request after {} attempts",
                        store.request_attempts
                    );
                    store.map_requested = false;
                    store.request_attempts = 0;
                    store.sequencer.abandon_initial_request();
                }
            }
            store.refresh_state();
        }

        if let Some(available) = notify_available {
            self.listeners.notify_availability(available);
        }
        if let Some(error) = notify_error {
            log::error!("{}", error);
            self.listeners.notify_error(&error);
        }
    }

    fn load_saved_maps(&self, entries: &[SavedMapEntry]) {
        let device = &self.config.device;
        let mut saved = BTreeMap::new();
        for entry in entries {
            let frame = match codec::decode(
                &entry.data,
                device.aes_iv.as_deref(),
                device.aes_key.as_deref(),
            ) {
                Ok(frame) if frame.frame_type == FrameType::Initial => frame,
                Ok(frame) => {
                    log::warn!(
                        "Saved map {} has frame type {:?}, skipping",
                        entry.id,
                        frame.frame_type
                    );
                    continue;
                }
                Err(e) => {
                    log::warn!("Saved map {} could not be decoded: {}", entry.id, e);
                    continue;
                }
            };
            match self.builder.merge(None, &frame) {
                Ok(mut state) => {
                    state.map_id = entry.id;
                    state.saved_map = true;
                    state.name = entry.name.clone();
                    saved.insert(entry.id, state);
                }
                Err(e) => log::warn!("Saved map {} could not be built: {}", entry.id, e),
            }
        }

        {
            let mut store = self.store.lock();
            if store
                .selected_map_id
                .is_some_and(|id| !saved.contains_key(&id))
            {
                store.selected_map_id = None;
            }
            log::info!("Loaded {} saved maps", saved.len());
            store.saved = saved;
        }
        self.listeners.notify_change(true);
    }
}

/// `_exited` is dropped when the loop returns, which `disconnect` waits on
fn run_poll_loop(shared: Arc<Shared>, shutdown_rx: Receiver<()>, _exited: Sender<()>) {
    log::info!("Map poller starting");
    loop {
        // Failures are already logged and counted by poll_once
        let _ = shared.poll_once();

        let cleaning = shared
            .store
            .lock()
            .sequencer
            .current()
            .is_some_and(|m| m.cleaning);
        let interval = shared.config.poll_interval(cleaning);
        select! {
            recv(shutdown_rx) -> _ => break,
            default(interval) => {}
        }
    }
    log::info!("Map poller exiting");
}

/// Owner of one device's map pipeline
pub struct MapManager {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    shutdown_tx: Option<Sender<()>>,
    poller: Option<(JoinHandle<()>, Receiver<()>)>,
}

impl MapManager {
    /// Create a manager. Nothing runs until [`connect`](Self::connect).
    pub fn new(
        config: NakshaConfig,
        device: Option<Arc<dyn DeviceRpc>>,
        cloud: Option<Arc<dyn CloudStorage>>,
    ) -> Result<Self> {
        let builder = MapBuilder::new(config.device.vslam)
            .with_encryption(config.device.aes_key.clone(), config.device.aes_iv.clone());
        let listeners = Arc::new(ListenerSet::default());

        let debounce_listeners = listeners.clone();
        let debouncer = Debouncer::spawn(
            "map-edit-debounce",
            Duration::from_millis(config.editor.debounce_ms),
            move || debounce_listeners.notify_update(),
        )?;

        let store = MapStore {
            sequencer: FrameSequencer::new(builder.clone(), config.recovery.clone()),
            saved: BTreeMap::new(),
            selected_map_id: None,
            state: ConnectionState::Disconnected,
            map_requested: false,
            request_attempts: 0,
            consecutive_failures: 0,
            update_failed: false,
            available: true,
            history_time: 0,
            history_value: None,
        };
        let url_cache = UrlCache::new(Duration::from_secs(config.cloud.file_url_ttl_secs));

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                builder,
                device,
                cloud,
                store: Mutex::new(store),
                url_cache: Mutex::new(url_cache),
                listeners,
                disconnected: AtomicBool::new(false),
            }),
            debouncer,
            shutdown_tx: None,
            poller: None,
        })
    }

    /// Start the polling thread
    pub fn connect(&mut self) -> Result<()> {
        if self.poller.is_some() {
            return Ok(());
        }
        self.shared.disconnected.store(false, Ordering::SeqCst);
        self.shared.listeners.set_muted(false);
        self.shared.store.lock().state = ConnectionState::Connecting;

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let (exited_tx, exited_rx) = bounded::<()>(0);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("map-poller".into())
            .spawn(move || run_poll_loop(shared, shutdown_rx, exited_tx))
            .inspect_err(|_| self.shared.store.lock().state = ConnectionState::Disconnected)?;

        self.shutdown_tx = Some(shutdown_tx);
        self.poller = Some((handle, exited_rx));
        let mut store = self.shared.store.lock();
        store.state = ConnectionState::Idle;
        store.refresh_state();
        Ok(())
    }

    /// Stop polling. In-flight results are discarded and callbacks muted.
    ///
    /// A poller stuck in a network call past `shutdown_timeout_ms` is
    /// detached; whatever it fetches is dropped.
    pub fn disconnect(&mut self) {
        self.shared.disconnected.store(true, Ordering::SeqCst);
        self.shared.listeners.set_muted(true);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some((handle, exited)) = self.poller.take() {
            let timeout = Duration::from_millis(self.shared.config.polling.shutdown_timeout_ms);
            match exited.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("Map poller busy after {:?}, detaching it", timeout)
                }
                _ => {
                    if handle.join().is_err() {
                        log::error!("Map poller panicked");
                    }
                }
            }
        }
        self.shared.store.lock().state = ConnectionState::Disconnected;
    }

    /// Run one poll cycle on the calling thread
    pub fn poll_once(&self) -> Result<usize> {
        self.shared.poll_once()
    }

    /// Ask for a fresh Initial frame on the next poll
    pub fn request_new_map(&self) {
        let mut store = self.shared.store.lock();
        store.map_requested = true;
        store.request_attempts = 0;
        store.refresh_state();
    }

    /// Feed a frame received out of band (e.g. pushed by the device)
    pub fn handle_raw_frame(&self, raw: &str) -> Result<Option<FrameOutcome>> {
        self.shared.ingest(raw, now_ms(), true)
    }

    /// Fetch and decode the saved map list
    pub fn refresh_saved_maps(&self) -> Result<usize> {
        let list = if let Some(cloud) = self.shared.cloud.as_ref() {
            let records = cloud.get_device_property(
                &self.shared.config.cloud.map_list_key,
                1,
                0,
                now_ms() / 1000,
            )?;
            records
                .into_iter()
                .max_by_key(|r| r.time)
                .map(|r| r.value)
                .ok_or_else(|| Error::Transport("no saved map list in history".to_string()))?
        } else {
            let device = self
                .shared
                .device
                .as_ref()
                .ok_or_else(|| Error::Config("no device or cloud configured".to_string()))?;
            let request = json!({"req_type": 1, "frame_type": "I", "map_list": 1}).to_string();
            let response = device.request_map(&[RpcParameter::new(PIID_MAP_REQUEST, request)])?;
            response
                .string(PIID_MAP_LIST)
                .map(str::to_string)
                .ok_or_else(|| Error::Transport("map list missing from response".to_string()))?
        };

        // History values may wrap the list in a JSON string
        let list = match serde_json::from_str::<Value>(&list) {
            Ok(Value::String(inner)) => inner,
            _ => list,
        };
        let entries = parse_map_list(&list)?;
        self.shared.load_saved_maps(&entries);
        Ok(self.shared.store.lock().saved.len())
    }

    /// Snapshot of the live map
    pub fn current_map(&self) -> Option<MapState> {
        self.shared.store.lock().sequencer.current().cloned()
    }

    /// Snapshot of the latest wifi map
    pub fn wifi_map(&self) -> Option<MapState> {
        self.shared.store.lock().sequencer.wifi().cloned()
    }

    /// Snapshot of the saved maps
    pub fn saved_maps(&self) -> BTreeMap<u32, MapState> {
        self.shared.store.lock().saved.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.store.lock().state
    }

    /// Cloud reachable as of the last poll
    pub fn is_available(&self) -> bool {
        self.shared.store.lock().available
    }

    /// Frames buffered for a map id
    pub fn pending_frame_ids(&self, map_id: u32) -> Vec<u32> {
        self.shared.store.lock().sequencer.pending_frame_ids(map_id)
    }

    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.shared.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    /// Mark a saved map as the one the live map corresponds to
    pub fn set_selected_map(&self, map_id: Option<u32>) -> Result<()> {
        let mut store = self.shared.store.lock();
        if let Some(id) = map_id
            && !store.saved.contains_key(&id)
        {
            return Err(Error::InvalidValue(format!("unknown saved map {}", id)));
        }
        store.selected_map_id = map_id;
        Ok(())
    }

    /// Apply an edit to the live map (and its saved copy when selected)
    pub fn apply_edit(&self, edit: MapEdit) -> Result<EditOutcome> {
        let outcome = {
            let mut guard = self.shared.store.lock();
            let store = &mut *guard;
            let current = store
                .sequencer
                .current_mut()
                .ok_or_else(|| Error::InvalidAction("no map to edit".to_string()))?;
            let outcome = edit.apply(current)?;
            let map_id = current.map_id;

            if outcome == EditOutcome::Applied
                && store.selected_map_id == Some(map_id)
                && let Some(saved) = store.saved.get_mut(&map_id)
                && let Err(e) = edit.apply(saved)
            {
                log::warn!("Edit not mirrored to saved map {}: {}", map_id, e);
            }
            outcome
        };
        if outcome == EditOutcome::Applied {
            self.debouncer.trigger();
        }
        Ok(outcome)
    }

    pub fn set_active_segments(&self, segments: Vec<u8>) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetActiveSegments(segments))
    }

    pub fn set_active_areas(&self, areas: Vec<Area>) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetActiveAreas(areas))
    }

    pub fn set_zones(
        &self,
        no_go_areas: Vec<Area>,
        no_mopping_areas: Vec<Area>,
        virtual_walls: Vec<Line>,
    ) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetZones {
            no_go_areas,
            no_mopping_areas,
            virtual_walls,
        })
    }

    pub fn set_cleaning_sequence(&self, sequence: Vec<u8>) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetCleaningSequence(sequence))
    }

    /// Replace the cleaning settings of the listed segments
    pub fn set_custom_cleaning(
        &self,
        settings: BTreeMap<u8, CleaningSettings>,
    ) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetCustomCleaning(settings))
    }

    pub fn set_segment_suction_level(&self, segment: u8, level: u8) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentSuctionLevel { segment, level })
    }

    pub fn set_segment_water_volume(&self, segment: u8, volume: u8) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentWaterVolume { segment, volume })
    }

    pub fn set_segment_cleaning_times(&self, segment: u8, times: u8) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentCleaningTimes { segment, times })
    }

    pub fn set_segment_cleaning_mode(&self, segment: u8, mode: u8) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentCleaningMode { segment, mode })
    }

    pub fn set_segment_order(&self, segment: u8, order: u32) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentOrder { segment, order })
    }

    pub fn set_segment_name(
        &self,
        segment: u8,
        room_type: u8,
        custom_name: Option<String>,
    ) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetSegmentName {
            segment,
            room_type,
            custom_name,
        })
    }

    pub fn set_rotation(&self, degrees: i32) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetRotation(degrees))
    }

    pub fn set_obstacle_ignore(&self, obstacle: u32, ignored: bool) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SetObstacleIgnore { obstacle, ignored })
    }

    pub fn merge_segments(&self, keep: u8, absorb: u8) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::MergeSegments { keep, absorb })
    }

    pub fn split_segment(&self, segment: u8, line: Line) -> Result<EditOutcome> {
        self.apply_edit(MapEdit::SplitSegment { segment, line })
    }
}

impl Drop for MapManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
