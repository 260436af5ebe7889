//! Test utilities for NakshaMap.
//!
//! Builds synthetic device frames through the codec's encoder and provides
//! in-memory stand-ins for the device RPC and the cloud.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use naksha_map::codec::{FrameMetadata, encode};
use naksha_map::core::{Dimensions, Pose};
use naksha_map::error::{Error, Result};
use naksha_map::manager::{
    CloudStorage, DeviceRpc, PIID_MAP_DATA, PIID_OBJECT_NAME, PropertyRecord, RpcParameter,
    RpcResponse,
};
use naksha_map::{FrameType, PartialFrame};

/// Standard-layout device bytes
pub const WALL: u8 = 63;
pub const FLOOR: u8 = 0x80;

/// Plausible wall-clock base for frame timestamps (2023-11-14, epoch ms)
pub const BASE_TS: u64 = 1_700_000_000_000;

/// A frame with empty metadata
pub fn frame(
    frame_type: FrameType,
    map_id: u32,
    frame_id: u32,
    dimensions: Dimensions,
    raw_bitmap: Vec<u8>,
) -> PartialFrame {
    PartialFrame {
        map_id,
        frame_id,
        frame_type,
        robot: Pose::new(100, 100, 90),
        charger: Pose::new(0, 0, 0),
        dimensions,
        raw_bitmap,
        metadata: FrameMetadata::default(),
        timestamp_ms: Some(BASE_TS + frame_id as u64 * 1000),
    }
}

/// 4×4 Initial frame at the origin, grid 50, all segment 1 except a wall at (2, 2)
pub fn room_with_pillar(map_id: u32, frame_id: u32) -> PartialFrame {
    let mut bitmap = vec![1; 16];
    bitmap[2 * 4 + 2] = WALL;
    frame(
        FrameType::Initial,
        map_id,
        frame_id,
        Dimensions::new(0, 0, 4, 4, 50),
        bitmap,
    )
}

/// Two rooms side by side: segment 1 in columns 0-1, a wall column, segment 2 in 3-4
pub fn two_rooms(map_id: u32, frame_id: u32) -> PartialFrame {
    let row = [1, 1, WALL, 2, 2];
    let bitmap = row.iter().copied().cycle().take(row.len() * 3).collect();
    frame(
        FrameType::Initial,
        map_id,
        frame_id,
        Dimensions::new(0, 0, 5, 3, 50),
        bitmap,
    )
}

/// Partial frame without pixels
pub fn empty_partial(map_id: u32, frame_id: u32) -> PartialFrame {
    frame(
        FrameType::Partial,
        map_id,
        frame_id,
        Dimensions::new(0, 0, 0, 0, 50),
        Vec::new(),
    )
}

/// Encode without encryption
pub fn raw(frame: &PartialFrame) -> String {
    encode(frame, None, None).unwrap()
}

/// Scripted device: returns queued responses in order, records requests
#[derive(Default)]
pub struct MockDevice {
    responses: Mutex<VecDeque<Option<RpcResponse>>>,
    pub requests: Mutex<Vec<Vec<RpcParameter>>>,
}

impl MockDevice {
    /// Queue a successful response carrying inline map data
    pub fn push_frame(&self, raw: String) {
        self.responses.lock().push_back(Some(RpcResponse {
            code: 0,
            out: vec![RpcParameter::new(PIID_MAP_DATA, raw)],
        }));
    }

    /// Queue a successful response pointing at a cloud object
    pub fn push_object(&self, object_name: &str) {
        self.responses.lock().push_back(Some(RpcResponse {
            code: 0,
            out: vec![RpcParameter::new(PIID_OBJECT_NAME, object_name)],
        }));
    }

    pub fn push_response(&self, response: RpcResponse) {
        self.responses.lock().push_back(Some(response));
    }

    /// Queue a transport failure
    pub fn push_failure(&self) {
        self.responses.lock().push_back(None);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Request payloads (the piid 2 value) as JSON
    pub fn request_payloads(&self) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .iter()
            .filter_map(|params| params.first())
            .filter_map(|p| p.value.as_str())
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }
}

impl DeviceRpc for MockDevice {
    fn request_map(&self, parameters: &[RpcParameter]) -> Result<RpcResponse> {
        self.requests.lock().push(parameters.to_vec());
        match self.responses.lock().pop_front() {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(Error::Transport("device unreachable".to_string())),
            None => Err(Error::Transport("no scripted response".to_string())),
        }
    }
}

/// In-memory cloud: objects by name, property histories by key
#[derive(Default)]
pub struct MockCloud {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub properties: Mutex<HashMap<String, Vec<PropertyRecord>>>,
    pub offline: Mutex<bool>,
    pub url_requests: AtomicUsize,
}

impl MockCloud {
    pub fn put_object(&self, name: &str, bytes: Vec<u8>) {
        self.objects.lock().insert(name.to_string(), bytes);
    }

    pub fn push_property(&self, key: &str, time: u64, value: String) {
        self.properties
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(PropertyRecord { time, value });
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    fn check_online(&self) -> Result<()> {
        if *self.offline.lock() {
            Err(Error::Transport("cloud unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CloudStorage for MockCloud {
    fn get_file_url(&self, object_name: &str) -> Result<String> {
        self.check_online()?;
        self.url_requests.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://files.example/{}", object_name))
    }

    fn get_file(&self, url: &str) -> Result<Vec<u8>> {
        self.check_online()?;
        let name = url.trim_start_matches("https://files.example/");
        self.objects
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no object {}", name)))
    }

    fn get_device_property(
        &self,
        key: &str,
        limit: u32,
        time_start: u64,
        time_end: u64,
    ) -> Result<Vec<PropertyRecord>> {
        self.check_online()?;
        let mut records: Vec<PropertyRecord> = self
            .properties
            .lock()
            .get(key)
            .map(|all| {
                all.iter()
                    .filter(|r| r.time >= time_start && r.time <= time_end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Newest first, like the vendor API
        records.sort_by(|a, b| b.time.cmp(&a.time));
        records.truncate(limit as usize);
        Ok(records)
    }
}
