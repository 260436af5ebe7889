//! External collaborators: the device's local RPC and the vendor cloud.
//!
//! Both are black boxes to this crate. Implementations own authentication
//! and transport; calls block and may fail with [`Error::Transport`].
//!
//! [`Error::Transport`]: crate::error::Error::Transport

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property id carrying map data in a map RPC response
pub const PIID_MAP_DATA: u32 = 1;
/// Property id of the map request parameter
pub const PIID_MAP_REQUEST: u32 = 2;
/// Property id carrying a cloud object name in a map RPC response
pub const PIID_OBJECT_NAME: u32 = 3;
/// Property id carrying the robot clock in a map RPC response
pub const PIID_ROBOT_TIME: u32 = 5;
/// Property id carrying the saved map list
pub const PIID_MAP_LIST: u32 = 8;

/// One `{piid, value}` pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcParameter {
    pub piid: u32,
    pub value: Value,
}

impl RpcParameter {
    pub fn new(piid: u32, value: impl Into<Value>) -> Self {
        Self {
            piid,
            value: value.into(),
        }
    }
}

/// Device RPC reply
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// 0 on success
    pub code: i64,
    #[serde(default)]
    pub out: Vec<RpcParameter>,
}

impl RpcResponse {
    /// Value of an output property
    pub fn value(&self, piid: u32) -> Option<&Value> {
        self.out.iter().find(|p| p.piid == piid).map(|p| &p.value)
    }

    /// String value of an output property
    pub fn string(&self, piid: u32) -> Option<&str> {
        self.value(piid).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

/// One entry of a device property history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Record time, epoch seconds
    pub time: u64,
    /// Property value as reported (usually a JSON-encoded string)
    pub value: String,
}

/// Local (LAN) access to the device
pub trait DeviceRpc: Send + Sync {
    /// Invoke the map action
    fn request_map(&self, parameters: &[RpcParameter]) -> Result<RpcResponse>;
}

/// Vendor cloud object storage and property history
pub trait CloudStorage: Send + Sync {
    /// Signed download URL for an object
    fn get_file_url(&self, object_name: &str) -> Result<String>;

    /// Download bytes from a URL returned by [`get_file_url`](Self::get_file_url)
    fn get_file(&self, url: &str) -> Result<Vec<u8>>;

    /// Property history, newest first, `time_start..=time_end` in epoch seconds
    fn get_device_property(
        &self,
        key: &str,
        limit: u32,
        time_start: u64,
        time_end: u64,
    ) -> Result<Vec<PropertyRecord>>;
}
