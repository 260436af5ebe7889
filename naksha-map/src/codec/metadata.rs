//! Trailing JSON metadata of a frame.
//!
//! Every field is optional and parsed leniently: a key whose value has an
//! unexpected shape is treated as absent instead of failing the whole frame.
//! Unknown keys are ignored.

use serde::de::{DeserializeOwned, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// List of numbers where elements may arrive as JSON numbers or numeric strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberList(pub Vec<f64>);

impl NumberList {
    /// Element as integer (truncated), if present
    pub fn int(&self, index: usize) -> Option<i64> {
        self.0.get(index).map(|v| *v as i64)
    }

    /// Element as float, if present
    pub fn float(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// First four elements as an `[x0, y0, x1, y1]` box
    pub fn rect(&self) -> Option<[i32; 4]> {
        if self.0.len() < 4 {
            return None;
        }
        Some([
            self.0[0] as i32,
            self.0[1] as i32,
            self.0[2] as i32,
            self.0[3] as i32,
        ])
    }
}

impl<'de> Deserialize<'de> for NumberList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        let numbers = values
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                serde_json::Value::Bool(b) => Some(*b as u8 as f64),
                _ => None,
            })
            .collect();
        Ok(NumberList(numbers))
    }
}

impl Serialize for NumberList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for v in &self.0 {
            if v.fract() == 0.0 {
                seq.serialize_element(&(*v as i64))?;
            } else {
                seq.serialize_element(v)?;
            }
        }
        seq.end()
    }
}

/// `vw`: user-drawn restrictions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RestrictionsMeta {
    /// Virtual walls
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<NumberList>>,
    /// No-go rectangles
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rect: Option<Vec<NumberList>>,
    /// No-mop rectangles
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mop: Option<Vec<NumberList>>,
}

/// `da2`: active cleaning areas
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveAreasMeta {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<NumberList>>,
}

/// `vws`: thresholds, ramps and curtains
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineSetsMeta {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vwsl: Option<Vec<NumberList>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ramp: Option<Vec<NumberList>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub curtain: Option<Vec<NumberList>>,
}

/// One `seg_inf` entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfoMeta {
    /// Neighbor segment ids
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub nei_id: Option<Vec<u8>>,
    /// Room type code
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub room_type: Option<u8>,
    /// Numeric suffix for repeated room types
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Custom name, base64 encoded
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Floor material code
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub material: Option<u8>,
    /// Visibility flag (0 hidden)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub visible: Option<u8>,
}

/// Typed view of the trailing JSON
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,

    /// Frame-map flag
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fsm: Option<i64>,

    /// Saved map status (0/1 legacy layout, 2 restored)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ris: Option<i64>,

    /// Embedded saved map, itself a codec input string
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rism: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rpur: Option<i64>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tm: Option<i64>,

    /// Recovery map flag
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rcm: Option<i64>,

    /// Map rotation in degrees
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mra: Option<i32>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vw: Option<RestrictionsMeta>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub da2: Option<ActiveAreasMeta>,

    /// Active segments, `[[id, ...], ...]`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sa: Option<Vec<NumberList>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub seg_inf: Option<BTreeMap<String, SegmentInfoMeta>>,

    /// Per-segment `[suction, water, repeats, order, (mode)]`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cleanset: Option<BTreeMap<String, NumberList>>,

    /// Path string
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tr: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ai_obstacle: Option<Vec<NumberList>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ai_furniture: Option<Vec<NumberList>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub carpet_info: Option<Vec<NumberList>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vws: Option<LineSetsMeta>,

    /// Cleaning state (1 while cleaning)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cs: Option<i64>,
}

impl FrameMetadata {
    /// Parse the bytes following the bitmap.
    ///
    /// Anything unparseable yields empty metadata; bytes after the first JSON
    /// value are ignored.
    pub fn parse(tail: &[u8]) -> Self {
        let start = tail
            .iter()
            .position(|b| !b.is_ascii_whitespace() && *b != 0)
            .unwrap_or(tail.len());
        let tail = &tail[start..];
        if tail.is_empty() {
            return Self::default();
        }
        match serde_json::Deserializer::from_slice(tail)
            .into_iter::<FrameMetadata>()
            .next()
        {
            Some(Ok(metadata)) => metadata,
            Some(Err(e)) => {
                log::debug!("Ignoring unparseable frame metadata: {}", e);
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Temporary map (`rpur` or `tm` set)
    pub fn is_temporary(&self) -> bool {
        self.rpur.unwrap_or(0) != 0 || self.tm.unwrap_or(0) != 0
    }

    /// Recovery map (`rcm` set)
    pub fn is_recovery(&self) -> bool {
        self.rcm.unwrap_or(0) != 0
    }

    /// Restored saved map (`ris == 2`)
    pub fn is_restored(&self) -> bool {
        self.ris == Some(2)
    }

    /// Device reports active cleaning
    pub fn is_cleaning(&self) -> Option<bool> {
        self.cs.map(|cs| cs == 1)
    }
}
