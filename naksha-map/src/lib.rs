//! # NakshaMap
//!
//! Map frame decoding and incremental map reconstruction for robot vacuums
//! that stream compressed binary map frames.
//!
//! ## Overview
//!
//! ```text
//! raw frame ──► codec::decode ──► PartialFrame
//!                                      │
//!                                      ▼
//!              MapState (prev) ──► merger ──► MapState (next)
//!                                      ▲
//!                   FrameSequencer ────┘  (ordering, gaps, dedup)
//! ```
//!
//! - **Codec**: base64, optional AES-256-CBC, zlib, 27-byte header, bitmap
//!   and trailing JSON metadata.
//! - **Map model**: pixel grid, segments (rooms), zones, obstacles,
//!   furniture and the robot path.
//! - **Merger**: `Initial` frames rebuild, `Partial` frames patch, embedded
//!   saved maps are spliced in.
//! - **Manager**: polls the device or the cloud, sequences frames and
//!   notifies subscribers.
//! - **Editor**: optimistic local edits protected against stale device
//!   frames by an edit watermark.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use naksha_map::{decode, merge};
//!
//! let frame = decode(&raw, None, Some("vendor-key"))?;
//! let map = merge(None, &frame, false)?;
//! println!("{} rooms", map.segments.len());
//! ```
//!
//! ## Coordinates
//!
//! World coordinates are device units (mm). Grid cell `(x, y)` covers
//! `left + x * grid_size ..` horizontally and `top + y * grid_size ..`
//! vertically; its center is reported by [`core::Dimensions::to_world`].

pub mod codec;
pub mod config;
pub mod core;
pub mod editor;
pub mod error;
pub mod manager;
pub mod map;
pub mod merger;

pub use codec::{FrameType, PartialFrame, decode};
pub use config::NakshaConfig;
pub use editor::{EditOutcome, MapEdit};
pub use error::{DecodeError, Error, Result};
pub use manager::{ConnectionState, FrameSequencer, Listener, MapManager};
pub use map::MapState;
pub use merger::{MapBuilder, merge};
