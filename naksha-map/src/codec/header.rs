//! Fixed-size frame header.
//!
//! ```text
//! offset  size  field
//!   0      2    map_id        u16
//!   2      2    frame_id      u16
//!   4      1    frame_type    u8 ('I', 'P', 'W')
//!   5      6    robot         i16 x, y, angle
//!  11      6    charger       i16 x, y, angle
//!  17      2    grid_size     u16
//!  19      2    width         u16
//!  21      2    height        u16
//!  23      2    left          i16
//!  25      2    top           i16
//! ```
//!
//! All fields are little-endian.

use crate::core::{Dimensions, Pose};
use crate::error::DecodeError;

/// Header length in bytes
pub const HEADER_SIZE: usize = 27;

/// Decoded frame header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub map_id: u16,
    pub frame_id: u16,
    pub frame_type: u8,
    pub robot: Pose,
    pub charger: Pose,
    pub dimensions: Dimensions,
}

impl FrameHeader {
    /// Parse the header from the start of an inflated frame
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DecodeError::Malformed(format!(
                "frame too short: {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        let i16_at = |offset: usize| i16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as i32;

        Ok(Self {
            map_id: u16_at(0),
            frame_id: u16_at(2),
            frame_type: bytes[4],
            robot: Pose::new(i16_at(5), i16_at(7), i16_at(9)),
            charger: Pose::new(i16_at(11), i16_at(13), i16_at(15)),
            dimensions: Dimensions::new(
                i16_at(23),
                i16_at(25),
                u16_at(19) as u32,
                u16_at(21) as u32,
                u16_at(17) as u32,
            ),
        })
    }

    /// Serialize to the wire layout
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.map_id.to_le_bytes());
        out.extend_from_slice(&self.frame_id.to_le_bytes());
        out.push(self.frame_type);
        for pose in [self.robot, self.charger] {
            out.extend_from_slice(&(pose.x as i16).to_le_bytes());
            out.extend_from_slice(&(pose.y as i16).to_le_bytes());
            out.extend_from_slice(&(pose.angle as i16).to_le_bytes());
        }
        let d = &self.dimensions;
        out.extend_from_slice(&(d.grid_size as u16).to_le_bytes());
        out.extend_from_slice(&(d.width as u16).to_le_bytes());
        out.extend_from_slice(&(d.height as u16).to_le_bytes());
        out.extend_from_slice(&(d.left as i16).to_le_bytes());
        out.extend_from_slice(&(d.top as i16).to_le_bytes());
    }

    /// Bitmap length declared by the header
    pub fn bitmap_len(&self) -> usize {
        self.dimensions.cell_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout() {
        let header = FrameHeader {
            map_id: 0x1234,
            frame_id: 7,
            frame_type: b'P',
            robot: Pose::new(-100, 250, 90),
            charger: Pose::new(0, -32000, -45),
            dimensions: Dimensions::new(-1200, 800, 300, 2, 50),
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes);
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..2], &[0x34, 0x12]);
        assert_eq!(bytes[4], b'P');
        assert_eq!(&bytes[17..19], &[50, 0]);
        assert_eq!(&bytes[19..21], &[0x2C, 0x01]);
        assert_eq!(FrameHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_short_input() {
        let result = FrameHeader::parse(&[0u8; HEADER_SIZE - 1]);
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }
}
