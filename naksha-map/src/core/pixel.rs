//! Pixel classification.
//!
//! The device packs pixel classes into bytes in three different layouts
//! depending on frame flavour. Every layout is normalized into [`Pixel`] at
//! decode time so the rest of the crate sees one representation:
//!
//! | Byte | Meaning |
//! |------|---------|
//! | `0` | outside the map |
//! | `1..=62` | floor belonging to segment `id` |
//! | `63` | wall |
//! | `0x40` | floor without a segment |
//! | `0x41` | unknown |
//!
//! Bit `0x80` marks carpet and is only ever set on segment or floor pixels.

use serde::{Deserialize, Serialize};

/// Highest valid segment id
pub const MAX_SEGMENT_ID: u8 = 62;

/// Classification of one pixel, without the carpet flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelClass {
    /// Outside the explored area
    Outside,
    /// Wall or obstacle boundary
    Wall,
    /// Floor not assigned to a segment
    Floor,
    /// Seen but unclassified
    Unknown,
    /// Floor belonging to a segment
    Segment(u8),
}

/// Normalized pixel byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel(pub u8);

impl Pixel {
    pub const OUTSIDE: Pixel = Pixel(0);
    pub const WALL: Pixel = Pixel(63);
    pub const FLOOR: Pixel = Pixel(0x40);
    pub const UNKNOWN: Pixel = Pixel(0x41);

    const CARPET_BIT: u8 = 0x80;

    /// Segment pixel, optionally carpeted.
    ///
    /// Ids outside `1..=62` fall back to plain floor.
    pub fn segment(id: u8, carpet: bool) -> Self {
        if (1..=MAX_SEGMENT_ID).contains(&id) {
            Pixel(id).with_carpet(carpet)
        } else {
            Pixel::FLOOR.with_carpet(carpet)
        }
    }

    /// Build from a class and carpet flag
    pub fn from_class(class: PixelClass, carpet: bool) -> Self {
        match class {
            PixelClass::Outside => Pixel::OUTSIDE,
            PixelClass::Wall => Pixel::WALL,
            PixelClass::Unknown => Pixel::UNKNOWN,
            PixelClass::Floor => Pixel::FLOOR.with_carpet(carpet),
            PixelClass::Segment(id) => Pixel::segment(id, carpet),
        }
    }

    /// Set or clear the carpet flag (ignored for non-floor pixels)
    pub fn with_carpet(self, carpet: bool) -> Self {
        let base = self.0 & !Self::CARPET_BIT;
        let floorlike = (1..=MAX_SEGMENT_ID).contains(&base) || base == Pixel::FLOOR.0;
        if carpet && floorlike {
            Pixel(base | Self::CARPET_BIT)
        } else {
            Pixel(base)
        }
    }

    /// Carpet flag
    #[inline]
    pub fn is_carpet(self) -> bool {
        self.0 & Self::CARPET_BIT != 0
    }

    /// Class without carpet
    pub fn class(self) -> PixelClass {
        match self.0 & !Self::CARPET_BIT {
            0 => PixelClass::Outside,
            id @ 1..=MAX_SEGMENT_ID => PixelClass::Segment(id),
            63 => PixelClass::Wall,
            0x40 => PixelClass::Floor,
            _ => PixelClass::Unknown,
        }
    }

    /// Segment id, if this pixel belongs to one
    #[inline]
    pub fn segment_id(self) -> Option<u8> {
        match self.class() {
            PixelClass::Segment(id) => Some(id),
            _ => None,
        }
    }

    /// Walkable pixel (segment or floor)
    #[inline]
    pub fn is_floor(self) -> bool {
        matches!(self.class(), PixelClass::Segment(_) | PixelClass::Floor)
    }
}

/// Device byte layout, selected once per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelCodec {
    /// Frame maps: id in bits 2-7, class in bits 0-1
    FrameMapBits,
    /// Saved maps with status 0/1: id in bits 1-7, carpet in bit 0
    LegacySavedMapBits,
    /// Everything else: id in bits 0-5, carpet in bit 6, floor flag in bit 7
    #[default]
    StandardBits,
}

impl PixelCodec {
    /// Choose the layout from the frame's `fsm` and `ris` metadata.
    ///
    /// Vision devices never carried the legacy saved-map layout.
    pub fn select(frame_map: Option<i64>, saved_map_status: Option<i64>, vslam: bool) -> Self {
        if frame_map == Some(1) {
            PixelCodec::FrameMapBits
        } else if !vslam && matches!(saved_map_status, Some(0) | Some(1)) {
            PixelCodec::LegacySavedMapBits
        } else {
            PixelCodec::StandardBits
        }
    }

    /// Normalize one device byte
    pub fn classify(self, byte: u8) -> Pixel {
        match self {
            PixelCodec::FrameMapBits => {
                let id = byte >> 2;
                match id {
                    63 => Pixel::WALL,
                    1..=MAX_SEGMENT_ID => Pixel(id),
                    _ => match byte & 0x03 {
                        0 => Pixel::OUTSIDE,
                        1 => Pixel::FLOOR,
                        2 => Pixel::WALL,
                        _ => Pixel::UNKNOWN,
                    },
                }
            }
            PixelCodec::LegacySavedMapBits => {
                let id = byte >> 1;
                let carpet = byte & 0x01 != 0;
                match id {
                    0 => Pixel::OUTSIDE,
                    1..=MAX_SEGMENT_ID => Pixel::segment(id, carpet),
                    63 => Pixel::WALL,
                    64..=126 => Pixel::FLOOR.with_carpet(carpet),
                    _ => Pixel::UNKNOWN,
                }
            }
            PixelCodec::StandardBits => {
                let id = byte & 0x3F;
                let carpet = byte & 0x40 != 0;
                match id {
                    1..=MAX_SEGMENT_ID => Pixel::segment(id, carpet),
                    63 => Pixel::WALL,
                    _ if byte & 0x80 != 0 => Pixel::FLOOR.with_carpet(carpet),
                    _ if carpet => Pixel::UNKNOWN,
                    _ => Pixel::OUTSIDE,
                }
            }
        }
    }

    /// Device byte for a normalized pixel. Inverse of [`classify`](Self::classify)
    /// (the frame-map layout has no carpet bit, so carpet is dropped there).
    pub fn encode(self, pixel: Pixel) -> u8 {
        let carpet = pixel.is_carpet();
        match self {
            PixelCodec::FrameMapBits => match pixel.class() {
                PixelClass::Outside => 0,
                PixelClass::Floor => 1,
                PixelClass::Unknown => 3,
                PixelClass::Wall => 63 << 2,
                PixelClass::Segment(id) => id << 2,
            },
            PixelCodec::LegacySavedMapBits => match pixel.class() {
                PixelClass::Outside => 0,
                PixelClass::Wall => 63 << 1,
                PixelClass::Unknown => 127 << 1,
                PixelClass::Floor => (64 << 1) | carpet as u8,
                PixelClass::Segment(id) => (id << 1) | carpet as u8,
            },
            PixelCodec::StandardBits => match pixel.class() {
                PixelClass::Outside => 0,
                PixelClass::Wall => 63,
                PixelClass::Unknown => 0x40,
                PixelClass::Floor => 0x80 | if carpet { 0x40 } else { 0 },
                PixelClass::Segment(id) => id | if carpet { 0x40 } else { 0 },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select() {
        assert_eq!(PixelCodec::select(Some(1), Some(0), false), PixelCodec::FrameMapBits);
        assert_eq!(PixelCodec::select(None, Some(1), false), PixelCodec::LegacySavedMapBits);
        assert_eq!(PixelCodec::select(None, Some(1), true), PixelCodec::StandardBits);
        assert_eq!(PixelCodec::select(None, Some(2), false), PixelCodec::StandardBits);
        assert_eq!(PixelCodec::select(None, None, false), PixelCodec::StandardBits);
    }

    #[test]
    fn test_standard_bits() {
        let c = PixelCodec::StandardBits;
        assert_eq!(c.classify(0).class(), PixelClass::Outside);
        assert_eq!(c.classify(5), Pixel(5));
        assert_eq!(c.classify(5 | 0x40), Pixel::segment(5, true));
        assert_eq!(c.classify(63).class(), PixelClass::Wall);
        assert_eq!(c.classify(0x80), Pixel::FLOOR);
        assert!(c.classify(0xC0).is_carpet());
        assert_eq!(c.classify(0x40), Pixel::UNKNOWN);
    }

    #[test]
    fn test_legacy_bits() {
        let c = PixelCodec::LegacySavedMapBits;
        assert_eq!(c.classify(1), Pixel::OUTSIDE);
        assert_eq!(c.classify(3 << 1), Pixel(3));
        assert_eq!(c.classify((3 << 1) | 1), Pixel::segment(3, true));
        assert_eq!(c.classify(63 << 1), Pixel::WALL);
        assert_eq!(c.classify(100 << 1).class(), PixelClass::Floor);
        assert_eq!(c.classify(0xFF), Pixel::UNKNOWN);
    }

    #[test]
    fn test_frame_map_bits() {
        let c = PixelCodec::FrameMapBits;
        assert_eq!(c.classify(7 << 2), Pixel(7));
        assert_eq!(c.classify(0xFF), Pixel::WALL);
        assert_eq!(c.classify(1), Pixel::FLOOR);
        assert_eq!(c.classify(2), Pixel::WALL);
        assert_eq!(c.classify(3), Pixel::UNKNOWN);
        assert_eq!(c.classify(0), Pixel::OUTSIDE);
    }

    #[test]
    fn test_encode_inverts_classify() {
        let pixels = [
            Pixel::OUTSIDE,
            Pixel::WALL,
            Pixel::FLOOR,
            Pixel::UNKNOWN,
            Pixel(12),
            Pixel::segment(12, true),
            Pixel::FLOOR.with_carpet(true),
        ];
        for codec in [PixelCodec::StandardBits, PixelCodec::LegacySavedMapBits] {
            for p in pixels {
                assert_eq!(codec.classify(codec.encode(p)), p, "{:?} {:?}", codec, p);
            }
        }
        let fm = PixelCodec::FrameMapBits;
        assert_eq!(fm.classify(fm.encode(Pixel::segment(12, true))), Pixel(12));
    }

    #[test]
    fn test_carpet_only_on_floor() {
        assert_eq!(Pixel::WALL.with_carpet(true), Pixel::WALL);
        assert_eq!(Pixel::segment(0, false), Pixel::FLOOR);
        assert!(Pixel::segment(62, true).is_carpet());
        assert_eq!(Pixel::segment(62, true).segment_id(), Some(62));
    }
}
