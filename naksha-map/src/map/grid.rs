//! Pixel grid storage.
//!
//! Two layers share one row-major index: the device bytes as received
//! (`raw`) and their normalized classification (`pixels`). Partial frames
//! patch the raw layer additively, so it has to survive alongside the
//! classified one.

use crate::core::{GridCoord, Pixel, PixelCodec};

/// Row-major pixel grid
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    raw: Vec<u8>,
    pixels: Vec<Pixel>,
}

impl PixelGrid {
    /// Grid with every pixel outside
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            raw: vec![0; count],
            pixels: vec![Pixel::OUTSIDE; count],
        }
    }

    /// Build from device bytes, classifying each one.
    ///
    /// `raw` must hold exactly `width * height` bytes; shorter input is padded
    /// with outside pixels.
    pub fn from_raw(width: u32, height: u32, raw: &[u8], codec: PixelCodec) -> Self {
        let count = width as usize * height as usize;
        let mut bytes = raw[..raw.len().min(count)].to_vec();
        bytes.resize(count, 0);
        let pixels = bytes.iter().map(|b| codec.classify(*b)).collect();
        Self {
            width,
            height,
            raw: bytes,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Is the coordinate inside the grid?
    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Classified pixel; outside the grid reads as [`Pixel::OUTSIDE`]
    #[inline]
    pub fn get(&self, coord: GridCoord) -> Pixel {
        self.index(coord)
            .map(|i| self.pixels[i])
            .unwrap_or(Pixel::OUTSIDE)
    }

    /// Device byte; outside the grid reads as 0
    #[inline]
    pub fn raw(&self, coord: GridCoord) -> u8 {
        self.index(coord).map(|i| self.raw[i]).unwrap_or(0)
    }

    /// Overwrite a classified pixel (raw layer untouched). Returns false if out of bounds.
    pub fn set(&mut self, coord: GridCoord, pixel: Pixel) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.pixels[i] = pixel;
                true
            }
            None => false,
        }
    }

    /// Overwrite both layers of one pixel
    pub fn set_raw(&mut self, coord: GridCoord, byte: u8, codec: PixelCodec) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.raw[i] = byte;
                self.pixels[i] = codec.classify(byte);
                true
            }
            None => false,
        }
    }

    /// Copy of this grid placed at `offset` inside a new `width × height` grid.
    ///
    /// Pixels falling outside the new grid are dropped.
    pub fn reallocated(&self, width: u32, height: u32, offset: GridCoord) -> PixelGrid {
        let mut out = PixelGrid::new(width, height);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let src = GridCoord::new(x, y);
                if let (Some(si), Some(di)) = (self.index(src), out.index(src + offset)) {
                    out.raw[di] = self.raw[si];
                    out.pixels[di] = self.pixels[si];
                }
            }
        }
        out
    }

    /// Iterate classified pixels in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, Pixel)> + '_ {
        let width = self.width.max(1) as usize;
        self.pixels.iter().enumerate().map(move |(i, p)| {
            (
                GridCoord::new((i % width) as i32, (i / width) as i32),
                *p,
            )
        })
    }

    /// Raw device bytes, row-major
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Replace every pixel matching `from` (ignoring carpet) with segment `to`, keeping carpet
    pub fn relabel(&mut self, from: u8, to: u8) -> usize {
        let mut changed = 0;
        for pixel in self.pixels.iter_mut() {
            if pixel.segment_id() == Some(from) {
                *pixel = Pixel::segment(to, pixel.is_carpet());
                changed += 1;
            }
        }
        changed
    }
}
