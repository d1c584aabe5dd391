//! RGBA pixel buffers and content classification

use bitflags::bitflags;
use ddsforge_core::{Error, Result};
use image::RgbaImage;

bitflags! {
    /// Properties discovered by classifying a buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PixelFlags: u32 {
        /// At least one pixel is not fully opaque
        const ALPHA = 0x1;
    }
}

/// Mean colour of a tangent-space normal map, in [0, 1] per channel
const NORMAL_MAP_MEAN: [f64; 3] = [0.5, 0.5, 1.0];

/// Largest per-channel distance of the mean colour from [`NORMAL_MAP_MEAN`]
const NORMAL_MAP_MEAN_TOLERANCE: f64 = 0.2;

/// Largest distance of the mean squared vector length from 1.0
const NORMAL_MAP_LENGTH_TOLERANCE: f64 = 0.2;

/// Owned RGBA8 image, rows tightly packed
///
/// A buffer is either empty (0x0, no allocation) or holds exactly
/// `width * height * 4` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    flags: PixelFlags,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap RGBA bytes, classifying alpha on the way in
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let mut buffer = Self {
            width,
            height,
            flags: PixelFlags::empty(),
            data,
        };
        buffer.determine_alpha();
        Ok(buffer)
    }

    /// Buffer of one repeated colour
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(pixels))
    }

    /// The empty buffer
    pub fn empty() -> Self {
        Self::default()
    }

    /// Override the classification flags
    pub fn with_flags(mut self, flags: PixelFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Current classification flags
    pub fn flags(&self) -> PixelFlags {
        self.flags
    }

    /// Whether [`PixelFlags::ALPHA`] is set
    pub fn has_alpha(&self) -> bool {
        self.flags.contains(PixelFlags::ALPHA)
    }

    /// True for the 0x0 buffer
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw RGBA bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable RGBA bytes; classification is not refreshed
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer, returning its RGBA bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Iterate over pixels as `[r, g, b, a]` slices
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(4)
    }

    /// Move the contents out, leaving this buffer empty
    pub fn take(&mut self) -> PixelBuffer {
        std::mem::take(self)
    }

    /// Set or clear [`PixelFlags::ALPHA`] from the pixel data
    ///
    /// Returns the new alpha state.
    pub fn determine_alpha(&mut self) -> bool {
        let has_alpha = self.pixels().any(|px| px[3] < u8::MAX);
        self.flags.set(PixelFlags::ALPHA, has_alpha);
        has_alpha
    }

    /// Guess whether this buffer holds a tangent-space normal map
    ///
    /// Heuristic only. The mean colour has to sit near (0.5, 0.5, 1.0) and
    /// the decoded vectors `2c - 1` have to average close to unit length.
    /// Flat blue-ish colour textures can pass and heavily detailed normal
    /// maps can fail.
    pub fn is_normal_map(&self) -> bool {
        if self.is_empty() {
            return false;
        }

        let mut sum = [0.0f64; 3];
        let mut length_sum = 0.0f64;
        for px in self.pixels() {
            let mut length = 0.0;
            for (channel, total) in sum.iter_mut().enumerate() {
                let value = px[channel] as f64 / 255.0;
                *total += value;
                let component = value * 2.0 - 1.0;
                length += component * component;
            }
            length_sum += length;
        }

        let count = (self.width as usize * self.height as usize) as f64;
        let mean_ok = sum
            .iter()
            .zip(NORMAL_MAP_MEAN)
            .all(|(total, target)| (total / count - target).abs() <= NORMAL_MAP_MEAN_TOLERANCE);
        let length_ok = (length_sum / count - 1.0).abs() <= NORMAL_MAP_LENGTH_TOLERANCE;

        mean_ok && length_ok
    }

    /// Turn the image upside down
    pub fn flip_vertical(&mut self) {
        let row_len = self.width as usize * 4;
        let height = self.height as usize;
        for y in 0..height / 2 {
            let (top, bottom) = self.data.split_at_mut((height - 1 - y) * row_len);
            top[y * row_len..(y + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    /// Mirror the image left to right
    pub fn flip_horizontal(&mut self) {
        let row_len = self.width as usize * 4;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let pixels = self.width as usize;
            for x in 0..pixels / 2 {
                let mirror = pixels - 1 - x;
                for channel in 0..4 {
                    row.swap(x * 4 + channel, mirror * 4 + channel);
                }
            }
        }
    }

    /// Copy into an `image` crate buffer
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| Error::internal("pixel buffer does not fit its dimensions"))
    }

    /// Take ownership of an `image` crate buffer
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }
}
