//! Mipmap chain generation
//!
//! Every level is resampled from the one above it with a Lanczos3 kernel.
//! Halving stops once both dimensions reach 1, so a W x H base yields
//! `floor(log2(max(W, H))) + 1` levels.

use ddsforge_core::{Error, Result};
use ddsforge_dds::{full_mip_count, level_dimensions};
use image::imageops::{self, FilterType};
use tracing::debug;

use crate::pixel::PixelBuffer;

/// Resampling kernel used between levels
pub const MIPMAP_FILTER: FilterType = FilterType::Lanczos3;

/// Number of levels of a full chain for a base of the given size
pub fn mip_count(width: u32, height: u32) -> u32 {
    full_mip_count(width, height)
}

/// Levels of one face, index 0 at full resolution
#[derive(Debug, Clone)]
pub struct MipmapChain {
    levels: Vec<PixelBuffer>,
}

impl MipmapChain {
    /// Build a chain from `base`
    ///
    /// With `generate` unset the chain holds only the base level.
    pub fn build(base: PixelBuffer, generate: bool) -> Result<Self> {
        if base.is_empty() {
            return Err(Error::InvalidDimensions {
                width: base.width(),
                height: base.height(),
            });
        }

        let (width, height) = base.dimensions();
        let count = if generate { mip_count(width, height) } else { 1 };

        let mut levels = Vec::with_capacity(count as usize);
        levels.push(base);
        for level in 1..count {
            let (level_width, level_height) = level_dimensions(width, height, level);
            let previous = &levels[level as usize - 1];
            let next = downsample(previous, level_width, level_height)?;
            debug!(level, width = level_width, height = level_height, "Mip level resampled");
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Number of levels, base included
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Full-size level
    pub fn base(&self) -> &PixelBuffer {
        &self.levels[0]
    }

    /// Levels from largest to 1x1
    pub fn levels(&self) -> &[PixelBuffer] {
        &self.levels
    }

    pub fn into_levels(self) -> Vec<PixelBuffer> {
        self.levels
    }
}

/// Resample one level down to the next size
fn downsample(source: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer> {
    let image = source.to_rgba_image()?;
    let resized = imageops::resize(&image, width, height, MIPMAP_FILTER);
    // Levels inherit the classification of the base
    Ok(PixelBuffer::from_rgba_image(resized)?.with_flags(source.flags()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsforge_core::ErrorKind;

    #[test]
    fn test_no_generation_keeps_base_only() {
        let base = PixelBuffer::filled(64, 64, [1, 2, 3, 255]).unwrap();
        let chain = MipmapChain::build(base, false).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.base().dimensions(), (64, 64));
    }

    #[test]
    fn test_full_chain_dimensions() {
        let base = PixelBuffer::filled(16, 4, [1, 2, 3, 255]).unwrap();
        let chain = MipmapChain::build(base, true).unwrap();

        let dims: Vec<_> = chain.levels().iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims, vec![(16, 4), (8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn test_one_by_one_base() {
        let base = PixelBuffer::filled(1, 1, [1, 2, 3, 4]).unwrap();
        let chain = MipmapChain::build(base, true).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_uniform_colour_survives_resampling() {
        let base = PixelBuffer::filled(32, 32, [200, 100, 50, 200]).unwrap();
        let chain = MipmapChain::build(base, true).unwrap();

        let last = chain.levels().last().unwrap();
        assert_eq!(last.dimensions(), (1, 1));
        for (got, want) in last.data().iter().zip([200u8, 100, 50, 200]) {
            assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
        }
        assert!(last.has_alpha());
    }

    #[test]
    fn test_empty_base_rejected() {
        let err = MipmapChain::build(PixelBuffer::empty(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
