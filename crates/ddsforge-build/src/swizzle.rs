//! Channel swizzles for DXT5 normal-map encodings

use std::fmt;

use ddsforge_core::{BuildOptions, Error, Result};

use crate::pixel::PixelBuffer;

/// Per-pixel channel permutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Swizzle {
    /// (R, G, B, A) -> (G, G, G, R)
    Yyyx,
    /// (R, G, B, A) -> (B, G, B, R)
    Zyzx,
}

impl Swizzle {
    /// Swizzle requested by the option bits, if any
    pub fn from_options(options: BuildOptions) -> Result<Option<Self>> {
        if options.has_conflicting_swizzles() {
            return Err(Error::unsupported(
                "SWIZZLE_YYYX and SWIZZLE_ZYZX are mutually exclusive",
            ));
        }
        if options.contains(BuildOptions::SWIZZLE_YYYX) {
            Ok(Some(Swizzle::Yyyx))
        } else if options.contains(BuildOptions::SWIZZLE_ZYZX) {
            Ok(Some(Swizzle::Zyzx))
        } else {
            Ok(None)
        }
    }

    /// Remap one pixel
    #[inline]
    pub fn apply_pixel(self, [r, g, b, _a]: [u8; 4]) -> [u8; 4] {
        match self {
            Swizzle::Yyyx => [g, g, g, r],
            Swizzle::Zyzx => [b, g, b, r],
        }
    }

    /// Remap every pixel in place
    pub fn apply(self, buffer: &mut PixelBuffer) {
        for px in buffer.data_mut().chunks_exact_mut(4) {
            let out = self.apply_pixel([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        }
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Swizzle::Yyyx => write!(f, "YYYX"),
            Swizzle::Zyzx => write!(f, "ZYZX"),
        }
    }
}
