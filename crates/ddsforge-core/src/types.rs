//! Common types used across ddsforge
//!
//! Option bit values are fixed so that numeric masks stored in asset
//! manifests stay valid.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Options controlling how a DDS container is built.
    ///
    /// Flags compose with `|`. `SWIZZLE_YYYX` and `SWIZZLE_ZYZX` are mutually
    /// exclusive, and `CUBE_MAP` requires exactly six faces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BuildOptions: u32 {
        /// The face set is a cube map (+x, -x, +y, -y, +z, -z).
        const CUBE_MAP = 0x01;
        /// Mark the texture as a normal map in the pixel format.
        const NORMAL_MAP = 0x02;
        /// Generate a full mipmap chain down to 1x1.
        const GENERATE_MIPMAPS = 0x04;
        /// Use DXT1 (opaque) or DXT5 (alpha) block compression.
        const ENABLE_COMPRESSION = 0x08;
        /// Flip every face upside down before processing.
        const FLIP_VERTICAL = 0x10;
        /// Mirror every face left to right before processing.
        const FLIP_HORIZONTAL = 0x20;
        /// RGBA -> GGGR swizzle for DXT5nm normal maps.
        const SWIZZLE_YYYX = 0x40;
        /// RGBA -> BGBR swizzle for DXT5nm+z normal maps.
        const SWIZZLE_ZYZX = 0x80;
    }
}

impl BuildOptions {
    /// Whether both swizzle bits are set.
    pub fn has_conflicting_swizzles(&self) -> bool {
        self.contains(BuildOptions::SWIZZLE_YYYX | BuildOptions::SWIZZLE_ZYZX)
    }

    /// Whether any swizzle bit is set.
    pub fn has_swizzle(&self) -> bool {
        self.intersects(BuildOptions::SWIZZLE_YYYX | BuildOptions::SWIZZLE_ZYZX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_bits_are_stable() {
        assert_eq!(BuildOptions::CUBE_MAP.bits(), 0x01);
        assert_eq!(BuildOptions::NORMAL_MAP.bits(), 0x02);
        assert_eq!(BuildOptions::GENERATE_MIPMAPS.bits(), 0x04);
        assert_eq!(BuildOptions::ENABLE_COMPRESSION.bits(), 0x08);
        assert_eq!(BuildOptions::FLIP_VERTICAL.bits(), 0x10);
        assert_eq!(BuildOptions::FLIP_HORIZONTAL.bits(), 0x20);
        assert_eq!(BuildOptions::SWIZZLE_YYYX.bits(), 0x40);
        assert_eq!(BuildOptions::SWIZZLE_ZYZX.bits(), 0x80);
    }

    #[test]
    fn test_swizzle_conflict() {
        let options = BuildOptions::SWIZZLE_YYYX | BuildOptions::ENABLE_COMPRESSION;
        assert!(options.has_swizzle());
        assert!(!options.has_conflicting_swizzles());

        let both = options | BuildOptions::SWIZZLE_ZYZX;
        assert!(both.has_conflicting_swizzles());
    }

    #[test]
    fn test_options_from_raw_mask() {
        let options = BuildOptions::from_bits_truncate(0x0C);
        assert_eq!(options, BuildOptions::GENERATE_MIPMAPS | BuildOptions::ENABLE_COMPRESSION);
    }

    #[test]
    fn test_options_serde() {
        let options = BuildOptions::CUBE_MAP | BuildOptions::GENERATE_MIPMAPS;
        let json = serde_json::to_string(&options).unwrap();
        let back: BuildOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
