//! Option normalization
//!
//! [`BuildPlan::normalize`] turns a raw option mask and a face count into one
//! consistent plan before any pixel is touched.

use ddsforge_core::{BuildOptions, Error, Result};
use ddsforge_dds::{CompressionFormat, CUBE_FACE_COUNT};
use tracing::warn;

use crate::swizzle::Swizzle;

/// Face layout of the output container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Single,
    /// 2D texture array with this many slices
    Array(u32),
    CubeMap,
}

/// How levels are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Uncompressed,
    BlockCompressed,
}

/// Build options resolved against the number of input faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildPlan {
    /// Single image, array or cube map
    pub topology: Topology,
    /// Raw rows or DXT blocks
    pub encoding: Encoding,
    /// Channel remap applied before mipmapping, compressed builds only
    pub swizzle: Option<Swizzle>,
    /// Generate a full mipmap chain
    pub mipmaps: bool,
    /// Mark the container as a normal map
    pub normal_map: bool,
    /// Mirror rows top to bottom
    pub flip_vertical: bool,
    /// Mirror columns left to right
    pub flip_horizontal: bool,
}

impl BuildPlan {
    /// Validate `options` against `face_count` and resolve the plan
    pub fn normalize(options: BuildOptions, face_count: usize) -> Result<Self> {
        if face_count == 0 {
            return Err(Error::invalid_input("no faces given"));
        }

        let swizzle = Swizzle::from_options(options)?;

        let topology = if options.contains(BuildOptions::CUBE_MAP) {
            if face_count != CUBE_FACE_COUNT as usize {
                return Err(Error::CubeFaceCount { count: face_count });
            }
            Topology::CubeMap
        } else if face_count > 1 {
            let slices = u32::try_from(face_count)
                .map_err(|_| Error::invalid_input(format!("{} faces is too many", face_count)))?;
            Topology::Array(slices)
        } else {
            Topology::Single
        };

        let encoding = if options.contains(BuildOptions::ENABLE_COMPRESSION) {
            Encoding::BlockCompressed
        } else {
            Encoding::Uncompressed
        };

        let swizzle = match (swizzle, encoding) {
            (Some(swizzle), Encoding::Uncompressed) => {
                warn!(%swizzle, "Swizzle ignored without compression");
                None
            }
            (swizzle, _) => swizzle,
        };

        Ok(Self {
            topology,
            encoding,
            swizzle,
            mipmaps: options.contains(BuildOptions::GENERATE_MIPMAPS),
            normal_map: options.contains(BuildOptions::NORMAL_MAP),
            flip_vertical: options.contains(BuildOptions::FLIP_VERTICAL),
            flip_horizontal: options.contains(BuildOptions::FLIP_HORIZONTAL),
        })
    }

    /// Number of faces in the output
    pub fn face_count(&self) -> u32 {
        match self.topology {
            Topology::Single => 1,
            Topology::Array(slices) => slices,
            Topology::CubeMap => CUBE_FACE_COUNT,
        }
    }

    /// Whether the faces form a cube map
    pub fn is_cube_map(&self) -> bool {
        self.topology == Topology::CubeMap
    }

    /// Stored format for faces with the given alpha status
    ///
    /// A swizzle moves data into alpha, so it always gets DXT5. Arrays need a
    /// DXGI format, so 24-bit RGB is widened to RGBA there.
    pub fn format(&self, has_alpha: bool) -> CompressionFormat {
        let compress = self.encoding == Encoding::BlockCompressed;
        let alpha = has_alpha
            || self.swizzle.is_some()
            || (!compress && matches!(self.topology, Topology::Array(_)));
        CompressionFormat::select(alpha, compress)
    }
}
