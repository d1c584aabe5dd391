//! DDS container assembly
//!
//! A [`ContainerDescriptor`] fixes everything the header says about the
//! texture. The [`ContainerAssembler`] then accepts level data in storage
//! order (face-major, then mip-major) and refuses anything out of order or
//! of the wrong size, so a finished container always has exactly the payload
//! its header promises.

use ddsforge_core::{Error, Result};
use tracing::debug;

use super::format::CompressionFormat;
use super::header::{
    caps, caps2, flags, pf_flags, DX10Header, DdsHeader, PixelFormat, DX10_HEADER_SIZE,
    HEADER_SIZE, PIXEL_FORMAT_SIZE, RESOURCE_DIMENSION_TEXTURE2D,
};
use super::DDS_MAGIC;

/// Number of faces in a cube map
pub const CUBE_FACE_COUNT: u32 = 6;

/// Number of levels in a full mipmap chain for the given base size
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Dimensions of a mip level, halving and clamping at 1
///
/// Levels past 31 are 1x1 rather than a shift overflow.
pub fn level_dimensions(width: u32, height: u32, level: u32) -> (u32, u32) {
    let halve = |extent: u32| extent.checked_shr(level).unwrap_or(0).max(1);
    (halve(width), halve(height))
}

/// Header-level description of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Base level width in pixels
    pub width: u32,
    /// Base level height in pixels
    pub height: u32,
    /// Levels stored per face, base included
    pub mip_count: u32,
    /// Cube faces or array slices
    pub face_count: u32,
    /// Faces form a cube map rather than an array
    pub cube_map: bool,
    /// Set the DDPF_NORMAL marker
    pub normal_map: bool,
    /// Stored format of every level
    pub format: CompressionFormat,
}

impl ContainerDescriptor {
    /// Single-face, single-level descriptor
    pub fn new(width: u32, height: u32, format: CompressionFormat) -> Self {
        Self {
            width,
            height,
            mip_count: 1,
            face_count: 1,
            cube_map: false,
            normal_map: false,
            format,
        }
    }

    /// Set the number of stored levels per face
    pub fn with_mip_count(mut self, mip_count: u32) -> Self {
        self.mip_count = mip_count;
        self
    }

    /// Set the face count and whether the faces form a cube map
    pub fn with_faces(mut self, face_count: u32, cube_map: bool) -> Self {
        self.face_count = face_count;
        self.cube_map = cube_map;
        self
    }

    /// Mark the container as holding a normal map
    pub fn with_normal_map(mut self, normal_map: bool) -> Self {
        self.normal_map = normal_map;
        self
    }

    /// Check that the header this descriptor produces is consistent
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let max_levels = full_mip_count(self.width, self.height);
        if self.mip_count == 0 || self.mip_count > max_levels {
            return Err(Error::invalid_input(format!(
                "mip count {} outside 1..={} for {}x{}",
                self.mip_count, max_levels, self.width, self.height
            )));
        }

        if u32::try_from(self.level_size(0)).is_err() {
            return Err(Error::invalid_input(format!(
                "{}x{} {} base level does not fit a DDS header",
                self.width, self.height, self.format
            )));
        }

        if self.face_count == 0 {
            return Err(Error::invalid_input("container needs at least one face"));
        }

        if self.cube_map {
            if self.face_count != CUBE_FACE_COUNT {
                return Err(Error::CubeFaceCount {
                    count: self.face_count as usize,
                });
            }
            if self.width != self.height {
                return Err(Error::invalid_input(format!(
                    "cube map faces must be square, got {}x{}",
                    self.width, self.height
                )));
            }
        }

        if self.is_array() && self.format.dxgi_format().is_none() {
            return Err(Error::unsupported(format!(
                "array textures cannot be stored as {}",
                self.format
            )));
        }

        Ok(())
    }

    /// More than one face without the cube-map flag
    pub fn is_array(&self) -> bool {
        self.face_count > 1 && !self.cube_map
    }

    /// Dimensions of a mip level
    pub fn level_dimensions(&self, level: u32) -> (u32, u32) {
        level_dimensions(self.width, self.height, level)
    }

    /// Stored size of one mip level of one face
    pub fn level_size(&self, level: u32) -> usize {
        let (width, height) = self.level_dimensions(level);
        self.format.level_size(width, height)
    }

    /// Stored size of one face including all its levels
    pub fn face_size(&self) -> usize {
        (0..self.mip_count)
            .map(|level| self.level_size(level))
            .fold(0, usize::saturating_add)
    }

    /// Total payload size following the headers
    pub fn payload_size(&self) -> usize {
        self.face_size().saturating_mul(self.face_count as usize)
    }

    /// Magic plus header(s)
    pub fn header_size(&self) -> usize {
        let dx10 = if self.is_array() { DX10_HEADER_SIZE } else { 0 };
        (4 + HEADER_SIZE + dx10) as usize
    }

    /// Build the legacy header
    pub fn header(&self) -> DdsHeader {
        let compressed = self.format.is_compressed();
        let has_mipmaps = self.mip_count > 1;

        let mut header_flags = flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT;
        if has_mipmaps {
            header_flags |= flags::MIPMAP_COUNT;
        }
        let pitch_or_linear_size = if compressed {
            header_flags |= flags::LINEAR_SIZE;
            self.level_size(0)
        } else {
            header_flags |= flags::PITCH;
            self.format.row_pitch(self.width)
        };
        // validate() rejects base levels that overflow the field
        let pitch_or_linear_size = u32::try_from(pitch_or_linear_size).unwrap_or(u32::MAX);

        let mut header_caps = caps::TEXTURE;
        if has_mipmaps {
            header_caps |= caps::COMPLEX | caps::MIPMAP;
        }
        if self.face_count > 1 {
            header_caps |= caps::COMPLEX;
        }

        let header_caps2 = if self.cube_map {
            caps2::CUBEMAP | caps2::CUBEMAP_ALL_FACES
        } else {
            0
        };

        let pixel_format = if self.is_array() {
            PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: pf_flags::FOURCC | if self.normal_map { pf_flags::NORMAL } else { 0 },
                fourcc: *b"DX10",
                ..PixelFormat::default()
            }
        } else {
            self.format.pixel_format(self.normal_map)
        };

        DdsHeader {
            size: HEADER_SIZE,
            flags: header_flags,
            height: self.height,
            width: self.width,
            pitch_or_linear_size,
            depth: 0,
            mipmap_count: self.mip_count,
            reserved1: [0; 11],
            pixel_format,
            caps: header_caps,
            caps2: header_caps2,
            caps3: 0,
            caps4: 0,
            reserved2: 0,
        }
    }

    /// DX10 extension header, present for array textures only
    pub fn dx10_header(&self) -> Option<DX10Header> {
        if !self.is_array() {
            return None;
        }
        let dxgi_format = self.format.dxgi_format()?;
        Some(DX10Header {
            dxgi_format: dxgi_format as u32,
            resource_dimension: RESOURCE_DIMENSION_TEXTURE2D,
            misc_flag: 0,
            array_size: self.face_count,
            misc_flags2: 0,
        })
    }
}

/// Packs headers and level data into one contiguous byte stream
#[derive(Debug)]
pub struct ContainerAssembler {
    descriptor: ContainerDescriptor,
    buffer: Vec<u8>,
    face: u32,
    level: u32,
}

impl ContainerAssembler {
    /// Validate the descriptor and write the headers
    pub fn new(descriptor: ContainerDescriptor) -> Result<Self> {
        descriptor.validate()?;

        let mut buffer = Vec::with_capacity(descriptor.header_size() + descriptor.payload_size());
        buffer.extend_from_slice(&DDS_MAGIC.to_le_bytes());
        descriptor.header().write(&mut buffer)?;
        if let Some(dx10) = descriptor.dx10_header() {
            dx10.write(&mut buffer)?;
        }

        debug!(
            width = descriptor.width,
            height = descriptor.height,
            mips = descriptor.mip_count,
            faces = descriptor.face_count,
            format = %descriptor.format,
            payload = descriptor.payload_size(),
            "Container header written"
        );

        Ok(Self {
            descriptor,
            buffer,
            face: 0,
            level: 0,
        })
    }

    /// Descriptor the headers were written from
    pub fn descriptor(&self) -> &ContainerDescriptor {
        &self.descriptor
    }

    /// The (face, level) slot the next `push_level` call fills
    pub fn next_slot(&self) -> Option<(u32, u32)> {
        if self.face < self.descriptor.face_count {
            Some((self.face, self.level))
        } else {
            None
        }
    }

    /// Append the stored data of the next level
    pub fn push_level(&mut self, data: &[u8]) -> Result<()> {
        let (face, level) = self.next_slot().ok_or_else(|| {
            Error::internal("container already holds every face and level")
        })?;

        let expected = self.descriptor.level_size(level);
        if data.len() != expected {
            return Err(Error::internal(format!(
                "face {} level {}: expected {} bytes, got {}",
                face,
                level,
                expected,
                data.len()
            )));
        }

        self.buffer.extend_from_slice(data);

        self.level += 1;
        if self.level == self.descriptor.mip_count {
            self.level = 0;
            self.face += 1;
        }
        Ok(())
    }

    /// Finish the container, failing if any level is missing
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some((face, level)) = self.next_slot() {
            return Err(Error::internal(format!(
                "container incomplete: missing face {} level {}",
                face, level
            )));
        }
        Ok(self.buffer)
    }
}

/// Assemble a container from per-face, per-level data in one call
pub fn assemble(descriptor: ContainerDescriptor, faces: &[Vec<Vec<u8>>]) -> Result<Vec<u8>> {
    let mut assembler = ContainerAssembler::new(descriptor)?;
    for levels in faces {
        for data in levels {
            assembler.push_level(data)?;
        }
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsforge_core::ErrorKind;

    fn levels_for(descriptor: &ContainerDescriptor) -> Vec<Vec<u8>> {
        (0..descriptor.mip_count)
            .map(|level| vec![level as u8; descriptor.level_size(level)])
            .collect()
    }

    #[test]
    fn test_full_mip_count() {
        assert_eq!(full_mip_count(1, 1), 1);
        assert_eq!(full_mip_count(256, 256), 9);
        assert_eq!(full_mip_count(256, 1), 9);
        assert_eq!(full_mip_count(300, 20), 9);
        assert_eq!(full_mip_count(4096, 4096), 13);
    }

    #[test]
    fn test_level_dimensions_clamp() {
        assert_eq!(level_dimensions(8, 2, 0), (8, 2));
        assert_eq!(level_dimensions(8, 2, 1), (4, 1));
        assert_eq!(level_dimensions(8, 2, 3), (1, 1));
    }

    #[test]
    fn test_level_dimensions_past_shift_width() {
        assert_eq!(level_dimensions(1, 1, 32), (1, 1));
        assert_eq!(level_dimensions(u32::MAX, 4, 35), (1, 1));
        assert_eq!(level_dimensions(u32::MAX, u32::MAX, u32::MAX), (1, 1));
    }

    #[test]
    fn test_validate_rejects_oversized_base_level() {
        let huge = ContainerDescriptor::new(u32::MAX, u32::MAX, CompressionFormat::Rgba);
        assert_eq!(huge.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_header_for_compressed_mipmapped() {
        let descriptor = ContainerDescriptor::new(256, 256, CompressionFormat::Dxt1).with_mip_count(9);
        let header = descriptor.header();

        assert!(header.flags & flags::MIPMAP_COUNT != 0);
        assert!(header.flags & flags::LINEAR_SIZE != 0);
        assert_eq!(header.flags & flags::PITCH, 0);
        assert_eq!(header.pitch_or_linear_size, 32768);
        assert!(header.caps & caps::MIPMAP != 0);
        assert_eq!(&header.pixel_format.fourcc, b"DXT1");
        assert!(!header.is_normal_map());
    }

    #[test]
    fn test_header_for_uncompressed_single_level() {
        let descriptor = ContainerDescriptor::new(5, 3, CompressionFormat::Rgb).with_normal_map(true);
        let header = descriptor.header();

        assert_eq!(header.flags & flags::MIPMAP_COUNT, 0);
        assert!(header.flags & flags::PITCH != 0);
        assert_eq!(header.pitch_or_linear_size, 16);
        assert_eq!(header.caps, caps::TEXTURE);
        assert_eq!(header.pixel_format.rgb_bit_count, 24);
        assert!(header.is_normal_map());
    }

    #[test]
    fn test_cube_header() {
        let descriptor = ContainerDescriptor::new(16, 16, CompressionFormat::Dxt5).with_faces(6, true);
        let header = descriptor.header();

        assert!(header.is_cubemap());
        assert_eq!(header.cube_face_count(), 6);
        assert!(header.caps & caps::COMPLEX != 0);
        assert!(descriptor.dx10_header().is_none());
    }

    #[test]
    fn test_array_uses_dx10() {
        let descriptor = ContainerDescriptor::new(8, 8, CompressionFormat::Rgba).with_faces(3, false);
        let header = descriptor.header();

        assert!(header.has_dx10_header());
        let dx10 = descriptor.dx10_header().unwrap();
        assert_eq!(dx10.array_size, 3);
        assert_eq!(dx10.dxgi_format, 87);
        assert_eq!(descriptor.header_size(), 148);
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        let zero = ContainerDescriptor::new(0, 4, CompressionFormat::Rgb);
        assert_eq!(zero.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

        let cube = ContainerDescriptor::new(4, 4, CompressionFormat::Rgb).with_faces(5, true);
        assert!(matches!(cube.validate(), Err(Error::CubeFaceCount { count: 5 })));

        let non_square = ContainerDescriptor::new(8, 4, CompressionFormat::Rgb).with_faces(6, true);
        assert_eq!(non_square.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

        let too_many_mips = ContainerDescriptor::new(4, 4, CompressionFormat::Rgb).with_mip_count(4);
        assert_eq!(too_many_mips.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

        let rgb_array = ContainerDescriptor::new(4, 4, CompressionFormat::Rgb).with_faces(2, false);
        assert_eq!(
            rgb_array.validate().unwrap_err().kind(),
            ErrorKind::UnsupportedConfiguration
        );
    }

    #[test]
    fn test_assemble_face_major_order() {
        let descriptor = ContainerDescriptor::new(4, 4, CompressionFormat::Rgba)
            .with_mip_count(3)
            .with_faces(6, true);
        let faces: Vec<_> = (0..6)
            .map(|face| {
                (0..3u32)
                    .map(|level| vec![face as u8 * 10 + level as u8; descriptor.level_size(level)])
                    .collect()
            })
            .collect();

        let bytes = assemble(descriptor.clone(), &faces).unwrap();
        assert_eq!(bytes.len(), descriptor.header_size() + descriptor.payload_size());

        // Face 1 starts right after all levels of face 0
        let face1_start = descriptor.header_size() + descriptor.face_size();
        assert_eq!(bytes[face1_start], 10);
        assert_eq!(bytes[face1_start + descriptor.level_size(0)], 11);
    }

    #[test]
    fn test_push_level_rejects_wrong_size() {
        let descriptor = ContainerDescriptor::new(4, 4, CompressionFormat::Dxt1);
        let mut assembler = ContainerAssembler::new(descriptor).unwrap();

        let err = assembler.push_level(&[0; 7]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_finish_rejects_missing_levels() {
        let descriptor = ContainerDescriptor::new(4, 4, CompressionFormat::Dxt1).with_mip_count(3);
        let mut assembler = ContainerAssembler::new(descriptor.clone()).unwrap();
        let levels = levels_for(&descriptor);
        assembler.push_level(&levels[0]).unwrap();

        assert_eq!(assembler.next_slot(), Some((0, 1)));
        assert!(assembler.finish().is_err());
    }

    #[test]
    fn test_push_past_end_fails() {
        let descriptor = ContainerDescriptor::new(1, 1, CompressionFormat::Rgb);
        let mut assembler = ContainerAssembler::new(descriptor).unwrap();
        assembler.push_level(&[0; 4]).unwrap();

        assert!(assembler.next_slot().is_none());
        assert!(assembler.push_level(&[0; 4]).is_err());
    }
}
