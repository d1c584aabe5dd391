//! DDS (DirectDraw Surface) container format
//!
//! Writing goes through [`ContainerAssembler`], which emits the magic, the
//! legacy header and (for texture arrays) the DX10 extension, then accepts
//! level data face by face. [`DdsTexture`] reads containers back, which the
//! builder uses to recognise DDS sources and the CLI uses for `info`.

mod assembler;
mod format;
mod header;

pub use assembler::{
    assemble, full_mip_count, level_dimensions, ContainerAssembler, ContainerDescriptor,
    CUBE_FACE_COUNT,
};
pub use format::{CompressionFormat, DxgiFormat};
pub use header::{
    caps, caps2, flags, pf_flags, DX10Header, DdsHeader, PixelFormat, DX10_HEADER_SIZE,
    HEADER_SIZE, PIXEL_FORMAT_SIZE, RESOURCE_DIMENSION_TEXTURE2D,
};

use std::io::Read;

use ddsforge_core::{Error, Result};

/// DDS file magic number "DDS "
pub const DDS_MAGIC: u32 = 0x2053_4444;

/// Check whether a byte stream starts like a DDS container
///
/// Only the magic and the declared header size are inspected.
pub fn is_dds(bytes: &[u8]) -> bool {
    bytes.len() >= 8
        && bytes[..4] == DDS_MAGIC.to_le_bytes()
        && bytes[4..8] == HEADER_SIZE.to_le_bytes()
}

/// Parsed DDS texture
#[derive(Debug, Clone)]
pub struct DdsTexture {
    /// DDS header
    pub header: DdsHeader,
    /// DX10 extended header (if present)
    pub dx10_header: Option<DX10Header>,
    /// Level data of every face, in storage order
    pub data: Vec<u8>,
    /// Detected stored format, `None` for formats this crate does not write
    pub format: Option<CompressionFormat>,
}

impl DdsTexture {
    /// Parse a container from a reader positioned at the magic
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic_buf = [0u8; 4];
        reader.read_exact(&mut magic_buf)?;
        if u32::from_le_bytes(magic_buf) != DDS_MAGIC {
            return Err(Error::InvalidMagic {
                expected: DDS_MAGIC.to_le_bytes().to_vec(),
                found: magic_buf.to_vec(),
            });
        }

        let header = DdsHeader::read(&mut reader)?;
        let dx10_header = if header.has_dx10_header() {
            Some(DX10Header::read(&mut reader)?)
        } else {
            None
        };
        let format = CompressionFormat::from_header(&header, dx10_header.as_ref());

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Ok(DdsTexture {
            header,
            dx10_header,
            data,
            format,
        })
    }

    /// Parse a container held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(bytes)
    }

    /// Get width in pixels
    pub fn width(&self) -> u32 {
        self.header.width
    }

    /// Get height in pixels
    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Get mipmap count, treating 0 as a single level
    ///
    /// Counts beyond a full chain for the header's size are clamped to it.
    pub fn mipmap_count(&self) -> u32 {
        self.header
            .mipmap_count
            .clamp(1, full_mip_count(self.width(), self.height()))
    }

    /// Check if texture is a cubemap
    pub fn is_cubemap(&self) -> bool {
        self.header.is_cubemap()
    }

    /// Check if the normal map marker is set
    pub fn is_normal_map(&self) -> bool {
        self.header.is_normal_map()
    }

    /// Number of faces (cube faces or array slices)
    pub fn face_count(&self) -> u32 {
        if self.is_cubemap() {
            self.header.cube_face_count()
        } else {
            self.dx10_header
                .as_ref()
                .map(|dx10| dx10.array_size.max(1))
                .unwrap_or(1)
        }
    }

    /// Get the dimensions of a specific mipmap level
    pub fn get_mipmap_dimensions(&self, level: u32) -> Option<(u32, u32)> {
        if level >= self.mipmap_count() {
            return None;
        }
        Some(level_dimensions(self.width(), self.height(), level))
    }

    /// Get data for a specific face and mipmap level
    ///
    /// Returns `None` if the slot does not exist, the format is unknown, or
    /// the payload is too short.
    pub fn get_mipmap(&self, face: u32, level: u32) -> Option<&[u8]> {
        let format = self.format?;
        if face >= self.face_count() || level >= self.mipmap_count() {
            return None;
        }

        let level_size = |l: u32| {
            let (w, h) = level_dimensions(self.width(), self.height(), l);
            format.level_size(w, h)
        };
        let span = |levels: u32| {
            (0..levels).try_fold(0usize, |total, l| total.checked_add(level_size(l)))
        };

        let face_start = span(self.mipmap_count())?.checked_mul(face as usize)?;
        let offset = face_start.checked_add(span(level)?)?;
        let end = offset.checked_add(level_size(level))?;
        self.data.get(offset..end)
    }
}
