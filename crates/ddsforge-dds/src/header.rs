//! DDS header structures

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ddsforge_core::{Error, Result};

/// Size of the main header, excluding the magic
pub const HEADER_SIZE: u32 = 124;

/// Size of the embedded pixel format structure
pub const PIXEL_FORMAT_SIZE: u32 = 32;

/// Size of the DX10 extension header
pub const DX10_HEADER_SIZE: u32 = 20;

/// DDS header flags
pub mod flags {
    pub const CAPS: u32 = 0x1;
    pub const HEIGHT: u32 = 0x2;
    pub const WIDTH: u32 = 0x4;
    pub const PITCH: u32 = 0x8;
    pub const PIXEL_FORMAT: u32 = 0x1000;
    pub const MIPMAP_COUNT: u32 = 0x20000;
    pub const LINEAR_SIZE: u32 = 0x80000;
    pub const DEPTH: u32 = 0x800000;
}

/// Caps flags
pub mod caps {
    pub const COMPLEX: u32 = 0x8;
    pub const TEXTURE: u32 = 0x1000;
    pub const MIPMAP: u32 = 0x400000;
}

/// Caps2 flags
pub mod caps2 {
    pub const CUBEMAP: u32 = 0x200;
    pub const CUBEMAP_POSITIVEX: u32 = 0x400;
    pub const CUBEMAP_NEGATIVEX: u32 = 0x800;
    pub const CUBEMAP_POSITIVEY: u32 = 0x1000;
    pub const CUBEMAP_NEGATIVEY: u32 = 0x2000;
    pub const CUBEMAP_POSITIVEZ: u32 = 0x4000;
    pub const CUBEMAP_NEGATIVEZ: u32 = 0x8000;
    pub const CUBEMAP_ALL_FACES: u32 = CUBEMAP_POSITIVEX
        | CUBEMAP_NEGATIVEX
        | CUBEMAP_POSITIVEY
        | CUBEMAP_NEGATIVEY
        | CUBEMAP_POSITIVEZ
        | CUBEMAP_NEGATIVEZ;
    pub const VOLUME: u32 = 0x200000;
}

/// DDS pixel format flags
pub mod pf_flags {
    pub const ALPHAPIXELS: u32 = 0x1;
    pub const ALPHA: u32 = 0x2;
    pub const FOURCC: u32 = 0x4;
    pub const RGB: u32 = 0x40;
    pub const YUV: u32 = 0x200;
    pub const LUMINANCE: u32 = 0x20000;
    /// nVidia extension marking tangent-space normal maps
    pub const NORMAL: u32 = 0x8000_0000;
}

/// D3D10 resource dimension of a plain 2D texture
pub const RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;

/// DDS header (124 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: PixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

impl DdsHeader {
    /// Parse DDS header from reader, positioned right after the magic
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let size = reader.read_u32::<LittleEndian>()?;
        if size != HEADER_SIZE {
            return Err(Error::invalid_data(format!(
                "Invalid DDS header size: expected {}, got {}",
                HEADER_SIZE, size
            )));
        }

        let flags = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;
        let width = reader.read_u32::<LittleEndian>()?;
        let pitch_or_linear_size = reader.read_u32::<LittleEndian>()?;
        let depth = reader.read_u32::<LittleEndian>()?;
        let mipmap_count = reader.read_u32::<LittleEndian>()?;

        let mut reserved1 = [0u32; 11];
        reader.read_u32_into::<LittleEndian>(&mut reserved1)?;

        let pixel_format = PixelFormat::read(reader)?;

        let caps = reader.read_u32::<LittleEndian>()?;
        let caps2 = reader.read_u32::<LittleEndian>()?;
        let caps3 = reader.read_u32::<LittleEndian>()?;
        let caps4 = reader.read_u32::<LittleEndian>()?;
        let reserved2 = reader.read_u32::<LittleEndian>()?;

        Ok(DdsHeader {
            size,
            flags,
            height,
            width,
            pitch_or_linear_size,
            depth,
            mipmap_count,
            reserved1,
            pixel_format,
            caps,
            caps2,
            caps3,
            caps4,
            reserved2,
        })
    }

    /// Write the header (without magic) in little-endian order
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.height)?;
        writer.write_u32::<LittleEndian>(self.width)?;
        writer.write_u32::<LittleEndian>(self.pitch_or_linear_size)?;
        writer.write_u32::<LittleEndian>(self.depth)?;
        writer.write_u32::<LittleEndian>(self.mipmap_count)?;
        for value in self.reserved1 {
            writer.write_u32::<LittleEndian>(value)?;
        }
        self.pixel_format.write(writer)?;
        writer.write_u32::<LittleEndian>(self.caps)?;
        writer.write_u32::<LittleEndian>(self.caps2)?;
        writer.write_u32::<LittleEndian>(self.caps3)?;
        writer.write_u32::<LittleEndian>(self.caps4)?;
        writer.write_u32::<LittleEndian>(self.reserved2)?;
        Ok(())
    }

    /// Check if this DDS has a DX10 extended header
    pub fn has_dx10_header(&self) -> bool {
        self.pixel_format.flags & pf_flags::FOURCC != 0 && self.pixel_format.fourcc == *b"DX10"
    }

    /// Check if this is a cubemap
    pub fn is_cubemap(&self) -> bool {
        self.caps2 & caps2::CUBEMAP != 0
    }

    /// Check if this has mipmaps
    pub fn has_mipmaps(&self) -> bool {
        self.caps & caps::MIPMAP != 0 && self.mipmap_count > 1
    }

    /// Check if the normal map marker is set
    pub fn is_normal_map(&self) -> bool {
        self.pixel_format.flags & pf_flags::NORMAL != 0
    }

    /// Number of cube faces present according to caps2
    pub fn cube_face_count(&self) -> u32 {
        (self.caps2 & caps2::CUBEMAP_ALL_FACES).count_ones()
    }
}

/// DDS pixel format (32 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl PixelFormat {
    /// Parse pixel format from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let size = reader.read_u32::<LittleEndian>()?;
        if size != PIXEL_FORMAT_SIZE {
            return Err(Error::invalid_data(format!(
                "Invalid pixel format size: expected {}, got {}",
                PIXEL_FORMAT_SIZE, size
            )));
        }

        let flags = reader.read_u32::<LittleEndian>()?;
        let mut fourcc = [0u8; 4];
        reader.read_exact(&mut fourcc)?;

        Ok(PixelFormat {
            size,
            flags,
            fourcc,
            rgb_bit_count: reader.read_u32::<LittleEndian>()?,
            r_bit_mask: reader.read_u32::<LittleEndian>()?,
            g_bit_mask: reader.read_u32::<LittleEndian>()?,
            b_bit_mask: reader.read_u32::<LittleEndian>()?,
            a_bit_mask: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Write the pixel format in little-endian order
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_all(&self.fourcc)?;
        writer.write_u32::<LittleEndian>(self.rgb_bit_count)?;
        writer.write_u32::<LittleEndian>(self.r_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.g_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.b_bit_mask)?;
        writer.write_u32::<LittleEndian>(self.a_bit_mask)?;
        Ok(())
    }

    /// Get FourCC as string
    pub fn fourcc_string(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).to_string()
    }
}

/// DX10 extended header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DX10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

impl DX10Header {
    /// Parse DX10 header from reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(DX10Header {
            dxgi_format: reader.read_u32::<LittleEndian>()?,
            resource_dimension: reader.read_u32::<LittleEndian>()?,
            misc_flag: reader.read_u32::<LittleEndian>()?,
            array_size: reader.read_u32::<LittleEndian>()?,
            misc_flags2: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Write the DX10 header in little-endian order
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.dxgi_format)?;
        writer.write_u32::<LittleEndian>(self.resource_dimension)?;
        writer.write_u32::<LittleEndian>(self.misc_flag)?;
        writer.write_u32::<LittleEndian>(self.array_size)?;
        writer.write_u32::<LittleEndian>(self.misc_flags2)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_header() -> DdsHeader {
        DdsHeader {
            size: HEADER_SIZE,
            flags: flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT | flags::LINEAR_SIZE,
            height: 64,
            width: 128,
            pitch_or_linear_size: 4096,
            depth: 0,
            mipmap_count: 1,
            reserved1: [0; 11],
            pixel_format: PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: pf_flags::FOURCC | pf_flags::NORMAL,
                fourcc: *b"DXT1",
                ..PixelFormat::default()
            },
            caps: caps::TEXTURE,
            caps2: 0,
            caps3: 0,
            caps4: 0,
            reserved2: 0,
        }
    }

    #[test]
    fn test_header_write_is_124_bytes() {
        let mut bytes = Vec::new();
        sample_header().write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE as usize);
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();

        let parsed = DdsHeader::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.is_normal_map());
        assert!(!parsed.is_cubemap());
    }

    #[test]
    fn test_field_offsets() {
        let mut bytes = Vec::new();
        sample_header().write(&mut bytes).unwrap();

        // Offsets are relative to the header start (magic excluded)
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 64);
        assert_eq!(u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]), 128);
        assert_eq!(&bytes[80..84], b"DXT1");
    }

    #[test]
    fn test_rejects_bad_header_size() {
        let mut bytes = Vec::new();
        sample_header().write(&mut bytes).unwrap();
        bytes[0] = 100;

        let err = DdsHeader::read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(err.to_string().contains("header size"));
    }

    #[test]
    fn test_truncated_header_is_io_error() {
        let mut bytes = Vec::new();
        sample_header().write(&mut bytes).unwrap();
        bytes.truncate(60);

        assert!(DdsHeader::read(&mut Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn test_cube_face_count() {
        let mut header = sample_header();
        header.caps2 = caps2::CUBEMAP | caps2::CUBEMAP_ALL_FACES;
        assert!(header.is_cubemap());
        assert_eq!(header.cube_face_count(), 6);
    }

    #[test]
    fn test_dx10_round_trip() {
        let dx10 = DX10Header {
            dxgi_format: 77,
            resource_dimension: RESOURCE_DIMENSION_TEXTURE2D,
            misc_flag: 0,
            array_size: 4,
            misc_flags2: 0,
        };
        let mut bytes = Vec::new();
        dx10.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), DX10_HEADER_SIZE as usize);
        assert_eq!(DX10Header::read(&mut Cursor::new(&bytes)).unwrap(), dx10);
    }
}
