//! Stored pixel formats

use std::fmt;

use super::header::{pf_flags, DX10Header, DdsHeader, PixelFormat, PIXEL_FORMAT_SIZE};

/// DXGI format codes written into DX10 extension headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxgiFormat {
    Unknown = 0,
    BC1Unorm = 71,
    BC3Unorm = 77,
    B8G8R8A8Unorm = 87,
}

impl DxgiFormat {
    /// Create from u32 value
    pub fn from_u32(value: u32) -> Self {
        match value {
            71 => DxgiFormat::BC1Unorm,
            77 => DxgiFormat::BC3Unorm,
            87 => DxgiFormat::B8G8R8A8Unorm,
            _ => DxgiFormat::Unknown,
        }
    }
}

/// How pixel data of every level is stored
///
/// Uncompressed formats keep the usual DDS memory order (BGR / BGRA) with
/// each row padded to a 4-byte boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionFormat {
    /// 24-bit BGR, alpha dropped
    Rgb,
    /// 32-bit BGRA
    Rgba,
    /// BC1, 8 bytes per 4x4 block, opaque
    Dxt1,
    /// BC3, 16 bytes per 4x4 block, interpolated alpha
    Dxt5,
}

impl CompressionFormat {
    /// Pick the stored format from alpha presence and the compression switch.
    pub fn select(has_alpha: bool, compress: bool) -> Self {
        match (compress, has_alpha) {
            (false, false) => CompressionFormat::Rgb,
            (false, true) => CompressionFormat::Rgba,
            (true, false) => CompressionFormat::Dxt1,
            (true, true) => CompressionFormat::Dxt5,
        }
    }

    /// Check if format is block-compressed
    pub fn is_compressed(self) -> bool {
        matches!(self, CompressionFormat::Dxt1 | CompressionFormat::Dxt5)
    }

    /// Whether the stored data keeps an alpha channel
    pub fn has_alpha(self) -> bool {
        matches!(self, CompressionFormat::Rgba | CompressionFormat::Dxt5)
    }

    /// Bytes per pixel for uncompressed formats
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            CompressionFormat::Rgb => Some(3),
            CompressionFormat::Rgba => Some(4),
            _ => None,
        }
    }

    /// Block size for compressed formats
    pub fn block_size(self) -> Option<u32> {
        match self {
            CompressionFormat::Dxt1 => Some(8),
            CompressionFormat::Dxt5 => Some(16),
            _ => None,
        }
    }

    /// Bytes per row (uncompressed) or per row of 4x4 blocks (compressed)
    ///
    /// Saturates instead of wrapping for widths read from untrusted headers.
    pub fn row_pitch(self, width: u32) -> usize {
        let width = width as usize;
        match self {
            CompressionFormat::Rgb => width.saturating_mul(3).saturating_add(3) & !3,
            CompressionFormat::Rgba => width.saturating_mul(4),
            CompressionFormat::Dxt1 => width.div_ceil(4).max(1).saturating_mul(8),
            CompressionFormat::Dxt5 => width.div_ceil(4).max(1).saturating_mul(16),
        }
    }

    /// Number of stored rows (pixel rows or block rows)
    pub fn row_count(self, height: u32) -> u32 {
        if self.is_compressed() {
            height.div_ceil(4).max(1)
        } else {
            height
        }
    }

    /// Size in bytes of one level of the given dimensions
    pub fn level_size(self, width: u32, height: u32) -> usize {
        self.row_pitch(width)
            .saturating_mul(self.row_count(height) as usize)
    }

    /// FourCC written for compressed formats
    pub fn fourcc(self) -> Option<[u8; 4]> {
        match self {
            CompressionFormat::Dxt1 => Some(*b"DXT1"),
            CompressionFormat::Dxt5 => Some(*b"DXT5"),
            _ => None,
        }
    }

    /// DXGI code used when the container carries a DX10 header
    pub fn dxgi_format(self) -> Option<DxgiFormat> {
        match self {
            CompressionFormat::Dxt1 => Some(DxgiFormat::BC1Unorm),
            CompressionFormat::Dxt5 => Some(DxgiFormat::BC3Unorm),
            CompressionFormat::Rgba => Some(DxgiFormat::B8G8R8A8Unorm),
            CompressionFormat::Rgb => None,
        }
    }

    /// Legacy pixel format structure for this format
    pub fn pixel_format(self, normal_map: bool) -> PixelFormat {
        let normal = if normal_map { pf_flags::NORMAL } else { 0 };
        match self {
            CompressionFormat::Rgb => PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: pf_flags::RGB | normal,
                fourcc: [0; 4],
                rgb_bit_count: 24,
                r_bit_mask: 0x00FF_0000,
                g_bit_mask: 0x0000_FF00,
                b_bit_mask: 0x0000_00FF,
                a_bit_mask: 0,
            },
            CompressionFormat::Rgba => PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: pf_flags::RGB | pf_flags::ALPHAPIXELS | normal,
                fourcc: [0; 4],
                rgb_bit_count: 32,
                r_bit_mask: 0x00FF_0000,
                g_bit_mask: 0x0000_FF00,
                b_bit_mask: 0x0000_00FF,
                a_bit_mask: 0xFF00_0000,
            },
            CompressionFormat::Dxt1 | CompressionFormat::Dxt5 => PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: pf_flags::FOURCC | normal,
                fourcc: self.fourcc().unwrap_or_default(),
                ..PixelFormat::default()
            },
        }
    }

    /// Detect the stored format of an existing container
    pub fn from_header(header: &DdsHeader, dx10: Option<&DX10Header>) -> Option<Self> {
        if let Some(dx10_hdr) = dx10 {
            return match DxgiFormat::from_u32(dx10_hdr.dxgi_format) {
                DxgiFormat::BC1Unorm => Some(CompressionFormat::Dxt1),
                DxgiFormat::BC3Unorm => Some(CompressionFormat::Dxt5),
                DxgiFormat::B8G8R8A8Unorm => Some(CompressionFormat::Rgba),
                DxgiFormat::Unknown => None,
            };
        }

        let pf = &header.pixel_format;
        if pf.flags & pf_flags::FOURCC != 0 {
            match &pf.fourcc {
                b"DXT1" => Some(CompressionFormat::Dxt1),
                b"DXT5" => Some(CompressionFormat::Dxt5),
                _ => None,
            }
        } else if pf.flags & pf_flags::RGB != 0 && pf.r_bit_mask == 0x00FF_0000 {
            match pf.rgb_bit_count {
                24 => Some(CompressionFormat::Rgb),
                32 => Some(CompressionFormat::Rgba),
                _ => None,
            }
        } else {
            None
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionFormat::Rgb => write!(f, "RGB"),
            CompressionFormat::Rgba => write!(f, "RGBA"),
            CompressionFormat::Dxt1 => write!(f, "DXT1"),
            CompressionFormat::Dxt5 => write!(f, "DXT5"),
        }
    }
}
