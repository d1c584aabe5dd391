//! Level encoding: BGR(A) rows or DXT1/DXT5 blocks
//!
//! Block compression sits behind [`BlockCompressor`] so the pipeline does not
//! depend on one particular kernel. The production implementation wraps
//! `texpresso` and is only compiled with the `compression` feature.

use std::sync::Arc;

use ddsforge_core::{Error, Result};
use ddsforge_dds::CompressionFormat;

use crate::pixel::PixelBuffer;

/// Turns one RGBA level into DXT blocks
pub trait BlockCompressor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Compress `buffer` into `format`, which is always `Dxt1` or `Dxt5`
    fn compress(&self, buffer: &PixelBuffer, format: CompressionFormat) -> Result<Vec<u8>>;
}

/// S3TC compressor backed by `texpresso`
///
/// Always runs the iterative cluster fit, the slowest and most accurate
/// endpoint search texpresso offers.
#[cfg(feature = "compression")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TexpressoCompressor;

#[cfg(feature = "compression")]
impl TexpressoCompressor {
    /// Compressor with the cluster fit settings
    pub fn new() -> Self {
        Self
    }

    fn params() -> texpresso::Params {
        texpresso::Params {
            algorithm: texpresso::Algorithm::IterativeClusterFit,
            ..texpresso::Params::default()
        }
    }
}

#[cfg(feature = "compression")]
impl BlockCompressor for TexpressoCompressor {
    fn name(&self) -> &str {
        "texpresso"
    }

    fn compress(&self, buffer: &PixelBuffer, format: CompressionFormat) -> Result<Vec<u8>> {
        let kernel = match format {
            CompressionFormat::Dxt1 => texpresso::Format::Bc1,
            CompressionFormat::Dxt5 => texpresso::Format::Bc3,
            other => {
                return Err(Error::internal(format!(
                    "{} is not a block-compressed format",
                    other
                )))
            }
        };

        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        // Partial edge blocks are padded inside texpresso
        let mut output = vec![0u8; kernel.compressed_size(width, height)];
        kernel.compress(buffer.data(), width, height, Self::params(), &mut output);
        Ok(output)
    }
}

/// Compressor used when none is configured explicitly
pub fn default_compressor() -> Option<Arc<dyn BlockCompressor>> {
    #[cfg(feature = "compression")]
    {
        Some(Arc::new(TexpressoCompressor::new()))
    }
    #[cfg(not(feature = "compression"))]
    {
        None
    }
}

/// Write an RGBA level as BGR or BGRA rows padded to 4 bytes
pub fn encode_uncompressed(buffer: &PixelBuffer, format: CompressionFormat) -> Result<Vec<u8>> {
    let bytes_per_pixel = format
        .bytes_per_pixel()
        .ok_or_else(|| Error::internal(format!("{} is not an uncompressed format", format)))?
        as usize;

    let width = buffer.width() as usize;
    let pitch = format.row_pitch(buffer.width());
    let mut output = vec![0u8; format.level_size(buffer.width(), buffer.height())];

    if width == 0 {
        return Ok(output);
    }

    for (src_row, dst_row) in buffer
        .data()
        .chunks_exact(width * 4)
        .zip(output.chunks_exact_mut(pitch))
    {
        for (src, dst) in src_row
            .chunks_exact(4)
            .zip(dst_row.chunks_exact_mut(bytes_per_pixel))
        {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            if bytes_per_pixel == 4 {
                dst[3] = src[3];
            }
        }
    }

    Ok(output)
}

/// Encode one level, checking the result against the expected level size
pub fn encode_level(
    compressor: Option<&dyn BlockCompressor>,
    buffer: &PixelBuffer,
    format: CompressionFormat,
) -> Result<Vec<u8>> {
    let data = if format.is_compressed() {
        let compressor = compressor.ok_or_else(|| {
            Error::unsupported("block compression is not available in this build")
        })?;
        compressor.compress(buffer, format)?
    } else {
        encode_uncompressed(buffer, format)?
    };

    let expected = format.level_size(buffer.width(), buffer.height());
    if data.len() != expected {
        return Err(Error::internal(format!(
            "{} level {}x{} encoded to {} bytes, expected {}",
            format,
            buffer.width(),
            buffer.height(),
            data.len(),
            expected
        )));
    }
    Ok(data)
}
