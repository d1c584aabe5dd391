//! Source image decoding
//!
//! Decoding of PNG, JPEG, TGA and friends is left to the `image` crate. The
//! pipeline only sees the [`ImageDecoder`] trait, reached through a
//! [`DecoderContext`] that the caller creates once and passes around.

use std::io::Cursor;
use std::path::Path;

use ddsforge_core::{Error, Result};
use image::{ImageFormat, ImageReader};
use tracing::{debug, info};

use crate::pixel::PixelBuffer;

/// Turns encoded image bytes into an RGBA buffer
pub trait ImageDecoder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Decode `bytes`; `extension` is a format hint for headerless formats
    fn decode(&self, bytes: &[u8], extension: Option<&str>) -> Result<PixelBuffer>;
}

/// Decoder backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn name(&self) -> &str {
        "image"
    }

    fn decode(&self, bytes: &[u8], extension: Option<&str>) -> Result<PixelBuffer> {
        let mut reader = ImageReader::new(Cursor::new(bytes));
        if let Some(format) = extension.and_then(ImageFormat::from_extension) {
            reader.set_format(format);
        }

        // Content sniffing wins over the extension when it recognises the data
        let reader = reader
            .with_guessed_format()
            .map_err(|e| Error::decode(e.to_string()))?;
        let image = reader.decode().map_err(|e| Error::decode(e.to_string()))?;

        PixelBuffer::from_rgba_image(image.into_rgba8())
    }
}

/// Scoped handle to the image decoding library
///
/// Create one with [`DecoderContext::init`] before loading images and drop it
/// when done. Nothing is process-wide, so independent contexts can coexist.
pub struct DecoderContext {
    decoder: Box<dyn ImageDecoder>,
}

impl DecoderContext {
    /// Context over the `image` crate decoder
    pub fn init() -> Self {
        Self::with_decoder(Box::new(ImageCrateDecoder))
    }

    /// Context over a custom decoder
    pub fn with_decoder(decoder: Box<dyn ImageDecoder>) -> Self {
        info!(decoder = decoder.name(), "Decoder context initialized");
        Self { decoder }
    }

    /// The decoder behind this context
    pub fn decoder(&self) -> &dyn ImageDecoder {
        self.decoder.as_ref()
    }

    /// Decode in-memory bytes and classify alpha
    pub fn decode(&self, bytes: &[u8], extension: Option<&str>) -> Result<PixelBuffer> {
        let mut buffer = self.decoder.decode(bytes, extension)?;
        buffer.determine_alpha();
        debug!(
            width = buffer.width(),
            height = buffer.height(),
            alpha = buffer.has_alpha(),
            "Image decoded"
        );
        Ok(buffer)
    }

    /// Read and decode a file
    pub fn decode_file(&self, path: &Path) -> Result<PixelBuffer> {
        let bytes = std::fs::read(path).map_err(|e| Error::io_at(path, e))?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        self.decode(&bytes, extension)
            .map_err(|e| e.with_context(format!("decoding {}", path.display())))
    }
}

impl std::fmt::Debug for DecoderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderContext")
            .field("decoder", &self.decoder.name())
            .finish()
    }
}

impl Drop for DecoderContext {
    fn drop(&mut self) {
        info!(decoder = self.decoder.name(), "Decoder context released");
    }
}
