//! Texture build pipeline for ddsforge
//!
//! Takes RGBA images (decoded through the `image` crate or handed in
//! directly) and produces DDS containers:
//!
//! - alpha and normal-map classification ([`PixelBuffer`])
//! - Lanczos3 mipmap chains ([`MipmapChain`])
//! - YYYX / ZYZX swizzles for DXT5 normal maps ([`Swizzle`])
//! - DXT1 / DXT5 compression through `texpresso` ([`BlockCompressor`])
//! - single images, texture arrays and cube maps ([`ImageBuilder`])
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use ddsforge_build::{BuildOptions, DecoderContext, ImageBuilder};
//!
//! let decoder = DecoderContext::init();
//! let builder = ImageBuilder::new();
//! let written = builder.convert_to_dds(
//!     &decoder,
//!     Path::new("brick.png"),
//!     BuildOptions::GENERATE_MIPMAPS | BuildOptions::ENABLE_COMPRESSION,
//!     Path::new("out/"),
//! )?;
//! println!("wrote {}", written.display());
//! # Ok::<(), ddsforge_build::Error>(())
//! ```

pub mod builder;
pub mod compressor;
pub mod decoder;
pub mod logging;
pub mod mipmap;
pub mod pixel;
pub mod plan;
pub mod swizzle;

pub use builder::{output_path, write_atomic, BuilderConfig, ImageBuilder, DDS_EXTENSION};
#[cfg(feature = "compression")]
pub use compressor::TexpressoCompressor;
pub use compressor::{default_compressor, encode_level, encode_uncompressed, BlockCompressor};
pub use decoder::{DecoderContext, ImageCrateDecoder, ImageDecoder};
pub use mipmap::{mip_count, MipmapChain, MIPMAP_FILTER};
pub use pixel::{PixelBuffer, PixelFlags};
pub use plan::{BuildPlan, Encoding, Topology};
pub use swizzle::Swizzle;

pub use ddsforge_core::{BuildOptions, Error, ErrorKind, Result};
pub use ddsforge_dds::CompressionFormat;
