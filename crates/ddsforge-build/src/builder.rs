//! Texture build orchestration
//!
//! [`ImageBuilder`] runs the whole pipeline for a set of faces:
//! plan normalization, face validation, flips, swizzle, mipmaps, level
//! encoding and container assembly. Faces are independent and are built on
//! the rayon pool; results are collected in input order.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ddsforge_core::{BuildOptions, Error, Result, ResultExt};
use ddsforge_dds::{assemble, is_dds, CompressionFormat, ContainerDescriptor, DdsHeader};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::compressor::{default_compressor, encode_level, BlockCompressor};
use crate::decoder::DecoderContext;
use crate::logging::instrument_stage;
use crate::mipmap::{mip_count, MipmapChain};
use crate::pixel::PixelBuffer;
use crate::plan::{BuildPlan, Encoding};

/// File extension of written containers
pub const DDS_EXTENSION: &str = "dds";

/// Builder tuning knobs
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Build faces of arrays and cube maps concurrently
    pub parallel_faces: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            parallel_faces: true,
        }
    }
}

/// Builds DDS containers from pixel buffers or image files
#[derive(Clone)]
pub struct ImageBuilder {
    config: BuilderConfig,
    compressor: Option<Arc<dyn BlockCompressor>>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuilder")
            .field("config", &self.config)
            .field("compressor", &self.compressor.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl ImageBuilder {
    /// Builder with the default compressor, if this build has one
    pub fn new() -> Self {
        Self {
            config: BuilderConfig::default(),
            compressor: default_compressor(),
        }
    }

    /// Replace the tuning knobs
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `compressor` for DXT1/DXT5 levels
    pub fn with_compressor(mut self, compressor: Arc<dyn BlockCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Drop block compression; compression requests then fail
    pub fn without_compression(mut self) -> Self {
        self.compressor = None;
        self
    }

    /// Whether compression requests can be served
    pub fn compression_available(&self) -> bool {
        self.compressor.is_some()
    }

    /// Current tuning knobs
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build a container in memory
    pub fn build_dds(&self, faces: Vec<PixelBuffer>, options: BuildOptions) -> Result<Vec<u8>> {
        let plan = BuildPlan::normalize(options, faces.len())?;
        if plan.encoding == Encoding::BlockCompressed && !self.compression_available() {
            return Err(Error::unsupported(
                "compression requested but block compression is not available",
            ));
        }

        let (width, height, has_alpha) = validate_faces(&faces)?;
        let format = plan.format(has_alpha);
        let mips = if plan.mipmaps { mip_count(width, height) } else { 1 };

        info!(
            width,
            height,
            faces = faces.len(),
            mips,
            %format,
            topology = ?plan.topology,
            "Building DDS"
        );

        let descriptor = ContainerDescriptor::new(width, height, format)
            .with_mip_count(mips)
            .with_faces(plan.face_count(), plan.is_cube_map())
            .with_normal_map(plan.normal_map);
        descriptor.validate()?;

        let levels = instrument_stage("faces", || self.build_faces(faces, &plan, format))?;

        instrument_stage("assemble", || assemble(descriptor, &levels))
    }

    /// Build a container and write it atomically to `dest`
    ///
    /// On failure nothing is written and an existing `dest` is untouched.
    pub fn create_dds(
        &self,
        faces: Vec<PixelBuffer>,
        options: BuildOptions,
        dest: &Path,
    ) -> Result<()> {
        let bytes = self.build_dds(faces, options)?;
        write_atomic(dest, &bytes)?;
        info!(path = %dest.display(), size = bytes.len(), "DDS written");
        Ok(())
    }

    /// Convert one image file to DDS and return the path written
    ///
    /// A source that already is a DDS container is copied unchanged and
    /// `options` are ignored. A directory `dest_path` receives
    /// `<input stem>.dds`.
    pub fn convert_to_dds(
        &self,
        decoder: &DecoderContext,
        file: &Path,
        options: BuildOptions,
        dest_path: &Path,
    ) -> Result<PathBuf> {
        let dest = output_path(file, dest_path)?;
        let bytes = std::fs::read(file).map_err(|e| Error::io_at(file, e))?;

        if is_dds(&bytes) && DdsHeader::read(&mut &bytes[4..]).is_ok() {
            if !options.is_empty() {
                debug!(?options, "Options ignored for DDS passthrough");
            }
            write_atomic(&dest, &bytes)?;
            info!(source = %file.display(), dest = %dest.display(), "DDS source copied unchanged");
            return Ok(dest);
        }

        let extension = file.extension().and_then(|ext| ext.to_str());
        let buffer = decoder
            .decode(&bytes, extension)
            .with_context(|| format!("decoding {}", file.display()))?;

        self.create_dds(vec![buffer], options, &dest)
            .with_context(|| format!("converting {}", file.display()))?;
        Ok(dest)
    }

    /// Decode an image file with alpha classified
    pub fn load_image(decoder: &DecoderContext, file: &Path) -> Result<PixelBuffer> {
        decoder.decode_file(file)
    }

    fn build_faces(
        &self,
        faces: Vec<PixelBuffer>,
        plan: &BuildPlan,
        format: CompressionFormat,
    ) -> Result<Vec<Vec<Vec<u8>>>> {
        if self.config.parallel_faces && faces.len() > 1 {
            faces
                .into_par_iter()
                .enumerate()
                .map(|(index, face)| self.build_face(index, face, plan, format))
                .collect()
        } else {
            faces
                .into_iter()
                .enumerate()
                .map(|(index, face)| self.build_face(index, face, plan, format))
                .collect()
        }
    }

    fn build_face(
        &self,
        index: usize,
        mut face: PixelBuffer,
        plan: &BuildPlan,
        format: CompressionFormat,
    ) -> Result<Vec<Vec<u8>>> {
        if plan.flip_vertical {
            face.flip_vertical();
        }
        if plan.flip_horizontal {
            face.flip_horizontal();
        }
        if let Some(swizzle) = plan.swizzle {
            swizzle.apply(&mut face);
        }

        let chain = MipmapChain::build(face, plan.mipmaps)
            .with_context(|| format!("building mipmaps for face {}", index))?;

        let compressor = self.compressor.as_deref();
        chain
            .levels()
            .iter()
            .enumerate()
            .map(|(level, buffer)| {
                let data = encode_level(compressor, buffer, format)
                    .with_context(|| format!("encoding face {} level {}", index, level))?;
                debug!(face = index, level, bytes = data.len(), "Level encoded");
                Ok(data)
            })
            .collect()
    }
}

/// Check that all faces are non-empty and agree on size and alpha
fn validate_faces(faces: &[PixelBuffer]) -> Result<(u32, u32, bool)> {
    let first = faces
        .first()
        .ok_or_else(|| Error::invalid_input("no faces given"))?;
    if first.is_empty() {
        return Err(Error::InvalidDimensions {
            width: first.width(),
            height: first.height(),
        });
    }

    for (index, face) in faces.iter().enumerate().skip(1) {
        if face.dimensions() != first.dimensions() {
            return Err(Error::FaceMismatch {
                index,
                message: format!(
                    "size {}x{} differs from {}x{}",
                    face.width(),
                    face.height(),
                    first.width(),
                    first.height()
                ),
            });
        }
        if face.has_alpha() != first.has_alpha() {
            return Err(Error::FaceMismatch {
                index,
                message: format!(
                    "alpha {} differs from {}",
                    face.has_alpha(),
                    first.has_alpha()
                ),
            });
        }
    }

    Ok((first.width(), first.height(), first.has_alpha()))
}

/// Resolve where a converted file goes
///
/// A directory destination gets `<input stem>.dds`; anything else is used
/// as the output file path as given.
pub fn output_path(input: &Path, dest: &Path) -> Result<PathBuf> {
    if !dest.is_dir() {
        return Ok(dest.to_path_buf());
    }

    let stem = input
        .file_stem()
        .ok_or_else(|| Error::invalid_input(format!("{} has no file name", input.display())))?;
    Ok(dest.join(Path::new(stem).with_extension(DDS_EXTENSION)))
}

/// Write `bytes` to a sibling temporary file, then rename it over `dest`
///
/// The temporary file is removed on every failure path.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic_with(dest, |file| file.write_all(bytes))
}

fn write_atomic_with<F>(dest: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let file_name = dest
        .file_name()
        .ok_or_else(|| Error::invalid_input(format!("{} is not a file path", dest.display())))?;
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name.to_string_lossy()))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io_at(dir, e))?;
    let temp_path = temp.path().to_path_buf();

    // Dropping `temp` on any early return deletes it
    fill(temp.as_file_mut()).map_err(|e| Error::io_at(&temp_path, e))?;
    temp.persist(dest).map_err(|e| Error::io_at(dest, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsforge_core::ErrorKind;

    use std::sync::Mutex;

    use ddsforge_dds::DdsTexture;
    use tempfile::TempDir;

    /// Keeps every level it is handed and writes zeroed blocks
    #[derive(Default)]
    struct RecordingCompressor {
        seen: Mutex<Vec<(CompressionFormat, PixelBuffer)>>,
    }

    impl RecordingCompressor {
        fn seen(&self) -> Vec<(CompressionFormat, PixelBuffer)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl BlockCompressor for RecordingCompressor {
        fn name(&self) -> &str {
            "recording"
        }

        fn compress(&self, buffer: &PixelBuffer, format: CompressionFormat) -> Result<Vec<u8>> {
            self.seen.lock().unwrap().push((format, buffer.clone()));
            Ok(vec![0; format.level_size(buffer.width(), buffer.height())])
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn opaque(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::filled(width, height, [90, 60, 30, 255]).unwrap()
    }

    #[test]
    fn test_validate_faces_mismatched_size() {
        let faces = vec![opaque(4, 4), opaque(4, 4), opaque(8, 8)];
        let err = validate_faces(&faces).unwrap_err();
        assert!(matches!(err, Error::FaceMismatch { index: 2, .. }));
    }

    #[test]
    fn test_validate_faces_mismatched_alpha() {
        let translucent = PixelBuffer::filled(4, 4, [0, 0, 0, 10]).unwrap();
        let faces = vec![opaque(4, 4), translucent];
        let err = validate_faces(&faces).unwrap_err();
        assert!(matches!(err, Error::FaceMismatch { index: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_empty_face_rejected() {
        let builder = ImageBuilder::new();
        let err = builder
            .build_dds(vec![PixelBuffer::empty()], BuildOptions::empty())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_compression_without_compressor() {
        let builder = ImageBuilder::new().without_compression();
        let err = builder
            .build_dds(vec![opaque(4, 4)], BuildOptions::ENABLE_COMPRESSION)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn test_swizzle_applied_before_compression() {
        let recorder = Arc::new(RecordingCompressor::default());
        let builder = ImageBuilder::new().with_compressor(recorder.clone());
        let face = PixelBuffer::filled(8, 8, [10, 20, 30, 255]).unwrap();
        let options = BuildOptions::ENABLE_COMPRESSION | BuildOptions::SWIZZLE_ZYZX;
        let bytes = builder.build_dds(vec![face], options).unwrap();

        let texture = DdsTexture::from_bytes(&bytes).unwrap();
        assert_eq!(texture.format, Some(CompressionFormat::Dxt5));
        assert_eq!(texture.data.len(), 4 * 16);

        let seen = recorder.seen();
        assert_eq!(seen.len(), 1);
        let (format, level) = &seen[0];
        assert_eq!(*format, CompressionFormat::Dxt5);
        assert!(level.pixels().all(|px| px == [30, 20, 30, 10]));
    }

    #[test]
    fn test_yyyx_swizzle_reaches_every_level() {
        let recorder = Arc::new(RecordingCompressor::default());
        let builder = ImageBuilder::new().with_compressor(recorder.clone());
        let face = PixelBuffer::filled(4, 4, [10, 20, 30, 255]).unwrap();
        let options = BuildOptions::ENABLE_COMPRESSION
            | BuildOptions::SWIZZLE_YYYX
            | BuildOptions::GENERATE_MIPMAPS;
        builder.build_dds(vec![face], options).unwrap();

        let seen = recorder.seen();
        assert_eq!(seen.len(), 3);
        for (_, level) in &seen {
            assert!(level.pixels().all(|px| px == [20, 20, 20, 10]));
        }
    }

    #[test]
    fn test_flip_reaches_output() {
        let mut data = vec![0u8; 2 * 2 * 4];
        data[..8].copy_from_slice(&[255, 0, 0, 255, 255, 0, 0, 255]);
        data[8..].copy_from_slice(&[0, 0, 255, 255, 0, 0, 255, 255]);
        let face = PixelBuffer::new(2, 2, data).unwrap();

        let bytes = ImageBuilder::new()
            .build_dds(vec![face], BuildOptions::FLIP_VERTICAL)
            .unwrap();
        let texture = DdsTexture::from_bytes(&bytes).unwrap();
        let level = texture.get_mipmap(0, 0).unwrap();

        // First stored row is now the blue one, written as BGR
        assert_eq!(&level[0..3], &[255, 0, 0]);
        assert_eq!(&level[8..11], &[0, 0, 255]);
    }

    #[test]
    fn test_flop_reaches_output() {
        let face = PixelBuffer::new(
            2,
            1,
            vec![
                255, 0, 0, 255, //
                0, 0, 255, 255,
            ],
        )
        .unwrap();

        let bytes = ImageBuilder::new()
            .build_dds(vec![face], BuildOptions::FLIP_HORIZONTAL)
            .unwrap();
        let texture = DdsTexture::from_bytes(&bytes).unwrap();
        let level = texture.get_mipmap(0, 0).unwrap();

        // Blue pixel now comes first, written as BGR
        assert_eq!(&level[0..3], &[255, 0, 0]);
        assert_eq!(&level[3..6], &[0, 0, 255]);
    }

    #[test]
    fn test_flip_and_flop_reach_compressor() {
        let recorder = Arc::new(RecordingCompressor::default());
        let builder = ImageBuilder::new().with_compressor(recorder.clone());
        let data: Vec<u8> = (0..4u8).flat_map(|i| [i * 50, 0, 0, 255]).collect();
        let face = PixelBuffer::new(2, 2, data).unwrap();
        let options = BuildOptions::ENABLE_COMPRESSION
            | BuildOptions::FLIP_VERTICAL
            | BuildOptions::FLIP_HORIZONTAL;
        builder.build_dds(vec![face], options).unwrap();

        let seen = recorder.seen();
        let reds: Vec<u8> = seen[0].1.pixels().map(|px| px[0]).collect();
        assert_eq!(reds, vec![150, 100, 50, 0]);
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("texture.dds");
        std::fs::write(&dest, b"previous").unwrap();

        let err = write_atomic_with(&dest, |file| {
            file.write_all(b"partial")?;
            Err(std::io::Error::other("device full"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
        assert_eq!(dir_entries(dir.path()), vec!["texture.dds"]);
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("taken");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("inside"), b"x").unwrap();

        let err = write_atomic(&dest, b"DDS ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(dir_entries(dir.path()), vec!["taken"]);
    }

    #[test]
    fn test_concurrent_writes_to_one_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("shared.dds");
        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 4096]).collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let dest = &dest;
                scope.spawn(move || write_atomic(dest, payload).unwrap());
            }
        });

        let written = std::fs::read(&dest).unwrap();
        assert!(payloads.contains(&written));
        assert_eq!(dir_entries(dir.path()), vec!["shared.dds"]);
    }

    #[test]
    fn test_sequential_and_parallel_match() {
        let faces: Vec<_> = (0..4u8)
            .map(|i| PixelBuffer::filled(8, 8, [i * 40, 10, 200, 255]).unwrap())
            .collect();
        let options = BuildOptions::GENERATE_MIPMAPS;

        let parallel = ImageBuilder::new().build_dds(faces.clone(), options).unwrap();
        let sequential = ImageBuilder::new()
            .with_config(BuilderConfig {
                parallel_faces: false,
            })
            .build_dds(faces, options)
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_output_path_for_file_destination() {
        let dest = Path::new("/some/where/out.dds");
        let resolved = output_path(Path::new("textures/brick.png"), dest).unwrap();
        assert_eq!(resolved, dest);
    }
}
