//! ddsforge CLI
//!
//! Command-line interface for building DDS textures from images.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};

use ddsforge_build::logging::{self, TracingConfig};
use ddsforge_build::{output_path, BuildOptions, DecoderContext, ImageBuilder, PixelBuffer};
use ddsforge_dds::{is_dds, DdsTexture};

/// ddsforge - build GPU-ready DDS textures with mipmaps, DXT compression and cube maps
#[derive(Parser)]
#[command(name = "ddsforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert image files to DDS
    Convert(ConvertArgs),

    /// Build a cube map from six face images
    Cube(CubeArgs),

    /// Build a 2D texture array from several images
    Array(ArrayArgs),

    /// Show information about a DDS file
    Info(InfoArgs),
}

#[derive(Args, Debug, Default)]
struct BuildArgs {
    /// Generate a full mipmap chain
    #[arg(short, long)]
    mipmaps: bool,

    /// Compress with DXT1 (opaque) or DXT5 (alpha)
    #[arg(short, long)]
    compress: bool,

    /// Mark the output as a normal map
    #[arg(long)]
    normal_map: bool,

    /// Mark the output as a normal map when the image looks like one
    #[arg(long, conflicts_with = "normal_map")]
    detect_normal_map: bool,

    /// Flip images upside down
    #[arg(long)]
    flip: bool,

    /// Mirror images left to right
    #[arg(long)]
    flop: bool,

    /// Channel swizzle for DXT5 normal maps (needs --compress)
    #[arg(long, value_enum)]
    swizzle: Option<SwizzleArg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SwizzleArg {
    /// RGBA -> GGGR
    Yyyx,
    /// RGBA -> BGBR
    Zyzx,
}

impl BuildArgs {
    fn to_options(&self) -> BuildOptions {
        let mut options = BuildOptions::empty();
        options.set(BuildOptions::GENERATE_MIPMAPS, self.mipmaps);
        options.set(BuildOptions::ENABLE_COMPRESSION, self.compress);
        options.set(BuildOptions::NORMAL_MAP, self.normal_map);
        options.set(BuildOptions::FLIP_VERTICAL, self.flip);
        options.set(BuildOptions::FLIP_HORIZONTAL, self.flop);
        match self.swizzle {
            Some(SwizzleArg::Yyyx) => options |= BuildOptions::SWIZZLE_YYYX,
            Some(SwizzleArg::Zyzx) => options |= BuildOptions::SWIZZLE_ZYZX,
            None => {}
        }
        options
    }

    /// Options for a specific image, applying normal-map detection
    fn options_for(&self, image: &PixelBuffer) -> BuildOptions {
        let mut options = self.to_options();
        if self.detect_normal_map && image.is_normal_map() {
            debug!("Normal map detected");
            options |= BuildOptions::NORMAL_MAP;
        }
        options
    }
}

#[derive(Args)]
struct ConvertArgs {
    /// Input image files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file, or directory for `<name>.dds` outputs
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct CubeArgs {
    /// Face images in order +x -x +y -y +z -z
    #[arg(long, num_args = 6, required = true)]
    faces: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct ArrayArgs {
    /// Slice images in array order
    #[arg(long, num_args = 1.., required = true)]
    faces: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a DDS file
    path: PathBuf,
}

/// Summary printed by `info`
#[derive(Debug, Serialize)]
struct TextureSummary {
    path: PathBuf,
    width: u32,
    height: u32,
    mipmaps: u32,
    faces: u32,
    format: String,
    cube_map: bool,
    normal_map: bool,
    dx10: bool,
    data_size: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(&TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Convert(args) => cmd_convert(args, cli.format),
        Commands::Cube(args) => cmd_cube(args, cli.format),
        Commands::Array(args) => cmd_array(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn cmd_convert(args: ConvertArgs, format: OutputFormat) -> Result<()> {
    if args.inputs.len() > 1 && !args.output.is_dir() {
        std::fs::create_dir_all(&args.output)
            .with_context(|| format!("Failed to create output directory {:?}", args.output))?;
    }

    let decoder = DecoderContext::init();
    let builder = ImageBuilder::new();
    let mut written = Vec::with_capacity(args.inputs.len());

    for input in &args.inputs {
        let dest = convert_one(&builder, &decoder, input, &args.output, &args.build)
            .with_context(|| format!("Failed to convert {:?}", input))?;
        written.push(dest);
    }

    report_written(&written, format)
}

fn convert_one(
    builder: &ImageBuilder,
    decoder: &DecoderContext,
    input: &Path,
    output: &Path,
    build: &BuildArgs,
) -> Result<PathBuf> {
    if !build.detect_normal_map {
        return Ok(builder.convert_to_dds(decoder, input, build.to_options(), output)?);
    }

    // Detection needs the pixels, so decode here instead of inside the builder
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    if is_dds(&bytes) {
        return Ok(builder.convert_to_dds(decoder, input, build.to_options(), output)?);
    }

    let image = ImageBuilder::load_image(decoder, input)?;
    let options = build.options_for(&image);
    let dest = output_path(input, output)?;
    builder.create_dds(vec![image], options, &dest)?;
    Ok(dest)
}

fn cmd_cube(args: CubeArgs, format: OutputFormat) -> Result<()> {
    let decoder = DecoderContext::init();
    let faces = load_faces(&decoder, &args.faces)?;
    let options = args.build.options_for(&faces[0]) | BuildOptions::CUBE_MAP;

    ImageBuilder::new()
        .create_dds(faces, options, &args.output)
        .context("Failed to build cube map")?;

    report_written(&[args.output], format)
}

fn cmd_array(args: ArrayArgs, format: OutputFormat) -> Result<()> {
    let decoder = DecoderContext::init();
    let faces = load_faces(&decoder, &args.faces)?;
    let options = args.build.options_for(&faces[0]);

    ImageBuilder::new()
        .create_dds(faces, options, &args.output)
        .context("Failed to build texture array")?;

    report_written(&[args.output], format)
}

fn load_faces(decoder: &DecoderContext, paths: &[PathBuf]) -> Result<Vec<PixelBuffer>> {
    if paths.is_empty() {
        bail!("No face images given");
    }
    paths
        .iter()
        .map(|path| {
            info!("Loading face: {:?}", path);
            ImageBuilder::load_image(decoder, path)
                .with_context(|| format!("Failed to load {:?}", path))
        })
        .collect()
}

fn report_written(paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = paths
                .iter()
                .map(|path| {
                    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                    serde_json::json!({ "path": path, "size": size })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            for path in paths {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                println!("Wrote {} ({})", path.display(), format_size(size));
            }
        }
    }
    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let path = &args.path;
    if !path.exists() {
        bail!("File not found: {:?}", path);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let texture = DdsTexture::read(BufReader::new(file)).context("Failed to parse DDS file")?;

    let summary = TextureSummary {
        path: path.clone(),
        width: texture.width(),
        height: texture.height(),
        mipmaps: texture.mipmap_count(),
        faces: texture.face_count(),
        format: texture
            .format
            .map(|f| f.to_string())
            .unwrap_or_else(|| texture.header.pixel_format.fourcc_string()),
        cube_map: texture.is_cubemap(),
        normal_map: texture.is_normal_map(),
        dx10: texture.dx10_header.is_some(),
        data_size: texture.data.len(),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("DDS Texture: {:?}", summary.path);
            println!("  Dimensions:   {}x{}", summary.width, summary.height);
            println!("  Mipmaps:      {}", summary.mipmaps);
            println!("  Faces:        {}", summary.faces);
            println!("  Format:       {}", summary.format);
            println!("  Cube map:     {}", summary.cube_map);
            println!("  Normal map:   {}", summary.normal_map);
            println!("  DX10 header:  {}", summary.dx10);
            println!("  Data size:    {}", format_size(summary.data_size as u64));
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
