//! `ora` - inspect, unpack and build OpenRaster files

use clap::{Parser, Subcommand};
use image::ImageFormat;
use ora_codec::document::{Document, Layer};
use ora_codec::file::thumbnail::THUMBNAIL_PATH;
use ora_codec::file::{read_thumbnail, ArchiveError, FileFormat};
use ora_codec::{export_ora, load_ora, FileError, OraConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "ora",
    version,
    about = "OpenRaster (.ora) toolkit",
    arg_required_else_help = true
)]
struct Cli {
    /// JSON codec configuration
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canvas size, layers and import diagnostics
    Info {
        file: PathBuf,
        /// Emit the import report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write every layer and the thumbnail as PNG files
    Unpack { file: PathBuf, out_dir: PathBuf },
    /// Build an .ora from PNG files given bottom-to-top
    Pack {
        output: PathBuf,
        #[arg(required = true)]
        layers: Vec<PathBuf>,
    },
    /// Extract the stored thumbnail
    Thumbnail { file: PathBuf, output: PathBuf },
}

fn main() -> ExitCode {
    ora_codec::init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FileError> {
    let config = match &cli.config {
        Some(path) => OraConfig::load(path)?,
        None => OraConfig::default(),
    };

    match cli.command {
        Command::Info { file, json } => info(&file, json, &config),
        Command::Unpack { file, out_dir } => unpack(&file, &out_dir, &config),
        Command::Pack { output, layers } => pack(&output, &layers, &config),
        Command::Thumbnail { file, output } => match read_thumbnail(&file)? {
            Some(thumb) => Ok(thumb.save_with_format(&output, ImageFormat::Png)?),
            None => Err(FileError::ArchiveRead {
                entry: THUMBNAIL_PATH.to_string(),
                source: ArchiveError::EntryNotFound(THUMBNAIL_PATH.to_string()),
            }),
        },
    }
}

fn info(file: &Path, json: bool, config: &OraConfig) -> Result<(), FileError> {
    let (document, report) = load_ora(file, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}: {}", file.display(), report.size);
    println!(
        "layers: {} of {} loaded",
        report.imported_layers, report.manifest_layers
    );
    // Top-most first, like the manifest
    for (index, layer) in document.layers().iter().enumerate().rev() {
        println!(
            "  [{}] {:<24} opacity {:.2}{}",
            index,
            layer.name,
            layer.opacity,
            if layer.hidden { " (hidden)" } else { "" }
        );
    }
    for failure in &report.failures {
        println!("  ! {}", failure);
    }
    Ok(())
}

fn unpack(file: &Path, out_dir: &Path, config: &OraConfig) -> Result<(), FileError> {
    let (document, report) = load_ora(file, config)?;
    std::fs::create_dir_all(out_dir)?;

    for (index, layer) in document.layers().iter().enumerate() {
        let path = out_dir.join(format!("layer{}.png", index));
        layer.surface.save_with_format(&path, ImageFormat::Png)?;
        tracing::info!("Wrote {:?} ({})", path, layer.name);
    }
    if let Some(thumb) = read_thumbnail(file)? {
        thumb.save_with_format(out_dir.join("thumbnail.png"), ImageFormat::Png)?;
    }
    for failure in &report.failures {
        tracing::warn!("{}", failure);
    }
    Ok(())
}

fn pack(output: &Path, inputs: &[PathBuf], config: &OraConfig) -> Result<(), FileError> {
    if FileFormat::from_path(&output.to_string_lossy()).is_none() {
        tracing::warn!("Output {:?} does not have an .ora extension", output);
    }

    let mut document = Document::default();
    for input in inputs {
        let surface = image::open(input)?.to_rgba8();
        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("Layer {}", document.layers().len()));
        document.push(Layer::from_image(name, surface));
    }

    export_ora(&document, output, config)
}
