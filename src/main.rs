use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser;
use svg_extrude::{ConversionConfig, Error, ExtractOptions, PathSource, convert};
use tracing_subscriber::EnvFilter;

/// Extrude SVG artwork into a beveled 3-D model (glTF 2.0)
#[derive(Parser, Debug)]
#[command(name = "svg-extrude", version)]
struct Cli {
    /// SVG file, URL (with --url) or path data (with --path-data)
    input: String,

    /// Output file, defaults to the input name with .gltf or .glb
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat INPUT as a URL to fetch
    #[arg(long, conflicts_with = "path_data")]
    url: bool,

    /// Treat INPUT as an SVG path `d` string
    #[arg(long)]
    path_data: bool,

    /// JSON file with conversion settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    depth: Option<f64>,

    /// Disable the bevel
    #[arg(long)]
    no_bevel: bool,

    #[arg(long)]
    bevel_thickness: Option<f64>,

    #[arg(long)]
    bevel_size: Option<f64>,

    #[arg(long)]
    bevel_segments: Option<u32>,

    /// Largest planar side of the output model
    #[arg(long)]
    target_size: Option<f64>,

    /// Curve flattening tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Write a binary .glb container
    #[arg(long)]
    binary: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn source(&self) -> PathSource {
        if self.url {
            PathSource::Url(self.input.clone())
        } else if self.path_data {
            PathSource::PathData(self.input.clone())
        } else {
            PathSource::File(PathBuf::from(&self.input))
        }
    }

    fn config(&self) -> svg_extrude::Result<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::from_file(path)?,
            None => ConversionConfig::default(),
        };
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if self.no_bevel {
            config.bevel_enabled = false;
        }
        if let Some(t) = self.bevel_thickness {
            config.bevel_thickness = t;
        }
        if let Some(s) = self.bevel_size {
            config.bevel_size = s;
        }
        if let Some(n) = self.bevel_segments {
            config.bevel_segments = n;
        }
        if let Some(size) = self.target_size {
            config.target_size = size;
        }
        Ok(config)
    }

    fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = if self.path_data {
            "path".to_string()
        } else {
            let name = self.input.rsplit('/').next().unwrap_or(&self.input);
            Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "model".to_string())
        };
        let ext = if self.binary { "glb" } else { "gltf" };
        PathBuf::from(format!("{}.{}", stem, ext))
    }
}

/// Exit code for a failed conversion
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::SourceLoad { .. } => 1,
        _ => 2,
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = ExtractOptions {
        tolerance: cli.tolerance.unwrap_or(ExtractOptions::default().tolerance),
    };

    let document = match cli
        .config()
        .and_then(|config| convert(&cli.source(), &config, &options))
    {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error converting '{}': {}", cli.input, e);
            if let Some(cause) = std::error::Error::source(&e) {
                eprintln!("  caused by: {}", cause);
            }
            process::exit(exit_code(&e));
        }
    };

    let bytes = if cli.binary {
        document.to_glb()
    } else {
        document.to_json_bytes()
    };
    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error encoding document: {}", e);
            process::exit(2);
        }
    };

    let output = cli.output_path();
    if let Err(e) = write_output(&output, &bytes) {
        eprintln!("Error: {:#}", e);
        process::exit(3);
    }
    println!("Wrote '{}' ({} bytes)", output.display(), bytes.len());
}
