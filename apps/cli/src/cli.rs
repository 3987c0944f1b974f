// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geomark_core::SchemaVersion;
use geomark_export::{GuidMode, MarkerShape, Rgb};
use geomark_processing::{parse_schema, PipelineConfig, UrlPattern};

/// Place geotagged images as georeferenced markers in an IFC model
#[derive(Parser, Debug)]
#[command(name = "geomark", version)]
pub struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read GPS from a folder of images and write a JSON records file
    Extract(ExtractArgs),
    /// Write an IFC file from a JSON records file
    Export(ExportArgs),
    /// Extract and export in one go
    Run(RunArgs),
    /// Check the structure of an IFC file
    Validate(ValidateArgs),
    /// Write a project settings template
    Template(TemplateArgs),
    /// Describe a supported EPSG code
    Epsg(EpsgArgs),
    /// Replace image URLs in a JSON records file from a mapping file
    RemapUrls(RemapArgs),
}

/// Options shared by every command that reads or writes records
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Project settings JSON (names, owner, defaults)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Target EPSG code [default: 5110]
    #[arg(long)]
    pub epsg: Option<u32>,
}

/// Extraction options
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Descend into subfolders
    #[arg(long)]
    pub recursive: bool,

    /// Leave images without GPS out of the JSON file
    #[arg(long)]
    pub exclude_no_gps: bool,

    /// Image URL: 'file', a template with {filename}, or a base URL
    #[arg(long)]
    pub url_pattern: Option<UrlPattern>,

    /// Comma-separated image extensions
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,
}

/// IFC output options
#[derive(Args, Debug, Clone, Default)]
pub struct IfcArgs {
    /// IFC2X3, IFC4 or IFC4X3 [default: IFC2X3]
    #[arg(long, value_parser = schema_arg)]
    pub schema: Option<SchemaVersion>,

    /// Marker shape: cube or sphere
    #[arg(long)]
    pub shape: Option<MarkerShape>,

    /// Marker size in metres
    #[arg(long)]
    pub size: Option<f64>,

    /// Marker colour: a name or #rrggbb
    #[arg(long)]
    pub color: Option<Rgb>,

    /// Random GlobalIds instead of ids derived from the project name
    #[arg(long)]
    pub random_ids: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Folder with images
    pub folder: PathBuf,

    /// JSON records file to write
    #[arg(short, long, default_value = "image_records.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// JSON records file
    pub input: PathBuf,

    /// IFC file to write
    #[arg(short, long, default_value = "image_markers.ifc")]
    pub output: PathBuf,

    /// Abort when any record in the JSON file is invalid
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub ifc: IfcArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Folder with images
    pub folder: PathBuf,

    /// IFC file to write
    #[arg(short, long, default_value = "image_markers.ifc")]
    pub output: PathBuf,

    /// Also write the JSON records file
    #[arg(long)]
    pub json: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(flatten)]
    pub ifc: IfcArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// IFC file to check
    pub input: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Where to write the template; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EpsgArgs {
    pub code: u32,
}

#[derive(Args, Debug)]
pub struct RemapArgs {
    /// JSON records file
    pub input: PathBuf,

    /// JSON mapping of file names to URLs
    #[arg(long)]
    pub mapping: PathBuf,

    /// Output file; the input is replaced when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn schema_arg(value: &str) -> Result<SchemaVersion, String> {
    parse_schema(value).ok_or_else(|| format!("unknown IFC schema '{}'", value))
}

impl ConfigArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(epsg) = self.epsg {
            config.target_epsg = epsg;
        }
    }
}

impl ScanArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if self.recursive {
            config.recursive = true;
        }
        if self.exclude_no_gps {
            config.include_no_gps = false;
        }
        if let Some(pattern) = &self.url_pattern {
            config.url_pattern = pattern.clone();
        }
        if let Some(extensions) = &self.extensions {
            config.extensions = extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
        }
    }
}

impl IfcArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
        if let Some(shape) = self.shape {
            config.style.shape = shape;
        }
        if let Some(size) = self.size {
            config.style.size = size;
        }
        if let Some(colour) = self.color {
            config.style.colour = colour;
        }
        if self.random_ids {
            config.guid_mode = GuidMode::Random;
        }
    }
}
