// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration
//!
//! Values are layered: built-in defaults, then a settings file, then
//! `GEOMARK_*` environment variables, then command-line flags. The result is
//! passed explicitly into every stage.

use geomark_core::SchemaVersion;
use geomark_export::{ExportOptions, GuidMode, MarkerShape, MarkerStyle, Rgb};
use geomark_geo::{DEFAULT_TARGET_EPSG, WGS84_EPSG};

use crate::builder::UrlPattern;
use crate::error::{ProcessingError, Result};
use crate::settings::Settings;

/// Image extensions scanned by default
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// Configuration for extraction and export
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Output CRS for marker coordinates
    pub target_epsg: u32,
    /// Input CRS of EXIF coordinates; only WGS84 is accepted
    pub source_epsg: u32,
    pub schema: SchemaVersion,
    pub style: MarkerStyle,
    pub url_pattern: UrlPattern,
    /// Keep records for images without usable GPS in the JSON output
    pub include_no_gps: bool,
    pub recursive: bool,
    /// Lower-case file extensions without dot
    pub extensions: Vec<String>,
    pub guid_mode: GuidMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_epsg: DEFAULT_TARGET_EPSG,
            source_epsg: WGS84_EPSG,
            schema: SchemaVersion::Ifc2x3,
            style: MarkerStyle::default(),
            url_pattern: UrlPattern::FileUri,
            include_no_gps: true,
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            guid_mode: GuidMode::Deterministic,
        }
    }
}

/// Parse a schema name as typed by users: `IFC2X3`, `2x3`, `IFC4`, `IFC4.3`, `IFC4X3_ADD2`, ...
pub fn parse_schema(value: &str) -> Option<SchemaVersion> {
    let normalized = value
        .trim()
        .to_ascii_uppercase()
        .replace('.', "X")
        .replace(' ', "");
    let normalized = if normalized.starts_with("IFC") {
        normalized
    } else {
        format!("IFC{}", normalized)
    };
    SchemaVersion::from_identifier(&normalized)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl PipelineConfig {
    /// Defaults overridden by `GEOMARK_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply variables from `lookup`. Errors name the offending variable.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `GEOMARK_TARGET_EPSG` | target EPSG code |
    /// | `GEOMARK_SCHEMA` | `IFC2X3`, `IFC4` or `IFC4X3` |
    /// | `GEOMARK_MARKER_SHAPE` | `cube` or `sphere` |
    /// | `GEOMARK_MARKER_SIZE` | metres |
    /// | `GEOMARK_MARKER_COLOR` | colour name or `#rrggbb` |
    /// | `GEOMARK_URL_PATTERN` | `file`, template with `{filename}`, or base URL |
    /// | `GEOMARK_INCLUDE_NO_GPS` | boolean |
    /// | `GEOMARK_RECURSIVE` | boolean |
    /// | `GEOMARK_EXTENSIONS` | comma-separated list |
    /// | `GEOMARK_GUID_MODE` | `deterministic` or `random` |
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GEOMARK_TARGET_EPSG") {
            self.target_epsg = v
                .trim()
                .parse()
                .map_err(|_| ProcessingError::config("GEOMARK_TARGET_EPSG", &v, "not an EPSG code"))?;
        }
        if let Some(v) = lookup("GEOMARK_SCHEMA") {
            self.schema = parse_schema(&v)
                .ok_or_else(|| ProcessingError::config("GEOMARK_SCHEMA", &v, "unknown IFC schema"))?;
        }
        if let Some(v) = lookup("GEOMARK_MARKER_SHAPE") {
            self.style.shape = v
                .parse::<MarkerShape>()
                .map_err(|e| ProcessingError::config("GEOMARK_MARKER_SHAPE", &v, e))?;
        }
        if let Some(v) = lookup("GEOMARK_MARKER_SIZE") {
            self.style.size = v
                .trim()
                .parse()
                .map_err(|_| ProcessingError::config("GEOMARK_MARKER_SIZE", &v, "not a number"))?;
        }
        if let Some(v) = lookup("GEOMARK_MARKER_COLOR") {
            self.style.colour = v
                .parse::<Rgb>()
                .map_err(|e| ProcessingError::config("GEOMARK_MARKER_COLOR", &v, e))?;
        }
        if let Some(v) = lookup("GEOMARK_URL_PATTERN") {
            self.url_pattern = v
                .parse::<UrlPattern>()
                .map_err(|e| ProcessingError::config("GEOMARK_URL_PATTERN", &v, e))?;
        }
        if let Some(v) = lookup("GEOMARK_INCLUDE_NO_GPS") {
            self.include_no_gps = parse_bool(&v)
                .ok_or_else(|| ProcessingError::config("GEOMARK_INCLUDE_NO_GPS", &v, "not a boolean"))?;
        }
        if let Some(v) = lookup("GEOMARK_RECURSIVE") {
            self.recursive = parse_bool(&v)
                .ok_or_else(|| ProcessingError::config("GEOMARK_RECURSIVE", &v, "not a boolean"))?;
        }
        if let Some(v) = lookup("GEOMARK_EXTENSIONS") {
            self.extensions = parse_extensions(&v);
        }
        if let Some(v) = lookup("GEOMARK_GUID_MODE") {
            self.guid_mode = match v.trim().to_ascii_lowercase().as_str() {
                "deterministic" => GuidMode::Deterministic,
                "random" => GuidMode::Random,
                _ => {
                    return Err(ProcessingError::config(
                        "GEOMARK_GUID_MODE",
                        &v,
                        "expected 'deterministic' or 'random'",
                    ))
                }
            };
        }
        self.validate()
    }

    /// Take schema and target CRS defaults from a settings file
    pub fn apply_settings(&mut self, settings: &Settings) {
        if let Some(defaults) = &settings.defaults {
            if let Some(schema) = defaults.schema {
                self.schema = schema;
            }
            if let Some(epsg) = defaults.target_epsg {
                self.target_epsg = epsg;
            }
        }
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        if self.source_epsg != WGS84_EPSG {
            return Err(ProcessingError::config(
                "source_epsg",
                &self.source_epsg.to_string(),
                "only EPSG:4326 input is supported",
            ));
        }
        if !self.style.is_valid() {
            return Err(ProcessingError::config(
                "marker size",
                &self.style.size.to_string(),
                "must be a positive number of metres",
            ));
        }
        if self.extensions.is_empty() {
            return Err(ProcessingError::config("extensions", "", "no image extensions"));
        }
        Ok(())
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            style: self.style,
            guid_mode: self.guid_mode,
            timestamp: None,
        }
    }

    /// Whether `extension` (without dot, any case) is scanned
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_epsg, 5110);
        assert_eq!(config.schema, SchemaVersion::Ifc2x3);
        assert_eq!(config.style.shape, MarkerShape::Cube);
        assert_eq!(config.style.size, 4.0);
        assert_eq!(config.style.colour, Rgb::RED);
        assert!(config.include_no_gps);
        assert!(!config.recursive);
        assert!(config.accepts_extension("JPG"));
        assert!(!config.accepts_extension("gif"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("GEOMARK_TARGET_EPSG", "25832"),
                ("GEOMARK_SCHEMA", "IFC4.3"),
                ("GEOMARK_MARKER_SHAPE", "sphere"),
                ("GEOMARK_MARKER_SIZE", "2.5"),
                ("GEOMARK_RECURSIVE", "yes"),
                ("GEOMARK_EXTENSIONS", ".JPG, heic"),
                ("GEOMARK_URL_PATTERN", "https://cdn.example.org/{filename}"),
                ("GEOMARK_GUID_MODE", "random"),
            ]))
            .unwrap();
        assert_eq!(config.target_epsg, 25832);
        assert_eq!(config.schema, SchemaVersion::Ifc4x3);
        assert_eq!(config.style.shape, MarkerShape::Sphere);
        assert_eq!(config.style.size, 2.5);
        assert!(config.recursive);
        assert_eq!(config.extensions, vec!["jpg", "heic"]);
        assert_eq!(
            config.url_pattern,
            UrlPattern::Template("https://cdn.example.org/{filename}".into())
        );
        assert_eq!(config.guid_mode, GuidMode::Random);
    }

    #[test]
    fn test_bad_env_value_names_the_variable() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env(env(&[("GEOMARK_TARGET_EPSG", "utm32")]))
            .unwrap_err();
        assert!(err.to_string().contains("GEOMARK_TARGET_EPSG"));
        assert!(err.to_string().contains("utm32"));

        let err = PipelineConfig::default()
            .apply_env(env(&[("GEOMARK_MARKER_SIZE", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Config { .. }));
    }

    #[test]
    fn test_parse_schema() {
        assert_eq!(parse_schema("IFC2X3"), Some(SchemaVersion::Ifc2x3));
        assert_eq!(parse_schema("2x3"), Some(SchemaVersion::Ifc2x3));
        assert_eq!(parse_schema("ifc4"), Some(SchemaVersion::Ifc4));
        assert_eq!(parse_schema("IFC4.3"), Some(SchemaVersion::Ifc4x3));
        assert_eq!(parse_schema("IFC4X3_ADD2"), Some(SchemaVersion::Ifc4x3));
        assert_eq!(parse_schema("STEP"), None);
    }
}
