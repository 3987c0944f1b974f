// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image record construction
//!
//! Combines a GPS extraction result, the configured CRS and URL pattern into
//! an [`ImageRecord`]. Images without usable GPS still produce a record,
//! marked with the extraction error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use geomark_export::ImageRecord;
use geomark_geo::{
    ExifMetadata, ExtractionError, GpsData, ReprojectionError, Transformer, WGS84_EPSG,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Placeholder replaced by the image file name in URL templates
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// How `image_url` is derived when no explicit URL is given
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UrlPattern {
    /// `file://` plus the absolute path with forward slashes
    #[default]
    FileUri,
    /// Template containing `{filename}`, e.g. `https://host/photos/{filename}`
    Template(String),
    /// Base URL; the file name is appended after a `/`
    BaseUrl(String),
}

impl UrlPattern {
    /// URL for an image at `path`
    pub fn url_for(&self, path: &Path) -> String {
        let filename = file_name(path);
        match self {
            UrlPattern::FileUri => file_uri(path),
            UrlPattern::Template(template) => template.replace(FILENAME_PLACEHOLDER, &filename),
            UrlPattern::BaseUrl(base) => format!("{}/{}", base.trim_end_matches('/'), filename),
        }
    }
}

impl FromStr for UrlPattern {
    type Err = String;

    /// `file`, a template containing `{filename}`, or a base URL
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty URL pattern".to_string());
        }
        if s.eq_ignore_ascii_case("file") || s.eq_ignore_ascii_case("file-uri") {
            Ok(UrlPattern::FileUri)
        } else if s.contains(FILENAME_PLACEHOLDER) {
            Ok(UrlPattern::Template(s.to_string()))
        } else {
            Ok(UrlPattern::BaseUrl(s.to_string()))
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::FileUri => write!(f, "file"),
            UrlPattern::Template(t) => write!(f, "{}", t),
            UrlPattern::BaseUrl(b) => write!(f, "{}", b),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::fs::canonicalize(path)
        .or_else(|_| std::env::current_dir().map(|dir| dir.join(path)))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// `file://` URI of a path; Windows drive paths get a leading slash
pub fn file_uri(path: &Path) -> String {
    let abs = absolute(path).to_string_lossy().replace('\\', "/");
    if abs.starts_with('/') {
        format!("file://{}", abs)
    } else {
        format!("file:///{}", abs)
    }
}

/// Extraction outcome of one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ImageStatus {
    /// GPS read and reprojected
    Located,
    /// No EXIF or no GPS tags
    Skipped(String),
    /// Unreadable file or corrupt GPS tags
    Failed(String),
}

impl ImageStatus {
    pub fn from_error(error: &ExtractionError) -> Self {
        if error.is_failure() {
            ImageStatus::Failed(error.to_string())
        } else {
            ImageStatus::Skipped(error.reason().to_string())
        }
    }
}

/// Builds records for one target CRS and URL pattern
pub struct RecordBuilder {
    transformer: Transformer,
    url_pattern: UrlPattern,
}

impl RecordBuilder {
    /// Resolve the target CRS once for the whole batch
    pub fn new(target_epsg: u32, url_pattern: UrlPattern) -> Result<Self, ReprojectionError> {
        Ok(Self {
            transformer: Transformer::new(WGS84_EPSG, target_epsg)?,
            url_pattern,
        })
    }

    pub fn with_transformer(transformer: Transformer, url_pattern: UrlPattern) -> Self {
        Self {
            transformer,
            url_pattern,
        }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Build a record from an extraction result.
    ///
    /// A GPS failure yields a record with null coordinates and `error` set;
    /// a reprojection failure is returned as an error.
    pub fn build(
        &self,
        image_path: &Path,
        gps: Result<GpsData, ExtractionError>,
        explicit_url: Option<&str>,
    ) -> Result<ImageRecord, ReprojectionError> {
        let mut record = ImageRecord::new(file_name(image_path));
        record.filepath = Some(absolute(image_path).to_string_lossy().into_owned());
        record.image_url = Some(match explicit_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => self.url_pattern.url_for(image_path),
        });
        record.filesize = std::fs::metadata(image_path).ok().map(|m| m.len());
        record.processing_date = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        match gps {
            Ok(gps) => {
                let (x, y, z) =
                    self.transformer
                        .transform(gps.longitude, gps.latitude, gps.elevation)?;
                record.has_gps = true;
                record.latitude = Some(gps.latitude);
                record.longitude = Some(gps.longitude);
                record.elevation = gps.elevation;
                record.gps_timestamp = gps.timestamp;
                record.transformed_x = Some(x);
                record.transformed_y = Some(y);
                record.transformed_z = z;
                record.coordinate_system = Some(self.transformer.target().identifier());
                debug!(file = %record.filename, x, y, "Built record");
            }
            Err(e) => {
                warn!(file = %record.filename, reason = e.reason(), "No usable GPS data");
                record.has_gps = false;
                record.error = Some(e.reason().to_string());
            }
        }
        Ok(record)
    }

    /// Read EXIF from `image_path` and build its record
    pub fn build_from_file(
        &self,
        image_path: &Path,
        explicit_url: Option<&str>,
    ) -> Result<(ImageRecord, ImageStatus), ReprojectionError> {
        let (gps, date_taken) = match ExifMetadata::read(image_path) {
            Ok(meta) => (meta.gps_data(), meta.date_taken),
            Err(e) => (Err(e), None),
        };
        let status = match &gps {
            Ok(_) => ImageStatus::Located,
            Err(e) => ImageStatus::from_error(e),
        };
        let mut record = self.build(image_path, gps, explicit_url)?;
        record.date_taken = date_taken;
        Ok((record, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn oslo() -> GpsData {
        GpsData {
            latitude: 59.91375,
            longitude: 10.580111,
            elevation: Some(64.8),
            timestamp: None,
        }
    }

    #[test]
    fn test_url_patterns() {
        let path = Path::new("/photos/IMG_0001.jpg");
        assert_eq!(UrlPattern::FileUri.url_for(path), "file:///photos/IMG_0001.jpg");
        assert_eq!(
            "https://cdn.example.org/{filename}?v=1"
                .parse::<UrlPattern>()
                .unwrap()
                .url_for(path),
            "https://cdn.example.org/IMG_0001.jpg?v=1"
        );
        assert_eq!(
            "https://cdn.example.org/photos/"
                .parse::<UrlPattern>()
                .unwrap()
                .url_for(path),
            "https://cdn.example.org/photos/IMG_0001.jpg"
        );
        assert_eq!("file".parse::<UrlPattern>(), Ok(UrlPattern::FileUri));
        assert!("".parse::<UrlPattern>().is_err());
    }

    #[test]
    fn test_build_with_gps() {
        let builder = RecordBuilder::new(5110, UrlPattern::FileUri).unwrap();
        let record = builder
            .build(Path::new("/photos/IMG_0001.jpg"), Ok(oslo()), None)
            .unwrap();
        assert!(record.has_gps);
        assert!(record.is_export_ready());
        assert_eq!(record.coordinate_system.as_deref(), Some("EPSG:5110"));
        assert_eq!(record.image_url.as_deref(), Some("file:///photos/IMG_0001.jpg"));
        assert_abs_diff_eq!(record.transformed_x.unwrap(), 104_481.824, epsilon = 0.01);
        assert_eq!(record.transformed_z, Some(64.8));
    }

    /// Passes plane coordinates through and raises heights by 40 m
    struct HeightTarget(geomark_geo::CrsInfo);

    impl geomark_geo::CrsTransform for HeightTarget {
        fn info(&self) -> &geomark_geo::CrsInfo {
            &self.0
        }

        fn forward(&self, lon: f64, lat: f64, z: f64) -> geomark_geo::Result<(f64, f64, f64)> {
            Ok((lon, lat, z + 40.0))
        }

        fn inverse(&self, x: f64, y: f64, z: f64) -> geomark_geo::Result<(f64, f64, f64)> {
            Ok((x, y, z - 40.0))
        }
    }

    #[test]
    fn test_3d_target_sets_transformed_z() {
        use geomark_geo::CrsTransform;

        let mut info = geomark_geo::lookup(5110).unwrap().info().clone();
        info.is_3d = true;
        let builder = RecordBuilder::with_transformer(
            Transformer::with_target(Box::new(HeightTarget(info))),
            UrlPattern::FileUri,
        );
        let record = builder
            .build(Path::new("/photos/IMG_0001.jpg"), Ok(oslo()), None)
            .unwrap();
        assert_eq!(record.elevation, Some(64.8));
        assert_abs_diff_eq!(record.transformed_z.unwrap(), 104.8);
        assert_eq!(record.transformed_x, Some(10.580111));
    }

    #[test]
    fn test_explicit_url_wins() {
        let builder = RecordBuilder::new(5110, UrlPattern::FileUri).unwrap();
        let record = builder
            .build(
                Path::new("/photos/IMG_0001.jpg"),
                Ok(oslo()),
                Some("https://example.org/a.jpg"),
            )
            .unwrap();
        assert_eq!(record.image_url.as_deref(), Some("https://example.org/a.jpg"));
    }

    #[test]
    fn test_gps_failure_keeps_record() {
        let builder = RecordBuilder::new(5110, UrlPattern::FileUri).unwrap();
        let record = builder
            .build(
                Path::new("/photos/IMG_0002.jpg"),
                Err(ExtractionError::NoGps(PathBuf::from("/photos/IMG_0002.jpg"))),
                None,
            )
            .unwrap();
        assert!(!record.has_gps);
        assert_eq!(record.error.as_deref(), Some("no GPS data"));
        assert_eq!(record.latitude, None);
        assert!(!record.is_export_ready());
    }

    #[test]
    fn test_reprojection_failure_is_fatal() {
        let builder = RecordBuilder::new(5110, UrlPattern::FileUri).unwrap();
        let far_away = GpsData {
            latitude: 0.0,
            longitude: 150.0,
            elevation: None,
            timestamp: None,
        };
        let result = builder.build(Path::new("/photos/a.jpg"), Ok(far_away), None);
        assert!(matches!(result, Err(ReprojectionError::OutOfDomain { .. })));
    }

    #[test]
    fn test_status_of_unreadable_file() {
        let builder = RecordBuilder::new(5110, UrlPattern::FileUri).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jpg");
        let (record, status) = builder.build_from_file(&path, None).unwrap();
        assert!(matches!(status, ImageStatus::Failed(_)));
        assert_eq!(record.error.as_deref(), Some("unreadable file"));
        assert_eq!(record.filename, "missing.jpg");

        let text = dir.path().join("notes.jpg");
        std::fs::write(&text, b"not an image").unwrap();
        let (record, status) = builder.build_from_file(&text, None).unwrap();
        assert!(!record.has_gps);
        assert!(!matches!(status, ImageStatus::Located));
    }

    #[test]
    fn test_unknown_target_crs() {
        assert!(matches!(
            RecordBuilder::new(1, UrlPattern::FileUri),
            Err(ReprojectionError::UnsupportedCrs(1))
        ));
    }
}
