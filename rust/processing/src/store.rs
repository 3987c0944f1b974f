// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON intermediate store
//!
//! Records are stored as a bare JSON array. Unset values are written as
//! `null`, never as `0`, and floats round-trip exactly. Loading checks every
//! element and reports all bad records at once together with the valid ones.

use std::fmt;
use std::path::{Path, PathBuf};

use geomark_export::{write_string_atomic, ImageRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// One record rejected while loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub index: usize,
    pub filename: Option<String>,
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(name) => write!(f, "record {} ({}): {}", self.index, name, self.message),
            None => write!(f, "record {}: {}", self.index, self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of records")]
    NotAnArray,

    /// Some records failed validation; `valid` holds the rest in input order
    #[error("{} invalid record(s): {}", errors.len(), summarize(errors))]
    Validation {
        errors: Vec<RecordError>,
        valid: Vec<ImageRecord>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(errors: &[RecordError]) -> String {
    errors
        .iter()
        .take(3)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serialize records as a pretty-printed JSON array
pub fn save(records: &[ImageRecord]) -> Result<String, StoreError> {
    let mut text = serde_json::to_string_pretty(records)?;
    text.push('\n');
    Ok(text)
}

/// Parse and validate a JSON array of records
pub fn load(text: &str) -> Result<Vec<ImageRecord>, StoreError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(StoreError::NotAnArray);
    };

    let mut valid = Vec::with_capacity(items.len());
    let mut errors = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let filename = item
            .get("filename")
            .and_then(Value::as_str)
            .map(str::to_string);
        let record = match serde_json::from_value::<ImageRecord>(item) {
            Ok(record) => record,
            Err(e) => {
                errors.push(RecordError {
                    index,
                    filename,
                    message: e.to_string(),
                });
                continue;
            }
        };
        match validate_record(&record) {
            Ok(()) => valid.push(record),
            Err(message) => errors.push(RecordError {
                index,
                filename,
                message,
            }),
        }
    }

    debug!(valid = valid.len(), invalid = errors.len(), "Loaded records");
    if errors.is_empty() {
        Ok(valid)
    } else {
        warn!(invalid = errors.len(), "Records failed validation");
        Err(StoreError::Validation { errors, valid })
    }
}

/// Shape checks applied to every loaded record.
///
/// Missing coordinates, including a half-null pair, are valid here; the
/// exporter skips such records with "incomplete coordinates".
pub fn validate_record(record: &ImageRecord) -> Result<(), String> {
    if record.filename.trim().is_empty() {
        return Err("filename is empty".to_string());
    }
    if let Some(lat) = record.latitude {
        if !lat.is_finite() || lat.abs() > 90.0 {
            return Err(format!("latitude {} outside [-90, 90]", lat));
        }
    }
    if let Some(lon) = record.longitude {
        if !lon.is_finite() || lon.abs() > 180.0 {
            return Err(format!("longitude {} outside [-180, 180]", lon));
        }
    }
    Ok(())
}

pub fn save_to_path(records: &[ImageRecord], path: &Path) -> Result<(), StoreError> {
    let text = save(records)?;
    write_string_atomic(path, &text).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), records = records.len(), "Saved records");
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<Vec<ImageRecord>, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomark_export::{partition_records, SkipReason};

    fn full_record() -> ImageRecord {
        ImageRecord {
            filename: "IMG_0001.jpg".into(),
            filepath: Some("/photos/IMG_0001.jpg".into()),
            image_url: Some("file:///photos/IMG_0001.jpg".into()),
            latitude: Some(59.913_75),
            longitude: Some(10.580_111_111_111_111),
            elevation: Some(64.8),
            date_taken: Some("2024:06:15 14:30:05".into()),
            transformed_x: Some(104_481.824_123_456_7),
            transformed_y: Some(1_213_183.612_000_1),
            transformed_z: Some(64.8),
            has_gps: true,
            coordinate_system: Some("EPSG:5110".into()),
            filesize: Some(2_345_678),
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let mut no_gps = ImageRecord::new("IMG_0002.jpg");
        no_gps.error = Some("no GPS data".into());
        let records = vec![full_record(), no_gps];

        let text = save(&records).unwrap();
        let loaded = load(&text).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_null_is_not_zero() {
        let mut record = ImageRecord::new("IMG_0003.jpg");
        record.elevation = Some(0.0);
        let text = save(&[record]).unwrap();

        assert!(text.contains("\"elevation\": 0.0"));
        assert!(text.contains("\"latitude\": null"));
        assert!(text.contains("\"transformed_z\": null"));

        let loaded = load(&text).unwrap();
        assert_eq!(loaded[0].elevation, Some(0.0));
        assert_eq!(loaded[0].latitude, None);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let text = r#"[{"filename": "a.jpg", "latitude": 1.0, "longitude": 2.0, "camera": "X100"}]"#;
        let loaded = load(text).unwrap();
        assert_eq!(loaded[0].filename, "a.jpg");
        assert!(!loaded[0].has_gps);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let text = r#"[
            {"filename": "ok.jpg"},
            {"filename": "", "latitude": 1.0, "longitude": 1.0},
            {"filename": "north.jpg", "latitude": 91.0, "longitude": 1.0},
            {"filename": "typed.jpg", "latitude": "north"},
            {"filename": "ok2.jpg", "latitude": -33.5, "longitude": 151.2}
        ]"#;
        match load(text) {
            Err(StoreError::Validation { errors, valid }) => {
                let indices: Vec<_> = errors.iter().map(|e| e.index).collect();
                assert_eq!(indices, vec![1, 2, 3]);
                assert_eq!(errors[1].filename.as_deref(), Some("north.jpg"));
                assert!(errors[1].message.contains("latitude"));
                let names: Vec<_> = valid.iter().map(|r| r.filename.as_str()).collect();
                assert_eq!(names, vec!["ok.jpg", "ok2.jpg"]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_half_null_coordinates_load_and_are_skipped() {
        let text = r#"[
            {"filename": "half.jpg", "latitude": 59.9, "longitude": null,
             "transformed_x": 104481.8, "transformed_y": 1213183.6,
             "image_url": "file:///photos/half.jpg"}
        ]"#;
        let loaded = load(text).unwrap();
        assert_eq!(loaded[0].latitude, Some(59.9));

        let (ready, skipped) = partition_records(&loaded);
        assert!(ready.is_empty());
        assert_eq!(skipped[0].reason, SkipReason::IncompleteCoordinates(None));
        assert_eq!(skipped[0].reason.to_string(), "incomplete coordinates");
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(load(r#"{"filename": "a.jpg"}"#), Err(StoreError::NotAnArray)));
        assert!(matches!(load("[{"), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        save_to_path(&[full_record()], &path).unwrap();
        assert_eq!(load_from_path(&path).unwrap(), vec![full_record()]);

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_from_path(&missing), Err(StoreError::Io { .. })));
    }
}
