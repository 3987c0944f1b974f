// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image records and export readiness

use std::fmt;

use serde::{Deserialize, Serialize};

/// One processed image
///
/// This is the JSON contract between extraction and export. Fields present in
/// the first version always serialize (as `null` when unset); fields added
/// later are optional and omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// WGS84 decimal degrees
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Metres above sea level
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Raw EXIF date, "YYYY:MM:DD HH:MM:SS"
    #[serde(default)]
    pub date_taken: Option<String>,
    #[serde(default)]
    pub transformed_x: Option<f64>,
    #[serde(default)]
    pub transformed_y: Option<f64>,
    #[serde(default)]
    pub transformed_z: Option<f64>,

    #[serde(default)]
    pub has_gps: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// When this record was built, RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_date: Option<String>,
    /// GPS timestamp, "YYYY-MM-DDTHH:MM:SSZ"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_timestamp: Option<String>,
    /// Extraction error marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why a record was left out of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingFilename,
    /// Latitude or longitude absent or not finite, with the extraction error if any
    IncompleteCoordinates(Option<String>),
    NotTransformed,
    MissingUrl,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFilename => write!(f, "missing filename"),
            SkipReason::IncompleteCoordinates(None) => write!(f, "incomplete coordinates"),
            SkipReason::IncompleteCoordinates(Some(cause)) => {
                write!(f, "incomplete coordinates ({})", cause)
            }
            SkipReason::NotTransformed => write!(f, "coordinates not transformed"),
            SkipReason::MissingUrl => write!(f, "missing image URL"),
        }
    }
}

/// A record excluded from an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position in the input
    pub index: usize,
    pub filename: String,
    pub reason: SkipReason,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl ImageRecord {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Check whether the record can become a marker
    pub fn readiness(&self) -> Result<(), SkipReason> {
        if self.filename.trim().is_empty() {
            return Err(SkipReason::MissingFilename);
        }
        if finite(self.latitude).is_none() || finite(self.longitude).is_none() {
            return Err(SkipReason::IncompleteCoordinates(self.error.clone()));
        }
        if finite(self.transformed_x).is_none() || finite(self.transformed_y).is_none() {
            return Err(SkipReason::NotTransformed);
        }
        match self.image_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(()),
            _ => Err(SkipReason::MissingUrl),
        }
    }

    pub fn is_export_ready(&self) -> bool {
        self.readiness().is_ok()
    }

    /// Marker position in the target CRS; a missing height is 0
    pub fn position(&self) -> Option<[f64; 3]> {
        Some([
            finite(self.transformed_x)?,
            finite(self.transformed_y)?,
            finite(self.transformed_z).unwrap_or(0.0),
        ])
    }

    /// Elevation written to the property set; a missing elevation is 0
    pub fn elevation_or_zero(&self) -> f64 {
        finite(self.elevation).unwrap_or(0.0)
    }
}

/// Split records into export-ready ones and skipped ones, keeping input order
pub fn partition_records(records: &[ImageRecord]) -> (Vec<&ImageRecord>, Vec<SkippedRecord>) {
    let mut ready = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match record.readiness() {
            Ok(()) => ready.push(record),
            Err(reason) => skipped.push(SkippedRecord {
                index,
                filename: record.filename.clone(),
                reason,
            }),
        }
    }
    (ready, skipped)
}
