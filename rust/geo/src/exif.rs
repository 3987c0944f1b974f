// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EXIF GPS extraction
//!
//! Reading is split in two: [`RawGpsTags::from_exif`] copies the relevant
//! tags out of a parsed EXIF block, [`RawGpsTags::interpret`] turns them into
//! WGS84 decimal degrees. The second step never touches the filesystem.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dms::dms_to_decimal;
use crate::error::ExtractionError;

/// GPS position read from an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    /// WGS84 decimal degrees, positive north
    pub latitude: f64,
    /// WGS84 decimal degrees, positive east
    pub longitude: f64,
    /// Metres above sea level, negative below
    pub elevation: Option<f64>,
    /// GPSDateStamp + GPSTimeStamp as `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: Option<String>,
}

/// Unsigned EXIF rational (numerator, denominator)
pub type RawRational = (u32, u32);

/// GPS tags as stored in the EXIF block, before interpretation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGpsTags {
    pub latitude: Option<Vec<RawRational>>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<Vec<RawRational>>,
    pub longitude_ref: Option<String>,
    pub altitude: Option<RawRational>,
    pub altitude_ref: Option<u8>,
    /// "YYYY:MM:DD"
    pub date_stamp: Option<String>,
    /// hour, minute, second
    pub time_stamp: Option<Vec<RawRational>>,
}

fn rationals(field: Option<&exif::Field>) -> Option<Vec<RawRational>> {
    match &field?.value {
        exif::Value::Rational(values) => Some(values.iter().map(|r| (r.num, r.denom)).collect()),
        _ => None,
    }
}

fn ascii(field: Option<&exif::Field>) -> Option<String> {
    match &field?.value {
        exif::Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

impl RawGpsTags {
    /// Copy GPS tags out of the primary image's EXIF data
    pub fn from_exif(exif: &exif::Exif) -> Self {
        let get = |tag: exif::Tag| exif.get_field(tag, exif::In::PRIMARY);
        Self {
            latitude: rationals(get(exif::Tag::GPSLatitude)),
            latitude_ref: ascii(get(exif::Tag::GPSLatitudeRef)),
            longitude: rationals(get(exif::Tag::GPSLongitude)),
            longitude_ref: ascii(get(exif::Tag::GPSLongitudeRef)),
            altitude: rationals(get(exif::Tag::GPSAltitude)).and_then(|v| v.first().copied()),
            altitude_ref: get(exif::Tag::GPSAltitudeRef)
                .and_then(|f| f.value.get_uint(0))
                .map(|v| v as u8),
            date_stamp: ascii(get(exif::Tag::GPSDateStamp)),
            time_stamp: rationals(get(exif::Tag::GPSTimeStamp)),
        }
    }

    /// Interpret the raw tags; `path` is only used for error messages
    pub fn interpret(&self, path: &Path) -> Result<GpsData, ExtractionError> {
        let no_gps = || ExtractionError::NoGps(path.to_path_buf());
        let corrupt = |reason: String| ExtractionError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let (Some(lat), Some(lon)) = (&self.latitude, &self.longitude) else {
            return Err(no_gps());
        };
        // Without hemisphere references the values are unset, even if present.
        // (0, 0, 0) with references is the real equator/meridian point.
        let (Some(lat_ref), Some(lon_ref)) = (&self.latitude_ref, &self.longitude_ref) else {
            return Err(no_gps());
        };

        check_ref(lat_ref, &['N', 'S']).map_err(|r| corrupt(format!("latitude reference '{}'", r)))?;
        check_ref(lon_ref, &['E', 'W']).map_err(|r| corrupt(format!("longitude reference '{}'", r)))?;

        let latitude = decimal(lat, lat_ref).map_err(|r| corrupt(format!("latitude {}", r)))?;
        let longitude = decimal(lon, lon_ref).map_err(|r| corrupt(format!("longitude {}", r)))?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(corrupt(format!("latitude {} out of range", latitude)));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(corrupt(format!("longitude {} out of range", longitude)));
        }

        let elevation = self.altitude.and_then(|(num, denom)| {
            if denom == 0 {
                debug!(path = %path.display(), "Ignoring GPSAltitude with zero denominator");
                return None;
            }
            let metres = num as f64 / denom as f64;
            // GPSAltitudeRef 1 = below sea level
            Some(if self.altitude_ref == Some(1) { -metres } else { metres })
        });

        Ok(GpsData {
            latitude,
            longitude,
            elevation,
            timestamp: self.timestamp(),
        })
    }

    fn timestamp(&self) -> Option<String> {
        let date = NaiveDate::parse_from_str(self.date_stamp.as_deref()?, "%Y:%m:%d").ok()?;
        let time = self.time_stamp.as_ref().and_then(|hms| {
            let part = |i: usize| {
                hms.get(i)
                    .filter(|(_, d)| *d != 0)
                    .map(|(n, d)| (*n as f64 / *d as f64).floor() as u32)
            };
            NaiveTime::from_hms_opt(part(0)?, part(1)?, part(2)?)
        });
        Some(match time {
            Some(time) => date.and_time(time).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => date.format("%Y-%m-%d").to_string(),
        })
    }
}

fn check_ref(reference: &str, allowed: &[char]) -> Result<(), String> {
    match reference.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some(c) if allowed.contains(&c) => Ok(()),
        _ => Err(reference.to_string()),
    }
}

fn decimal(values: &[RawRational], reference: &str) -> Result<f64, String> {
    if values.len() < 3 {
        return Err(format!("has {} components, expected 3", values.len()));
    }
    let mut parts = [0.0; 3];
    for (slot, (num, denom)) in parts.iter_mut().zip(values) {
        if *denom == 0 {
            return Err("has a zero denominator".to_string());
        }
        *slot = *num as f64 / *denom as f64;
    }
    let value = dms_to_decimal(parts[0], parts[1], parts[2], reference);
    if !value.is_finite() {
        return Err("is not finite".to_string());
    }
    Ok(value)
}

/// EXIF metadata relevant to image records
#[derive(Debug, Clone, PartialEq)]
pub struct ExifMetadata {
    pub path: PathBuf,
    /// DateTimeOriginal, falling back to DateTime, as written ("YYYY:MM:DD HH:MM:SS")
    pub date_taken: Option<String>,
    pub gps: RawGpsTags,
}

impl ExifMetadata {
    /// Read EXIF from a JPEG, TIFF, PNG, WebP or HEIF file
    pub fn read(path: &Path) -> Result<Self, ExtractionError> {
        let file = File::open(path).map_err(|source| ExtractionError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| map_exif_error(path, e))?;

        let get = |tag: exif::Tag| exif.get_field(tag, exif::In::PRIMARY);
        let date_taken = ascii(get(exif::Tag::DateTimeOriginal)).or_else(|| ascii(get(exif::Tag::DateTime)));

        Ok(Self {
            path: path.to_path_buf(),
            date_taken,
            gps: RawGpsTags::from_exif(&exif),
        })
    }

    pub fn gps_data(&self) -> Result<GpsData, ExtractionError> {
        self.gps.interpret(&self.path)
    }
}

fn map_exif_error(path: &Path, error: exif::Error) -> ExtractionError {
    match error {
        exif::Error::Io(source) => ExtractionError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        exif::Error::NotFound(_) => ExtractionError::NoExif(path.to_path_buf()),
        other => ExtractionError::Corrupt {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Read the GPS position of one image
pub fn extract_gps(path: &Path) -> Result<GpsData, ExtractionError> {
    ExifMetadata::read(path)?.gps_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn oslo() -> RawGpsTags {
        RawGpsTags {
            latitude: Some(vec![(59, 1), (54, 1), (495, 10)]),
            latitude_ref: Some("N".into()),
            longitude: Some(vec![(10, 1), (34, 1), (484, 10)]),
            longitude_ref: Some("E".into()),
            altitude: Some((648, 10)),
            altitude_ref: Some(0),
            date_stamp: Some("2024:06:15".into()),
            time_stamp: Some(vec![(14, 1), (30, 1), (5, 1)]),
        }
    }

    #[test]
    fn test_interpret_oslo() {
        let gps = oslo().interpret(Path::new("a.jpg")).unwrap();
        assert_abs_diff_eq!(gps.latitude, 59.91375, epsilon = 1e-6);
        assert_abs_diff_eq!(gps.longitude, 10.580111, epsilon = 1e-6);
        assert_abs_diff_eq!(gps.elevation.unwrap(), 64.8, epsilon = 1e-9);
        assert_eq!(gps.timestamp.as_deref(), Some("2024-06-15T14:30:05Z"));
    }

    #[test]
    fn test_southern_western_and_below_sea_level() {
        let mut tags = oslo();
        tags.latitude_ref = Some("S".into());
        tags.longitude_ref = Some("W".into());
        tags.altitude_ref = Some(1);
        tags.time_stamp = None;
        let gps = tags.interpret(Path::new("a.jpg")).unwrap();
        assert!(gps.latitude < 0.0 && gps.longitude < 0.0);
        assert_abs_diff_eq!(gps.elevation.unwrap(), -64.8, epsilon = 1e-9);
        assert_eq!(gps.timestamp.as_deref(), Some("2024-06-15"));
    }

    #[test]
    fn test_zero_tags_without_reference_is_no_gps() {
        let tags = RawGpsTags {
            latitude: Some(vec![(0, 1), (0, 1), (0, 1)]),
            longitude: Some(vec![(0, 1), (0, 1), (0, 1)]),
            ..Default::default()
        };
        assert!(matches!(
            tags.interpret(Path::new("a.jpg")),
            Err(ExtractionError::NoGps(_))
        ));
    }

    #[test]
    fn test_zero_tags_with_reference() {
        let tags = RawGpsTags {
            latitude: Some(vec![(0, 1), (0, 1), (0, 1)]),
            latitude_ref: Some("N".into()),
            longitude: Some(vec![(0, 1), (0, 1), (0, 1)]),
            longitude_ref: Some("E".into()),
            ..Default::default()
        };
        let gps = tags.interpret(Path::new("equator.jpg")).unwrap();
        assert_eq!(gps.latitude, 0.0);
        assert_eq!(gps.longitude, 0.0);

        let mut equator = tags.clone();
        equator.longitude = Some(vec![(9, 1), (0, 1), (0, 1)]);
        let gps = equator.interpret(Path::new("a.jpg")).unwrap();
        assert_eq!(gps.latitude, 0.0);
        assert_eq!(gps.longitude, 9.0);
    }

    #[test]
    fn test_missing_pair_is_no_gps() {
        let mut tags = oslo();
        tags.longitude = None;
        assert!(matches!(
            tags.interpret(Path::new("a.jpg")),
            Err(ExtractionError::NoGps(_))
        ));

        let mut tags = oslo();
        tags.latitude_ref = None;
        assert!(matches!(
            tags.interpret(Path::new("a.jpg")),
            Err(ExtractionError::NoGps(_))
        ));
    }

    #[test]
    fn test_corrupt_values() {
        let mut zero_denominator = oslo();
        zero_denominator.latitude = Some(vec![(59, 0), (54, 1), (0, 1)]);
        let err = zero_denominator.interpret(Path::new("a.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { .. }));
        assert_eq!(err.reason(), "corrupt GPS data");

        let mut out_of_range = oslo();
        out_of_range.latitude = Some(vec![(95, 1), (0, 1), (0, 1)]);
        assert!(matches!(
            out_of_range.interpret(Path::new("a.jpg")),
            Err(ExtractionError::Corrupt { .. })
        ));

        let mut bad_ref = oslo();
        bad_ref.latitude_ref = Some("X".into());
        assert!(matches!(
            bad_ref.interpret(Path::new("a.jpg")),
            Err(ExtractionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_zero_denominator_altitude_is_ignored() {
        let mut tags = oslo();
        tags.altitude = Some((0, 0));
        assert_eq!(tags.interpret(Path::new("a.jpg")).unwrap().elevation, None);
    }

    #[test]
    fn test_unreadable_file() {
        let err = extract_gps(Path::new("/nonexistent/IMG_0001.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }
}
