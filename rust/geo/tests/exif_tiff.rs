// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPS extraction from real files written with the EXIF writer

use std::io::Cursor;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use geomark_geo::{extract_gps, ExifMetadata, ExtractionError, Transformer};

fn rational(values: &[(u32, u32)]) -> Value {
    Value::Rational(
        values
            .iter()
            .map(|&(num, denom)| Rational { num, denom })
            .collect(),
    )
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn write_tiff(dir: &Path, name: &str, fields: &[Field]) -> PathBuf {
    let mut writer = Writer::new();
    for f in fields {
        writer.push_field(f);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, buf.into_inner()).unwrap();
    path
}

fn oslo_fields() -> Vec<Field> {
    vec![
        field(Tag::DateTimeOriginal, ascii("2024:06:15 14:30:05")),
        field(Tag::GPSLatitudeRef, ascii("N")),
        field(Tag::GPSLatitude, rational(&[(59, 1), (54, 1), (495, 10)])),
        field(Tag::GPSLongitudeRef, ascii("E")),
        field(Tag::GPSLongitude, rational(&[(10, 1), (34, 1), (484, 10)])),
        field(Tag::GPSAltitudeRef, Value::Byte(vec![0])),
        field(Tag::GPSAltitude, rational(&[(648, 10)])),
    ]
}

#[test]
fn test_reads_gps_from_tiff() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tiff(dir.path(), "oslo.tif", &oslo_fields());

    let meta = ExifMetadata::read(&path).unwrap();
    assert_eq!(meta.date_taken.as_deref(), Some("2024:06:15 14:30:05"));

    let gps = meta.gps_data().unwrap();
    assert_abs_diff_eq!(gps.latitude, 59.91375, epsilon = 1e-6);
    assert_abs_diff_eq!(gps.longitude, 10.580111, epsilon = 1e-6);
    assert_abs_diff_eq!(gps.elevation.unwrap(), 64.8, epsilon = 1e-9);

    let (x, y, z) = Transformer::new(4326, 5110)
        .unwrap()
        .transform(gps.longitude, gps.latitude, gps.elevation)
        .unwrap();
    assert!((104_000.0..105_000.0).contains(&x));
    assert!((1_212_000.0..1_215_000.0).contains(&y));
    assert_eq!(z, gps.elevation);
}

#[test]
fn test_tiff_without_gps() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tiff(
        dir.path(),
        "plain.tif",
        &[field(Tag::DateTime, ascii("2023:01:02 03:04:05"))],
    );

    let meta = ExifMetadata::read(&path).unwrap();
    assert_eq!(meta.date_taken.as_deref(), Some("2023:01:02 03:04:05"));
    assert!(matches!(meta.gps_data(), Err(ExtractionError::NoGps(_))));
}

#[test]
fn test_non_image_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.jpg");
    std::fs::write(&path, b"not an image at all").unwrap();

    let err = extract_gps(&path).unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::NoExif(_) | ExtractionError::Corrupt { .. }
    ));
}
