// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image folder to JSON to IFC, through real files

use std::io::Cursor;
use std::path::Path;

use approx::assert_abs_diff_eq;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use geomark_core::{validate_file, SchemaVersion};
use geomark_export::ProjectTemplate;
use geomark_processing::{
    export_records, extract_folder, load_from_path, remap_urls, run, save_to_path,
    PipelineConfig, ProcessingError, UrlMapping,
};

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

/// 59°54'49.5"N 10°34'48.4"E, 64.8 m
fn write_oslo_tiff(dir: &Path, name: &str) {
    let fields = [
        field(Tag::DateTimeOriginal, ascii("2024:06:15 14:30:05")),
        field(Tag::GPSLatitudeRef, ascii("N")),
        field(Tag::GPSLatitude, rational(&[(59, 1), (54, 1), (495, 10)])),
        field(Tag::GPSLongitudeRef, ascii("E")),
        field(Tag::GPSLongitude, rational(&[(10, 1), (34, 1), (484, 10)])),
        field(Tag::GPSAltitudeRef, Value::Byte(vec![0])),
        field(Tag::GPSAltitude, rational(&[(648, 10)])),
    ];
    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).unwrap();
    std::fs::write(dir.join(name), buf.into_inner()).unwrap();
}

fn ifc4x3_config() -> PipelineConfig {
    PipelineConfig {
        schema: SchemaVersion::Ifc4x3,
        ..PipelineConfig::default()
    }
}

#[test]
fn test_oslo_image_to_ifc4x3() {
    let photos = tempfile::tempdir().unwrap();
    write_oslo_tiff(photos.path(), "oslo.tif");
    std::fs::write(photos.path().join("blank.jpg"), b"no metadata").unwrap();

    let config = ifc4x3_config();
    let batch = extract_folder(photos.path(), &config).unwrap();
    assert_eq!(batch.summary.succeeded, vec!["oslo.tif".to_string()]);
    assert_eq!(batch.summary.total(), 2);
    assert_eq!(batch.records.len(), 2);

    let oslo = batch
        .records
        .iter()
        .find(|r| r.filename == "oslo.tif")
        .unwrap();
    assert_abs_diff_eq!(oslo.latitude.unwrap(), 59.9137, epsilon = 1e-4);
    assert_abs_diff_eq!(oslo.longitude.unwrap(), 10.5801, epsilon = 1e-4);
    assert_eq!(oslo.elevation, Some(64.8));
    assert_eq!(oslo.transformed_z, Some(64.8));
    assert_eq!(oslo.date_taken.as_deref(), Some("2024:06:15 14:30:05"));
    assert!(oslo.image_url.as_deref().unwrap().starts_with("file://"));

    // JSON round trip keeps the no-GPS record distinct
    let out = tempfile::tempdir().unwrap();
    let json = out.path().join("records.json");
    save_to_path(&batch.records, &json).unwrap();
    let records = load_from_path(&json).unwrap();
    assert_eq!(records, batch.records);

    let ifc = out.path().join("markers.ifc");
    let result = export_records(&records, &ProjectTemplate::default(), &config, &ifc).unwrap();
    assert_eq!(result.markers_written, 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].filename, "blank.jpg");

    let report = validate_file(&ifc).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.epsg, Some(5110));
    assert_eq!(report.marker_count, 1);

    let content = std::fs::read_to_string(&ifc).unwrap();
    assert!(content.contains("IFCPROPERTYSINGLEVALUE('GPS_Elevation',$,IFCREAL(64.8),$);"));
    assert!(content.contains("'oslo.tif'"));
}

#[test]
fn test_run_writes_json_and_ifc() {
    let photos = tempfile::tempdir().unwrap();
    write_oslo_tiff(photos.path(), "a.tif");
    write_oslo_tiff(photos.path(), "b.tif");

    let out = tempfile::tempdir().unwrap();
    let json = out.path().join("records.json");
    let ifc = out.path().join("markers.ifc");
    let outcome = run(
        photos.path(),
        Some(&json),
        &ifc,
        &ProjectTemplate::default(),
        &PipelineConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.batch.succeeded.len(), 2);
    assert_eq!(outcome.records_written, 2);
    assert_eq!(outcome.export.markers_written, 2);
    assert_eq!(outcome.export.schema, "IFC2X3");
    assert_eq!(load_from_path(&json).unwrap().len(), 2);

    let report = validate_file(&ifc).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.epsg, None);
}

#[test]
fn test_folder_without_gps_keeps_json_but_fails_export() {
    let photos = tempfile::tempdir().unwrap();
    std::fs::write(photos.path().join("blank.jpg"), b"no metadata").unwrap();

    let out = tempfile::tempdir().unwrap();
    let json = out.path().join("records.json");
    let ifc = out.path().join("markers.ifc");
    let err = run(
        photos.path(),
        Some(&json),
        &ifc,
        &ProjectTemplate::default(),
        &PipelineConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ProcessingError::Export(_)));
    assert!(json.exists());
    assert!(!ifc.exists());
}

#[test]
fn test_remapped_urls_reach_the_ifc() {
    let photos = tempfile::tempdir().unwrap();
    write_oslo_tiff(photos.path(), "oslo.tif");

    let mut batch = extract_folder(photos.path(), &ifc4x3_config()).unwrap();
    let mut mapping = UrlMapping::default();
    mapping.insert(
        "oslo.tif".into(),
        "https://cdn.example.org/photos/oslo.tif".into(),
    );
    assert_eq!(remap_urls(&mut batch.records, &mapping), 1);

    let out = tempfile::tempdir().unwrap();
    let ifc = out.path().join("markers.ifc");
    export_records(
        &batch.records,
        &ProjectTemplate::default(),
        &ifc4x3_config(),
        &ifc,
    )
    .unwrap();
    let content = std::fs::read_to_string(&ifc).unwrap();
    assert!(content.contains("'https://cdn.example.org/photos/oslo.tif'"));
}
