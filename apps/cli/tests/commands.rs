// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runs the built binary

use std::path::Path;
use std::process::{Command, Output};

fn geomark(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_geomark"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_epsg_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let ok = geomark(&["epsg", "5110"], dir.path());
    assert!(ok.status.success());
    assert!(stdout(&ok).starts_with("EPSG:5110"));

    let unknown = geomark(&["epsg", "1"], dir.path());
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("Supported codes"));
}

#[test]
fn test_template_then_export_with_settings() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let created = geomark(&["template", "-o", "settings.json"], dir.path());
    assert!(created.status.success());
    assert!(settings.exists());

    std::fs::write(
        dir.path().join("records.json"),
        r#"[{
            "filename": "IMG_0001.jpg",
            "filepath": "/photos/IMG_0001.jpg",
            "image_url": "https://cdn.example.org/IMG_0001.jpg",
            "latitude": 59.91375,
            "longitude": 10.580111,
            "elevation": 64.8,
            "date_taken": null,
            "transformed_x": 104481.824,
            "transformed_y": 1213183.612,
            "transformed_z": 64.8,
            "has_gps": true
        }]"#,
    )
    .unwrap();

    let export = geomark(
        &[
            "export",
            "records.json",
            "--settings",
            "settings.json",
            "--schema",
            "IFC4X3",
            "-o",
            "out.ifc",
        ],
        dir.path(),
    );
    assert!(export.status.success(), "{}", String::from_utf8_lossy(&export.stderr));
    assert!(stdout(&export).contains("1 marker(s)"));

    let content = std::fs::read_to_string(dir.path().join("out.ifc")).unwrap();
    assert!(content.contains("'PROJECT_NAME'"));

    let validate = geomark(&["validate", "out.ifc", "--json"], dir.path());
    assert!(validate.status.success());
    let report: serde_json::Value = serde_json::from_slice(&validate.stdout).unwrap();
    assert_eq!(report["epsg"], 5110);
    assert_eq!(report["marker_count"], 1);
}

#[test]
fn test_strict_export_rejects_bad_records() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("records.json"),
        r#"[{"filename": "bad.jpg", "latitude": 95.0, "longitude": 10.0}]"#,
    )
    .unwrap();

    let strict = geomark(&["export", "records.json", "--strict"], dir.path());
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("bad.jpg"));

    // Without --strict the valid subset is empty, so the export itself fails
    let lenient = geomark(&["export", "records.json"], dir.path());
    assert!(!lenient.status.success());
    assert!(!dir.path().join("image_markers.ifc").exists());
}

#[test]
fn test_missing_folder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = geomark(&["extract", "no-such-folder"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-folder"));
}
