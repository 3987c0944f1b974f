// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Folder to JSON to IFC orchestration
//!
//! Per-image problems are recorded in the [`BatchSummary`] and never stop a
//! batch. Configuration problems and reprojection failures stop it at once.

use std::path::{Path, PathBuf};
use std::time::Instant;

use geomark_export::{ExportResult, IfcExporter, ImageRecord, ProjectTemplate};
use geomark_geo::{lookup, CrsTransform};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::builder::{ImageStatus, RecordBuilder};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::scan::scan_images;
use crate::store;

/// One image that produced no located record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageIssue {
    pub filename: String,
    pub reason: String,
}

/// Per-image results of an extraction batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<String>,
    pub skipped: Vec<ImageIssue>,
    pub failed: Vec<ImageIssue>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    fn push(&mut self, filename: String, status: ImageStatus) {
        match status {
            ImageStatus::Located => self.succeeded.push(filename),
            ImageStatus::Skipped(reason) => self.skipped.push(ImageIssue { filename, reason }),
            ImageStatus::Failed(reason) => self.failed.push(ImageIssue { filename, reason }),
        }
    }
}

/// Records built from a folder, in scan order
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub records: Vec<ImageRecord>,
    pub summary: BatchSummary,
}

/// Result of a full folder to IFC run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub batch: BatchSummary,
    pub records_written: usize,
    pub json_path: Option<PathBuf>,
    pub export: ExportResult,
}

/// Scan `folder`, read GPS from every image in parallel and build records.
///
/// Records without GPS are kept when `config.include_no_gps` is set.
pub fn extract_folder(folder: &Path, config: &PipelineConfig) -> Result<BatchOutcome> {
    config.validate()?;
    let start = Instant::now();
    let builder = RecordBuilder::new(config.target_epsg, config.url_pattern.clone())?;
    let images = scan_images(folder, config)?;
    info!(folder = %folder.display(), images = images.len(), "Extracting GPS data");

    // par_iter keeps input order on collect
    let built: Vec<_> = images
        .par_iter()
        .map(|path| (path, builder.build_from_file(path, None)))
        .collect();

    let mut records = Vec::with_capacity(built.len());
    let mut summary = BatchSummary::default();
    for (path, result) in built {
        let (record, status) = result.map_err(|source| ProcessingError::ImageReprojection {
            file: path.display().to_string(),
            source,
        })?;
        let keep = record.has_gps || config.include_no_gps;
        summary.push(record.filename.clone(), status);
        if keep {
            records.push(record);
        }
    }

    info!(
        succeeded = summary.succeeded.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        time_ms = start.elapsed().as_millis(),
        "Extraction complete"
    );
    Ok(BatchOutcome { records, summary })
}

/// Export records to an IFC file with the configured CRS, schema and style
pub fn export_records(
    records: &[ImageRecord],
    template: &ProjectTemplate,
    config: &PipelineConfig,
    out_path: &Path,
) -> Result<ExportResult> {
    config.validate()?;
    let crs = lookup(config.target_epsg)?;
    let expected = crs.info().identifier();

    // Coordinates from another CRS would land in the wrong place
    if let Some(found) = records
        .iter()
        .filter(|r| r.is_export_ready())
        .filter_map(|r| r.coordinate_system.as_deref())
        .find(|cs| !cs.eq_ignore_ascii_case(&expected))
    {
        return Err(ProcessingError::CrsMismatch {
            expected,
            found: found.to_string(),
        });
    }

    debug!(records = records.len(), schema = %config.schema, crs = %expected, "Exporting records");
    let exporter = IfcExporter::new(config.export_options());
    Ok(exporter.export(records, template, config.schema, crs.info(), out_path)?)
}

/// Folder to optional JSON file to IFC file
///
/// The JSON file is written before the export, so it survives an export
/// that finds no located images.
pub fn run(
    folder: &Path,
    json_path: Option<&Path>,
    ifc_path: &Path,
    template: &ProjectTemplate,
    config: &PipelineConfig,
) -> Result<RunOutcome> {
    let batch = extract_folder(folder, config)?;
    if let Some(path) = json_path {
        store::save_to_path(&batch.records, path)?;
        info!(path = %path.display(), records = batch.records.len(), "Wrote JSON records");
    }
    let export = export_records(&batch.records, template, config, ifc_path)?;
    Ok(RunOutcome {
        records_written: batch.records.len(),
        batch: batch.summary,
        json_path: json_path.map(Path::to_path_buf),
        export,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomark_core::SchemaVersion;

    fn located(name: &str) -> ImageRecord {
        ImageRecord {
            filename: name.into(),
            image_url: Some(format!("file:///photos/{}", name)),
            latitude: Some(59.91375),
            longitude: Some(10.580111),
            transformed_x: Some(104_481.824),
            transformed_y: Some(1_213_183.612),
            has_gps: true,
            coordinate_system: Some("EPSG:5110".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_folder_without_gps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"no exif here").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"ignored").unwrap();

        let outcome = extract_folder(dir.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.summary.total(), 1);
        assert!(outcome.summary.succeeded.is_empty());
        assert!(!outcome.records[0].is_export_ready());

        let config = PipelineConfig {
            include_no_gps: false,
            ..PipelineConfig::default()
        };
        let outcome = extract_folder(dir.path(), &config).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary.total(), 1);
    }

    #[test]
    fn test_unsupported_target_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            target_epsg: 9999,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            extract_folder(dir.path(), &config),
            Err(ProcessingError::Reprojection(_))
        ));
    }

    #[test]
    fn test_export_rejects_other_crs() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = located("IMG_0001.jpg");
        record.coordinate_system = Some("EPSG:25832".into());
        let err = export_records(
            &[record],
            &ProjectTemplate::default(),
            &PipelineConfig::default(),
            &dir.path().join("out.ifc"),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::CrsMismatch { .. }));
    }

    #[test]
    fn test_export_records_uses_config_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            schema: SchemaVersion::Ifc4x3,
            ..PipelineConfig::default()
        };
        let out = dir.path().join("out.ifc");
        let result = export_records(
            &[located("IMG_0001.jpg")],
            &ProjectTemplate::default(),
            &config,
            &out,
        )
        .unwrap();
        assert_eq!(result.markers_written, 1);
        assert_eq!(result.schema, "IFC4X3_ADD2");
        assert!(out.exists());
    }
}
