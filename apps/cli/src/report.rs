// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Human-readable summaries

use std::fmt::Write as _;

use geomark_core::{Severity, ValidationReport};
use geomark_export::ExportResult;
use geomark_geo::CrsInfo;
use geomark_processing::{BatchSummary, RecordError};

pub fn batch(summary: &BatchSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Processed {} image(s): {} located, {} skipped, {} failed",
        summary.total(),
        summary.succeeded.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    for issue in &summary.skipped {
        let _ = writeln!(out, "  skipped  {}: {}", issue.filename, issue.reason);
    }
    for issue in &summary.failed {
        let _ = writeln!(out, "  failed   {}: {}", issue.filename, issue.reason);
    }
    out
}

pub fn export(result: &ExportResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Wrote {} ({}, EPSG:{}): {} marker(s), {} record(s) skipped",
        result.output_path.display(),
        result.schema,
        result.epsg,
        result.markers_written,
        result.skipped.len()
    );
    for skipped in &result.skipped {
        let name = if skipped.filename.is_empty() {
            format!("#{}", skipped.index)
        } else {
            skipped.filename.clone()
        };
        let _ = writeln!(out, "  skipped  {}: {}", name, skipped.reason);
    }
    out
}

pub fn invalid_records(errors: &[RecordError]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} invalid record(s) in JSON file:", errors.len());
    for error in errors {
        let _ = writeln!(out, "  {}", error);
    }
    out
}

pub fn validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: schema {}, {} entities, {} marker(s), {}",
        if report.is_valid() { "VALID" } else { "INVALID" },
        report.schema.as_deref().unwrap_or("unknown"),
        report.entity_count,
        report.marker_count,
        match report.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => "no projected CRS".to_string(),
        }
    );
    for issue in &report.issues {
        let level = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        let _ = match issue.entity {
            Some(id) => writeln!(out, "  {:<7} [{}] #{}: {}", level, issue.category, id, issue.message),
            None => writeln!(out, "  {:<7} [{}] {}", level, issue.category, issue.message),
        };
    }
    for marker in report.markers.iter().filter(|m| m.map.is_some()) {
        if let Some([x, y, z]) = marker.map {
            let _ = writeln!(
                out,
                "  marker  {} at ({:.3}, {:.3}, {:.3})",
                marker.name.as_deref().unwrap_or("?"),
                x,
                y,
                z
            );
        }
    }
    out
}

pub fn crs(info: &CrsInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", info.identifier(), info.name);
    let _ = writeln!(out, "  datum       {}", info.geodetic_datum);
    let _ = writeln!(out, "  projection  {}", info.projection);
    if let Some(zone) = &info.zone {
        let _ = writeln!(out, "  zone        {}", zone);
    }
    let _ = writeln!(out, "  unit        {}", info.map_unit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomark_processing::ImageIssue;

    #[test]
    fn test_batch_lists_reasons() {
        let summary = BatchSummary {
            succeeded: vec!["a.jpg".into()],
            skipped: vec![ImageIssue {
                filename: "b.jpg".into(),
                reason: "no GPS data".into(),
            }],
            failed: vec![],
        };
        let text = batch(&summary);
        assert!(text.starts_with("Processed 2 image(s): 1 located, 1 skipped, 0 failed"));
        assert!(text.contains("skipped  b.jpg: no GPS data"));
    }

    #[test]
    fn test_crs_description() {
        let crs = geomark_geo::lookup(5110).unwrap();
        let text = super::crs(geomark_geo::CrsTransform::info(&crs));
        assert!(text.starts_with("EPSG:5110"));
        assert!(text.contains("ETRS89"));
    }
}
