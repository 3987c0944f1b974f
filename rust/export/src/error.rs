// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::SkippedRecord;

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors that abort an export; bad records are skipped instead
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no export-ready records ({} skipped)", skipped.len())]
    NoExportableRecords { skipped: Vec<SkippedRecord> },

    #[error("schema {0} is not supported for export")]
    UnsupportedSchema(String),

    #[error("output path {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write IFC content: {0}")]
    Writer(#[from] std::io::Error),

    #[error("invalid marker size {0}")]
    InvalidMarkerSize(f64),
}
