// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use geomark_export::ExportError;
use geomark_geo::ReprojectionError;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Errors that abort a pipeline stage
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("invalid configuration value for {key}: '{value}' ({reason})")]
    Config {
        key: String,
        value: String,
        reason: String,
    },

    #[error("cannot read settings file {path}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read URL mapping {path}: {reason}")]
    UrlMap { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reprojection(#[from] ReprojectionError),

    #[error("cannot reproject {file}: {source}")]
    ImageReprojection {
        file: String,
        #[source]
        source: ReprojectionError,
    },

    #[error("records were transformed to {found}, export target is {expected}")]
    CrsMismatch { expected: String, found: String },

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ProcessingError {
    pub(crate) fn config(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ProcessingError::Config {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessingError::Io {
            path: path.into(),
            source,
        }
    }
}
