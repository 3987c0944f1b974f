// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Why GPS data could not be read from an image
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no EXIF metadata in {0}")]
    NoExif(PathBuf),

    #[error("no GPS data in {0}")]
    NoGps(PathBuf),

    #[error("corrupt GPS data in {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl ExtractionError {
    /// Short reason suitable for an error marker on a record
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractionError::Unreadable { .. } => "unreadable file",
            ExtractionError::NoExif(_) => "no EXIF metadata",
            ExtractionError::NoGps(_) => "no GPS data",
            ExtractionError::Corrupt { .. } => "corrupt GPS data",
        }
    }

    /// Unreadable files and corrupt tags count as failures; images that simply
    /// carry no GPS are skips
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ExtractionError::Unreadable { .. } | ExtractionError::Corrupt { .. }
        )
    }
}

/// Reprojection failures; fatal for a batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReprojectionError {
    #[error("unsupported CRS EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("source CRS must be EPSG:4326, got EPSG:{0}")]
    UnsupportedSource(u32),

    #[error("cannot load definition of EPSG:{epsg}: {reason}")]
    Definition { epsg: u32, reason: String },

    #[error("coordinate out of domain for EPSG:{epsg}: {reason}")]
    OutOfDomain { epsg: u32, reason: String },

    #[error("suspicious output for EPSG:{epsg}: ({x}, {y})")]
    SuspiciousOutput { epsg: u32, x: f64, y: f64 },
}

pub type Result<T> = std::result::Result<T, ReprojectionError>;
