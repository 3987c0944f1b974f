// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Geomark Geo
//!
//! Geodesy for geotagged images:
//!
//! - **EXIF GPS** - read latitude, longitude and altitude from image files
//! - **DMS** - degrees/minutes/seconds to decimal degrees
//! - **Reprojection** - WGS84 to a registry of projected CRSs, computed with `proj4rs`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geomark_geo::{extract_gps, Transformer};
//! use std::path::Path;
//!
//! let gps = extract_gps(Path::new("IMG_0001.jpg"))?;
//! let transformer = Transformer::new(4326, 5110)?;
//! let (x, y, z) = transformer.transform(gps.longitude, gps.latitude, gps.elevation)?;
//! println!("{} {} {:?}", x, y, z);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod crs;
pub mod dms;
pub mod error;
pub mod exif;

pub use crs::{
    lookup, reproject, supported_ranges, AxisOrder, CrsInfo, CrsTransform, ProjectedCrs,
    Transformer, DEFAULT_TARGET_EPSG, WGS84_EPSG,
};
pub use dms::{decimal_to_dms, dms_to_decimal};
pub use error::{ExtractionError, ReprojectionError, Result};
pub use exif::{extract_gps, ExifMetadata, GpsData, RawGpsTags};
