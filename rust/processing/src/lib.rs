// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Geomark Processing
//!
//! Turns folders of geotagged images into IFC marker models:
//!
//! - [`scan_images`] finds images, [`RecordBuilder`] reads their GPS and
//!   reprojects it into the target CRS
//! - [`store`] saves and loads records as a JSON array
//! - [`extract_folder`], [`export_records`] and [`run`] chain the stages
//!
//! Configuration is a [`PipelineConfig`] layered from defaults, a settings
//! file, `GEOMARK_*` environment variables and command-line flags.

pub mod builder;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scan;
pub mod settings;
pub mod store;
pub mod url_map;

pub use builder::{file_uri, ImageStatus, RecordBuilder, UrlPattern};
pub use config::{parse_schema, PipelineConfig, DEFAULT_EXTENSIONS};
pub use error::{ProcessingError, Result};
pub use pipeline::{
    export_records, extract_folder, run, BatchOutcome, BatchSummary, ImageIssue, RunOutcome,
};
pub use scan::scan_images;
pub use settings::{load_settings, Settings};
pub use store::{load, load_from_path, save, save_to_path, RecordError, StoreError};
pub use url_map::{load_url_map, parse_url_map, remap_urls, UrlMapping};
