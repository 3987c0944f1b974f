// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Geomark Export
//!
//! Writes image records as IFC marker models:
//!
//! - **Spatial hierarchy** - one Project, Site, Building and Storey per export
//! - **Markers** - a cube or sphere proxy per image with an `ImageMetadata`
//!   property set and a document reference to the image
//! - **Schemas** - IFC2x3 and IFC4/IFC4.3 via [`SchemaDialect`]; IFC4.x files
//!   carry `IfcProjectedCRS` and `IfcMapConversion`
//! - **Atomic output** - files are replaced only after a complete write
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use geomark_export::{IfcExporter, ImageRecord, ProjectTemplate};
//! use geomark_core::SchemaVersion;
//! use geomark_geo::{lookup, CrsTransform};
//!
//! let crs = lookup(5110)?;
//! let result = IfcExporter::default().export(
//!     &records,
//!     &ProjectTemplate::default(),
//!     SchemaVersion::Ifc4x3,
//!     crs.info(),
//!     Path::new("markers.ifc"),
//! )?;
//! println!("{} markers", result.markers_written);
//! ```

pub mod builder;
pub mod dialect;
pub mod error;
pub mod exporter;
pub mod guid;
pub mod marker;
pub mod output;
pub mod record;
pub mod step;
pub mod template;

pub use dialect::{dialect_for, Ifc2x3Dialect, Ifc4Dialect, SchemaDialect};
pub use error::{ExportError, Result};
pub use exporter::{export, BuiltModel, ExportOptions, ExportResult, GuidMode, IfcExporter};
pub use guid::GuidGenerator;
pub use marker::{MarkerShape, MarkerStyle, Rgb, DEFAULT_MARKER_SIZE};
pub use output::{write_atomic, write_string_atomic};
pub use record::{partition_records, ImageRecord, SkipReason, SkippedRecord};
pub use step::{EntityId, StepHeaderInfo, StepModel, StepValue};
pub use template::ProjectTemplate;
