// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Geomark Core
//!
//! STEP/IFC reading built with [nom](https://docs.rs/nom), used to inspect and
//! validate image marker models.
//!
//! ## Overview
//!
//! - **STEP Tokenization**: zero-copy parsing of ISO 10303-21 entity instances
//! - **Entity Indexing**: [memchr](https://docs.rs/memchr) accelerated, string-aware
//! - **Lazy Decoding**: on-demand attribute parsing with unescaped strings
//! - **String Encoding**: `\X2\` / `\X4\` escapes for non-ASCII text
//! - **Validation**: structural checks of marker models, including georeferencing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use geomark_core::{validate_ifc, EntityDecoder, IfcType};
//!
//! let mut decoder = EntityDecoder::new(content);
//! for proxy in decoder.entities_of_type(IfcType::IfcBuildingElementProxy)? {
//!     println!("#{} {:?}", proxy.id, proxy.get_string(2));
//! }
//!
//! let report = validate_ifc(content);
//! assert!(report.is_valid());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialization of validation reports

pub mod decoder;
pub mod error;
pub mod georef;
pub mod parser;
pub mod schema;
pub mod step_string;
pub mod units;
pub mod validate;

pub use decoder::{build_entity_index, AttributeValue, DecodedEntity, EntityDecoder, EntityIndex};
pub use error::{Error, Result};
pub use georef::{GeoRefExtractor, GeoReference};
pub use parser::{parse_entity, parse_header, StepHeader, Token};
pub use schema::{IfcType, SchemaVersion};
pub use step_string::{decode_step_string, encode_step_string};
pub use units::{extract_length_unit_scale, extract_si_units, get_si_prefix_multiplier, SiUnit};
pub use validate::{
    is_valid_global_id, validate_file, validate_ifc, MarkerLocation, Severity, ValidationIssue,
    ValidationReport, IMAGE_PSET_NAME, REQUIRED_IMAGE_PROPERTIES,
};
