// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural validation of image marker models
//!
//! Checks the header, spatial hierarchy, units, contexts, marker containment,
//! marker property sets, georeferencing and GlobalIds. This is a
//! self-consistency check for files this workspace writes, not full schema
//! validation.

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::decoder::{DecodedEntity, EntityDecoder};
use crate::georef::{GeoRefExtractor, GeoReference};
use crate::parser::{has_trailer, parse_header};
use crate::schema::{IfcType, SchemaVersion};
use crate::units::extract_si_units;

/// Name of the property set attached to every marker
pub const IMAGE_PSET_NAME: &str = "ImageMetadata";

/// Properties every ImageMetadata set must carry
pub const REQUIRED_IMAGE_PROPERTIES: [&str; 5] = [
    "ImageFilename",
    "ImageURL",
    "GPS_Latitude",
    "GPS_Longitude",
    "GPS_Elevation",
];

const GLOBAL_ID_ALPHABET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Placement chains longer than this are treated as cyclic
const MAX_PLACEMENT_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single finding
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Short machine-readable category, e.g. "hierarchy"
    pub category: String,
    pub message: String,
    /// Entity the issue is about, when there is one
    pub entity: Option<u32>,
}

/// Marker placement in model and map coordinates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerLocation {
    pub entity: u32,
    pub name: Option<String>,
    pub local: [f64; 3],
    /// Local position pushed through IfcMapConversion, when present
    pub map: Option<[f64; 3]>,
}

/// Result of validating one IFC file
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationReport {
    /// FILE_SCHEMA identifier as written
    pub schema: Option<String>,
    pub entity_count: usize,
    pub marker_count: usize,
    /// EPSG code of the IfcProjectedCRS, when present
    pub epsg: Option<u32>,
    pub georeference: Option<GeoReference>,
    pub markers: Vec<MarkerLocation>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// No error-level issues
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &str,
        message: impl Into<String>,
        entity: Option<u32>,
    ) {
        self.issues.push(ValidationIssue {
            severity,
            category: category.to_string(),
            message: message.into(),
            entity,
        });
    }

    fn error(&mut self, category: &str, message: impl Into<String>, entity: Option<u32>) {
        self.push(Severity::Error, category, message, entity);
    }

    fn warning(&mut self, category: &str, message: impl Into<String>, entity: Option<u32>) {
        self.push(Severity::Warning, category, message, entity);
    }
}

/// Check a GlobalId for length and alphabet (first character encodes two bits)
pub fn is_valid_global_id(id: &str) -> bool {
    id.len() == 22
        && id.chars().all(|c| GLOBAL_ID_ALPHABET.contains(c))
        && id.starts_with(|c: char| ('0'..='3').contains(&c))
}

/// Validate an IFC file on disk
pub fn validate_file(path: &Path) -> crate::Result<ValidationReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(validate_ifc(&content))
}

/// Validate IFC content held in memory
pub fn validate_ifc(content: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    let schema = match parse_header(content) {
        Ok(header) => {
            report.schema = header.schema();
            match report.schema.as_deref().map(SchemaVersion::from_identifier) {
                Some(Some(version)) => Some(version),
                Some(None) => {
                    let id = report.schema.clone().unwrap_or_default();
                    report.error("header", format!("unsupported schema {}", id), None);
                    None
                }
                None => {
                    report.error("header", "FILE_SCHEMA is missing", None);
                    None
                }
            }
        }
        Err(e) => {
            report.error("header", e.to_string(), None);
            return report;
        }
    };
    if !has_trailer(content) {
        report.warning("header", "missing END-ISO-10303-21 trailer", None);
    }

    let mut decoder = EntityDecoder::new(content);
    let mut entities: Vec<DecodedEntity> = Vec::new();
    for id in decoder.ids() {
        match decoder.decode_by_id(id) {
            Ok(entity) => entities.push(entity),
            Err(e) => report.error("syntax", e.to_string(), Some(id)),
        }
    }
    report.entity_count = entities.len();
    debug!(entities = entities.len(), schema = ?schema, "Validating IFC content");

    let by_id: FxHashMap<u32, &DecodedEntity> = entities.iter().map(|e| (e.id, e)).collect();
    let mut by_type: FxHashMap<IfcType, Vec<&DecodedEntity>> = FxHashMap::default();
    for entity in &entities {
        by_type.entry(entity.ifc_type).or_default().push(entity);
    }
    let of_type = |t: IfcType| by_type.get(&t).cloned().unwrap_or_default();

    check_references(&mut report, &entities, &decoder_ids(&by_id));
    check_global_ids(&mut report, &entities);

    // Spatial structure
    let mut singletons: FxHashMap<IfcType, u32> = FxHashMap::default();
    for t in [
        IfcType::IfcProject,
        IfcType::IfcSite,
        IfcType::IfcBuilding,
        IfcType::IfcBuildingStorey,
    ] {
        let found = of_type(t);
        match found.as_slice() {
            [one] => {
                singletons.insert(t, one.id);
            }
            [] => report.error("hierarchy", format!("no {} found", t), None),
            many => report.error(
                "hierarchy",
                format!("expected exactly one {}, found {}", t, many.len()),
                Some(many[1].id),
            ),
        }
    }
    check_aggregation(&mut report, &of_type(IfcType::IfcRelAggregates), &singletons);

    if let Some(&project) = singletons.get(&IfcType::IfcProject) {
        check_units(&mut report, &mut decoder, project);
    }
    check_contexts(
        &mut report,
        &of_type(IfcType::IfcGeometricRepresentationContext),
        &of_type(IfcType::IfcGeometricRepresentationSubContext),
    );

    // Markers
    let markers = of_type(IfcType::IfcBuildingElementProxy);
    report.marker_count = markers.len();
    if markers.is_empty() {
        report.warning("markers", "model contains no markers", None);
    }
    if let Some(&storey) = singletons.get(&IfcType::IfcBuildingStorey) {
        check_containment(
            &mut report,
            &markers,
            &of_type(IfcType::IfcRelContainedInSpatialStructure),
            storey,
        );
    }
    check_marker_psets(
        &mut report,
        &markers,
        &of_type(IfcType::IfcRelDefinesByProperties),
        &by_id,
    );

    // Georeferencing
    let crs_count = of_type(IfcType::IfcProjectedCRS).len();
    let conversion_count = of_type(IfcType::IfcMapConversion).len();
    match schema {
        Some(SchemaVersion::Ifc2x3) => {
            if crs_count + conversion_count > 0 {
                report.error(
                    "georeferencing",
                    "IFC2X3 does not define IfcProjectedCRS or IfcMapConversion",
                    None,
                );
            }
        }
        Some(_) => {
            if crs_count != 1 {
                report.error(
                    "georeferencing",
                    format!("expected exactly one IfcProjectedCRS, found {}", crs_count),
                    None,
                );
            }
            if conversion_count != 1 {
                report.error(
                    "georeferencing",
                    format!("expected exactly one IfcMapConversion, found {}", conversion_count),
                    None,
                );
            }
        }
        None => {}
    }
    if conversion_count > 0 {
        match GeoRefExtractor::extract(&mut decoder) {
            Ok(Some(georef)) => {
                report.epsg = georef.epsg_code();
                if report.epsg.is_none() {
                    report.warning(
                        "georeferencing",
                        "IfcProjectedCRS name carries no EPSG code",
                        None,
                    );
                }
                report.georeference = Some(georef);
            }
            Ok(None) => {}
            Err(e) => report.error("georeferencing", e.to_string(), None),
        }
    }

    for marker in &markers {
        match local_position(marker, &by_id) {
            Some(local) => {
                let map = report.georeference.as_ref().map(|g| {
                    let (e, n, h) = g.local_to_map(local[0], local[1], local[2]);
                    [e, n, h]
                });
                report.markers.push(MarkerLocation {
                    entity: marker.id,
                    name: marker.get_string(2).map(str::to_string),
                    local,
                    map,
                });
            }
            None => report.error(
                "markers",
                "marker placement cannot be resolved",
                Some(marker.id),
            ),
        }
    }

    report
}

fn decoder_ids(by_id: &FxHashMap<u32, &DecodedEntity>) -> FxHashSet<u32> {
    by_id.keys().copied().collect()
}

fn check_references(
    report: &mut ValidationReport,
    entities: &[DecodedEntity],
    ids: &FxHashSet<u32>,
) {
    for entity in entities {
        for target in entity.references() {
            if !ids.contains(&target) {
                report.error(
                    "references",
                    format!("{} references missing entity #{}", entity.type_name, target),
                    Some(entity.id),
                );
            }
        }
    }
}

fn check_global_ids(report: &mut ValidationReport, entities: &[DecodedEntity]) {
    let mut seen: FxHashMap<&str, u32> = FxHashMap::default();
    for entity in entities.iter().filter(|e| e.ifc_type.is_rooted()) {
        let Some(guid) = entity.get_string(0) else {
            report.error(
                "guid",
                format!("{} has no GlobalId", entity.type_name),
                Some(entity.id),
            );
            continue;
        };
        if !is_valid_global_id(guid) {
            report.error("guid", format!("malformed GlobalId '{}'", guid), Some(entity.id));
        }
        if let Some(first) = seen.insert(guid, entity.id) {
            report.error(
                "guid",
                format!("GlobalId '{}' already used by #{}", guid, first),
                Some(entity.id),
            );
        }
    }
}

/// IfcRelAggregates: RelatingObject (4), RelatedObjects (5)
fn check_aggregation(
    report: &mut ValidationReport,
    rels: &[&DecodedEntity],
    singletons: &FxHashMap<IfcType, u32>,
) {
    let chain = [
        (IfcType::IfcProject, IfcType::IfcSite),
        (IfcType::IfcSite, IfcType::IfcBuilding),
        (IfcType::IfcBuilding, IfcType::IfcBuildingStorey),
    ];
    for (parent_type, child_type) in chain {
        let (Some(&parent), Some(&child)) =
            (singletons.get(&parent_type), singletons.get(&child_type))
        else {
            continue;
        };
        let linked = rels
            .iter()
            .any(|rel| rel.get_ref(4) == Some(parent) && rel.get_ref_list(5).contains(&child));
        if !linked {
            report.error(
                "hierarchy",
                format!(
                    "{} #{} is not aggregated into {} #{}",
                    child_type, child, parent_type, parent
                ),
                Some(child),
            );
        }
    }
}

fn check_units(report: &mut ValidationReport, decoder: &mut EntityDecoder, project: u32) {
    match extract_si_units(decoder, project) {
        Ok(units) => match units.iter().find(|u| u.unit_type == "LENGTHUNIT") {
            Some(length) if length.name == "METRE" && length.prefix.is_none() => {}
            Some(length) => report.error(
                "units",
                format!(
                    "length unit is {}{}, expected METRE",
                    length.prefix.as_deref().map(|p| format!("{} ", p)).unwrap_or_default(),
                    length.name
                ),
                Some(project),
            ),
            None => report.error("units", "no SI length unit assigned", Some(project)),
        },
        Err(e) => report.error("units", e.to_string(), Some(project)),
    }
}

/// Subcontext attribute 0 is ContextIdentifier, attribute 6 ParentContext
fn check_contexts(
    report: &mut ValidationReport,
    contexts: &[&DecodedEntity],
    subcontexts: &[&DecodedEntity],
) {
    if contexts.is_empty() {
        report.error("context", "no IfcGeometricRepresentationContext", None);
        return;
    }
    let has_body = subcontexts.iter().any(|sub| {
        sub.get_string(0) == Some("Body")
            && sub
                .get_ref(6)
                .map(|parent| contexts.iter().any(|c| c.id == parent))
                .unwrap_or(false)
    });
    if !has_body {
        report.warning("context", "no 'Body' representation subcontext", None);
    }
}

/// IfcRelContainedInSpatialStructure: RelatedElements (4), RelatingStructure (5)
fn check_containment(
    report: &mut ValidationReport,
    markers: &[&DecodedEntity],
    rels: &[&DecodedEntity],
    storey: u32,
) {
    let contained: FxHashSet<u32> = rels
        .iter()
        .filter(|rel| rel.get_ref(5) == Some(storey))
        .flat_map(|rel| rel.get_ref_list(4))
        .collect();
    for marker in markers {
        if !contained.contains(&marker.id) {
            report.error(
                "containment",
                "marker is not contained in the storey",
                Some(marker.id),
            );
        }
    }
}

/// IfcRelDefinesByProperties: RelatedObjects (4), RelatingPropertyDefinition (5)
fn check_marker_psets(
    report: &mut ValidationReport,
    markers: &[&DecodedEntity],
    rels: &[&DecodedEntity],
    by_id: &FxHashMap<u32, &DecodedEntity>,
) {
    for marker in markers {
        let pset = rels
            .iter()
            .filter(|rel| rel.get_ref_list(4).contains(&marker.id))
            .filter_map(|rel| rel.get_ref(5).and_then(|id| by_id.get(&id)))
            .find(|pset| {
                pset.ifc_type == IfcType::IfcPropertySet
                    && pset.get_string(2) == Some(IMAGE_PSET_NAME)
            });
        let Some(pset) = pset else {
            report.error(
                "properties",
                format!("marker has no {} property set", IMAGE_PSET_NAME),
                Some(marker.id),
            );
            continue;
        };

        let names: FxHashSet<&str> = pset
            .get_ref_list(4)
            .into_iter()
            .filter_map(|id| by_id.get(&id))
            .filter_map(|prop| prop.get_string(0))
            .collect();
        for required in REQUIRED_IMAGE_PROPERTIES {
            if !names.contains(required) {
                report.error(
                    "properties",
                    format!("{} is missing property {}", IMAGE_PSET_NAME, required),
                    Some(pset.id),
                );
            }
        }
    }
}

/// Sum IfcLocalPlacement translations up the PlacementRelTo chain
fn local_position(
    marker: &DecodedEntity,
    by_id: &FxHashMap<u32, &DecodedEntity>,
) -> Option<[f64; 3]> {
    let mut total = [0.0; 3];
    let mut next = marker.get_ref(5);
    let mut depth = 0;

    while let Some(placement_id) = next {
        depth += 1;
        if depth > MAX_PLACEMENT_DEPTH {
            return None;
        }
        let placement = by_id.get(&placement_id)?;
        if placement.ifc_type != IfcType::IfcLocalPlacement {
            return None;
        }
        let axis = by_id.get(&placement.get_ref(1)?)?;
        let point = by_id.get(&axis.get_ref(0)?)?;
        let coords = point.get(0)?.as_float_list()?;
        for (slot, value) in total.iter_mut().zip(coords.iter()) {
            *slot += value;
        }
        next = placement.get_ref(0);
    }

    Some(total)
}
