// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC export of image markers

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geomark_core::{SchemaVersion, IMAGE_PSET_NAME};
use geomark_geo::{decimal_to_dms, CrsInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builder::ModelBuilder;
use crate::dialect::{dialect_for, ProxySpec, SchemaDialect};
use crate::error::{ExportError, Result};
use crate::guid::GuidGenerator;
use crate::marker::{MarkerShape, MarkerStyle};
use crate::output::write_atomic;
use crate::record::{partition_records, ImageRecord, SkippedRecord};
use crate::step::{EntityId, StepHeaderInfo, StepModel, StepValue};
use crate::template::ProjectTemplate;

const APPLICATION_NAME: &str = "Geomark";
const APPLICATION_ID: &str = "geomark";
const OBJECT_TYPE: &str = "ImageMarker";

/// How GlobalIds are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidMode {
    /// Seeded by the project name; repeated exports produce identical ids
    #[default]
    Deterministic,
    Random,
}

/// Export settings that are not part of the project template
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub style: MarkerStyle,
    pub guid_mode: GuidMode,
    /// Header timestamp and owner history creation date; `None` uses the current time
    pub timestamp: Option<DateTime<Utc>>,
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub output_path: PathBuf,
    pub schema: String,
    pub epsg: u32,
    pub markers_written: usize,
    pub skipped: Vec<SkippedRecord>,
    pub entity_count: usize,
}

/// An in-memory model ready to be written
pub struct BuiltModel {
    pub model: StepModel,
    pub header: StepHeaderInfo,
    pub markers_written: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Writes image records as IFC marker models
#[derive(Debug, Clone, Default)]
pub struct IfcExporter {
    options: ExportOptions,
}

impl IfcExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Build and atomically write an IFC file
    pub fn export(
        &self,
        records: &[ImageRecord],
        template: &ProjectTemplate,
        schema: SchemaVersion,
        crs: &CrsInfo,
        out_path: &Path,
    ) -> Result<ExportResult> {
        let built = self.build_model(records, template, schema, crs, out_path)?;

        write_atomic(out_path, |out| built.model.write(out, &built.header)).map_err(
            |source| ExportError::Unwritable {
                path: out_path.to_path_buf(),
                source,
            },
        )?;

        info!(
            path = %out_path.display(),
            schema = %schema,
            markers = built.markers_written,
            skipped = built.skipped.len(),
            "IFC export complete"
        );

        Ok(ExportResult {
            output_path: out_path.to_path_buf(),
            schema: schema.identifier().to_string(),
            epsg: crs.epsg,
            markers_written: built.markers_written,
            skipped: built.skipped,
            entity_count: built.model.len(),
        })
    }

    /// Build the model without writing it; `out_path` only names the file in the header
    pub fn build_model(
        &self,
        records: &[ImageRecord],
        template: &ProjectTemplate,
        schema: SchemaVersion,
        crs: &CrsInfo,
        out_path: &Path,
    ) -> Result<BuiltModel> {
        let style = self.options.style;
        if !style.is_valid() {
            return Err(ExportError::InvalidMarkerSize(style.size));
        }
        let dialect = dialect_for(schema)?;

        let (ready, skipped) = partition_records(records);
        for s in &skipped {
            warn!(index = s.index, filename = %s.filename, reason = %s.reason, "Skipping record");
        }
        if ready.is_empty() {
            return Err(ExportError::NoExportableRecords { skipped });
        }

        let timestamp = self.options.timestamp.unwrap_or_else(Utc::now);
        let guids = match self.options.guid_mode {
            GuidMode::Deterministic => GuidGenerator::deterministic(&template.project_name),
            GuidMode::Random => GuidGenerator::random(),
        };
        let mut b = ModelBuilder::new(StepModel::new(schema), guids);

        let ownership = write_ownership(&mut b, dialect.as_ref(), template, timestamp.timestamp());
        let units = write_units(&mut b);
        let contexts = write_contexts(&mut b);

        let project = b.rooted(
            "IFCPROJECT",
            vec![
                StepValue::string(&template.project_name),
                StepValue::opt_string(template.project_description.as_deref()),
                StepValue::Null,
                StepValue::Null,
                StepValue::Null,
                StepValue::refs([contexts.model]),
                units.assignment.into(),
            ],
        );

        let site_reference = dialect.georeferenced().then_some(ready[0]);
        let hierarchy = write_hierarchy(&mut b, template, project, site_reference);
        dialect.georeference(&mut b, crs, contexts.model, hierarchy.site, units.metre);

        let representation = write_marker_geometry(&mut b, dialect.as_ref(), contexts.body, style);

        let mut markers = Vec::with_capacity(ready.len());
        for record in &ready {
            let marker = write_marker(
                &mut b,
                dialect.as_ref(),
                record,
                hierarchy.storey_placement,
                representation,
            );
            markers.push(marker);
        }

        b.rooted(
            "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            vec![
                StepValue::Null,
                StepValue::Null,
                StepValue::refs(markers.iter().copied()),
                hierarchy.storey.into(),
            ],
        );

        let model = b.finish();
        debug!(
            entities = model.len(),
            markers = markers.len(),
            schema = %schema,
            epsg = crs.epsg,
            "Built IFC model"
        );

        let header = StepHeaderInfo {
            description: match schema {
                SchemaVersion::Ifc2x3 => "ViewDefinition [CoordinationView_V2.0]".to_string(),
                _ => "ViewDefinition [ReferenceView]".to_string(),
            },
            file_name: out_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            time_stamp: timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            author: format!("{} {}", template.person_given_name, template.person_family_name)
                .trim()
                .to_string(),
            organization: template.organization_name.clone(),
            preprocessor: format!("{} {}", APPLICATION_ID, env!("CARGO_PKG_VERSION")),
            originating_system: APPLICATION_NAME.to_string(),
        };

        Ok(BuiltModel {
            model,
            header,
            markers_written: markers.len(),
            skipped,
        })
    }

    /// Build the model and return the file content
    pub fn export_to_string(
        &self,
        records: &[ImageRecord],
        template: &ProjectTemplate,
        schema: SchemaVersion,
        crs: &CrsInfo,
    ) -> Result<(String, BuiltModel)> {
        let built = self.build_model(records, template, schema, crs, Path::new("markers.ifc"))?;
        let content = built.model.to_step_string(&built.header);
        Ok((content, built))
    }
}

/// Export with default options
pub fn export(
    records: &[ImageRecord],
    template: &ProjectTemplate,
    schema: SchemaVersion,
    crs: &CrsInfo,
    out_path: &Path,
) -> Result<ExportResult> {
    IfcExporter::default().export(records, template, schema, crs, out_path)
}

fn write_ownership(
    b: &mut ModelBuilder,
    dialect: &dyn SchemaDialect,
    template: &ProjectTemplate,
    creation_date: i64,
) -> EntityId {
    let person = b.create(
        "IFCPERSON",
        vec![
            StepValue::Null,
            StepValue::string(&template.person_family_name),
            StepValue::string(&template.person_given_name),
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
        ],
    );
    let organization = b.create(
        "IFCORGANIZATION",
        vec![
            StepValue::Null,
            StepValue::string(&template.organization_name),
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
        ],
    );
    let person_org = b.create(
        "IFCPERSONANDORGANIZATION",
        vec![person.into(), organization.into(), StepValue::Null],
    );
    let application = b.create(
        "IFCAPPLICATION",
        vec![
            organization.into(),
            StepValue::string(env!("CARGO_PKG_VERSION")),
            StepValue::string(APPLICATION_NAME),
            StepValue::string(APPLICATION_ID),
        ],
    );
    let owner = dialect.owner_history(b, person_org, application, creation_date);
    b.set_owner_history(owner);
    owner
}

struct Units {
    assignment: EntityId,
    metre: EntityId,
}

fn write_units(b: &mut ModelBuilder) -> Units {
    let mut si = |unit_type: &'static str, name: &'static str| {
        b.create(
            "IFCSIUNIT",
            vec![
                StepValue::Derived,
                StepValue::Enum(unit_type),
                StepValue::Null,
                StepValue::Enum(name),
            ],
        )
    };
    let metre = si("LENGTHUNIT", "METRE");
    let square_metre = si("AREAUNIT", "SQUARE_METRE");
    let cubic_metre = si("VOLUMEUNIT", "CUBIC_METRE");
    let radian = si("PLANEANGLEUNIT", "RADIAN");
    let assignment = b.create(
        "IFCUNITASSIGNMENT",
        vec![StepValue::refs([metre, square_metre, cubic_metre, radian])],
    );
    Units { assignment, metre }
}

struct Contexts {
    model: EntityId,
    body: EntityId,
}

fn write_contexts(b: &mut ModelBuilder) -> Contexts {
    let world = b.oriented_axis_placement([0.0, 0.0, 0.0]);
    let true_north = b.create("IFCDIRECTION", vec![StepValue::reals([0.0, 1.0])]);
    let model = b.create(
        "IFCGEOMETRICREPRESENTATIONCONTEXT",
        vec![
            StepValue::Null,
            StepValue::string("Model"),
            StepValue::Integer(3),
            StepValue::real(1e-5),
            world.into(),
            true_north.into(),
        ],
    );
    let body = b.create(
        "IFCGEOMETRICREPRESENTATIONSUBCONTEXT",
        vec![
            StepValue::string("Body"),
            StepValue::string("Model"),
            StepValue::Derived,
            StepValue::Derived,
            StepValue::Derived,
            StepValue::Derived,
            model.into(),
            StepValue::Null,
            StepValue::Enum("MODEL_VIEW"),
            StepValue::Null,
        ],
    );
    Contexts { model, body }
}

struct Hierarchy {
    site: EntityId,
    storey: EntityId,
    storey_placement: EntityId,
}

/// IfcCompoundPlaneAngleMeasure: degrees, minutes, seconds, millionths of a second
fn compound_angle(value: f64, is_latitude: bool) -> StepValue {
    let (d, m, s, hemisphere) = decimal_to_dms(value, is_latitude);
    let seconds = s.trunc();
    let micro = ((s - seconds) * 1e6).round().min(999_999.0);
    let sign: i64 = if matches!(hemisphere, 'S' | 'W') { -1 } else { 1 };
    StepValue::List(
        [d as i64, m as i64, seconds as i64, micro as i64]
            .into_iter()
            .map(|v| StepValue::Integer(sign * v))
            .collect(),
    )
}

fn write_hierarchy(
    b: &mut ModelBuilder,
    template: &ProjectTemplate,
    project: EntityId,
    reference: Option<&ImageRecord>,
) -> Hierarchy {
    let origin = [0.0, 0.0, 0.0];

    // Site reference location from the first exported image
    let (ref_lat, ref_lon, ref_elevation) = match reference {
        Some(record) => match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => (
                compound_angle(lat, true),
                compound_angle(lon, false),
                StepValue::real(record.elevation_or_zero()),
            ),
            _ => (StepValue::Null, StepValue::Null, StepValue::Null),
        },
        None => (StepValue::Null, StepValue::Null, StepValue::Null),
    };

    let site_placement = b.local_placement(None, origin);
    let site = b.rooted(
        "IFCSITE",
        vec![
            StepValue::string(&template.site_name),
            StepValue::opt_string(template.site_description.as_deref()),
            StepValue::Null,
            site_placement.into(),
            StepValue::Null,
            StepValue::Null,
            StepValue::Enum("ELEMENT"),
            ref_lat,
            ref_lon,
            ref_elevation,
            StepValue::Null,
            StepValue::Null,
        ],
    );

    let building_placement = b.local_placement(Some(site_placement), origin);
    let building = b.rooted(
        "IFCBUILDING",
        vec![
            StepValue::string(&template.building_name),
            StepValue::opt_string(template.building_description.as_deref()),
            StepValue::Null,
            building_placement.into(),
            StepValue::Null,
            StepValue::Null,
            StepValue::Enum("ELEMENT"),
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
        ],
    );

    let storey_placement = b.local_placement(Some(building_placement), origin);
    let storey = b.rooted(
        "IFCBUILDINGSTOREY",
        vec![
            StepValue::string(&template.storey_name),
            StepValue::opt_string(template.storey_description.as_deref()),
            StepValue::Null,
            storey_placement.into(),
            StepValue::Null,
            StepValue::Null,
            StepValue::Enum("ELEMENT"),
            StepValue::real(0.0),
        ],
    );

    b.aggregate(project, &[site]);
    b.aggregate(site, &[building]);
    b.aggregate(building, &[storey]);

    Hierarchy {
        site,
        storey,
        storey_placement,
    }
}

/// Shared body representation: a styled solid centred on the marker placement
fn write_marker_geometry(
    b: &mut ModelBuilder,
    dialect: &dyn SchemaDialect,
    body_context: EntityId,
    style: MarkerStyle,
) -> EntityId {
    let half = style.size / 2.0;
    let (item, representation_type) = match style.shape {
        MarkerShape::Cube => {
            let centre = b.point_2d(0.0, 0.0);
            let profile_position =
                b.create("IFCAXIS2PLACEMENT2D", vec![centre.into(), StepValue::Null]);
            let profile = b.create(
                "IFCRECTANGLEPROFILEDEF",
                vec![
                    StepValue::Enum("AREA"),
                    StepValue::Null,
                    profile_position.into(),
                    StepValue::real(style.size),
                    StepValue::real(style.size),
                ],
            );
            let position = b.axis_placement([0.0, 0.0, -half]);
            let up = b.direction([0.0, 0.0, 1.0]);
            let solid = b.create(
                "IFCEXTRUDEDAREASOLID",
                vec![
                    profile.into(),
                    position.into(),
                    up.into(),
                    StepValue::real(style.size),
                ],
            );
            (solid, "SweptSolid")
        }
        MarkerShape::Sphere => {
            let position = b.axis_placement([0.0, 0.0, 0.0]);
            let sphere = b.create("IFCSPHERE", vec![position.into(), StepValue::real(half)]);
            let solid = b.create("IFCCSGSOLID", vec![sphere.into()]);
            (solid, "CSG")
        }
    };

    let styles = dialect.surface_styles(b, OBJECT_TYPE, style.colour);
    b.create(
        "IFCSTYLEDITEM",
        vec![item.into(), styles, StepValue::string(OBJECT_TYPE)],
    );

    b.create(
        "IFCSHAPEREPRESENTATION",
        vec![
            body_context.into(),
            StepValue::string("Body"),
            StepValue::string(representation_type),
            StepValue::refs([item]),
        ],
    )
}

fn write_marker(
    b: &mut ModelBuilder,
    dialect: &dyn SchemaDialect,
    record: &ImageRecord,
    storey_placement: EntityId,
    representation: EntityId,
) -> EntityId {
    // Only export-ready records get here
    let position = record.position().unwrap_or([0.0; 3]);
    let url = record.image_url.as_deref().unwrap_or_default();
    let date_taken = record.date_taken.as_deref().filter(|d| !d.trim().is_empty());

    let placement = b.local_placement(Some(storey_placement), position);
    let shape = b.create(
        "IFCPRODUCTDEFINITIONSHAPE",
        vec![StepValue::Null, StepValue::Null, StepValue::refs([representation])],
    );
    let marker = dialect.marker_proxy(
        b,
        &ProxySpec {
            name: &record.filename,
            description: date_taken,
            placement,
            representation: shape,
        },
    );

    let mut properties = vec![
        b.text_property("ImageFilename", &record.filename),
        b.text_property("ImageURL", url),
        b.real_property("GPS_Latitude", record.latitude.unwrap_or_default()),
        b.real_property("GPS_Longitude", record.longitude.unwrap_or_default()),
        b.real_property("GPS_Elevation", record.elevation_or_zero()),
    ];
    if let Some(date) = date_taken {
        properties.push(b.text_property("DateTaken", date));
    }
    if let Some(path) = record.filepath.as_deref().filter(|p| !p.is_empty()) {
        properties.push(b.text_property("FilePath", path));
    }
    b.property_set(IMAGE_PSET_NAME, properties, &[marker]);

    let document = dialect.document_reference(b, url, &record.filename, date_taken);
    b.rooted(
        "IFCRELASSOCIATESDOCUMENT",
        vec![
            StepValue::Null,
            StepValue::Null,
            StepValue::refs([marker]),
            document.into(),
        ],
    );

    marker
}
