// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema-specific entity layouts
//!
//! Everything that differs between IFC2x3 and IFC4/IFC4.3 goes through
//! [`SchemaDialect`]; the exporter itself is schema-agnostic.

use geomark_core::SchemaVersion;
use geomark_geo::CrsInfo;

use crate::builder::ModelBuilder;
use crate::error::{ExportError, Result};
use crate::marker::Rgb;
use crate::step::{EntityId, StepValue};

/// Entities of the marker proxy that depend on the schema
pub struct ProxySpec<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub placement: EntityId,
    pub representation: EntityId,
}

/// Schema-specific construction
pub trait SchemaDialect: Send + Sync {
    fn schema(&self) -> SchemaVersion;

    /// IfcOwnerHistory with a creation date in Unix seconds. The layout is
    /// shared; IFC2x3 requires the ChangeAction that IFC4 makes optional.
    fn owner_history(
        &self,
        b: &mut ModelBuilder,
        owning_user: EntityId,
        application: EntityId,
        creation_date: i64,
    ) -> EntityId {
        b.create(
            "IFCOWNERHISTORY",
            vec![
                owning_user.into(),
                application.into(),
                StepValue::Enum("READWRITE"),
                StepValue::Enum("ADDED"),
                StepValue::Null,
                StepValue::Null,
                StepValue::Null,
                StepValue::Integer(creation_date),
            ],
        )
    }

    /// IfcBuildingElementProxy for one marker
    fn marker_proxy(&self, b: &mut ModelBuilder, proxy: &ProxySpec<'_>) -> EntityId;

    /// IfcDocumentReference pointing at the image
    fn document_reference(
        &self,
        b: &mut ModelBuilder,
        location: &str,
        name: &str,
        description: Option<&str>,
    ) -> EntityId;

    /// Styles list for IfcStyledItem carrying a shaded surface colour
    fn surface_styles(&self, b: &mut ModelBuilder, name: &str, colour: Rgb) -> StepValue;

    /// Whether the model carries georeferencing: CRS entities and the site's
    /// reference location
    fn georeferenced(&self) -> bool;

    /// Declare the target CRS. `context` is the model representation context,
    /// `site` the site, `length_unit` the metre IfcSIUnit.
    fn georeference(
        &self,
        b: &mut ModelBuilder,
        crs: &CrsInfo,
        context: EntityId,
        site: EntityId,
        length_unit: EntityId,
    );
}

/// Pick the dialect for a schema
pub fn dialect_for(schema: SchemaVersion) -> Result<Box<dyn SchemaDialect>> {
    match schema {
        SchemaVersion::Ifc2x3 => Ok(Box::new(Ifc2x3Dialect)),
        SchemaVersion::Ifc4 | SchemaVersion::Ifc4x3 => Ok(Box::new(Ifc4Dialect { schema })),
    }
}

/// Shared IfcColourRgb + IfcSurfaceStyleShading + IfcSurfaceStyle prefix
fn surface_style(b: &mut ModelBuilder, name: &str, colour: Rgb, ifc4: bool) -> EntityId {
    let rgb = b.create(
        "IFCCOLOURRGB",
        vec![
            StepValue::Null,
            StepValue::real(colour.r),
            StepValue::real(colour.g),
            StepValue::real(colour.b),
        ],
    );
    let mut shading = vec![rgb.into()];
    if ifc4 {
        // Transparency
        shading.push(StepValue::real(0.0));
    }
    let shading = b.create("IFCSURFACESTYLESHADING", shading);
    b.create(
        "IFCSURFACESTYLE",
        vec![
            StepValue::string(name),
            StepValue::Enum("BOTH"),
            StepValue::refs([shading]),
        ],
    )
}

/// IFC2x3: no CRS entities; styles wrapped in IfcPresentationStyleAssignment
#[derive(Debug, Clone, Copy, Default)]
pub struct Ifc2x3Dialect;

impl SchemaDialect for Ifc2x3Dialect {
    fn schema(&self) -> SchemaVersion {
        SchemaVersion::Ifc2x3
    }

    fn marker_proxy(&self, b: &mut ModelBuilder, proxy: &ProxySpec<'_>) -> EntityId {
        b.rooted(
            "IFCBUILDINGELEMENTPROXY",
            vec![
                StepValue::string(proxy.name),
                StepValue::opt_string(proxy.description),
                StepValue::string("ImageMarker"),
                proxy.placement.into(),
                proxy.representation.into(),
                StepValue::Null,
                StepValue::Enum("ELEMENT"),
            ],
        )
    }

    fn document_reference(
        &self,
        b: &mut ModelBuilder,
        location: &str,
        name: &str,
        _description: Option<&str>,
    ) -> EntityId {
        // Location, ItemReference, Name
        b.create(
            "IFCDOCUMENTREFERENCE",
            vec![
                StepValue::string(location),
                StepValue::string(name),
                StepValue::string(name),
            ],
        )
    }

    fn surface_styles(&self, b: &mut ModelBuilder, name: &str, colour: Rgb) -> StepValue {
        let style = surface_style(b, name, colour, false);
        let assignment = b.create("IFCPRESENTATIONSTYLEASSIGNMENT", vec![StepValue::refs([style])]);
        StepValue::refs([assignment])
    }

    fn georeferenced(&self) -> bool {
        false
    }

    /// IFC2x3 output is plain local coordinates without georeferencing metadata
    fn georeference(
        &self,
        _b: &mut ModelBuilder,
        _crs: &CrsInfo,
        _context: EntityId,
        _site: EntityId,
        _length_unit: EntityId,
    ) {
    }
}

/// IFC4 and IFC4.3: IfcProjectedCRS + IfcMapConversion, USERDEFINED proxies
#[derive(Debug, Clone, Copy)]
pub struct Ifc4Dialect {
    schema: SchemaVersion,
}

impl Ifc4Dialect {
    pub fn new(schema: SchemaVersion) -> Result<Self> {
        match schema {
            SchemaVersion::Ifc4 | SchemaVersion::Ifc4x3 => Ok(Self { schema }),
            other => Err(ExportError::UnsupportedSchema(other.identifier().to_string())),
        }
    }
}

impl SchemaDialect for Ifc4Dialect {
    fn schema(&self) -> SchemaVersion {
        self.schema
    }

    fn marker_proxy(&self, b: &mut ModelBuilder, proxy: &ProxySpec<'_>) -> EntityId {
        b.rooted(
            "IFCBUILDINGELEMENTPROXY",
            vec![
                StepValue::string(proxy.name),
                StepValue::opt_string(proxy.description),
                StepValue::string("ImageMarker"),
                proxy.placement.into(),
                proxy.representation.into(),
                StepValue::Null,
                StepValue::Enum("USERDEFINED"),
            ],
        )
    }

    fn document_reference(
        &self,
        b: &mut ModelBuilder,
        location: &str,
        name: &str,
        description: Option<&str>,
    ) -> EntityId {
        // Location, Identification, Name, Description, ReferencedDocument
        b.create(
            "IFCDOCUMENTREFERENCE",
            vec![
                StepValue::string(location),
                StepValue::string(name),
                StepValue::string(name),
                StepValue::opt_string(description),
                StepValue::Null,
            ],
        )
    }

    fn surface_styles(&self, b: &mut ModelBuilder, name: &str, colour: Rgb) -> StepValue {
        let style = surface_style(b, name, colour, true);
        StepValue::refs([style])
    }

    fn georeferenced(&self) -> bool {
        true
    }

    fn georeference(
        &self,
        b: &mut ModelBuilder,
        crs: &CrsInfo,
        context: EntityId,
        _site: EntityId,
        length_unit: EntityId,
    ) {
        let projected = b.create(
            "IFCPROJECTEDCRS",
            vec![
                StepValue::string(crs.identifier()),
                StepValue::string(&crs.name),
                StepValue::string(&crs.geodetic_datum),
                StepValue::Null,
                StepValue::string(&crs.projection),
                StepValue::opt_string(crs.zone.as_deref()),
                length_unit.into(),
            ],
        );

        // Marker coordinates are already map coordinates: identity conversion
        let mut conversion = vec![
            context.into(),
            projected.into(),
            StepValue::real(0.0),
            StepValue::real(0.0),
            StepValue::real(0.0),
            StepValue::real(1.0),
            StepValue::real(0.0),
            StepValue::real(1.0),
        ];
        if self.schema == SchemaVersion::Ifc4x3 {
            // ScaleY, ScaleZ
            conversion.extend([StepValue::Null, StepValue::Null]);
        }
        b.create("IFCMAPCONVERSION", conversion);
    }
}
