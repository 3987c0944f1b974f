// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison. Only the
//! entities that occur in a marker model are named; everything else is kept
//! as [`IfcType::Unknown`].

use std::fmt;

/// Schema versions that can be written and validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchemaVersion {
    #[cfg_attr(feature = "serde", serde(rename = "IFC2X3", alias = "IFC2x3"))]
    Ifc2x3,
    #[cfg_attr(feature = "serde", serde(rename = "IFC4"))]
    Ifc4,
    #[cfg_attr(feature = "serde", serde(rename = "IFC4X3", alias = "IFC4X3_ADD2", alias = "IFC4x3"))]
    Ifc4x3,
}

impl SchemaVersion {
    /// FILE_SCHEMA identifier written to the header
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Ifc2x3 => "IFC2X3",
            Self::Ifc4 => "IFC4",
            Self::Ifc4x3 => "IFC4X3_ADD2",
        }
    }

    /// Recognise a FILE_SCHEMA identifier (IFC4X3, IFC4X3_TC1, IFC4X3_ADD2, ...)
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let id = identifier.trim().to_ascii_uppercase();
        if id.starts_with("IFC2X3") {
            Some(Self::Ifc2x3)
        } else if id.starts_with("IFC4X3") {
            Some(Self::Ifc4x3)
        } else if id.starts_with("IFC4") {
            Some(Self::Ifc4)
        } else {
            None
        }
    }

    /// IFC4 and later carry IfcProjectedCRS / IfcMapConversion
    pub fn supports_map_conversion(&self) -> bool {
        !matches!(self, Self::Ifc2x3)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// IFC Entity Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Spatial structure
    IfcProject,
    IfcSite,
    IfcBuilding,
    IfcBuildingStorey,

    // Elements
    IfcBuildingElementProxy,

    // Relationships
    IfcRelAggregates,
    IfcRelContainedInSpatialStructure,
    IfcRelDefinesByProperties,
    IfcRelAssociatesDocument,

    // Properties and documents
    IfcPropertySet,
    IfcPropertySingleValue,
    IfcDocumentReference,

    // Context and units
    IfcGeometricRepresentationContext,
    IfcGeometricRepresentationSubContext,
    IfcUnitAssignment,
    IfcSIUnit,
    IfcConversionBasedUnit,

    // Georeferencing
    IfcProjectedCRS,
    IfcMapConversion,

    // Geometry
    IfcShapeRepresentation,
    IfcProductDefinitionShape,
    IfcExtrudedAreaSolid,
    IfcRectangleProfileDef,
    IfcCsgSolid,
    IfcSphere,
    IfcAxis2Placement2D,
    IfcAxis2Placement3D,
    IfcLocalPlacement,
    IfcCartesianPoint,
    IfcDirection,

    // Presentation
    IfcStyledItem,
    IfcSurfaceStyle,
    IfcSurfaceStyleShading,
    IfcPresentationStyleAssignment,
    IfcColourRgb,

    // Ownership
    IfcOwnerHistory,
    IfcPerson,
    IfcOrganization,
    IfcPersonAndOrganization,
    IfcApplication,

    // Fallback for unknown types
    Unknown(u16),
}

impl IfcType {
    /// Parse IFC type from an entity keyword (case-insensitive)
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "IFCPROJECT" => Self::IfcProject,
            "IFCSITE" => Self::IfcSite,
            "IFCBUILDING" => Self::IfcBuilding,
            "IFCBUILDINGSTOREY" => Self::IfcBuildingStorey,

            "IFCBUILDINGELEMENTPROXY" => Self::IfcBuildingElementProxy,

            "IFCRELAGGREGATES" => Self::IfcRelAggregates,
            "IFCRELCONTAINEDINSPATIALSTRUCTURE" => Self::IfcRelContainedInSpatialStructure,
            "IFCRELDEFINESBYPROPERTIES" => Self::IfcRelDefinesByProperties,
            "IFCRELASSOCIATESDOCUMENT" => Self::IfcRelAssociatesDocument,

            "IFCPROPERTYSET" => Self::IfcPropertySet,
            "IFCPROPERTYSINGLEVALUE" => Self::IfcPropertySingleValue,
            "IFCDOCUMENTREFERENCE" => Self::IfcDocumentReference,

            "IFCGEOMETRICREPRESENTATIONCONTEXT" => Self::IfcGeometricRepresentationContext,
            "IFCGEOMETRICREPRESENTATIONSUBCONTEXT" => Self::IfcGeometricRepresentationSubContext,
            "IFCUNITASSIGNMENT" => Self::IfcUnitAssignment,
            "IFCSIUNIT" => Self::IfcSIUnit,
            "IFCCONVERSIONBASEDUNIT" => Self::IfcConversionBasedUnit,

            "IFCPROJECTEDCRS" => Self::IfcProjectedCRS,
            "IFCMAPCONVERSION" => Self::IfcMapConversion,

            "IFCSHAPEREPRESENTATION" => Self::IfcShapeRepresentation,
            "IFCPRODUCTDEFINITIONSHAPE" => Self::IfcProductDefinitionShape,
            "IFCEXTRUDEDAREASOLID" => Self::IfcExtrudedAreaSolid,
            "IFCRECTANGLEPROFILEDEF" => Self::IfcRectangleProfileDef,
            "IFCCSGSOLID" => Self::IfcCsgSolid,
            "IFCSPHERE" => Self::IfcSphere,
            "IFCAXIS2PLACEMENT2D" => Self::IfcAxis2Placement2D,
            "IFCAXIS2PLACEMENT3D" => Self::IfcAxis2Placement3D,
            "IFCLOCALPLACEMENT" => Self::IfcLocalPlacement,
            "IFCCARTESIANPOINT" => Self::IfcCartesianPoint,
            "IFCDIRECTION" => Self::IfcDirection,

            "IFCSTYLEDITEM" => Self::IfcStyledItem,
            "IFCSURFACESTYLE" => Self::IfcSurfaceStyle,
            "IFCSURFACESTYLESHADING" => Self::IfcSurfaceStyleShading,
            "IFCPRESENTATIONSTYLEASSIGNMENT" => Self::IfcPresentationStyleAssignment,
            "IFCCOLOURRGB" => Self::IfcColourRgb,

            "IFCOWNERHISTORY" => Self::IfcOwnerHistory,
            "IFCPERSON" => Self::IfcPerson,
            "IFCORGANIZATION" => Self::IfcOrganization,
            "IFCPERSONANDORGANIZATION" => Self::IfcPersonAndOrganization,
            "IFCAPPLICATION" => Self::IfcApplication,

            other => Self::Unknown(simple_hash(other)),
        }
    }

    /// Get the upper-case STEP keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IfcProject => "IFCPROJECT",
            Self::IfcSite => "IFCSITE",
            Self::IfcBuilding => "IFCBUILDING",
            Self::IfcBuildingStorey => "IFCBUILDINGSTOREY",

            Self::IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",

            Self::IfcRelAggregates => "IFCRELAGGREGATES",
            Self::IfcRelContainedInSpatialStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            Self::IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
            Self::IfcRelAssociatesDocument => "IFCRELASSOCIATESDOCUMENT",

            Self::IfcPropertySet => "IFCPROPERTYSET",
            Self::IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
            Self::IfcDocumentReference => "IFCDOCUMENTREFERENCE",

            Self::IfcGeometricRepresentationContext => "IFCGEOMETRICREPRESENTATIONCONTEXT",
            Self::IfcGeometricRepresentationSubContext => "IFCGEOMETRICREPRESENTATIONSUBCONTEXT",
            Self::IfcUnitAssignment => "IFCUNITASSIGNMENT",
            Self::IfcSIUnit => "IFCSIUNIT",
            Self::IfcConversionBasedUnit => "IFCCONVERSIONBASEDUNIT",

            Self::IfcProjectedCRS => "IFCPROJECTEDCRS",
            Self::IfcMapConversion => "IFCMAPCONVERSION",

            Self::IfcShapeRepresentation => "IFCSHAPEREPRESENTATION",
            Self::IfcProductDefinitionShape => "IFCPRODUCTDEFINITIONSHAPE",
            Self::IfcExtrudedAreaSolid => "IFCEXTRUDEDAREASOLID",
            Self::IfcRectangleProfileDef => "IFCRECTANGLEPROFILEDEF",
            Self::IfcCsgSolid => "IFCCSGSOLID",
            Self::IfcSphere => "IFCSPHERE",
            Self::IfcAxis2Placement2D => "IFCAXIS2PLACEMENT2D",
            Self::IfcAxis2Placement3D => "IFCAXIS2PLACEMENT3D",
            Self::IfcLocalPlacement => "IFCLOCALPLACEMENT",
            Self::IfcCartesianPoint => "IFCCARTESIANPOINT",
            Self::IfcDirection => "IFCDIRECTION",

            Self::IfcStyledItem => "IFCSTYLEDITEM",
            Self::IfcSurfaceStyle => "IFCSURFACESTYLE",
            Self::IfcSurfaceStyleShading => "IFCSURFACESTYLESHADING",
            Self::IfcPresentationStyleAssignment => "IFCPRESENTATIONSTYLEASSIGNMENT",
            Self::IfcColourRgb => "IFCCOLOURRGB",

            Self::IfcOwnerHistory => "IFCOWNERHISTORY",
            Self::IfcPerson => "IFCPERSON",
            Self::IfcOrganization => "IFCORGANIZATION",
            Self::IfcPersonAndOrganization => "IFCPERSONANDORGANIZATION",
            Self::IfcApplication => "IFCAPPLICATION",

            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::IfcProject | Self::IfcSite | Self::IfcBuilding | Self::IfcBuildingStorey
        )
    }

    /// Check if this is a rooted entity (carries a GlobalId as attribute 0)
    pub fn is_rooted(&self) -> bool {
        self.is_spatial()
            || self.is_relationship()
            || matches!(self, Self::IfcBuildingElementProxy | Self::IfcPropertySet)
    }

    /// Check if this is a relationship
    pub fn is_relationship(&self) -> bool {
        matches!(
            self,
            Self::IfcRelAggregates
                | Self::IfcRelContainedInSpatialStructure
                | Self::IfcRelDefinesByProperties
                | Self::IfcRelAssociatesDocument
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simple hash function for unknown IFC types
fn simple_hash(s: &str) -> u16 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = ((hash << 5).wrapping_add(hash)).wrapping_add(byte as u32);
    }
    (hash & 0xFFFF) as u16
}
