// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction for IFC files
//!
//! Follows IFCPROJECT → IFCUNITASSIGNMENT → IFCSIUNIT and reports which SI
//! units a model declares.

use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::schema::IfcType;

/// SI Prefix multipliers as defined in IFC specification
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3,
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0,
    }
}

/// One IFCSIUNIT from the project's unit assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SiUnit {
    /// e.g. "LENGTHUNIT"
    pub unit_type: String,
    /// e.g. Some("MILLI")
    pub prefix: Option<String>,
    /// e.g. "METRE"
    pub name: String,
}

impl SiUnit {
    pub fn scale(&self) -> f64 {
        self.prefix
            .as_deref()
            .map(get_si_prefix_multiplier)
            .unwrap_or(1.0)
    }
}

/// SI units assigned to a project (UnitsInContext, attribute 8 of IFCPROJECT)
pub fn extract_si_units(decoder: &mut EntityDecoder, project_id: u32) -> Result<Vec<SiUnit>> {
    let project = decoder.decode_by_id(project_id)?;
    if project.ifc_type != IfcType::IfcProject {
        return Ok(Vec::new());
    }

    let Some(units_ref) = project.get_ref(8) else {
        return Ok(Vec::new());
    };
    let assignment = decoder.decode_by_id(units_ref)?;
    if assignment.ifc_type != IfcType::IfcUnitAssignment {
        return Ok(Vec::new());
    }

    let mut units = Vec::new();
    for unit_ref in assignment.get_ref_list(0) {
        let unit = match decoder.decode_by_id(unit_ref) {
            Ok(entity) => entity,
            Err(_) => continue,
        };
        if unit.ifc_type != IfcType::IfcSIUnit {
            continue; // IfcConversionBasedUnit etc.
        }

        // Dimensions (*), UnitType, Prefix, Name
        let (Some(unit_type), Some(name)) = (
            unit.get(1).and_then(|v| v.as_enum()),
            unit.get(3).and_then(|v| v.as_enum()),
        ) else {
            continue;
        };
        units.push(SiUnit {
            unit_type: unit_type.to_string(),
            prefix: unit.get(2).and_then(|v| v.as_enum()).map(str::to_string),
            name: name.to_string(),
        });
    }

    Ok(units)
}

/// Extract length unit scale factor (1.0 for metres, 0.001 for millimetres)
pub fn extract_length_unit_scale(decoder: &mut EntityDecoder, project_id: u32) -> Result<f64> {
    Ok(extract_si_units(decoder, project_id)?
        .iter()
        .find(|u| u.unit_type == "LENGTHUNIT")
        .map(SiUnit::scale)
        .unwrap_or(1.0))
}
