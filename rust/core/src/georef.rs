// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Georeferencing Support
//!
//! Reads IfcMapConversion and IfcProjectedCRS (IFC4 and later) so marker
//! placements can be reported in map coordinates.

use crate::decoder::{DecodedEntity, EntityDecoder};
use crate::error::Result;
use crate::schema::IfcType;

/// Georeferencing information extracted from IFC model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoReference {
    /// CRS name (e.g., "EPSG:5110")
    pub crs_name: Option<String>,
    /// Geodetic datum (e.g., "ETRS89")
    pub geodetic_datum: Option<String>,
    /// Map projection (e.g., "Transverse Mercator")
    pub map_projection: Option<String>,
    /// Map zone (e.g., "10")
    pub map_zone: Option<String>,
    /// False easting (X offset to map CRS)
    pub eastings: f64,
    /// False northing (Y offset to map CRS)
    pub northings: f64,
    /// Orthogonal height (Z offset)
    pub orthogonal_height: f64,
    /// X-axis abscissa (cos of rotation angle)
    pub x_axis_abscissa: f64,
    /// X-axis ordinate (sin of rotation angle)
    pub x_axis_ordinate: f64,
    /// Scale factor (default 1.0)
    pub scale: f64,
}

impl Default for GeoReference {
    fn default() -> Self {
        Self {
            crs_name: None,
            geodetic_datum: None,
            map_projection: None,
            map_zone: None,
            eastings: 0.0,
            northings: 0.0,
            orthogonal_height: 0.0,
            x_axis_abscissa: 1.0,
            x_axis_ordinate: 0.0,
            scale: 1.0,
        }
    }
}

impl GeoReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// EPSG code parsed from a CRS name like "EPSG:5110" or "epsg 5110"
    pub fn epsg_code(&self) -> Option<u32> {
        let name = self.crs_name.as_deref()?.trim();
        let digits = name
            .get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG"))
            .map(|_| name[4..].trim_start_matches(|c: char| c == ':' || c == ' '))?;
        digits.parse().ok()
    }

    /// Transform local coordinates to map coordinates
    #[inline]
    pub fn local_to_map(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        // Abscissa/ordinate need not be normalised
        let norm = self.x_axis_abscissa.hypot(self.x_axis_ordinate);
        let (cos_r, sin_r) = if norm > f64::EPSILON {
            (self.x_axis_abscissa / norm, self.x_axis_ordinate / norm)
        } else {
            (1.0, 0.0)
        };
        let s = self.scale;

        let e = s * (cos_r * x - sin_r * y) + self.eastings;
        let n = s * (sin_r * x + cos_r * y) + self.northings;
        let h = z + self.orthogonal_height;

        (e, n, h)
    }
}

/// Extract georeferencing from IFC content
pub struct GeoRefExtractor;

impl GeoRefExtractor {
    /// Extract georeferencing from the first IfcMapConversion and its target CRS
    pub fn extract(decoder: &mut EntityDecoder) -> Result<Option<GeoReference>> {
        let conversions = decoder.entities_of_type(IfcType::IfcMapConversion)?;
        let Some(conversion) = conversions.first() else {
            return Ok(None);
        };

        let mut georef = GeoReference::new();
        Self::parse_map_conversion(conversion, &mut georef);

        // TargetCRS (index 1), falling back to any IfcProjectedCRS in the file
        let crs = match conversion.get_ref(1) {
            Some(id) => Some(decoder.decode_by_id(id)?),
            None => decoder
                .entities_of_type(IfcType::IfcProjectedCRS)?
                .into_iter()
                .next(),
        };
        if let Some(crs) = crs.filter(|c| c.ifc_type == IfcType::IfcProjectedCRS) {
            Self::parse_projected_crs(&crs, &mut georef);
        }

        Ok(Some(georef))
    }

    /// IfcMapConversion: SourceCRS, TargetCRS, Eastings, Northings,
    /// OrthogonalHeight, XAxisAbscissa, XAxisOrdinate, Scale[, ScaleY, ScaleZ]
    fn parse_map_conversion(entity: &DecodedEntity, georef: &mut GeoReference) {
        if let Some(e) = entity.get_float(2) {
            georef.eastings = e;
        }
        if let Some(n) = entity.get_float(3) {
            georef.northings = n;
        }
        if let Some(h) = entity.get_float(4) {
            georef.orthogonal_height = h;
        }
        if let Some(xa) = entity.get_float(5) {
            georef.x_axis_abscissa = xa;
        }
        if let Some(xo) = entity.get_float(6) {
            georef.x_axis_ordinate = xo;
        }
        if let Some(s) = entity.get_float(7) {
            georef.scale = s;
        }
    }

    /// IfcProjectedCRS: Name, Description, GeodeticDatum, VerticalDatum,
    /// MapProjection, MapZone, MapUnit
    fn parse_projected_crs(entity: &DecodedEntity, georef: &mut GeoReference) {
        georef.crs_name = entity.get_string(0).map(str::to_string);
        georef.geodetic_datum = entity.get_string(2).map(str::to_string);
        georef.map_projection = entity.get_string(4).map(str::to_string);
        georef.map_zone = entity.get_string(5).map(str::to_string);
    }
}
