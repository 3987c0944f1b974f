// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate reference systems and WGS84 reprojection
//!
//! Projection math comes from `proj4rs`, with definitions resolved by EPSG
//! code. The registry here only describes the supported targets for
//! `IfcProjectedCRS` and listings. ETRS89 and SWEREF99 are treated as
//! identical to WGS84 (null datum shift). Output is always easting first,
//! whatever axis order the EPSG definition declares.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReprojectionError, Result};

/// Geographic WGS84, the only supported source CRS
pub const WGS84_EPSG: u32 = 4326;

/// Default target: ETRS89 / NTM zone 10
pub const DEFAULT_TARGET_EPSG: u32 = 5110;

/// Largest allowed distance from the central meridian for Transverse Mercator
const MAX_TM_DELTA_LON: f64 = 60.0;

/// Web Mercator latitude limit
const MAX_WEB_MERCATOR_LAT: f64 = 85.06;

/// Projected coordinates beyond this are treated as a failed transformation
const MAX_PROJECTED_COORD: f64 = 1e10;

/// Axis order declared by the EPSG definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    EastingNorthing,
    NorthingEasting,
}

/// Description of a projected CRS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsInfo {
    pub epsg: u32,
    /// e.g. "ETRS89 / NTM zone 10"
    pub name: String,
    /// e.g. "ETRS89"
    pub geodetic_datum: String,
    /// e.g. "Transverse Mercator"
    pub projection: String,
    /// e.g. "10" or "32N"
    pub zone: Option<String>,
    /// Central meridian of Transverse Mercator targets, in degrees
    pub central_meridian: Option<f64>,
    /// IFC unit name of the map unit
    pub map_unit: String,
    pub declared_axis_order: AxisOrder,
    /// Whether the target transforms heights (no built-in target does)
    pub is_3d: bool,
}

impl CrsInfo {
    /// Identifier used for IfcProjectedCRS.Name
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

/// A target CRS reachable from WGS84 geographic coordinates
pub trait CrsTransform: Send + Sync {
    fn info(&self) -> &CrsInfo;

    /// (lon, lat, height) in WGS84 degrees to (easting, northing, height)
    fn forward(&self, lon: f64, lat: f64, z: f64) -> Result<(f64, f64, f64)>;

    /// (easting, northing, height) back to (lon, lat, height)
    fn inverse(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64)>;
}

/// A registered projected CRS backed by `proj4rs`
#[derive(Debug, Clone)]
pub struct ProjectedCrs {
    info: CrsInfo,
    geographic: Proj,
    projected: Proj,
}

impl ProjectedCrs {
    fn resolve(info: CrsInfo) -> Result<Self> {
        let epsg = info.epsg;
        let code = u16::try_from(epsg).map_err(|_| ReprojectionError::UnsupportedCrs(epsg))?;
        let definition = |code: u16| {
            Proj::from_epsg_code(code).map_err(|e| ReprojectionError::Definition {
                epsg: code as u32,
                reason: e.to_string(),
            })
        };
        Ok(Self {
            geographic: definition(WGS84_EPSG as u16)?,
            projected: definition(code)?,
            info,
        })
    }

    fn out_of_domain(&self, reason: String) -> ReprojectionError {
        ReprojectionError::OutOfDomain {
            epsg: self.info.epsg,
            reason,
        }
    }

    fn check_input(&self, lon: f64, lat: f64) -> Result<()> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(self.out_of_domain(format!("non-finite input ({}, {})", lon, lat)));
        }
        if lat.abs() > 90.0 {
            return Err(self.out_of_domain(format!("latitude {} outside [-90, 90]", lat)));
        }
        if lon.abs() > 180.0 {
            return Err(self.out_of_domain(format!("longitude {} outside [-180, 180]", lon)));
        }
        if let Some(lon0) = self.info.central_meridian {
            let delta = (lon - lon0 + 540.0).rem_euclid(360.0) - 180.0;
            if delta.abs() > MAX_TM_DELTA_LON {
                return Err(self.out_of_domain(format!(
                    "longitude {} is {:.1}° from the central meridian {}",
                    lon,
                    delta.abs(),
                    lon0
                )));
            }
        }
        if self.info.epsg == 3857 && lat.abs() > MAX_WEB_MERCATOR_LAT {
            return Err(self.out_of_domain(format!(
                "latitude {} beyond ±{}",
                lat, MAX_WEB_MERCATOR_LAT
            )));
        }
        Ok(())
    }

    fn check_output(&self, x: f64, y: f64) -> Result<()> {
        if !x.is_finite()
            || !y.is_finite()
            || x.abs() > MAX_PROJECTED_COORD
            || y.abs() > MAX_PROJECTED_COORD
        {
            return Err(ReprojectionError::SuspiciousOutput {
                epsg: self.info.epsg,
                x,
                y,
            });
        }
        Ok(())
    }
}

impl CrsTransform for ProjectedCrs {
    fn info(&self) -> &CrsInfo {
        &self.info
    }

    fn forward(&self, lon: f64, lat: f64, z: f64) -> Result<(f64, f64, f64)> {
        self.check_input(lon, lat)?;
        // proj4rs works in radians for geographic CRSs
        let mut point = (lon.to_radians(), lat.to_radians(), z);
        transform(&self.geographic, &self.projected, &mut point)
            .map_err(|e| self.out_of_domain(e.to_string()))?;
        self.check_output(point.0, point.1)?;
        Ok(point)
    }

    fn inverse(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64)> {
        self.check_output(x, y)?;
        let mut point = (x, y, z);
        transform(&self.projected, &self.geographic, &mut point)
            .map_err(|e| self.out_of_domain(e.to_string()))?;
        Ok((point.0.to_degrees(), point.1.to_degrees(), point.2))
    }
}

fn info(
    epsg: u32,
    name: String,
    datum: &str,
    projection: &str,
    zone: Option<String>,
    central_meridian: Option<f64>,
    axis: AxisOrder,
) -> CrsInfo {
    CrsInfo {
        epsg,
        name,
        geodetic_datum: datum.to_string(),
        projection: projection.to_string(),
        zone,
        central_meridian,
        map_unit: "METRE".to_string(),
        declared_axis_order: axis,
        is_3d: false,
    }
}

fn utm_meridian(zone: u32) -> Option<f64> {
    Some(zone as f64 * 6.0 - 183.0)
}

/// Look up a supported projected CRS
pub fn lookup(epsg: u32) -> Result<ProjectedCrs> {
    use AxisOrder::*;
    const TM: &str = "Transverse Mercator";

    let info = match epsg {
        3857 => info(
            epsg,
            "WGS 84 / Pseudo-Mercator".into(),
            "WGS84",
            "Popular Visualisation Pseudo Mercator",
            None,
            None,
            EastingNorthing,
        ),
        32601..=32660 | 32701..=32760 => {
            let south = epsg > 32700;
            let zone = epsg % 100;
            let hemi = if south { 'S' } else { 'N' };
            info(
                epsg,
                format!("WGS 84 / UTM zone {}{}", zone, hemi),
                "WGS84",
                TM,
                Some(format!("{}{}", zone, hemi)),
                utm_meridian(zone),
                EastingNorthing,
            )
        }
        25828..=25838 => {
            let zone = epsg - 25800;
            info(
                epsg,
                format!("ETRS89 / UTM zone {}N", zone),
                "ETRS89",
                TM,
                Some(format!("{}N", zone)),
                utm_meridian(zone),
                EastingNorthing,
            )
        }
        5105..=5130 => {
            let zone = epsg - 5100;
            info(
                epsg,
                format!("ETRS89 / NTM zone {}", zone),
                "ETRS89",
                TM,
                Some(zone.to_string()),
                Some(zone as f64 + 0.5),
                NorthingEasting,
            )
        }
        3006 => info(
            epsg,
            "SWEREF99 TM".into(),
            "SWEREF99",
            TM,
            None,
            Some(15.0),
            NorthingEasting,
        ),
        _ => return Err(ReprojectionError::UnsupportedCrs(epsg)),
    };
    ProjectedCrs::resolve(info)
}

/// Ranges of supported target codes, for listings
pub fn supported_ranges() -> &'static [(u32, u32, &'static str)] {
    &[
        (3006, 3006, "SWEREF99 TM"),
        (3857, 3857, "WGS 84 / Pseudo-Mercator"),
        (5105, 5130, "ETRS89 / NTM zones 5-30"),
        (25828, 25838, "ETRS89 / UTM zones 28N-38N"),
        (32601, 32660, "WGS 84 / UTM zones 1N-60N"),
        (32701, 32760, "WGS 84 / UTM zones 1S-60S"),
    ]
}

/// WGS84 to one target CRS, resolved once per batch
pub struct Transformer {
    target: Box<dyn CrsTransform>,
}

impl Transformer {
    /// Resolve a source/target pair; the source must be EPSG:4326
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg != WGS84_EPSG {
            return Err(ReprojectionError::UnsupportedSource(source_epsg));
        }
        let target = lookup(target_epsg)?;
        debug!(
            source = source_epsg,
            target = target_epsg,
            name = %target.info().name,
            "Resolved CRS"
        );
        Ok(Self {
            target: Box::new(target),
        })
    }

    /// Use an externally supplied target implementation
    pub fn with_target(target: Box<dyn CrsTransform>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &CrsInfo {
        self.target.info()
    }

    /// Transform one point. Elevation passes through for 2D targets.
    pub fn transform(
        &self,
        lon: f64,
        lat: f64,
        elevation: Option<f64>,
    ) -> Result<(f64, f64, Option<f64>)> {
        let (x, y, z) = self.target.forward(lon, lat, elevation.unwrap_or(0.0))?;
        let z = match (elevation, self.target.info().is_3d) {
            (None, _) => None,
            (Some(_), true) => Some(z),
            (Some(e), false) => Some(e),
        };
        Ok((x, y, z))
    }

    pub fn inverse(&self, x: f64, y: f64, z: f64) -> Result<(f64, f64, f64)> {
        self.target.inverse(x, y, z)
    }
}

/// Reproject a single WGS84 point
pub fn reproject(
    lon: f64,
    lat: f64,
    elevation: f64,
    source_epsg: u32,
    target_epsg: u32,
) -> Result<(f64, f64, f64)> {
    let transformer = Transformer::new(source_epsg, target_epsg)?;
    let (x, y, z) = transformer.transform(lon, lat, Some(elevation))?;
    Ok((x, y, z.unwrap_or(elevation)))
}
