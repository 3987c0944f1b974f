// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Marker appearance

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default marker edge length / diameter in metres
pub const DEFAULT_MARKER_SIZE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    /// Extruded square centred on the placement
    #[default]
    Cube,
    /// CSG sphere centred on the placement
    Sphere,
}

impl FromStr for MarkerShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cube" | "box" => Ok(MarkerShape::Cube),
            "sphere" | "ball" => Ok(MarkerShape::Sphere),
            other => Err(format!("unknown marker shape '{}' (expected cube or sphere)", other)),
        }
    }
}

impl fmt::Display for MarkerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerShape::Cube => write!(f, "cube"),
            MarkerShape::Sphere => write!(f, "sphere"),
        }
    }
}

/// Surface colour, components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const RED: Rgb = Rgb { r: 1.0, g: 0.0, b: 0.0 };

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Rgb {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::RED
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Named colour or `#rrggbb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let channel = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
            };
            return match (hex.len(), channel(0), channel(2), channel(4)) {
                (6, Some(r), Some(g), Some(b)) => Ok(Rgb::from_bytes(r, g, b)),
                _ => Err(format!("invalid hex colour '{}'", s)),
            };
        }
        let (r, g, b) = match s.to_ascii_lowercase().as_str() {
            "red" => (255, 0, 0),
            "green" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "yellow" => (255, 255, 0),
            "orange" => (255, 165, 0),
            "magenta" => (255, 0, 255),
            "cyan" => (0, 255, 255),
            "white" => (255, 255, 255),
            "black" => (0, 0, 0),
            other => return Err(format!("unknown colour '{}'", other)),
        };
        Ok(Rgb::from_bytes(r, g, b))
    }
}

/// Shape, size and colour shared by all markers of one export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub shape: MarkerShape,
    /// Cube edge length or sphere diameter, metres
    pub size: f64,
    pub colour: Rgb,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Cube,
            size: DEFAULT_MARKER_SIZE,
            colour: Rgb::RED,
        }
    }
}

impl MarkerStyle {
    pub fn is_valid(&self) -> bool {
        self.size.is_finite() && self.size > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!("Sphere".parse::<MarkerShape>(), Ok(MarkerShape::Sphere));
        assert_eq!(" cube ".parse::<MarkerShape>(), Ok(MarkerShape::Cube));
        assert!("cone".parse::<MarkerShape>().is_err());
    }

    #[test]
    fn test_parse_colour() {
        assert_eq!("red".parse::<Rgb>(), Ok(Rgb::RED));
        let c: Rgb = "#00ff80".parse().unwrap();
        assert_eq!((c.r, c.g), (0.0, 1.0));
        assert!((c.b - 128.0 / 255.0).abs() < 1e-12);
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("mauve".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_style_validity() {
        assert!(MarkerStyle::default().is_valid());
        let flat = MarkerStyle {
            size: 0.0,
            ..Default::default()
        };
        assert!(!flat.is_valid());
    }
}
