// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Degrees/minutes/seconds conversion

/// Convert degrees, minutes, seconds and a hemisphere reference to decimal degrees.
///
/// `S` and `W` references (case-insensitive) negate the result; any other
/// reference leaves it positive.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: &str) -> f64 {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    if is_negative_ref(reference) {
        -value
    } else {
        value
    }
}

pub(crate) fn is_negative_ref(reference: &str) -> bool {
    matches!(reference.trim().chars().next(), Some('S' | 's' | 'W' | 'w'))
}

/// Split decimal degrees into (degrees, minutes, seconds, hemisphere)
pub fn decimal_to_dms(value: f64, is_latitude: bool) -> (u32, u32, f64, char) {
    let hemisphere = match (is_latitude, value < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    };
    let abs = value.abs();
    let degrees = abs.trunc();
    let minutes = ((abs - degrees) * 60.0).trunc();
    let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
    (degrees as u32, minutes as u32, seconds, hemisphere)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_northern_latitude() {
        assert_abs_diff_eq!(dms_to_decimal(40.0, 26.0, 46.0, "N"), 40.446111, epsilon = 1e-6);
    }

    #[test]
    fn test_south_and_west_negate() {
        assert_abs_diff_eq!(dms_to_decimal(33.0, 52.0, 4.0, "S"), -33.867778, epsilon = 1e-6);
        assert_abs_diff_eq!(dms_to_decimal(74.0, 0.0, 21.0, "w"), -74.005833, epsilon = 1e-6);
        assert_abs_diff_eq!(dms_to_decimal(10.0, 34.0, 48.4, "E"), 10.580111, epsilon = 1e-6);
    }

    #[test]
    fn test_oslo_scenario() {
        assert_abs_diff_eq!(dms_to_decimal(59.0, 54.0, 49.5, "N"), 59.91375, epsilon = 1e-6);
    }

    #[test]
    fn test_decimal_to_dms() {
        let (d, m, s, h) = decimal_to_dms(-33.867778, true);
        assert_eq!((d, m, h), (33, 52, 'S'));
        assert_abs_diff_eq!(s, 4.0, epsilon = 1e-2);
    }
}
