//! Fixed-point node locations.
//!
//! Longitude/latitude are stored as `i32`s scaled by 1e7, matching
//! osmium::Location's internal representation. `Location::UNDEFINED`
//! plays the role of that type's "invalid" sentinel.

use crate::errors::InputError;

/// Node identifiers are signed 64-bit integers. The node cache's dense
/// encoding requires |id| < 2^42.
pub type Identifier = i64;

/// 2^42, the largest absolute node id the dense cache encoding can address.
pub const MAX_ABS_ID: i64 = 1i64 << 42;

/// Fails loudly with `InputError::IdTooLarge` if `id` is out of range.
pub fn check_id(id: Identifier) -> Result<(), InputError> {
    if id >= MAX_ABS_ID || id <= -MAX_ABS_ID {
        return Err(InputError::IdTooLarge(id));
    }
    Ok(())
}

/// A longitude/latitude pair, fixed-point at 1e7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    lon_e7: i32,
    lat_e7: i32,
}

impl Location {
    /// The sentinel used to mean "no location" — distinguishable from any
    /// valid coordinate because both fields sit outside the valid range.
    pub const UNDEFINED: Location = Location {
        lon_e7: i32::MIN,
        lat_e7: i32::MIN,
    };

    pub fn new(lon_e7: i32, lat_e7: i32) -> Location {
        Location { lon_e7, lat_e7 }
    }

    pub fn from_degrees(lon: f64, lat: f64) -> Location {
        Location {
            lon_e7: (lon * 1e7).round() as i32,
            lat_e7: (lat * 1e7).round() as i32,
        }
    }

    pub fn is_defined(&self) -> bool {
        *self != Location::UNDEFINED
    }

    pub fn x(&self) -> i32 {
        self.lon_e7
    }

    pub fn y(&self) -> i32 {
        self.lat_e7
    }

    pub fn lon(&self) -> f64 {
        f64::from(self.lon_e7) / 1e7
    }

    pub fn lat(&self) -> f64 {
        f64::from(self.lat_e7) / 1e7
    }
}

impl Default for Location {
    fn default() -> Location {
        Location::UNDEFINED
    }
}

/// Lexicographic order by (x, then y) — used to normalize segment endpoints.
impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.lon_e7, self.lat_e7).cmp(&(other.lon_e7, other.lat_e7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_not_defined() {
        assert!(!Location::UNDEFINED.is_defined());
        assert!(Location::new(0, 0).is_defined());
    }

    #[test]
    fn id_bound_is_exclusive_at_2_42() {
        assert!(check_id(MAX_ABS_ID - 1).is_ok());
        assert_eq!(check_id(MAX_ABS_ID), Err(InputError::IdTooLarge(MAX_ABS_ID)));
        assert_eq!(check_id(-MAX_ABS_ID), Err(InputError::IdTooLarge(-MAX_ABS_ID)));
    }

    #[test]
    fn ordering_is_lexicographic_x_then_y() {
        let a = Location::new(0, 5);
        let b = Location::new(0, 10);
        let c = Location::new(1, 0);
        assert!(a < b);
        assert!(b < c);
    }
}
