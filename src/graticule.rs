//! One-degree grid cells ("graticules").
//!
//! A [`GridCell`] is identified by the integer magnitude of its latitude and
//! longitude plus a hemisphere flag for each axis. The flags are stored
//! separately from the magnitudes because the cells touching the equator and
//! the prime meridian exist twice: `0` and `-0` are different cells.
//!
//! ```text
//!   47.6, -122.3   →  cell 47 -122   (north, west)
//!   -0.4,    5.9   →  cell -0 5      (south, east)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longitude magnitude (degrees west) from which the date-shift rule applies.
pub const DATE_SHIFT_MIN_WEST_LONGITUDE: u8 = 30;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraticuleError {
    #[error("latitude degrees must be 0-89, got {0}")]
    LatitudeOutOfRange(f64),
    #[error("longitude degrees must be 0-179, got {0}")]
    LongitudeOutOfRange(f64),
    #[error("coordinate is not a finite number")]
    NonFiniteCoordinate,
}

/// An immutable one-degree geographic grid reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGridCell", into = "RawGridCell")]
pub struct GridCell {
    latitude: u8,
    south: bool,
    longitude: u8,
    west: bool,
}

impl GridCell {
    /// Build a cell from degree magnitudes and hemisphere flags.
    pub fn new(
        latitude: u8,
        south: bool,
        longitude: u8,
        west: bool,
    ) -> Result<Self, GraticuleError> {
        if latitude > 89 {
            return Err(GraticuleError::LatitudeOutOfRange(latitude as f64));
        }
        if longitude > 179 {
            return Err(GraticuleError::LongitudeOutOfRange(longitude as f64));
        }
        Ok(Self {
            latitude,
            south,
            longitude,
            west,
        })
    }

    /// The cell containing the given location.
    ///
    /// Degrees are the truncated magnitudes; the hemisphere follows the sign
    /// of the coordinate, so `-0.4` lands in the `-0` cell.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Result<Self, GraticuleError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GraticuleError::NonFiniteCoordinate);
        }
        if latitude.abs() >= 90.0 {
            return Err(GraticuleError::LatitudeOutOfRange(latitude));
        }
        if longitude.abs() >= 180.0 {
            return Err(GraticuleError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude: latitude.abs().trunc() as u8,
            south: latitude.is_sign_negative(),
            longitude: longitude.abs().trunc() as u8,
            west: longitude.is_sign_negative(),
        })
    }

    pub fn latitude(&self) -> u8 {
        self.latitude
    }

    pub fn longitude(&self) -> u8 {
        self.longitude
    }

    pub fn is_south(&self) -> bool {
        self.south
    }

    pub fn is_west(&self) -> bool {
        self.west
    }

    /// Whether this cell lies in the western range affected by the
    /// date-shift ("30W") rule: 30°W through 180°W.
    pub fn uses_date_shift_rule(&self) -> bool {
        self.west && self.longitude >= DATE_SHIFT_MIN_WEST_LONGITUDE
    }

    /// Signed latitude text, keeping `-0` distinct from `0`.
    pub fn latitude_string(&self) -> String {
        signed_degrees(self.latitude, self.south)
    }

    /// Signed longitude text, keeping `-0` distinct from `0`.
    pub fn longitude_string(&self) -> String {
        signed_degrees(self.longitude, self.west)
    }

    /// Apply this cell's offset and hemisphere to a latitude fraction.
    pub(crate) fn offset_latitude(&self, fraction: f64) -> f64 {
        apply_sign(self.latitude as f64 + fraction, self.south)
    }

    /// Apply this cell's offset and hemisphere to a longitude fraction.
    pub(crate) fn offset_longitude(&self, fraction: f64) -> f64 {
        apply_sign(self.longitude as f64 + fraction, self.west)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.latitude_string(), self.longitude_string())
    }
}

fn signed_degrees(degrees: u8, negative: bool) -> String {
    if negative {
        format!("-{degrees}")
    } else {
        degrees.to_string()
    }
}

fn apply_sign(magnitude: f64, negative: bool) -> f64 {
    if negative { -magnitude } else { magnitude }
}

/// Wire form of a [`GridCell`]; validated on the way back in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawGridCell {
    latitude: u8,
    south: bool,
    longitude: u8,
    west: bool,
}

impl TryFrom<RawGridCell> for GridCell {
    type Error = GraticuleError;

    fn try_from(raw: RawGridCell) -> Result<Self, Self::Error> {
        GridCell::new(raw.latitude, raw.south, raw.longitude, raw.west)
    }
}

impl From<GridCell> for RawGridCell {
    fn from(cell: GridCell) -> Self {
        Self {
            latitude: cell.latitude,
            south: cell.south,
            longitude: cell.longitude,
            west: cell.west,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_degrees() {
        assert!(matches!(
            GridCell::new(90, false, 0, false),
            Err(GraticuleError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            GridCell::new(0, false, 180, true),
            Err(GraticuleError::LongitudeOutOfRange(_))
        ));
        assert!(GridCell::new(89, true, 179, true).is_ok());
    }

    #[test]
    fn from_coordinates_truncates_toward_zero() {
        let cell = GridCell::from_coordinates(47.61, -122.33).unwrap();
        assert_eq!(cell.latitude(), 47);
        assert_eq!(cell.longitude(), 122);
        assert!(!cell.is_south());
        assert!(cell.is_west());
    }

    #[test]
    fn from_coordinates_keeps_negative_zero_cells() {
        let cell = GridCell::from_coordinates(-0.4, -0.9).unwrap();
        assert_eq!(cell.latitude(), 0);
        assert!(cell.is_south());
        assert!(cell.is_west());
        assert_eq!(cell.to_string(), "-0 -0");
    }

    #[test]
    fn from_coordinates_rejects_poles_and_nan() {
        assert!(GridCell::from_coordinates(90.0, 0.0).is_err());
        assert!(GridCell::from_coordinates(0.0, -180.0).is_err());
        assert_eq!(
            GridCell::from_coordinates(f64::NAN, 0.0),
            Err(GraticuleError::NonFiniteCoordinate)
        );
    }

    // =========================================================================
    // Date-shift rule
    // =========================================================================

    #[test]
    fn date_shift_applies_from_30_west() {
        assert!(GridCell::new(47, false, 30, true).unwrap().uses_date_shift_rule());
        assert!(GridCell::new(47, false, 122, true).unwrap().uses_date_shift_rule());
        assert!(GridCell::new(47, false, 179, true).unwrap().uses_date_shift_rule());
    }

    #[test]
    fn date_shift_skips_east_and_near_west() {
        assert!(!GridCell::new(47, false, 29, true).unwrap().uses_date_shift_rule());
        assert!(!GridCell::new(47, false, 0, true).unwrap().uses_date_shift_rule());
        assert!(!GridCell::new(47, false, 122, false).unwrap().uses_date_shift_rule());
    }

    #[test]
    fn display_is_signed_pair() {
        let cell = GridCell::new(47, false, 122, true).unwrap();
        assert_eq!(cell.to_string(), "47 -122");
        assert_eq!(cell.latitude_string(), "47");
        assert_eq!(cell.longitude_string(), "-122");
    }

    #[test]
    fn deserialize_validates_ranges() {
        let ok: GridCell =
            serde_json::from_str(r#"{"latitude":47,"south":false,"longitude":122,"west":true}"#)
                .unwrap();
        assert_eq!(ok, GridCell::new(47, false, 122, true).unwrap());

        let bad = serde_json::from_str::<GridCell>(
            r#"{"latitude":95,"south":false,"longitude":122,"west":true}"#,
        );
        assert!(bad.is_err());
    }
}
