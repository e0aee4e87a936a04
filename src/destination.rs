//! Destination resolution: lookup dates, final coordinates, and distance.
//!
//! A day's destination is built in two halves. The integer half comes from
//! the [`GridCell`] (or, for a global draw, there is none). The fractional
//! half comes from an external random seed keyed by a *lookup date*, which
//! is not always the destination's own date:
//!
//! ```text
//! date
//!   └─► -1 day if global, or a 30W cell dated after 2008-05-26
//!         └─► Sat → Fri, Sun → Fri
//!               └─► lookup date
//! ```
//!
//! Once the fractions are known, a [`Destination`] combines them with the
//! cell and date into an immutable record.
//!
//! Global destinations use the fractions directly as a share of the whole
//! latitude/longitude range (`lat = f * 180 - 90`, `lon = f * 360 - 180`).

use crate::graticule::GridCell;
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DestinationError {
    #[error("destination has no coordinate data")]
    NoCoordinates,
    #[error("hash fraction must be in [0, 1), got {0}")]
    FractionOutOfRange(f64),
    #[error("snapshot date {year}-{month}-{day} is not a calendar date (month is 0-based)")]
    InvalidSnapshotDate { year: i32, month: u32, day: u32 },
}

/// The last day on which the date-shift rule was *not* yet in force.
///
/// Cell-bound destinations dated on or before this day never shift.
pub fn date_shift_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2008, 5, 26).expect("cutoff is a valid calendar date")
}

/// Compute the date whose seed determines a destination's fractions.
///
/// `cell == None` means a global destination, which always shifts back one
/// day. Weekends are then clamped back to the preceding Friday, since the
/// seed source only publishes on weekdays.
pub fn compute_lookup_date(date: NaiveDate, cell: Option<&GridCell>) -> NaiveDate {
    let shifted = if shifts_back(date, cell) {
        days_before(date, 1)
    } else {
        date
    };

    match shifted.weekday() {
        Weekday::Sat => days_before(shifted, 1),
        Weekday::Sun => days_before(shifted, 2),
        _ => shifted,
    }
}

fn shifts_back(date: NaiveDate, cell: Option<&GridCell>) -> bool {
    match cell {
        None => true,
        Some(cell) => date > date_shift_cutoff() && cell.uses_date_shift_rule(),
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Great-circle distance in meters (haversine on a spherical Earth).
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let c = 2.0 * a.min(1.0).sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The seed-derived fractional parts of a destination, each in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HashFractions {
    pub latitude: f64,
    pub longitude: f64,
}

impl HashFractions {
    pub(crate) fn checked(latitude: f64, longitude: f64) -> Result<Self, DestinationError> {
        for f in [latitude, longitude] {
            if !(0.0..1.0).contains(&f) {
                return Err(DestinationError::FractionOutOfRange(f));
            }
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// An immutable, fully-resolved destination for one date and cell.
///
/// Invalid destinations carry only their date and cell, so callers that
/// receive one after an upstream failure still know what was requested.
/// Every coordinate-producing method on them returns
/// [`DestinationError::NoCoordinates`].
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    fractions: Option<HashFractions>,
    cell: Option<GridCell>,
    date: NaiveDate,
    retro: bool,
}

impl Destination {
    /// A cell-bound destination, classified against today's local date.
    pub fn new_bound(
        latitude_fraction: f64,
        longitude_fraction: f64,
        cell: GridCell,
        date: NaiveDate,
    ) -> Result<Self, DestinationError> {
        Self::new_bound_as_of(latitude_fraction, longitude_fraction, cell, date, today())
    }

    pub fn new_bound_as_of(
        latitude_fraction: f64,
        longitude_fraction: f64,
        cell: GridCell,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, DestinationError> {
        let fractions = HashFractions::checked(latitude_fraction, longitude_fraction)?;
        Ok(Self::from_parts(Some(fractions), Some(cell), date, date < today))
    }

    /// A global destination spanning the whole globe.
    pub fn new_global(
        latitude_fraction: f64,
        longitude_fraction: f64,
        date: NaiveDate,
    ) -> Result<Self, DestinationError> {
        Self::new_global_as_of(latitude_fraction, longitude_fraction, date, today())
    }

    pub fn new_global_as_of(
        latitude_fraction: f64,
        longitude_fraction: f64,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, DestinationError> {
        let fractions = HashFractions::checked(latitude_fraction, longitude_fraction)?;
        Ok(Self::from_parts(Some(fractions), None, date, date < today))
    }

    /// A placeholder carrying only the requested date and cell.
    pub fn new_invalid(cell: Option<GridCell>, date: NaiveDate) -> Self {
        Self::new_invalid_as_of(cell, date, today())
    }

    pub fn new_invalid_as_of(cell: Option<GridCell>, date: NaiveDate, today: NaiveDate) -> Self {
        debug!(%date, cell = ?cell, "recording destination without coordinates");
        Self::from_parts(None, cell, date, date < today)
    }

    pub(crate) fn from_parts(
        fractions: Option<HashFractions>,
        cell: Option<GridCell>,
        date: NaiveDate,
        retro: bool,
    ) -> Self {
        Self {
            fractions,
            cell,
            date,
            retro,
        }
    }

    pub(crate) fn fractions(&self) -> Result<HashFractions, DestinationError> {
        self.fractions.ok_or(DestinationError::NoCoordinates)
    }

    pub fn cell(&self) -> Option<&GridCell> {
        self.cell.as_ref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_valid(&self) -> bool {
        self.fractions.is_some()
    }

    pub fn is_global(&self) -> bool {
        self.cell.is_none()
    }

    /// Whether the date was strictly before the day this record was built.
    ///
    /// Future dates (weekend draws already known on Friday) are not retro.
    pub fn is_retro(&self) -> bool {
        self.retro
    }

    pub fn final_latitude(&self) -> Result<f64, DestinationError> {
        let f = self.fractions()?;
        Ok(match &self.cell {
            Some(cell) => cell.offset_latitude(f.latitude),
            None => f.latitude * 180.0 - 90.0,
        })
    }

    pub fn final_longitude(&self) -> Result<f64, DestinationError> {
        let f = self.fractions()?;
        Ok(match &self.cell {
            Some(cell) => cell.offset_longitude(f.longitude),
            None => f.longitude * 360.0 - 180.0,
        })
    }

    pub fn final_coordinates(&self) -> Result<Coordinates, DestinationError> {
        Ok(Coordinates::new(self.final_latitude()?, self.final_longitude()?))
    }

    /// Final coordinates in integer micro-degrees, truncated toward zero.
    pub fn final_point_e6(&self) -> Result<(i32, i32), DestinationError> {
        let c = self.final_coordinates()?;
        Ok((
            (c.latitude * 1_000_000.0) as i32,
            (c.longitude * 1_000_000.0) as i32,
        ))
    }

    /// The latitude share contributed by the seed, without any cell offset.
    pub fn latitude_hash_fraction(&self) -> Result<f64, DestinationError> {
        Ok(self.fractions()?.latitude)
    }

    /// The longitude share contributed by the seed, without any cell offset.
    pub fn longitude_hash_fraction(&self) -> Result<f64, DestinationError> {
        Ok(self.fractions()?.longitude)
    }

    pub fn distance_meters(&self, latitude: f64, longitude: f64) -> Result<f64, DestinationError> {
        let c = self.final_coordinates()?;
        Ok(haversine_meters(c.latitude, c.longitude, latitude, longitude))
    }

    pub fn distance_meters_to(&self, point: &Coordinates) -> Result<f64, DestinationError> {
        self.distance_meters(point.latitude, point.longitude)
    }

    /// See [`compute_lookup_date`].
    pub fn lookup_date(&self) -> NaiveDate {
        compute_lookup_date(self.date, self.cell.as_ref())
    }

    /// Global destinations always qualify; cell-bound ones only after the cutoff.
    pub fn uses_date_shift_rule(&self) -> bool {
        shifts_back(self.date, self.cell.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seattle() -> GridCell {
        GridCell::new(47, false, 122, true).unwrap()
    }

    fn berlin() -> GridCell {
        GridCell::new(52, false, 13, false).unwrap()
    }

    // =========================================================================
    // compute_lookup_date
    // =========================================================================

    #[test]
    fn lookup_sunday_without_rule_clamps_to_friday() {
        assert_eq!(compute_lookup_date(ymd(2024, 3, 17), Some(&berlin())), ymd(2024, 3, 15));
    }

    #[test]
    fn lookup_saturday_with_rule_lands_on_friday() {
        // Rule shift alone reaches Friday, which needs no clamp.
        assert_eq!(compute_lookup_date(ymd(2024, 3, 16), Some(&seattle())), ymd(2024, 3, 15));
    }

    #[test]
    fn lookup_monday_with_rule_rewinds_past_weekend() {
        // Mon → Sun (rule) → Fri (clamp)
        assert_eq!(compute_lookup_date(ymd(2024, 3, 18), Some(&seattle())), ymd(2024, 3, 15));
    }

    #[test]
    fn lookup_weekday_without_rule_is_unchanged() {
        assert_eq!(compute_lookup_date(ymd(2024, 3, 13), Some(&berlin())), ymd(2024, 3, 13));
    }

    #[test]
    fn lookup_global_always_shifts() {
        assert_eq!(compute_lookup_date(ymd(2024, 3, 13), None), ymd(2024, 3, 12));
        assert_eq!(compute_lookup_date(ymd(2008, 5, 20), None), ymd(2008, 5, 19));
    }

    #[test]
    fn lookup_rule_inactive_on_cutoff_day() {
        // 2008-05-26 was a Monday.
        assert_eq!(compute_lookup_date(ymd(2008, 5, 26), Some(&seattle())), ymd(2008, 5, 26));
        assert_eq!(compute_lookup_date(ymd(2008, 5, 27), Some(&seattle())), ymd(2008, 5, 26));
    }

    #[test]
    fn lookup_never_lands_on_weekend() {
        let cells = [Some(seattle()), Some(berlin()), None];
        let mut date = ymd(2008, 5, 1);
        while date < ymd(2008, 7, 1) {
            for cell in &cells {
                let lookup = compute_lookup_date(date, cell.as_ref());
                assert!(
                    !matches!(lookup.weekday(), Weekday::Sat | Weekday::Sun),
                    "{date} with {cell:?} → {lookup}"
                );
                assert!(lookup <= date);
            }
            date = date.succ_opt().unwrap();
        }
    }

    // =========================================================================
    // Construction and classification
    // =========================================================================

    #[test]
    fn retro_only_for_strictly_past_dates() {
        let today = ymd(2024, 3, 13);
        let past =
            Destination::new_bound_as_of(0.1, 0.2, seattle(), ymd(2024, 3, 12), today).unwrap();
        let same = Destination::new_bound_as_of(0.1, 0.2, seattle(), today, today).unwrap();
        let future = Destination::new_global_as_of(0.1, 0.2, ymd(2024, 3, 14), today).unwrap();
        assert!(past.is_retro());
        assert!(!same.is_retro());
        assert!(!future.is_retro());
    }

    #[test]
    fn retro_against_local_clock() {
        // Dates a few days either side of now stay classified the same even
        // if the clock crosses midnight between these reads.
        let now = today();
        let past = now - Days::new(3);
        let future = now + Days::new(3);
        assert!(Destination::new_bound(0.5, 0.5, berlin(), past).unwrap().is_retro());
        assert!(!Destination::new_bound(0.5, 0.5, berlin(), future).unwrap().is_retro());
    }

    #[test]
    fn rejects_fractions_outside_unit_interval() {
        let date = ymd(2024, 3, 13);
        assert_eq!(
            Destination::new_global(1.0, 0.5, date),
            Err(DestinationError::FractionOutOfRange(1.0))
        );
        assert!(Destination::new_bound(0.5, -0.1, seattle(), date).is_err());
        assert!(Destination::new_bound(f64::NAN, 0.1, seattle(), date).is_err());
    }

    #[test]
    fn date_shift_rule_for_destination() {
        let global = Destination::new_global(0.5, 0.5, ymd(2000, 1, 1)).unwrap();
        assert!(global.uses_date_shift_rule());
        assert!(global.is_global());

        let early = Destination::new_bound(0.5, 0.5, seattle(), ymd(2008, 5, 26)).unwrap();
        assert!(!early.uses_date_shift_rule());

        let late = Destination::new_bound(0.5, 0.5, seattle(), ymd(2008, 5, 27)).unwrap();
        assert!(late.uses_date_shift_rule());

        let east = Destination::new_bound(0.5, 0.5, berlin(), ymd(2024, 1, 1)).unwrap();
        assert!(!east.uses_date_shift_rule());
    }

    // =========================================================================
    // Coordinates
    // =========================================================================

    #[test]
    fn bound_final_coordinates_apply_cell_signs() {
        let d = Destination::new_bound(0.1234, 0.5678, seattle(), ymd(2024, 3, 13)).unwrap();
        assert!((d.final_latitude().unwrap() - 47.1234).abs() < 1e-9);
        assert!((d.final_longitude().unwrap() + 122.5678).abs() < 1e-9);
        assert_eq!(d.latitude_hash_fraction().unwrap(), 0.1234);
        assert_eq!(d.longitude_hash_fraction().unwrap(), 0.5678);
        assert_eq!(d.final_point_e6().unwrap(), (47_123_400, -122_567_800));
    }

    #[test]
    fn negative_zero_cell_stays_in_its_hemisphere() {
        let cell = GridCell::new(0, true, 0, true).unwrap();
        let d = Destination::new_bound(0.25, 0.75, cell, ymd(2024, 3, 13)).unwrap();
        assert_eq!(d.final_latitude().unwrap(), -0.25);
        assert_eq!(d.final_longitude().unwrap(), -0.75);
    }

    #[test]
    fn global_final_coordinates_span_globe() {
        let d = Destination::new_global(0.5, 0.5, ymd(2024, 3, 13)).unwrap();
        assert_eq!(d.final_coordinates().unwrap(), Coordinates::new(0.0, 0.0));

        let d = Destination::new_global(0.25, 0.75, ymd(2024, 3, 13)).unwrap();
        assert_eq!(d.final_latitude().unwrap(), -45.0);
        assert_eq!(d.final_longitude().unwrap(), 90.0);
        assert_eq!(d.latitude_hash_fraction().unwrap(), 0.25);
    }

    #[test]
    fn invalid_destination_refuses_coordinates() {
        let d = Destination::new_invalid(Some(seattle()), ymd(2024, 3, 16));
        assert!(!d.is_valid());
        assert_eq!(d.final_latitude(), Err(DestinationError::NoCoordinates));
        assert_eq!(d.distance_meters(0.0, 0.0), Err(DestinationError::NoCoordinates));
        assert_eq!(d.latitude_hash_fraction(), Err(DestinationError::NoCoordinates));
        // Date context is still usable.
        assert_eq!(d.lookup_date(), ymd(2024, 3, 15));
    }

    // =========================================================================
    // Distance
    // =========================================================================

    #[test]
    fn distance_is_zero_for_same_point() {
        let d = Destination::new_bound(0.1234, 0.5678, seattle(), ymd(2024, 3, 13)).unwrap();
        assert!(d.distance_meters(47.1234, -122.5678).unwrap() < 1e-6);
    }

    #[test]
    fn haversine_london_paris() {
        let km = haversine_meters(51.5074, -0.1278, 48.8566, 2.3522) / 1000.0;
        assert!((km - 343.5).abs() < 1.5, "got {km}");
    }

    #[test]
    fn haversine_is_symmetric_and_bounded() {
        let a = haversine_meters(47.6, -122.3, -33.9, 151.2);
        let b = haversine_meters(-33.9, 151.2, 47.6, -122.3);
        assert!((a - b).abs() < 1e-6);

        let antipodal = haversine_meters(0.0, 0.0, 0.0, 180.0);
        assert!((antipodal - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }
}
