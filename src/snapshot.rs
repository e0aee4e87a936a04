//! Ordered-field snapshot of a [`Destination`].
//!
//! Field order is fixed and must not change:
//!
//! | # | Field | Type |
//! |---|-------|------|
//! | 1 | `latitude_fraction` | `f64` |
//! | 2 | `longitude_fraction` | `f64` |
//! | 3 | `cell` | optional [`GridCell`], absent for global |
//! | 4 | `year` | `i32` |
//! | 5 | `month` | `u32`, **0-based** (January = 0) |
//! | 6 | `day_of_month` | `u32` |
//! | 7 | `is_retro` | `u8`, 0 or 1 |
//!
//! Restoring takes the date straight from the three integer fields and
//! carries `is_retro` verbatim: a destination that was "today" when saved
//! stays non-retro after a restore on a later day.

use crate::destination::{Destination, DestinationError, HashFractions};
use crate::graticule::GridCell;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationSnapshot {
    pub latitude_fraction: f64,
    pub longitude_fraction: f64,
    pub cell: Option<GridCell>,
    pub year: i32,
    pub month: u32,
    pub day_of_month: u32,
    pub is_retro: u8,
}

impl Destination {
    /// Capture this destination for persistence or transfer.
    ///
    /// Only valid destinations have a snapshot form. A placeholder has no
    /// fractions, and writing zeros in their place would restore as a real
    /// destination at the cell's corner, so this returns
    /// [`DestinationError::NoCoordinates`] instead. Persist the date and cell
    /// of a placeholder and re-query the seed.
    pub fn snapshot(&self) -> Result<DestinationSnapshot, DestinationError> {
        let fractions = self.fractions()?;
        let date = self.date();
        Ok(DestinationSnapshot {
            latitude_fraction: fractions.latitude,
            longitude_fraction: fractions.longitude,
            cell: self.cell().copied(),
            year: date.year(),
            month: date.month0(),
            day_of_month: date.day(),
            is_retro: u8::from(self.is_retro()),
        })
    }

    /// Rebuild a destination exactly as it was captured.
    pub fn from_snapshot(snapshot: &DestinationSnapshot) -> Result<Self, DestinationError> {
        let date = snapshot
            .month
            .checked_add(1)
            .and_then(|month| NaiveDate::from_ymd_opt(snapshot.year, month, snapshot.day_of_month))
            .ok_or(DestinationError::InvalidSnapshotDate {
                year: snapshot.year,
                month: snapshot.month,
                day: snapshot.day_of_month,
            })?;

        let fractions =
            HashFractions::checked(snapshot.latitude_fraction, snapshot.longitude_fraction)?;
        Ok(Destination::from_parts(
            Some(fractions),
            snapshot.cell,
            date,
            snapshot.is_retro == 1,
        ))
    }
}
