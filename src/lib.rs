//! # geohash-core
//!
//! The deterministic core of a geohashing client: which day's seed decides a
//! destination, where that destination lands once the seed is known, and how
//! to shrink a photo of it for upload without distorting it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`graticule`] | `GridCell`: one-degree cells, including the `-0` cells, and the 30W rule |
//! | [`destination`] | `Destination`, `compute_lookup_date`, final coordinates, distance |
//! | [`snapshot`] | Ordered-field persistence form of a `Destination` |
//! | [`imaging`] | Ratio-preserving downscaler with a memory-bounded on-disk path |
//! | [`config`] | TOML presets used by the command-line tool |
//!
//! # Design Decisions
//!
//! ## Days, Not Instants
//!
//! Every date here is a [`chrono::NaiveDate`]. The lookup-date rule and the
//! retro classification only ever compare whole days, so carrying a time of
//! day would just create midnight edge cases. "Today" is the local calendar
//! day, read once at construction.
//!
//! ## Invalid Destinations Are Values
//!
//! When the seed source fails, callers still need to report which date and
//! cell they asked about. [`destination::Destination::new_invalid`] keeps that
//! context, and every coordinate accessor on it returns
//! [`destination::DestinationError::NoCoordinates`] instead of zeros.
//!
//! ## Borrow When Nothing Changes
//!
//! [`imaging::scale_to_fit`] returns a `Cow`: an image that already fits
//! comes back borrowed, so the common "thumbnail is already small" case costs
//! nothing. Callers that need their own copy call `into_owned()`.
//!
//! ## Bounded Decoding
//!
//! Phone photos are large. [`imaging::scale_to_fit_from_path`] reads the
//! header, picks a power-of-two subsample factor one step above the target,
//! and decodes at that size. Running out of memory is an
//! [`imaging::ScaleError::ResourceExhausted`] error, not an abort.

pub mod config;
pub mod destination;
pub mod graticule;
pub mod imaging;
pub mod snapshot;

pub use destination::{Coordinates, Destination, DestinationError, compute_lookup_date};
pub use graticule::{GraticuleError, GridCell};
pub use snapshot::DestinationSnapshot;
