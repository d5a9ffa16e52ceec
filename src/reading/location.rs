//! Grid point identity.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// A (latitude, longitude) grid point.
///
/// MERRA-2 coordinates are fixed precision, so two locations are equal only
/// when both coordinates match bit for bit. `-0.0` is folded into `0.0` on
/// construction so that the equator and the prime meridian hash the same way
/// whichever sign the source file used. Ordering is total, latitude first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Location {
            lat: fold_zero(lat),
            lon: fold_zero(lon),
        }
    }

    /// True when neither coordinate is NaN.
    pub fn is_valid(&self) -> bool {
        !self.lat.is_nan() && !self.lon.is_nan()
    }
}

fn fold_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        fold_zero(self.lat).to_bits() == fold_zero(other.lat).to_bits()
            && fold_zero(self.lon).to_bits() == fold_zero(other.lon).to_bits()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_zero(self.lat).to_bits().hash(state);
        fold_zero(self.lon).to_bits().hash(state);
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        fold_zero(self.lat)
            .total_cmp(&fold_zero(other.lat))
            .then_with(|| fold_zero(self.lon).total_cmp(&fold_zero(other.lon)))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

// -- Tests -------------------------------------------------------------------
