//! Partitioning a flat grid into per-location time series.

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{GridError, Result},
    reading::Location,
};

use super::ObservationGrid;

/// What to do when a (time, lat, lon) key occurs twice in one grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail the whole grid.
    #[default]
    Reject,
    /// Keep the later record in the position of the first one.
    LastWriteWins,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "last-write-wins" | "last_write_wins" => Ok(DuplicatePolicy::LastWriteWins),
            other => Err(format!("unknown duplicate policy `{}`", other)),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::Reject => write!(f, "reject"),
            DuplicatePolicy::LastWriteWins => write!(f, "last-write-wins"),
        }
    }
}

/// The records of one location, in the order they were first seen.
#[derive(Debug, Clone, Copy)]
pub struct LocationSeries<'a> {
    pub(super) grid: &'a ObservationGrid,
    pub(super) location: Location,
    pub(super) rows: &'a [usize],
}

impl<'a> LocationSeries<'a> {
    pub fn location(&self) -> Location {
        self.location
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|&r| self.grid.time(r)).collect()
    }

    /// Values of one field along the series, or `None` if the grid lacks it.
    pub fn field(&self, name: &str) -> Option<Vec<f64>> {
        self.grid
            .column(name)
            .map(|column| self.rows.iter().map(|&r| column[r]).collect())
    }
}

/// Every location of a grid with its series.
///
/// Locations are numbered in first-seen order and each number owns a list of
/// row indices, so the floating point key is hashed once per record.
#[derive(Debug)]
pub struct LocationGroups<'a> {
    grid: &'a ObservationGrid,
    locations: Vec<Location>,
    rows: Vec<Vec<usize>>,
    duplicates: usize,
}

impl<'a> LocationGroups<'a> {
    /// Number of distinct locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Number of records across all groups.
    pub fn record_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Records replaced under [`DuplicatePolicy::LastWriteWins`].
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[cfg(test)]
    pub fn get(&self, location: &Location) -> Option<LocationSeries<'_>> {
        self.iter().find(|series| series.location() == *location)
    }

    /// Series in first-seen location order.
    pub fn iter(&self) -> impl Iterator<Item = LocationSeries<'_>> + '_ {
        (0..self.locations.len()).map(move |i| self.series(i))
    }

    fn series(&self, i: usize) -> LocationSeries<'_> {
        LocationSeries {
            grid: self.grid,
            location: self.locations[i],
            rows: &self.rows[i],
        }
    }
}

/// Groups the records of `grid` by (lat, lon) in a single pass.
///
/// Within each group, records keep the order they have in the grid. A key
/// seen twice is handled according to `policy`.
pub fn group_by_location(
    grid: &ObservationGrid,
    policy: DuplicatePolicy,
) -> Result<LocationGroups<'_>> {
    let mut index: HashMap<Location, usize> = HashMap::new();
    let mut locations = Vec::new();
    let mut rows: Vec<Vec<usize>> = Vec::new();
    // (location index, timestamp) -> position within that location's rows
    let mut seen: HashMap<(usize, DateTime<Utc>), usize> = HashMap::with_capacity(grid.len());
    let mut duplicates = 0;

    for row in 0..grid.len() {
        let location = grid.location(row);
        let time = grid.time(row);

        let i = *index.entry(location).or_insert_with(|| {
            locations.push(location);
            rows.push(Vec::new());
            locations.len() - 1
        });

        match seen.get(&(i, time)) {
            None => {
                seen.insert((i, time), rows[i].len());
                rows[i].push(row);
            }
            Some(&position) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(GridError::DuplicateKey { time, location });
                }
                DuplicatePolicy::LastWriteWins => {
                    warn!(%location, %time, "duplicate record, keeping the later one");
                    rows[i][position] = row;
                    duplicates += 1;
                }
            },
        }
    }

    Ok(LocationGroups {
        grid,
        locations,
        rows,
        duplicates,
    })
}

// -- Tests -------------------------------------------------------------------
