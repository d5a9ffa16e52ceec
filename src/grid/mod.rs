//! Reshaping observation grids into per-location series and back.
//!
//! A grid is a flat `time × lat × lon` table. [`group_by_location`] splits it
//! into one series per grid point, the models in [`crate::model`] run on
//! each series, and [`reassemble`] flattens the results into an output grid
//! under one of the [`IndexScheme`]s. [`Aggregator`] does the three steps
//! in one pass.

pub mod aggregate;
pub mod group;
pub mod observation;
pub mod reassemble;

pub use aggregate::{merge_totals, Aggregator, LocationTotals};
pub use group::{group_by_location, DuplicatePolicy, LocationSeries};
pub use observation::ObservationGrid;
pub use reassemble::{reassemble, series_total, IndexScheme, LocationResult, OutputGrid};
