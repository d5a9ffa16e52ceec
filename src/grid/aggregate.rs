//! One aggregation pass: reshape, run the models per location, reassemble.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::{debug, info, warn};

use crate::{
    error::{GridError, Result},
    model::{LocationModel, ModelOutput},
    reading::Location,
};

use super::{
    group_by_location, reassemble, series_total, DuplicatePolicy, IndexScheme, LocationResult,
    LocationSeries, ObservationGrid, OutputGrid,
};

/// Runs `model` on one location's series.
///
/// Empty series never reach the model, and a series result must have one
/// value per record.
pub fn apply_model(series: &LocationSeries<'_>, model: &dyn LocationModel) -> Result<ModelOutput> {
    if series.is_empty() {
        return Err(GridError::EmptySeries(series.location()));
    }

    let output = model.evaluate(series).map_err(|source| GridError::Model {
        model: model.name().to_string(),
        location: series.location(),
        source,
    })?;

    if let ModelOutput::Series(values) = &output {
        if values.len() != series.len() {
            return Err(GridError::SeriesLength {
                model: model.name().to_string(),
                location: series.location(),
                expected: series.len(),
                actual: values.len(),
            });
        }
    }

    Ok(output)
}

/// A location left out of the output because a model failed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFailure {
    pub location: Location,
    pub model: String,
    pub reason: String,
}

/// Outcome of one aggregation pass over one grid.
#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub output: OutputGrid,
    pub failures: Vec<LocationFailure>,
    /// Distinct locations in the input.
    pub locations: usize,
    /// Records in the input.
    pub records: usize,
}

impl AggregationReport {
    /// Per-location sums of every output column.
    pub fn totals(&self) -> LocationTotals {
        LocationTotals::from_output(&self.output)
    }
}

/// Applies a fixed set of models to every location of a grid.
///
/// Models are shared read-only, so one aggregator can serve several grids
/// at once.
#[derive(Clone, Default)]
pub struct Aggregator {
    models: Vec<Arc<dyn LocationModel>>,
    policy: DuplicatePolicy,
}

impl Aggregator {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Aggregator {
            models: Vec::new(),
            policy,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LocationModel>) -> Self {
        self.models.push(model);
        self
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Groups `grid` by location, applies every model to every location and
    /// reassembles the results under `scheme`.
    ///
    /// A model failure drops that location from the output and is recorded in
    /// the report, as does a scalar result under [`IndexScheme::Full`].
    /// Grouping and reassembly errors fail the whole grid.
    pub fn run(&self, grid: &ObservationGrid, scheme: IndexScheme) -> Result<AggregationReport> {
        let groups = group_by_location(grid, self.policy)?;
        debug!(
            locations = groups.len(),
            records = groups.record_count(),
            duplicates = groups.duplicates(),
            "grouped grid by location"
        );

        let mut results = Vec::with_capacity(groups.len());
        let mut failures = Vec::new();

        'locations: for series in groups.iter() {
            let mut outputs = BTreeMap::new();
            for model in &self.models {
                let output = apply_model(&series, model.as_ref()).and_then(|output| {
                    if scheme == IndexScheme::Full && matches!(output, ModelOutput::Scalar(_)) {
                        return Err(GridError::ScalarInFullScheme {
                            model: model.name().to_string(),
                            location: series.location(),
                        });
                    }
                    Ok(output)
                });
                match output {
                    Ok(output) => {
                        outputs.insert(model.name().to_string(), output);
                    }
                    Err(e) => {
                        let failure = LocationFailure {
                            location: series.location(),
                            model: model.name().to_string(),
                            reason: e.to_string(),
                        };
                        warn!(location = %failure.location, model = %failure.model, "{}", failure.reason);
                        failures.push(failure);
                        continue 'locations;
                    }
                }
            }

            results.push(LocationResult {
                location: series.location(),
                timestamps: series.timestamps(),
                outputs,
            });
        }

        let output = reassemble(&results, scheme)?;
        info!(
            locations = groups.len(),
            failed = failures.len(),
            rows = output.len(),
            "aggregated grid"
        );

        Ok(AggregationReport {
            output,
            failures,
            locations: groups.len(),
            records: grid.len(),
        })
    }
}

/// Running per-location sums, one value per output column.
///
/// Sums merge by addition, so totals from separate grids (or separate
/// workers) can be combined in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationTotals {
    values: BTreeMap<Location, BTreeMap<String, f64>>,
}

impl LocationTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sums every output column per location. NaN values are skipped.
    pub fn from_output(output: &OutputGrid) -> Self {
        let mut totals = LocationTotals::new();
        for row in output.rows() {
            for (column, value) in output.columns().iter().zip(&row.values) {
                totals.add(row.location, column, *value);
            }
        }

        totals
    }

    /// Adds `value` to a location's column. NaN registers the location and
    /// column without changing the sum.
    pub fn add(&mut self, location: Location, column: &str, value: f64) {
        let sum = self
            .values
            .entry(location)
            .or_default()
            .entry(column.to_string())
            .or_insert(0.0);
        *sum += series_total(&[value]);
    }

    pub fn merge(&mut self, other: &LocationTotals) {
        for (location, columns) in &other.values {
            for (column, value) in columns {
                self.add(*location, column, *value);
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, location: &Location, column: &str) -> Option<f64> {
        self.values.get(location)?.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every column name seen at any location.
    pub fn columns(&self) -> BTreeSet<String> {
        self.values
            .values()
            .flat_map(|columns| columns.keys().cloned())
            .collect()
    }

    /// Locations in (lat, lon) order with their sums.
    pub fn iter(&self) -> impl Iterator<Item = (&Location, &BTreeMap<String, f64>)> {
        self.values.iter()
    }
}

/// Adds up partial totals.
pub fn merge_totals<'a, I>(parts: I) -> LocationTotals
where
    I: IntoIterator<Item = &'a LocationTotals>,
{
    let mut merged = LocationTotals::new();
    for part in parts {
        merged.merge(part);
    }

    merged
}

// -- Tests -------------------------------------------------------------------
