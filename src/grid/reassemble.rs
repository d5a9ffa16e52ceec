//! Turning per-location results back into a flat, sorted table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{GridError, Result},
    model::ModelOutput,
    reading::Location,
};

/// Row layout of an output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScheme {
    /// One row per input record, keyed by (time, lat, lon).
    Full,
    /// One row per location, series summed.
    Summary,
}

/// Everything the models produced for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationResult {
    pub location: Location,
    /// Timestamps of the series the models saw, in series order.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Output column name to model output.
    pub outputs: BTreeMap<String, ModelOutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// `None` under [`IndexScheme::Summary`].
    pub time: Option<DateTime<Utc>>,
    pub location: Location,
    /// Values in the order of [`OutputGrid::columns`].
    pub values: Vec<f64>,
}

/// The reassembled table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGrid {
    scheme: IndexScheme,
    columns: Vec<String>,
    rows: Vec<OutputRow>,
}

impl OutputGrid {
    pub fn scheme(&self) -> IndexScheme {
        self.scheme
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Sum of a series, skipping NaN. An all-NaN series sums to zero.
pub fn series_total(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).sum()
}

/// Expands per-location results into an output grid.
///
/// Rows come out sorted by (time, lat, lon) for the full scheme and by
/// (lat, lon) for the summary scheme, whatever order `results` arrive in.
/// The column set is taken from the first result and every other result must
/// have the same columns.
pub fn reassemble<'a, I>(results: I, scheme: IndexScheme) -> Result<OutputGrid>
where
    I: IntoIterator<Item = &'a LocationResult>,
{
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in results {
        let columns = columns.get_or_insert_with(|| result.outputs.keys().cloned().collect());
        if result.outputs.len() != columns.len() {
            let extra = result
                .outputs
                .keys()
                .find(|k| !columns.contains(k))
                .cloned()
                .unwrap_or_default();
            return Err(GridError::ColumnMismatch {
                location: result.location,
                column: extra,
            });
        }
        let outputs = columns
            .iter()
            .map(|name| {
                result
                    .outputs
                    .get(name)
                    .map(|output| (name, output))
                    .ok_or_else(|| GridError::ColumnMismatch {
                        location: result.location,
                        column: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        match scheme {
            IndexScheme::Summary => {
                let values = outputs
                    .iter()
                    .map(|(_, output)| match output {
                        ModelOutput::Series(values) => series_total(values),
                        ModelOutput::Scalar(value) => *value,
                    })
                    .collect();
                rows.push(OutputRow {
                    time: None,
                    location: result.location,
                    values,
                });
            }
            IndexScheme::Full => {
                let mut series = Vec::with_capacity(outputs.len());
                for (name, output) in &outputs {
                    match output {
                        ModelOutput::Series(values) if values.len() == result.timestamps.len() => {
                            series.push(values)
                        }
                        ModelOutput::Series(values) => {
                            return Err(GridError::SeriesLength {
                                model: name.to_string(),
                                location: result.location,
                                expected: result.timestamps.len(),
                                actual: values.len(),
                            })
                        }
                        ModelOutput::Scalar(_) => {
                            return Err(GridError::ScalarInFullScheme {
                                model: name.to_string(),
                                location: result.location,
                            })
                        }
                    }
                }
                for (i, time) in result.timestamps.iter().enumerate() {
                    rows.push(OutputRow {
                        time: Some(*time),
                        location: result.location,
                        values: series.iter().map(|values| values[i]).collect(),
                    });
                }
            }
        }
    }

    rows.sort_by(|a, b| (a.time, a.location).cmp(&(b.time, b.location)));

    Ok(OutputGrid {
        scheme,
        columns: columns.unwrap_or_default(),
        rows,
    })
}

// -- Tests -------------------------------------------------------------------
