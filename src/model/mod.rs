//! Per-location models applied to each location's series.
//!
//! A model sees one location at a time and returns either one value per
//! timestamp or a single value for the whole series. Models are built once at
//! startup and only read afterwards, so one handle is shared by every worker.

pub mod power;
pub mod sed;

use crate::{error::ModelError, grid::LocationSeries};

pub use power::{Roughness, TurbineModel, TurbineSpec};
pub use sed::SedModel;

/// Output column of the turbine model.
pub const POWER_OUTPUT: &str = "power_output";
/// Output column of the energy-demand model.
pub const SED: &str = "sed";

/// Result of a model for one location.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// One value per timestamp, in series order.
    Series(Vec<f64>),
    /// One value for the whole series.
    Scalar(f64),
}

pub trait LocationModel: Send + Sync {
    /// Name of the output column.
    fn name(&self) -> &str;

    fn evaluate(&self, series: &LocationSeries<'_>) -> Result<ModelOutput, ModelError>;
}

/// Fetches a field from the series or reports which one is missing.
pub(crate) fn input(series: &LocationSeries<'_>, name: &str) -> Result<Vec<f64>, ModelError> {
    series
        .field(name)
        .ok_or_else(|| ModelError::MissingField(name.to_string()))
}
