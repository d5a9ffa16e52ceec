//! Error types for grid reshaping, models, stores and configuration.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reading::Location;

/// Errors raised while reading, reshaping or aggregating an observation grid.
#[derive(Error, Debug)]
pub enum GridError {
    /// The input table does not have the expected shape.
    #[error("invalid grid schema: {0}")]
    Schema(String),

    /// A field needed for a derivation or a model is absent.
    #[error("missing field `{0}`")]
    MissingField(String),

    /// A derived field would overwrite an existing one.
    #[error("field `{0}` already exists")]
    FieldExists(String),

    /// A column does not have one value per record.
    #[error("column `{name}` has {actual} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A record has a NaN latitude or longitude.
    #[error("record {row} has an invalid coordinate")]
    InvalidCoordinate { row: usize },

    /// The same (time, lat, lon) key appears more than once.
    #[error("duplicate record at {time} for {location}")]
    DuplicateKey {
        time: DateTime<Utc>,
        location: Location,
    },

    /// An empty series was about to be handed to a model.
    #[error("empty series for {0}")]
    EmptySeries(Location),

    /// A model returned a series of the wrong length.
    #[error("model `{model}` returned {actual} values for {location}, expected {expected}")]
    SeriesLength {
        model: String,
        location: Location,
        expected: usize,
        actual: usize,
    },

    /// A scalar result cannot be expanded back to timestamps.
    #[error("model `{model}` returned a scalar for {location}; the full scheme needs a series")]
    ScalarInFullScheme { model: String, location: Location },

    /// Results disagree on their column set.
    #[error("result for {location} is missing column `{column}`")]
    ColumnMismatch { location: Location, column: String },

    /// A model failed for one location.
    #[error("model `{model}` failed for {location}: {source}")]
    Model {
        model: String,
        location: Location,
        #[source]
        source: ModelError,
    },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the power and energy-demand models.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("missing input field `{0}`")]
    MissingField(String),

    #[error("expected {expected} coefficients for the polynomial, found {actual}")]
    Coefficients { expected: usize, actual: usize },

    #[error("invalid turbine specification: {0}")]
    Turbine(String),

    #[error("cannot parse model file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot parse turbine file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the object and summary stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store is read-only")]
    ReadOnly,

    #[error("{0} is not supported by this store")]
    Unsupported(&'static str),

    #[error("request for `{key}` failed with status {status}")]
    Status { key: String, status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(String),

    #[error("summary document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading the settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    Env { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
