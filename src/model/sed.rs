//! Specific energy demand (SED) of direct air capture.
//!
//! A polynomial regression of the energy demand on ambient temperature and
//! relative humidity, fitted offline. The fitted coefficients are stored as
//! JSON:
//!
//! ```json
//! { "degree": 8, "intercept": 5.1e6, "coefficients": [ ... 44 values ... ] }
//! ```
//!
//! Features are the powers of `(T [K], phi [%])` without the bias term,
//! grouped by total degree and, within a degree, by falling power of `T`:
//! `T, phi, T², T·phi, phi², T³, …`.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    error::ModelError,
    grid::LocationSeries,
    reading::{
        derived::{kelvin_to_celsius, T_0},
        fields::{RH2M, T2M},
    },
};

use super::{input, LocationModel, ModelOutput, SED};

#[derive(Debug, Deserialize)]
struct SedFile {
    degree: u32,
    intercept: f64,
    coefficients: Vec<f64>,
}

/// Fitted SED regression. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SedModel {
    degree: u32,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl SedModel {
    pub fn new(degree: u32, intercept: f64, coefficients: Vec<f64>) -> Result<Self, ModelError> {
        let expected = feature_count(degree);
        if coefficients.len() != expected {
            return Err(ModelError::Coefficients {
                expected,
                actual: coefficients.len(),
            });
        }

        Ok(SedModel {
            degree,
            intercept,
            coefficients,
        })
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let file: SedFile = serde_json::from_slice(bytes)?;
        Self::new(file.degree, file.intercept, file.coefficients)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::from_json_slice(&fs::read(path)?)
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Energy demand for an ambient temperature in °C and a relative
    /// humidity in percent.
    pub fn predict(&self, temperature_c: f64, humidity_percent: f64) -> f64 {
        let features = polynomial_features(temperature_c + T_0, humidity_percent, self.degree);

        self.intercept
            + features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, c)| x * c)
                .sum::<f64>()
    }
}

impl LocationModel for SedModel {
    fn name(&self) -> &str {
        SED
    }

    fn evaluate(&self, series: &LocationSeries<'_>) -> Result<ModelOutput, ModelError> {
        let temperature = input(series, T2M)?;
        let humidity = input(series, RH2M)?;

        let sed = temperature
            .iter()
            .zip(&humidity)
            .map(|(&t, &rh)| self.predict(kelvin_to_celsius(t), rh * 100.0))
            .collect();

        Ok(ModelOutput::Series(sed))
    }
}

/// Number of non-bias polynomial terms of two variables up to `degree`.
pub fn feature_count(degree: u32) -> usize {
    let d = degree as usize;
    d * (d + 3) / 2
}

/// Polynomial terms of `(x, y)` up to `degree`, without the constant.
pub fn polynomial_features(x: f64, y: f64, degree: u32) -> Vec<f64> {
    let mut features = Vec::with_capacity(feature_count(degree));
    for d in 1..=degree as i32 {
        for j in 0..=d {
            features.push(x.powi(d - j) * y.powi(j));
        }
    }

    features
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        grid::{group_by_location, DuplicatePolicy, ObservationGrid},
        reading::Location,
    };

    #[test]
    fn should_count_features() {
        assert_eq!(feature_count(1), 2);
        assert_eq!(feature_count(2), 5);
        assert_eq!(feature_count(8), 44);
    }

    #[test]
    fn should_order_features_by_degree_then_power() {
        let f = polynomial_features(2.0, 3.0, 3);

        assert_eq!(f, vec![2.0, 3.0, 4.0, 6.0, 9.0, 8.0, 12.0, 18.0, 27.0]);
    }

    #[test]
    fn should_predict_linear_model() {
        // sed = 10 + 2 T[K] + 0.5 phi[%]
        let model = SedModel::new(1, 10.0, vec![2.0, 0.5]).unwrap();

        let sed = model.predict(15.0, 60.0);

        assert!((sed - (10.0 + 2.0 * 288.15 + 30.0)).abs() < 1e-9);
    }

    #[test]
    fn should_reject_wrong_coefficient_count() {
        let result = SedModel::new(2, 0.0, vec![1.0, 2.0]);

        assert!(matches!(
            result,
            Err(ModelError::Coefficients { expected: 5, actual: 2 })
        ));
    }

    #[test]
    fn should_load_from_json() {
        let json = br#"{"degree": 2, "intercept": 1.5, "coefficients": [0, 0, 0, 0, 1]}"#;
        let model = SedModel::from_json_slice(json).unwrap();

        assert_eq!(model.degree(), 2);
        // only the phi² term
        assert!((model.predict(0.0, 10.0) - 101.5).abs() < 1e-9);
        assert!(SedModel::from_json_slice(b"{\"degree\": 2}").is_err());
    }

    #[test]
    fn should_evaluate_series_with_nan_humidity() {
        let mut grid = ObservationGrid::new([T2M, RH2M]);
        let here = Location::new(30.0, 60.0);
        for (h, rh) in [0.5, f64::NAN].iter().enumerate() {
            let time = Utc.with_ymd_and_hms(2019, 7, 1, h as u32, 30, 0).unwrap();
            grid.push_record(time, here, &[300.0, *rh]).unwrap();
        }
        let groups = group_by_location(&grid, DuplicatePolicy::Reject).unwrap();

        let model = SedModel::new(1, 0.0, vec![0.0, 1.0]).unwrap();
        let output = model.evaluate(&groups.get(&here).unwrap()).unwrap();

        match output {
            ModelOutput::Series(values) => {
                assert!((values[0] - 50.0).abs() < 1e-9);
                assert!(values[1].is_nan());
            }
            other => panic!("expected a series, got {:?}", other),
        }
    }
}
