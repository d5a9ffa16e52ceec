//! Wind turbine power from a power curve.
//!
//! The 50 m wind is brought up to hub height with a logarithmic profile, the
//! power curve is optionally corrected for air density at the hub, and power
//! is read off the curve by linear interpolation.

use std::{fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    grid::LocationSeries,
    reading::{
        derived::R_D,
        fields::{DISPH, PS, T2M, WS50M},
    },
};

use super::{input, LocationModel, ModelOutput, POWER_OUTPUT};

/// Height of the MERRA-2 wind the profile starts from (m).
const REFERENCE_HEIGHT: f64 = 50.0;
/// Height of the MERRA-2 temperature used for the gradient (m).
const TEMPERATURE_HEIGHT: f64 = 2.0;
/// Standard atmosphere lapse rate (K/m).
const TEMPERATURE_GRADIENT: f64 = 0.0065;
/// Air density the power curve was measured at (kg/m³).
const STANDARD_DENSITY: f64 = 1.225;

/// Where the roughness length for the wind profile comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Roughness {
    /// The same roughness length (m) everywhere.
    Constant(f64),
    /// The grid's `DISPH` field, per record.
    DisplacementHeight,
}

impl Default for Roughness {
    fn default() -> Self {
        Roughness::Constant(0.15)
    }
}

impl FromStr for Roughness {
    type Err = String;

    /// `disph` for the displacement height, otherwise a length in metres.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disph" | "displacement-height" => Ok(Roughness::DisplacementHeight),
            other => match other.parse::<f64>() {
                Ok(z0) if z0 > 0.0 => Ok(Roughness::Constant(z0)),
                _ => Err(format!("invalid roughness `{}`", s)),
            },
        }
    }
}

/// A turbine type: hub height and a power curve of (wind speed m/s, power W).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineSpec {
    pub name: String,
    pub hub_height: f64,
    #[serde(default = "default_density_correction")]
    pub density_correction: bool,
    pub power_curve: Vec<[f64; 2]>,
}

fn default_density_correction() -> bool {
    true
}

impl TurbineSpec {
    /// Enercon E-82/2300 at its tallest hub height.
    pub fn enercon_e82() -> Self {
        let kw = [
            (1.0, 0.0),
            (2.0, 3.0),
            (3.0, 25.0),
            (4.0, 82.0),
            (5.0, 174.0),
            (6.0, 321.0),
            (7.0, 532.0),
            (8.0, 815.0),
            (9.0, 1180.0),
            (10.0, 1580.0),
            (11.0, 1900.0),
            (12.0, 2200.0),
            (13.0, 2300.0),
            (25.0, 2300.0),
        ];

        TurbineSpec {
            name: "E-82/2300".to_string(),
            hub_height: 138.0,
            density_correction: true,
            power_curve: kw.iter().map(|&(v, p)| [v, p * 1000.0]).collect(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ModelError> {
        let spec: TurbineSpec = toml::from_str(s)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.hub_height > 0.0) {
            return Err(ModelError::Turbine(format!(
                "hub height must be positive, got {}",
                self.hub_height
            )));
        }
        if self.power_curve.len() < 2 {
            return Err(ModelError::Turbine(
                "power curve needs at least two points".to_string(),
            ));
        }
        for pair in self.power_curve.windows(2) {
            if !(pair[1][0] > pair[0][0]) {
                return Err(ModelError::Turbine(format!(
                    "power curve wind speeds must increase, found {} after {}",
                    pair[1][0], pair[0][0]
                )));
            }
        }
        if self.power_curve.iter().any(|p| !(p[1] >= 0.0)) {
            return Err(ModelError::Turbine(
                "power curve values must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Power output (W) of one turbine per timestamp.
#[derive(Debug, Clone)]
pub struct TurbineModel {
    spec: TurbineSpec,
    roughness: Roughness,
    speeds: Vec<f64>,
    powers: Vec<f64>,
}

impl TurbineModel {
    pub fn new(spec: TurbineSpec, roughness: Roughness) -> Result<Self, ModelError> {
        spec.validate()?;
        let speeds = spec.power_curve.iter().map(|p| p[0]).collect();
        let powers = spec.power_curve.iter().map(|p| p[1]).collect();

        Ok(TurbineModel {
            spec,
            roughness,
            speeds,
            powers,
        })
    }

    /// Power for one timestamp. Any NaN input gives NaN.
    pub fn power(&self, wind_50m: f64, pressure: f64, temperature_2m: f64, roughness: f64) -> f64 {
        let hub = self.spec.hub_height;
        let wind = logarithmic_profile(wind_50m, REFERENCE_HEIGHT, hub, roughness);
        if wind.is_nan() {
            return f64::NAN;
        }
        if !self.spec.density_correction {
            return interpolate(wind, &self.speeds, &self.powers);
        }

        let density = hub_density(pressure, temperature_2m, hub);
        if !(density > 0.0) || !density.is_finite() {
            return f64::NAN;
        }
        let corrected: Vec<f64> = self
            .speeds
            .iter()
            .map(|&v| v * (STANDARD_DENSITY / density).powf(density_exponent(v)))
            .collect();

        interpolate(wind, &corrected, &self.powers)
    }
}

impl LocationModel for TurbineModel {
    fn name(&self) -> &str {
        POWER_OUTPUT
    }

    fn evaluate(&self, series: &LocationSeries<'_>) -> Result<ModelOutput, ModelError> {
        let wind = input(series, WS50M)?;
        let pressure = input(series, PS)?;
        let temperature = input(series, T2M)?;
        let roughness = match self.roughness {
            Roughness::Constant(z0) => vec![z0; series.len()],
            Roughness::DisplacementHeight => input(series, DISPH)?,
        };

        let power = (0..series.len())
            .map(|i| self.power(wind[i], pressure[i], temperature[i], roughness[i]))
            .collect();

        Ok(ModelOutput::Series(power))
    }
}

/// Wind speed at `height` from a wind speed measured at `reference`.
pub fn logarithmic_profile(wind: f64, reference: f64, height: f64, roughness: f64) -> f64 {
    if !(roughness > 0.0) || roughness >= reference.min(height) {
        return f64::NAN;
    }
    wind * ((height / roughness).ln() / (reference / roughness).ln())
}

/// Air density at hub height (kg/m³) from surface pressure (Pa) and the 2 m
/// temperature (K): 1 hPa pressure drop per 8 m, linear temperature gradient,
/// ideal gas.
pub fn hub_density(pressure: f64, temperature_2m: f64, hub_height: f64) -> f64 {
    let pressure_hub = (pressure / 100.0 - hub_height / 8.0) * 100.0;
    let temperature_hub = temperature_2m - TEMPERATURE_GRADIENT * (hub_height - TEMPERATURE_HEIGHT);
    pressure_hub / (R_D * temperature_hub)
}

// 1/3 below 7.5 m/s, 2/3 above 12.5 m/s, linear in between
fn density_exponent(speed: f64) -> f64 {
    if speed <= 7.5 {
        1.0 / 3.0
    } else if speed >= 12.5 {
        2.0 / 3.0
    } else {
        (speed - 7.5) / 15.0 + 1.0 / 3.0
    }
}

/// Linear interpolation on an increasing grid, zero outside it.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let last = xs.len() - 1;
    if x < xs[0] || x > xs[last] {
        return 0.0;
    }

    let i = xs.partition_point(|&s| s <= x);
    if i == xs.len() {
        return ys[last];
    }
    let (x0, x1, y0, y1) = (xs[i - 1], xs[i], ys[i - 1], ys[i]);

    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
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

    fn flat_spec(density_correction: bool) -> TurbineSpec {
        TurbineSpec {
            name: "test".to_string(),
            hub_height: 50.0,
            density_correction,
            power_curve: vec![[2.0, 0.0], [4.0, 1000.0], [12.0, 2000.0], [25.0, 2000.0]],
        }
    }

    #[test]
    fn should_interpolate_power_curve() {
        let xs = [2.0, 4.0, 12.0];
        let ys = [0.0, 1000.0, 2000.0];

        assert_eq!(interpolate(2.0, &xs, &ys), 0.0);
        assert_eq!(interpolate(3.0, &xs, &ys), 500.0);
        assert_eq!(interpolate(4.0, &xs, &ys), 1000.0);
        assert_eq!(interpolate(8.0, &xs, &ys), 1500.0);
        assert_eq!(interpolate(12.0, &xs, &ys), 2000.0);
        assert_eq!(interpolate(1.0, &xs, &ys), 0.0);
        assert_eq!(interpolate(30.0, &xs, &ys), 0.0);
        assert!(interpolate(f64::NAN, &xs, &ys).is_nan());
    }

    #[test]
    fn should_scale_wind_logarithmically() {
        let same = logarithmic_profile(8.0, 50.0, 50.0, 0.15);
        assert!((same - 8.0).abs() < 1e-12);

        let higher = logarithmic_profile(8.0, 50.0, 138.0, 0.15);
        let expected = 8.0 * (138.0f64 / 0.15).ln() / (50.0f64 / 0.15).ln();
        assert!((higher - expected).abs() < 1e-12);
        assert!(higher > 8.0);

        assert!(logarithmic_profile(8.0, 50.0, 138.0, 0.0).is_nan());
        assert!(logarithmic_profile(8.0, 50.0, 138.0, 60.0).is_nan());
    }

    #[test]
    fn should_compute_standard_density_near_sea_level() {
        let density = hub_density(101325.0, 288.15, 2.0);

        assert!((density - 1.225).abs() < 0.01, "density = {}", density);
    }

    #[test]
    fn should_read_power_from_curve_at_reference_height() {
        let model = TurbineModel::new(flat_spec(false), Roughness::Constant(0.15)).unwrap();

        assert_eq!(model.power(8.0, 101325.0, 288.15, 0.15), 1500.0);
        assert_eq!(model.power(1.0, 101325.0, 288.15, 0.15), 0.0);
        assert!(model.power(f64::NAN, 101325.0, 288.15, 0.15).is_nan());
    }

    #[test]
    fn should_raise_power_in_thin_air_below_rated_speed() {
        let corrected = TurbineModel::new(flat_spec(true), Roughness::Constant(0.15)).unwrap();
        let plain = TurbineModel::new(flat_spec(false), Roughness::Constant(0.15)).unwrap();

        // thin air shifts the curve to higher wind speeds, so less power
        let thin = corrected.power(8.0, 80000.0, 288.15, 0.15);
        assert!(thin < plain.power(8.0, 80000.0, 288.15, 0.15));
        assert!(corrected.power(8.0, f64::NAN, 288.15, 0.15).is_nan());
    }

    #[test]
    fn should_evaluate_a_location_series() {
        let mut grid = ObservationGrid::new([WS50M, PS, T2M, DISPH]);
        let here = Location::new(52.0, 5.0);
        for (h, wind) in [3.0, 8.0, f64::NAN].iter().enumerate() {
            let time = Utc.with_ymd_and_hms(2019, 1, 1, h as u32, 30, 0).unwrap();
            grid.push_record(time, here, &[*wind, 101325.0, 288.15, 0.15])
                .unwrap();
        }
        let groups = group_by_location(&grid, DuplicatePolicy::Reject).unwrap();
        let series = groups.get(&here).unwrap();

        let model = TurbineModel::new(flat_spec(false), Roughness::DisplacementHeight).unwrap();
        let output = model.evaluate(&series).unwrap();

        match output {
            ModelOutput::Series(values) => {
                assert_eq!(values.len(), 3);
                assert_eq!(values[0], 500.0);
                assert_eq!(values[1], 1500.0);
                assert!(values[2].is_nan());
            }
            other => panic!("expected a series, got {:?}", other),
        }
    }

    #[test]
    fn should_report_missing_input() {
        let mut grid = ObservationGrid::new([WS50M]);
        let here = Location::new(52.0, 5.0);
        let time = Utc.with_ymd_and_hms(2019, 1, 1, 0, 30, 0).unwrap();
        grid.push_record(time, here, &[5.0]).unwrap();
        let groups = group_by_location(&grid, DuplicatePolicy::Reject).unwrap();

        let model = TurbineModel::new(flat_spec(false), Roughness::default()).unwrap();
        let result = model.evaluate(&groups.get(&here).unwrap());

        assert!(matches!(result, Err(ModelError::MissingField(f)) if f == PS));
    }

    #[test]
    fn should_parse_turbine_file() {
        let spec = TurbineSpec::from_toml_str(
            r#"
            name = "V90/2000"
            hub_height = 105
            power_curve = [[4, 0], [15, 2000000], [25, 2000000]]
            "#,
        )
        .unwrap();

        assert_eq!(spec.name, "V90/2000");
        assert_eq!(spec.hub_height, 105.0);
        assert!(spec.density_correction);
        assert_eq!(spec.power_curve[1], [15.0, 2_000_000.0]);
    }

    #[test]
    fn should_reject_bad_turbine_file() {
        let unordered = r#"
            name = "x"
            hub_height = 80
            power_curve = [[5, 0], [4, 10]]
        "#;
        assert!(matches!(
            TurbineSpec::from_toml_str(unordered),
            Err(ModelError::Turbine(_))
        ));

        assert!(TurbineSpec::enercon_e82().validate().is_ok());
    }

    #[test]
    fn should_parse_roughness() {
        assert_eq!("DISPH".parse::<Roughness>(), Ok(Roughness::DisplacementHeight));
        assert_eq!("0.03".parse::<Roughness>(), Ok(Roughness::Constant(0.03)));
        assert!("-1".parse::<Roughness>().is_err());
        assert!("grass".parse::<Roughness>().is_err());
    }
}
