//! Fields computed from the raw MERRA-2 variables.
//!
//! Every derivation is a pure per-record function. Bad inputs come out as
//! NaN rather than an error so that one broken record never stops a grid.

use tracing::debug;

use crate::{error::Result, grid::ObservationGrid};

use super::fields::{PS, QV10M, QV2M, RH10M, RH2M, T10M, T2M, U10M, U50M, V10M, V50M, WS10M, WS50M};

/// Freezing point of water (K).
pub const T_0: f64 = 273.15;
/// Specific gas constant of dry air (J/(kg K)).
pub const R_D: f64 = 287.058;
/// Specific gas constant of water vapour (J/(kg K)).
pub const R_V: f64 = 461.5;

/// Wind speed magnitude from its northward and eastward components.
pub fn wind_speed(v: f64, u: f64) -> f64 {
    (v * v + u * u).sqrt()
}

/// Saturation vapour pressure (Pa) at `temperature` (K), Clausius-Clapeyron.
pub fn saturation_vapor_pressure(temperature: f64) -> f64 {
    611.0 * ((17.67 * (temperature - T_0)) / (temperature - 29.65)).exp()
}

/// Relative humidity (fraction) from specific humidity (kg/kg), ambient
/// pressure (Pa) and ambient temperature (K).
///
/// Returns NaN when the formula is undefined: `sh == 1`, or a pressure equal
/// to the saturation vapour pressure.
pub fn relative_humidity(specific_humidity: f64, pressure: f64, temperature: f64) -> f64 {
    let mass_fraction = 1.0 / (1.0 / specific_humidity - 1.0);

    let saturated_vapor_pressure = saturation_vapor_pressure(temperature);
    let denominator = (pressure - saturated_vapor_pressure) * R_V;
    if denominator == 0.0 || !mass_fraction.is_finite() {
        return f64::NAN;
    }
    let saturation_mass_fraction = (saturated_vapor_pressure * R_D) / denominator;

    let rh = mass_fraction / saturation_mass_fraction;
    if rh.is_finite() {
        rh
    } else {
        f64::NAN
    }
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - T_0
}

/// Adds wind speed at 10 m and 50 m and relative humidity at 2 m and 10 m to
/// the grid. Source fields are left untouched.
pub fn derive_fields(grid: &mut ObservationGrid) -> Result<()> {
    let ws10 = map2(grid, V10M, U10M, wind_speed)?;
    grid.add_column(WS10M, ws10)?;

    let ws50 = map2(grid, V50M, U50M, wind_speed)?;
    grid.add_column(WS50M, ws50)?;

    let rh2 = map3(grid, QV2M, PS, T2M, relative_humidity)?;
    grid.add_column(RH2M, rh2)?;

    let rh10 = map3(grid, QV10M, PS, T10M, relative_humidity)?;
    grid.add_column(RH10M, rh10)?;

    debug!(records = grid.len(), "derived wind speed and relative humidity");

    Ok(())
}

fn map2(grid: &ObservationGrid, a: &str, b: &str, f: fn(f64, f64) -> f64) -> Result<Vec<f64>> {
    let a = grid.require(a)?;
    let b = grid.require(b)?;

    Ok(a.iter().zip(b).map(|(&a, &b)| f(a, b)).collect())
}

fn map3(
    grid: &ObservationGrid,
    a: &str,
    b: &str,
    c: &str,
    f: fn(f64, f64, f64) -> f64,
) -> Result<Vec<f64>> {
    let a = grid.require(a)?;
    let b = grid.require(b)?;
    let c = grid.require(c)?;

    Ok(a.iter()
        .zip(b)
        .zip(c)
        .map(|((&a, &b), &c)| f(a, b, c))
        .collect())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{error::GridError, reading::fields::INPUT_FIELDS, reading::Location};

    #[test]
    fn should_make_3_4_5_triangle() {
        assert_eq!(wind_speed(3.0, 4.0), 5.0);
        assert_eq!(wind_speed(-3.0, -4.0), 5.0);
        assert_eq!(wind_speed(0.0, 0.0), 0.0);
    }

    #[test]
    fn should_propagate_nan_wind_component() {
        assert!(wind_speed(f64::NAN, 4.0).is_nan());
        assert!(wind_speed(3.0, f64::NAN).is_nan());
    }

    #[test]
    fn should_give_plausible_relative_humidity() {
        let rh = relative_humidity(0.008, 101325.0, 288.15);

        assert!(rh > 0.0 && rh < 1.5, "rh = {}", rh);
        assert!((rh - 0.758).abs() < 0.01, "rh = {}", rh);
    }

    #[test]
    fn should_be_nan_at_saturation_pressure() {
        let t = 288.15;
        let p = saturation_vapor_pressure(t);

        assert!(relative_humidity(0.008, p, t).is_nan());
    }

    #[test]
    fn should_be_nan_for_pure_vapour() {
        assert!(relative_humidity(1.0, 101325.0, 288.15).is_nan());
        assert!(relative_humidity(f64::NAN, 101325.0, 288.15).is_nan());
    }

    #[test]
    fn should_convert_kelvin() {
        assert!((kelvin_to_celsius(288.15) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn should_add_derived_columns_without_touching_sources() {
        let mut grid = ObservationGrid::new(INPUT_FIELDS);
        let time = Utc.with_ymd_and_hms(2019, 1, 9, 0, 30, 0).unwrap();
        //            V10M U10M V50M U50M PS        T2M     T10M    QV2M   QV10M  DISPH
        let values = [3.0, 4.0, 6.0, 8.0, 101325.0, 288.15, 288.0, 0.008, 0.007, 0.5];
        grid.push_record(time, Location::new(50.0, 10.0), &values)
            .unwrap();

        derive_fields(&mut grid).unwrap();

        assert_eq!(grid.column(WS10M).unwrap(), &[5.0]);
        assert_eq!(grid.column(WS50M).unwrap(), &[10.0]);
        assert!(grid.column(RH2M).unwrap()[0] > 0.0);
        assert!(grid.column(RH10M).unwrap()[0] > 0.0);
        assert_eq!(grid.column(V10M).unwrap(), &[3.0]);
        assert_eq!(grid.column(T2M).unwrap(), &[288.15]);
    }

    #[test]
    fn should_fail_on_missing_source_field() {
        let mut grid = ObservationGrid::new([V10M]);
        let time = Utc.with_ymd_and_hms(2019, 1, 9, 0, 30, 0).unwrap();
        grid.push_record(time, Location::new(50.0, 10.0), &[1.0])
            .unwrap();

        let result = derive_fields(&mut grid);

        assert!(matches!(result, Err(GridError::MissingField(f)) if f == U10M));
    }
}
