//! Carbon footprint of a turbine at each location and of capturing that carbon.

use serde::{Deserialize, Serialize};

use crate::{
    grid::LocationTotals,
    model::{POWER_OUTPUT, SED},
    reading::Location,
};

/// Constants of the footprint calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootprintSettings {
    /// Added to the power output so locations without wind stay finite.
    pub epsilon: f64,
    /// Life-cycle emissions of one turbine in kg CO2.
    pub emissions_kg: f64,
    pub lifetime_years: f64,
    /// Divides the summed energy demand into an hourly mean.
    pub hours_per_year: f64,
}

impl Default for FootprintSettings {
    fn default() -> Self {
        FootprintSettings {
            epsilon: 1e-6,
            emissions_kg: 1_227_780.21,
            lifetime_years: 20.0,
            hours_per_year: 365.0 * 24.0,
        }
    }
}

/// One row of a reduced table.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintRow {
    pub location: Location,
    pub power_output: f64,
    pub sed: f64,
    pub carbon_footprint: f64,
    pub emissions_carbon_capture: f64,
}

impl FootprintRow {
    pub const COLUMNS: [&'static str; 6] = [
        "lat",
        "lon",
        POWER_OUTPUT,
        SED,
        "carbon_footprint",
        "emissions_carbon_capture",
    ];

    /// Derives the footprint from a location's summed power output and
    /// energy demand. Missing sums count as zero.
    pub fn new(location: Location, power_output: f64, sed: f64, settings: &FootprintSettings) -> Self {
        let power_output = power_output + settings.epsilon;
        let carbon_footprint =
            settings.emissions_kg / (power_output * settings.lifetime_years / 1000.0);
        let sed = sed / settings.hours_per_year;

        FootprintRow {
            location,
            power_output,
            sed,
            carbon_footprint,
            emissions_carbon_capture: carbon_footprint * sed,
        }
    }
}

/// One footprint row per location, in (lat, lon) order.
pub fn footprint(totals: &LocationTotals, settings: &FootprintSettings) -> Vec<FootprintRow> {
    totals
        .iter()
        .map(|(location, columns)| {
            FootprintRow::new(
                *location,
                columns.get(POWER_OUTPUT).copied().unwrap_or(0.0),
                columns.get(SED).copied().unwrap_or(0.0),
                settings,
            )
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_derive_footprint() {
        let settings = FootprintSettings::default();

        let row = FootprintRow::new(Location::new(0.0, 0.0), 2_000_000.0, 8760.0 * 5.0, &settings);

        let expected = 1_227_780.21 / ((2_000_000.0 + 1e-6) * 20.0 / 1000.0);
        assert!((row.carbon_footprint - expected).abs() < 1e-9);
        assert_eq!(row.sed, 5.0);
        assert!((row.emissions_carbon_capture - expected * 5.0).abs() < 1e-9);
    }

    #[test]
    fn should_stay_finite_without_power() {
        let row = FootprintRow::new(Location::new(1.0, 1.0), 0.0, 0.0, &FootprintSettings::default());

        assert!(row.carbon_footprint.is_finite());
        assert_eq!(row.power_output, 1e-6);
        assert_eq!(row.emissions_carbon_capture, 0.0);
    }

    #[test]
    fn should_treat_missing_sed_as_zero() {
        let mut totals = LocationTotals::new();
        totals.add(Location::new(10.0, 20.0), POWER_OUTPUT, 500.0);
        totals.add(Location::new(-10.0, 20.0), POWER_OUTPUT, 100.0);
        totals.add(Location::new(-10.0, 20.0), SED, 8760.0);

        let rows = footprint(&totals, &FootprintSettings::default());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].location, Location::new(-10.0, 20.0));
        assert_eq!(rows[0].sed, 1.0);
        assert_eq!(rows[1].sed, 0.0);
    }
}
