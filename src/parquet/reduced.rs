//! Export reduced footprint tables as CSV.

use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array},
    csv::Writer,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};

use crate::{error::Result, footprint::FootprintRow};

/// Writes one row per location with a header line.
pub fn save_reduced_csv(rows: &[FootprintRow], file_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(
        FootprintRow::COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));

    let column = |f: fn(&FootprintRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
    };
    let batch = RecordBatch::try_new(
        schema,
        vec![
            column(|r| r.location.lat),
            column(|r| r.location.lon),
            column(|r| r.power_output),
            column(|r| r.sed),
            column(|r| r.carbon_footprint),
            column(|r| r.emissions_carbon_capture),
        ],
    )?;

    let mut writer = Writer::new(File::create(file_path)?);
    writer.write(&batch)?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
