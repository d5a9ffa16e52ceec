//! Save aggregated output grids and read per-location totals back.

use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Builder, TimestampSecondBuilder},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::{Compression, ZstdLevel},
    file::{properties::WriterProperties, reader::ChunkReader},
};

use crate::{
    error::Result,
    grid::{IndexScheme, LocationTotals, OutputGrid},
    reading::Location,
};

use super::grid::{find_column, to_f64, LAT, LON, TIME};

const CHUNK_SIZE: usize = 100000;

/// Writes `output` as `time, lat, lon, <columns…>` for the full scheme or
/// `lat, lon, <columns…>` for the summary scheme.
pub fn save_output(output: &OutputGrid, file_path: &Path) -> Result<()> {
    let full = output.scheme() == IndexScheme::Full;

    let mut fields = Vec::with_capacity(output.columns().len() + 3);
    if full {
        fields.push(Field::new(
            "time",
            DataType::Timestamp(TimeUnit::Second, None),
            false,
        ));
    }
    fields.push(Field::new("lat", DataType::Float64, false));
    fields.push(Field::new("lon", DataType::Float64, false));
    for column in output.columns() {
        fields.push(Field::new(column, DataType::Float64, true));
    }
    let schema = Arc::new(Schema::new(fields));

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();

    let file = File::create(file_path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    for rows in output.rows().chunks(CHUNK_SIZE) {
        let mut time_builder = TimestampSecondBuilder::with_capacity(rows.len());
        let mut lat_builder = Float64Builder::with_capacity(rows.len());
        let mut lon_builder = Float64Builder::with_capacity(rows.len());
        let mut value_builders: Vec<Float64Builder> = output
            .columns()
            .iter()
            .map(|_| Float64Builder::with_capacity(rows.len()))
            .collect();

        for row in rows {
            if let Some(time) = row.time {
                time_builder.append_value(time.timestamp());
            }
            lat_builder.append_value(row.location.lat);
            lon_builder.append_value(row.location.lon);
            for (builder, value) in value_builders.iter_mut().zip(&row.values) {
                builder.append_value(*value);
            }
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        if full {
            columns.push(Arc::new(time_builder.finish()));
        }
        columns.push(Arc::new(lat_builder.finish()));
        columns.push(Arc::new(lon_builder.finish()));
        for mut builder in value_builders {
            columns.push(Arc::new(builder.finish()));
        }

        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        writer.write(&batch)?;
    }

    writer.close()?;

    Ok(())
}

/// Sums every value column of a saved output per location.
///
/// Works on either scheme: a full output is summed over its timestamps, a
/// summary output is read as is. NaN values are skipped.
pub fn read_totals<R: ChunkReader + 'static>(reader: R) -> Result<LocationTotals> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
    let schema = builder.schema().clone();

    let lat_idx = find_column(&schema, LAT)?;
    let lon_idx = find_column(&schema, LON)?;
    let time_idx = find_column(&schema, TIME).ok();

    let value_columns: Vec<(usize, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(idx, field)| {
            *idx != lat_idx
                && *idx != lon_idx
                && Some(*idx) != time_idx
                && field.data_type().is_numeric()
        })
        .map(|(idx, field)| (idx, field.name().clone()))
        .collect();

    let mut totals = LocationTotals::new();
    for batch in builder.build()? {
        let batch = batch?;
        let lat = to_f64(batch.column(lat_idx))?;
        let lon = to_f64(batch.column(lon_idx))?;
        let locations: Vec<Location> = lat
            .into_iter()
            .zip(lon)
            .map(|(lat, lon)| Location::new(lat, lon))
            .collect();

        for (idx, name) in &value_columns {
            let values = to_f64(batch.column(*idx))?;
            for (location, value) in locations.iter().zip(values) {
                totals.add(*location, name, value);
            }
        }
    }

    Ok(totals)
}

// -- Tests -------------------------------------------------------------------
