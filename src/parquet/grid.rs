//! Read a long-format observation grid from a parquet file.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, Float64Array, TimestampSecondArray},
    compute::cast,
    datatypes::{DataType, Schema, TimeUnit},
};
use chrono::{DateTime, Utc};
use parquet::{arrow::arrow_reader::ParquetRecordBatchReaderBuilder, file::reader::ChunkReader};
use tracing::debug;

use crate::{
    error::{GridError, Result},
    grid::ObservationGrid,
    reading::Location,
};

pub(super) const TIME: &[&str] = &["time"];
pub(super) const LAT: &[&str] = &["lat", "latitude"];
pub(super) const LON: &[&str] = &["lon", "longitude"];

/// Reads a grid with one row per (time, lat, lon) record.
///
/// `time` may be any timestamp unit or Int64 epoch seconds, `lat`/`lon` any
/// float type. Every other numeric column becomes a field, with nulls read as
/// NaN. Works on files and on in-memory `Bytes` alike.
pub fn read_grid<R: ChunkReader + 'static>(reader: R) -> Result<ObservationGrid> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
    let schema = builder.schema().clone();

    let time_idx = find_column(&schema, TIME)?;
    let lat_idx = find_column(&schema, LAT)?;
    let lon_idx = find_column(&schema, LON)?;

    let time_type = schema.field(time_idx).data_type();
    if !matches!(time_type, DataType::Timestamp(_, _) | DataType::Int64) {
        return Err(GridError::Schema(format!(
            "`time` must be a timestamp or Int64, found {}",
            time_type
        )));
    }
    for idx in [lat_idx, lon_idx] {
        let field = schema.field(idx);
        if !matches!(field.data_type(), DataType::Float32 | DataType::Float64) {
            return Err(GridError::Schema(format!(
                "`{}` must be a float column, found {}",
                field.name(),
                field.data_type()
            )));
        }
    }

    let mut field_columns = Vec::new();
    for (idx, field) in schema.fields().iter().enumerate() {
        if [time_idx, lat_idx, lon_idx].contains(&idx) {
            continue;
        }
        if field.data_type().is_numeric() {
            field_columns.push((idx, field.name().clone()));
        } else {
            debug!(column = %field.name(), data_type = %field.data_type(), "skipping non-numeric column");
        }
    }

    let reader = builder.build()?;

    let mut times = Vec::new();
    let mut locations = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); field_columns.len()];

    for batch in reader {
        let batch = batch?;

        let time = cast(batch.column(time_idx), &DataType::Timestamp(TimeUnit::Second, None))?;
        let time = downcast::<TimestampSecondArray>(&time, "time")?;
        for row in 0..time.len() {
            if time.is_null(row) {
                return Err(GridError::Schema(format!(
                    "null time at row {}",
                    times.len()
                )));
            }
            let timestamp = DateTime::<Utc>::from_timestamp(time.value(row), 0).ok_or_else(|| {
                GridError::Schema(format!("time out of range at row {}", times.len()))
            })?;
            times.push(timestamp);
        }

        let lat = to_f64(batch.column(lat_idx))?;
        let lon = to_f64(batch.column(lon_idx))?;
        locations.extend(lat.into_iter().zip(lon).map(|(lat, lon)| Location::new(lat, lon)));

        for ((idx, _), column) in field_columns.iter().zip(values.iter_mut()) {
            column.extend(to_f64(batch.column(*idx))?);
        }
    }

    debug!(records = times.len(), fields = field_columns.len(), "read grid");

    let columns = field_columns
        .into_iter()
        .map(|(_, name)| name)
        .zip(values)
        .collect();

    ObservationGrid::from_columns(times, locations, columns)
}

pub(super) fn find_column(schema: &Schema, names: &[&str]) -> Result<usize> {
    names
        .iter()
        .find_map(|name| schema.index_of(name).ok())
        .ok_or_else(|| GridError::Schema(format!("missing `{}` column", names[0])))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| GridError::Schema(format!("unexpected type for `{}`", name)))
}

/// Casts a numeric column to f64, with nulls as NaN.
pub(super) fn to_f64(array: &ArrayRef) -> Result<Vec<f64>> {
    let array: Arc<dyn Array> = cast(array, &DataType::Float64)?;
    let array = downcast::<Float64Array>(&array, "value")?;

    Ok(array
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::fs::File;

    use arrow::{
        array::{Float32Array, Int64Array, StringArray, TimestampMillisecondArray},
        datatypes::Field,
        record_batch::RecordBatch,
    };
    use bytes::Bytes;
    use chrono::TimeZone;
    use parquet::arrow::ArrowWriter;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::reading::fields::{PS, T2M};

    fn write_batch(batch: RecordBatch) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        buffer
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 9, 0, 30, 0).unwrap()
    }

    fn grid_batch() -> RecordBatch {
        let t0 = start().timestamp_millis();
        let hour = 3_600_000;
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Timestamp(TimeUnit::Millisecond, None), false),
            Field::new("lat", DataType::Float64, false),
            Field::new("lon", DataType::Float64, false),
            Field::new(PS, DataType::Float32, true),
            Field::new(T2M, DataType::Float64, true),
            Field::new("source", DataType::Utf8, false),
        ]));

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMillisecondArray::from(vec![t0, t0, t0 + hour, t0 + hour])),
                Arc::new(Float64Array::from(vec![47.5, 48.0, 47.5, 48.0])),
                Arc::new(Float64Array::from(vec![8.125, 8.125, 8.125, 8.125])),
                Arc::new(Float32Array::from(vec![Some(95000.0), None, Some(95100.0), Some(95200.0)])),
                Arc::new(Float64Array::from(vec![270.0, 271.0, 272.0, 273.0])),
                Arc::new(StringArray::from(vec!["a", "b", "c", "d"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn should_read_grid_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), write_batch(grid_batch())).unwrap();

        let grid = read_grid(File::open(file.path()).unwrap()).unwrap();

        assert_eq!(grid.len(), 4);
        assert_eq!(grid.fields(), &[PS.to_string(), T2M.to_string()]);
        assert_eq!(grid.time(0), start());
        assert_eq!(grid.time(2), start() + chrono::Duration::hours(1));
        assert_eq!(grid.location(1), Location::new(48.0, 8.125));
        assert_eq!(grid.column(T2M).unwrap(), &[270.0, 271.0, 272.0, 273.0]);
    }

    #[test]
    fn should_read_nulls_as_nan() {
        let grid = read_grid(Bytes::from(write_batch(grid_batch()))).unwrap();

        let ps = grid.column(PS).unwrap();
        assert_eq!(ps[0], 95000.0);
        assert!(ps[1].is_nan());
    }

    #[test]
    fn should_accept_epoch_seconds_and_long_coordinate_names() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Int64, false),
            Field::new("latitude", DataType::Float32, false),
            Field::new("longitude", DataType::Float32, false),
            Field::new(PS, DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![start().timestamp()])),
                Arc::new(Float32Array::from(vec![-3.5])),
                Arc::new(Float32Array::from(vec![120.625])),
                Arc::new(Float64Array::from(vec![101325.0])),
            ],
        )
        .unwrap();

        let grid = read_grid(Bytes::from(write_batch(batch))).unwrap();

        assert_eq!(grid.time(0), start());
        assert_eq!(grid.location(0), Location::new(-3.5, 120.625));
    }

    #[test]
    fn should_reject_missing_coordinate_column() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Int64, false),
            Field::new("lat", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![0])),
                Arc::new(Float64Array::from(vec![0.0])),
            ],
        )
        .unwrap();

        let result = read_grid(Bytes::from(write_batch(batch)));

        assert!(matches!(result, Err(GridError::Schema(msg)) if msg.contains("lon")));
    }

    #[test]
    fn should_reject_text_time_column() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Utf8, false),
            Field::new("lat", DataType::Float64, false),
            Field::new("lon", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["2019-01-09"])),
                Arc::new(Float64Array::from(vec![0.0])),
                Arc::new(Float64Array::from(vec![0.0])),
            ],
        )
        .unwrap();

        assert!(matches!(
            read_grid(Bytes::from(write_batch(batch))),
            Err(GridError::Schema(_))
        ));
    }
}
