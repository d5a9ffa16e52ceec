//! Columnar storage for a flat `time × lat × lon` table.

use chrono::{DateTime, Utc};

use crate::{
    error::{GridError, Result},
    reading::Location,
};

/// Key of one record in an observation grid.
///
/// Orders by time, then latitude, then longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridKey {
    pub time: DateTime<Utc>,
    pub location: Location,
}

/// A flat table of records keyed by (time, lat, lon), one numeric column per
/// named field. Row order is the order the records were read in.
#[derive(Debug, Clone, Default)]
pub struct ObservationGrid {
    times: Vec<DateTime<Utc>>,
    locations: Vec<Location>,
    fields: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ObservationGrid {
    /// Creates an empty grid with the given field names.
    #[cfg(test)]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let columns = vec![Vec::new(); fields.len()];

        ObservationGrid {
            times: Vec::new(),
            locations: Vec::new(),
            fields,
            columns,
        }
    }

    /// Builds a grid from whole columns, as read from a columnar file.
    pub fn from_columns(
        times: Vec<DateTime<Utc>>,
        locations: Vec<Location>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let expected = times.len();
        if locations.len() != expected {
            return Err(GridError::ColumnLength {
                name: "location".to_string(),
                expected,
                actual: locations.len(),
            });
        }
        if let Some(row) = locations.iter().position(|l| !l.is_valid()) {
            return Err(GridError::InvalidCoordinate { row });
        }

        let mut grid = ObservationGrid {
            times,
            locations,
            fields: Vec::with_capacity(columns.len()),
            columns: Vec::with_capacity(columns.len()),
        };
        for (name, values) in columns {
            grid.add_column(&name, values)?;
        }

        Ok(grid)
    }

    /// Appends one record. `values` follow the order of [`Self::fields`].
    #[cfg(test)]
    pub fn push_record(
        &mut self,
        time: DateTime<Utc>,
        location: Location,
        values: &[f64],
    ) -> Result<()> {
        if values.len() != self.fields.len() {
            return Err(GridError::Schema(format!(
                "record has {} values for {} fields",
                values.len(),
                self.fields.len()
            )));
        }
        if !location.is_valid() {
            return Err(GridError::InvalidCoordinate { row: self.len() });
        }

        self.times.push(time);
        self.locations.push(location);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(*value);
        }

        Ok(())
    }

    /// Adds a new named column. Existing columns are never replaced.
    pub fn add_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if self.fields.iter().any(|f| f == name) {
            return Err(GridError::FieldExists(name.to_string()));
        }
        if values.len() != self.len() {
            return Err(GridError::ColumnLength {
                name: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }

        self.fields.push(name.to_string());
        self.columns.push(values);

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn time(&self, row: usize) -> DateTime<Utc> {
        self.times[row]
    }

    pub fn location(&self, row: usize) -> Location {
        self.locations[row]
    }

    pub fn key(&self, row: usize) -> GridKey {
        GridKey {
            time: self.times[row],
            location: self.locations[row],
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = GridKey> + '_ {
        (0..self.len()).map(|row| self.key(row))
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.fields
            .iter()
            .position(|f| f == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Like [`Self::column`] but a missing field is an error.
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| GridError::MissingField(name.to_string()))
    }

    /// A new grid holding only the given rows, in the given order.
    #[cfg(test)]
    pub fn select(&self, rows: &[usize]) -> ObservationGrid {
        ObservationGrid {
            times: rows.iter().map(|&r| self.times[r]).collect(),
            locations: rows.iter().map(|&r| self.locations[r]).collect(),
            fields: self.fields.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| rows.iter().map(|&r| c[r]).collect())
                .collect(),
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 1, h, 30, 0).unwrap()
    }

    #[test]
    fn should_push_and_read_records() {
        let mut grid = ObservationGrid::new(["PS", "T2M"]);
        grid.push_record(hour(0), Location::new(1.0, 2.0), &[100.0, 280.0])
            .unwrap();
        grid.push_record(hour(1), Location::new(1.0, 2.0), &[101.0, 281.0])
            .unwrap();

        assert_eq!(grid.len(), 2);
        assert_eq!(grid.column("T2M").unwrap(), &[280.0, 281.0]);
        assert_eq!(grid.key(1).time, hour(1));
        assert!(grid.column("QV2M").is_none());
    }

    #[test]
    fn should_reject_record_with_wrong_width() {
        let mut grid = ObservationGrid::new(["PS", "T2M"]);
        let result = grid.push_record(hour(0), Location::new(1.0, 2.0), &[100.0]);

        assert!(matches!(result, Err(GridError::Schema(_))));
    }

    #[test]
    fn should_reject_nan_coordinates() {
        let result = ObservationGrid::from_columns(
            vec![hour(0), hour(1)],
            vec![Location::new(1.0, 2.0), Location::new(f64::NAN, 2.0)],
            vec![("PS".to_string(), vec![1.0, 2.0])],
        );

        assert!(matches!(result, Err(GridError::InvalidCoordinate { row: 1 })));
    }

    #[test]
    fn should_not_overwrite_existing_column() {
        let mut grid = ObservationGrid::new(["PS"]);
        grid.push_record(hour(0), Location::new(1.0, 2.0), &[100.0])
            .unwrap();

        assert!(matches!(
            grid.add_column("PS", vec![0.0]),
            Err(GridError::FieldExists(_))
        ));
        assert!(matches!(
            grid.add_column("X", vec![0.0, 1.0]),
            Err(GridError::ColumnLength { .. })
        ));
    }

    #[test]
    fn should_select_rows() {
        let mut grid = ObservationGrid::new(["PS"]);
        for h in 0..4 {
            grid.push_record(hour(h), Location::new(1.0, 2.0), &[h as f64])
                .unwrap();
        }

        let subset = grid.select(&[3, 1]);

        assert_eq!(subset.len(), 2);
        assert_eq!(subset.column("PS").unwrap(), &[3.0, 1.0]);
        assert_eq!(subset.time(0), hour(3));
    }

    #[test]
    fn should_order_keys_by_time_first() {
        let early = GridKey {
            time: hour(0),
            location: Location::new(50.0, 50.0),
        };
        let late = GridKey {
            time: hour(1),
            location: Location::new(-50.0, -50.0),
        };

        assert!(early < late);
    }
}
