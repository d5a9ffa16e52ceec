use std::{collections::BTreeSet, fmt};

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};

use crate::{
    cli::create_spinner,
    grid::{group_by_location, DuplicatePolicy, ObservationGrid},
    parquet::read_grid,
    reading::{fields::INPUT_FIELDS, FileProperties},
};

use super::Context;

/// Shape of one input grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridShape {
    pub key: String,
    pub properties: Option<FileProperties>,
    pub records: usize,
    pub locations: usize,
    pub time_steps: usize,
    pub duplicates: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub fields: Vec<String>,
    /// Model inputs the grid does not have.
    pub missing: Vec<String>,
}

impl GridShape {
    pub fn of(key: &str, grid: &ObservationGrid) -> Result<Self> {
        // count duplicates instead of failing on them
        let groups = group_by_location(grid, DuplicatePolicy::LastWriteWins)?;
        let times: BTreeSet<DateTime<Utc>> = grid.keys().map(|key| key.time).collect();
        let missing = INPUT_FIELDS
            .iter()
            .filter(|field| grid.column(field).is_none())
            .map(|field| field.to_string())
            .collect();

        Ok(GridShape {
            key: key.to_string(),
            properties: FileProperties::from_key(key).ok(),
            records: grid.len(),
            locations: groups.len(),
            time_steps: times.len(),
            duplicates: groups.duplicates(),
            first: times.first().copied(),
            last: times.last().copied(),
            fields: grid.fields().to_vec(),
            missing,
        })
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.key)?;
        if let Some(p) = &self.properties {
            writeln!(
                f,
                "  country: {}, stream: {}, collection: {}, date: {}",
                p.country.as_deref().unwrap_or("-"),
                p.stream.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                p.collection,
                p.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
            )?;
        }
        writeln!(f, "  records: {}", self.records)?;
        writeln!(f, "  locations: {}", self.locations)?;
        writeln!(f, "  time steps: {}", self.time_steps)?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            writeln!(f, "  period: {} to {}", first, last)?;
        }
        writeln!(f, "  duplicate keys: {}", self.duplicates)?;
        write!(f, "  fields: {}", self.fields.join(", "))?;
        if !self.missing.is_empty() {
            write!(f, "\n  missing inputs: {}", self.missing.join(", "))?;
        }

        Ok(())
    }
}

/// Fetches and reads one input file and describes it.
pub async fn inspect(context: &Context, key: &str) -> Result<GridShape> {
    let bar = create_spinner(format!("Reading {}...", key));
    let bytes = context
        .input
        .fetch(&context.input_key(key))
        .await
        .with_context(|| format!("Failed to fetch `{}`", key))?;
    let grid = read_grid(bytes)?;
    bar.finish_and_clear();

    GridShape::of(key, &grid)
}

// -- Tests -------------------------------------------------------------------
