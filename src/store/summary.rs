//! Summary store kept in a single JSON document.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::info;

use crate::{error::StoreError, grid::LocationTotals, reading::Location};

use super::SummaryStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    locations: Vec<LocationEntry>,
    #[serde(default)]
    completed: Vec<CompletedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocationEntry {
    location: Location,
    values: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletedFile {
    name: String,
    country: String,
}

/// Every call reads, changes and rewrites the document under one lock, so
/// concurrent upserts from the same process add up.
#[derive(Debug)]
pub struct JsonSummaryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSummaryStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Document, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, serde_json::to_vec_pretty(document)?).await?;
        fs::rename(&temp, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl SummaryStore for JsonSummaryStore {
    async fn upsert(&self, totals: &LocationTotals) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;

        let mut stored = LocationTotals::new();
        for entry in &document.locations {
            for (column, value) in &entry.values {
                stored.add(entry.location, column, *value);
            }
        }
        stored.merge(totals);

        document.locations = stored
            .iter()
            .map(|(location, values)| LocationEntry {
                location: *location,
                values: values.clone(),
            })
            .collect();
        self.write(&document).await?;
        info!(locations = totals.len(), "upserted location totals");

        Ok(())
    }

    async fn mark_completed(&self, keys: &[String]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;

        for key in keys {
            let country = key.split('/').next().unwrap_or_default().to_string();
            document.completed.push(CompletedFile {
                name: key.clone(),
                country,
            });
        }
        self.write(&document).await
    }

    async fn completed(&self) -> Result<BTreeSet<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.read().await?;

        Ok(document.completed.into_iter().map(|f| f.name).collect())
    }

    async fn load_all(&self) -> Result<LocationTotals, StoreError> {
        let _guard = self.lock.lock().await;
        let document = self.read().await?;

        let mut totals = LocationTotals::new();
        for entry in document.locations {
            for (column, value) in entry.values {
                totals.add(entry.location, &column, value);
            }
        }

        Ok(totals)
    }
}

// -- Tests -------------------------------------------------------------------
