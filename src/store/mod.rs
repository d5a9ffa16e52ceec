//! Object and summary stores.
//!
//! Commands never reach a storage backend directly. They are handed an
//! [`ObjectStore`] for input and output files and a [`SummaryStore`] for the
//! running per-location totals, both built once in `main`.

pub mod http;
pub mod local;
pub mod summary;

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{error::StoreError, grid::LocationTotals};

pub use http::HttpStore;
pub use local::LocalStore;
pub use summary::JsonSummaryStore;

/// Keyed blob storage. Keys use `/` as separator whatever the backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError>;

    async fn store(&self, key: &str, bytes: Bytes) -> Result<(), StoreError>;

    /// Every key starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Per-location running sums and the ledger of processed files.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Adds `totals` to the stored sums, inserting locations seen for the
    /// first time.
    async fn upsert(&self, totals: &LocationTotals) -> Result<(), StoreError>;

    async fn mark_completed(&self, keys: &[String]) -> Result<(), StoreError>;

    async fn completed(&self) -> Result<BTreeSet<String>, StoreError>;

    async fn load_all(&self) -> Result<LocationTotals, StoreError>;
}
