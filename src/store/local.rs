//! Object store on the local file system.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

use super::ObjectStore;

/// Keys are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }

    /// Maps a key to a path under the root. Keys may not climb out of it.
    pub fn path_of(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.path_of(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &bytes).await?;
        debug!(key, bytes = bytes.len(), "stored object");

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        if !fs::try_exists(&self.root).await? {
            return Ok(keys);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(key) = key_of(&self.root, &path) else {
                    continue;
                };
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();

        Ok(keys)
    }
}

fn key_of(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();

    Some(parts?.join("/"))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn should_store_and_fetch_nested_key() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        store
            .store("output/Germany/a.parquet", Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let bytes = store.fetch("output/Germany/a.parquet").await.unwrap();
        assert_eq!(&bytes[..], b"abc");
        assert!(dir.path().join("output").join("Germany").join("a.parquet").exists());
    }

    #[tokio::test]
    async fn should_report_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let result = store.fetch("nothing/here").await;

        assert!(matches!(result, Err(StoreError::NotFound(key)) if key == "nothing/here"));
    }

    #[tokio::test]
    async fn should_reject_keys_outside_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        for key in ["../escape", "/etc/passwd", "", "a/../../b"] {
            assert!(
                matches!(store.fetch(key).await, Err(StoreError::InvalidKey(_))),
                "{}",
                key
            );
        }
    }

    #[tokio::test]
    async fn should_list_sorted_keys_under_prefix() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        for key in [
            "World_2019/Spain/MERRA2_400.tavg1_2d_slv_Nx.20190102.nc4",
            "World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190102.nc4",
            "World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190101.nc4",
            "output/Germany/x.parquet",
        ] {
            store.store(key, Bytes::from_static(b"")).await.unwrap();
        }

        let keys = store.list("World_2019/").await.unwrap();

        assert_eq!(
            keys,
            vec![
                "World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190101.nc4",
                "World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190102.nc4",
                "World_2019/Spain/MERRA2_400.tavg1_2d_slv_Nx.20190102.nc4",
            ]
        );
    }

    #[tokio::test]
    async fn should_list_nothing_for_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("absent"));

        assert!(store.list("").await.unwrap().is_empty());
    }
}
