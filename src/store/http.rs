//! Read-only object store over HTTP.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::error::StoreError;

use super::ObjectStore;

/// Upper bound on the buffer reserved from a `Content-Length` header.
const MAX_PREALLOCATION: u64 = 64 << 20;

/// Fetches keys relative to a base URL. Listing and writing are not
/// available over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    pub fn new(base: &str) -> Result<Self, StoreError> {
        // a base without a trailing slash would lose its last segment on join
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base = Url::parse(&base).map_err(|e| StoreError::Url(format!("{}: {}", base, e)))?;

        Ok(HttpStore {
            client: Client::new(),
            base,
        })
    }

    pub fn url_of(&self, key: &str) -> Result<Url, StoreError> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        self.base
            .join(key)
            .map_err(|e| StoreError::Url(format!("{}: {}", key, e)))
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError> {
        let url = self.url_of(key)?;
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(key.to_string())),
            status if !status.is_success() => {
                return Err(StoreError::Status {
                    key: key.to_string(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let mut buffer = BytesMut::with_capacity(initial_capacity(response.content_length()));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        debug!(%url, bytes = buffer.len(), "fetched object");

        Ok(buffer.freeze())
    }

    async fn store(&self, _key: &str, _bytes: Bytes) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unsupported("listing"))
    }
}

fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOCATION) as usize
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_join_keys_under_base_path() {
        let store = HttpStore::new("https://data.example.org/merra2").unwrap();

        let url = store
            .url_of("World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.nc4")
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://data.example.org/merra2/World_2019/Germany/MERRA2_400.tavg1_2d_slv_Nx.20190109.nc4"
        );
    }

    #[test]
    fn should_reject_bad_base_and_keys() {
        assert!(matches!(HttpStore::new("not a url"), Err(StoreError::Url(_))));

        let store = HttpStore::new("https://data.example.org/").unwrap();
        assert!(matches!(store.url_of("../secret"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.url_of("/root"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn should_cap_preallocation_from_content_length() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(1024)), 1024);
        assert_eq!(initial_capacity(Some(u64::MAX)), 64 << 20);
    }

    #[tokio::test]
    async fn should_refuse_writes_and_listing() {
        let store = HttpStore::new("https://data.example.org/").unwrap();

        assert!(matches!(
            store.store("a", Bytes::new()).await,
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(store.list("").await, Err(StoreError::Unsupported(_))));
    }
}
