//! File-backed key-value store
//!
//! Each key lives in `<root>/<key>.json`. Writes go to a temporary sibling
//! first and are renamed into place, so a crash mid-write leaves the previous
//! value intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use agrilink_core::KeyValueStore;
use agrilink_domain::{AgriLinkError, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::errors::InfraError;

#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(AgriLinkError::InvalidInput(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

fn io_error(err: std::io::Error) -> AgriLinkError {
    InfraError::from(err).into()
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    #[instrument(skip(self, value), fields(key = %key, bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await.map_err(io_error)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value.as_bytes()).await.map_err(io_error)?;
        fs::rename(&temp_path, &path).await.map_err(io_error)?;

        debug!("stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }
}
