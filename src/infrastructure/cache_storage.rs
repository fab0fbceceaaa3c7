// Cache storage backends: in-memory map and one-file-per-key directory
use crate::application::ttl_cache::CacheStorage;
use crate::domain::error::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Entries persisted as `<dir>/<url-encoded key>.json`, surviving restarts.
#[derive(Debug, Clone)]
pub struct FileCacheStorage {
    dir: PathBuf,
}

impl FileCacheStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl CacheStorage for FileCacheStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: String) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_overwrites() {
        let storage = MemoryCacheStorage::new();
        assert_eq!(storage.read("k").await.unwrap(), None);

        storage.write("k", "1".to_string()).await.unwrap();
        storage.write("k", "2".to_string()).await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_file_storage_round_trips_awkward_keys() {
        let dir = std::env::temp_dir().join(format!("dashboard-cache-{}", std::process::id()));
        let storage = FileCacheStorage::new(&dir);

        assert_eq!(storage.read("sleeper:league/1").await.unwrap(), None);
        storage
            .write("sleeper:league/1", "{\"v\":1}".to_string())
            .await
            .unwrap();
        assert_eq!(
            storage.read("sleeper:league/1").await.unwrap().as_deref(),
            Some("{\"v\":1}")
        );
        assert!(dir.join("sleeper%3Aleague%2F1.json").is_file());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
