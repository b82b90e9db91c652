//! In-process storage provider backed by a concurrent map.
//!
//! Useful for tests and for deployments where artifacts only need to live as
//! long as the process.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use meshforge_core::error::AppError;
use meshforge_core::result::AppResult;
use meshforge_core::traits::storage::StorageProvider;

/// Memory storage provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageProvider {
    objects: Arc<DashMap<String, Bytes>>,
}

impl MemoryStorageProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn key(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        self.objects
            .get(&Self::key(path))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("File not found: {path}")))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        self.objects.insert(Self::key(path), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        self.objects.remove(&Self::key(path));
        Ok(())
    }

    async fn delete_dir(&self, path: &str) -> AppResult<()> {
        let prefix = format!("{}/", Self::key(path).trim_end_matches('/'));
        self.objects.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let (_, data) = self
            .objects
            .remove(&Self::key(from))
            .ok_or_else(|| AppError::not_found(format!("File not found: {from}")))?;
        self.objects.insert(Self::key(to), data);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(self.objects.contains_key(&Self::key(path)))
    }
}
