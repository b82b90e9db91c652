//! Storage provider trait for pluggable artifact backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for byte storage backends.
///
/// Paths are `/`-separated and relative to the provider root. Implementations
/// live in `meshforge-storage` (local filesystem and in-process memory).
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "memory").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an object into memory. Missing objects are `NotFound`.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to the given path, replacing any existing object.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Delete every object under a directory prefix.
    async fn delete_dir(&self, path: &str) -> AppResult<()>;

    /// Move an object from one path to another within this provider.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Check whether an object exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;
}
