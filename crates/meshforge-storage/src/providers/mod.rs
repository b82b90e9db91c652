//! Storage provider implementations.

pub mod local;
pub mod memory;

use std::sync::Arc;

use meshforge_core::config::StorageConfig;
use meshforge_core::error::AppError;
use meshforge_core::result::AppResult;
use meshforge_core::traits::storage::StorageProvider;

pub use local::LocalStorageProvider;
pub use memory::MemoryStorageProvider;

/// Construct the provider named by `config.provider`.
pub async fn build_provider(config: &StorageConfig) -> AppResult<Arc<dyn StorageProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalStorageProvider::new(&config.data_root).await?)),
        "memory" => Ok(Arc::new(MemoryStorageProvider::new())),
        other => Err(AppError::configuration(format!(
            "Unknown storage provider '{other}' (expected 'local' or 'memory')"
        ))),
    }
}
