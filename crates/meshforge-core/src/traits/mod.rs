//! Core traits defined in `meshforge-core` and implemented by other crates.

pub mod storage;

pub use storage::StorageProvider;
