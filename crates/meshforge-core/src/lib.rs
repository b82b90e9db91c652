//! # meshforge-core
//!
//! Core crate for MeshForge. Contains the unified error system, the
//! configuration schemas and loader, typed identifiers, and the storage
//! provider trait implemented by `meshforge-storage`.
//!
//! This crate has **no** internal dependencies on other MeshForge crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
