//! # meshforge-storage
//!
//! Artifact persistence for MeshForge. The [`ArtifactStore`] keys converted
//! meshes by artifact id under their owning job, on top of a pluggable
//! [`StorageProvider`](meshforge_core::traits::StorageProvider).

pub mod artifact;
pub mod providers;

pub use artifact::{ArtifactKind, ArtifactStore};
pub use providers::{LocalStorageProvider, MemoryStorageProvider, build_provider};
