//! Core type definitions used across the MeshForge workspace.

pub mod id;

pub use id::*;
