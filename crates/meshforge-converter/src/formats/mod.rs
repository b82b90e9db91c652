//! Format registry: which identifiers the service accepts and produces.

pub mod registry;

pub use registry::{Direction, FormatRegistry, FormatSpec};
