//! Job lifecycle and execution for MeshForge.
//!
//! This crate provides:
//! - The job store, sole owner of job records and their state machine
//! - The execution dispatcher, a bounded pool serving sync and async work
//! - Maintenance tasks (retention sweep, scratch cleanup) and the interval
//!   scheduler that runs them

pub mod dispatcher;
pub mod jobs;
pub mod scheduler;
pub mod store;

pub use dispatcher::{DispatcherSettings, ExecutionDispatcher};
pub use jobs::{MaintenanceReport, MaintenanceTask, RetentionSweepTask, TempCleanupTask};
pub use scheduler::MaintenanceScheduler;
pub use store::{JobStats, JobStore, JobStoreError};
