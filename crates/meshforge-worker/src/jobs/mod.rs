//! Periodic maintenance tasks.

pub mod retention;
pub mod temp_cleanup;

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Serialize;

use meshforge_core::result::AppResult;

pub use retention::RetentionSweepTask;
pub use temp_cleanup::TempCleanupTask;

/// Outcome of one maintenance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Task that ran.
    pub task: &'static str,
    /// Items removed.
    pub removed: usize,
}

/// A task the maintenance scheduler runs on an interval.
#[async_trait]
pub trait MaintenanceTask: Send + Sync + Debug + 'static {
    /// Stable task name.
    fn name(&self) -> &'static str;

    /// Run once.
    async fn run(&self) -> AppResult<MaintenanceReport>;
}
