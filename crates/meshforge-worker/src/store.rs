//! Job store and lifecycle manager.
//!
//! The only owner of job records. Every transition goes through here and is
//! checked against the state machine; mutations on one id are serialized by
//! the shard lock of the underlying map, distinct ids do not contend.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use meshforge_converter::{ConversionRequest, FormatRegistry, ParameterValidator, ValidationError};
use meshforge_core::error::AppError;
use meshforge_core::types::JobId;
use meshforge_entity::{Artifact, FailureKind, Job, JobFailure, JobStatus, NewJob};

/// Job store failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobStoreError {
    /// The request was rejected before a job was created.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No visible job with this id.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// The job is not in a state that allows the operation.
    #[error("cannot {operation} job {id}: status is {status}")]
    InvalidState {
        /// Job id.
        id: JobId,
        /// Current status.
        status: JobStatus,
        /// Attempted operation.
        operation: &'static str,
    },
}

impl From<JobStoreError> for AppError {
    fn from(err: JobStoreError) -> Self {
        match err {
            JobStoreError::Validation(e) => e.into(),
            JobStoreError::NotFound(_) => AppError::not_found(err.to_string()),
            JobStoreError::InvalidState { .. } => AppError::invalid_state(err.to_string()),
        }
    }
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// Waiting for a worker.
    pub pending: usize,
    /// Being converted.
    pub in_progress: usize,
    /// Finished with an artifact.
    pub completed: usize,
    /// Finished with an error.
    pub failed: usize,
}

impl JobStats {
    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.failed
    }
}

/// In-memory job registry.
#[derive(Debug)]
pub struct JobStore {
    jobs: DashMap<JobId, Job>,
    validator: ParameterValidator,
    retention: chrono::Duration,
}

impl JobStore {
    /// Create a store that keeps terminal jobs for `retention`.
    pub fn new(validator: ParameterValidator, retention: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            validator,
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::MAX),
        }
    }

    /// The validator consulted by [`create`](Self::create).
    pub fn validator(&self) -> &ParameterValidator {
        &self.validator
    }

    fn expiry_from(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at.checked_add_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Validate `request` and register a Pending job for it.
    ///
    /// Nothing is stored when validation fails.
    pub fn create(&self, request: &ConversionRequest) -> Result<Job, JobStoreError> {
        self.validator.validate(request)?;
        Ok(self.insert(new_job(request)))
    }

    fn insert(&self, new: NewJob) -> Job {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            status: JobStatus::Pending,
            input_format: new.input_format,
            output_format: new.output_format,
            quality: new.quality,
            mode: new.mode,
            input_bytes: new.input_bytes,
            source_name: new.source_name,
            artifact: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            expires_at: self.expiry_from(now),
        };
        self.jobs.insert(job.id, job.clone());
        debug!(job_id = %job.id, mode = %job.mode, "Job created");
        job
    }

    /// Apply a transition under the entry lock.
    fn transition(
        &self,
        id: JobId,
        next: JobStatus,
        operation: &'static str,
        apply: impl FnOnce(&mut Job, DateTime<Utc>),
    ) -> Result<Job, JobStoreError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();
        if !job.status.can_transition_to(next) {
            return Err(JobStoreError::InvalidState {
                id,
                status: job.status,
                operation,
            });
        }

        let now = Utc::now();
        job.status = next;
        job.updated_at = now;
        if next.is_terminal() {
            job.completed_at = Some(now);
            job.expires_at = self.expiry_from(now);
        }
        apply(job, now);
        Ok(job.clone())
    }

    /// Pending → InProgress. At most once per job.
    pub fn start(&self, id: JobId) -> Result<Job, JobStoreError> {
        self.transition(id, JobStatus::InProgress, "start", |job, now| {
            job.started_at = Some(now);
        })
    }

    /// InProgress → Completed with the stored artifact.
    pub fn complete(&self, id: JobId, artifact: Artifact) -> Result<Job, JobStoreError> {
        let job = self.transition(id, JobStatus::Completed, "complete", |job, _| {
            job.artifact = Some(artifact);
        })?;
        info!(job_id = %id, duration_ms = job.duration_ms(), "Job completed");
        Ok(job)
    }

    /// Pending or InProgress → Failed.
    pub fn fail(&self, id: JobId, failure: JobFailure) -> Result<Job, JobStoreError> {
        let kind = failure.kind;
        let job = self.transition(id, JobStatus::Failed, "fail", |job, _| {
            job.error = Some(failure);
        })?;
        info!(job_id = %id, kind = %kind, "Job failed");
        Ok(job)
    }

    /// Pending → Failed with kind `Cancelled`. Running jobs cannot be cancelled.
    pub fn cancel(&self, id: JobId) -> Result<Job, JobStoreError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();
        if job.status != JobStatus::Pending {
            return Err(JobStoreError::InvalidState {
                id,
                status: job.status,
                operation: "cancel",
            });
        }

        let now = Utc::now();
        job.status = JobStatus::Failed;
        job.updated_at = now;
        job.completed_at = Some(now);
        job.expires_at = self.expiry_from(now);
        job.error = Some(JobFailure::new(
            FailureKind::Cancelled,
            "cancelled before a worker started it",
        ));
        info!(job_id = %id, "Job cancelled");
        Ok(job.clone())
    }

    /// Snapshot of a visible job.
    pub fn get(&self, id: JobId) -> Result<Job, JobStoreError> {
        let job = self.jobs.get(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.is_expired(Utc::now()) {
            return Err(JobStoreError::NotFound(id));
        }
        Ok(job.clone())
    }

    /// Remove every terminal job whose expiry is at or before `now`.
    ///
    /// The removed jobs are returned so the caller can delete their artifacts.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<Job> {
        let expired: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        let removed: Vec<Job> = expired
            .into_iter()
            .filter_map(|id| {
                self.jobs
                    .remove_if(&id, |_, job| job.is_expired(now))
                    .map(|(_, job)| job)
            })
            .collect();

        if !removed.is_empty() {
            info!(count = removed.len(), "Swept expired jobs");
        }
        removed
    }

    /// Counts per status, including expired jobs not yet swept.
    pub fn stats(&self) -> JobStats {
        let mut stats = JobStats::default();
        for entry in self.jobs.iter() {
            match entry.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::InProgress => stats.in_progress += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no jobs are stored.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn new_job(request: &ConversionRequest) -> NewJob {
    let canonical = |format: &str| {
        FormatRegistry::canonical(format)
            .map(str::to_string)
            .unwrap_or_else(|| format.to_ascii_lowercase())
    };
    NewJob {
        input_format: canonical(&request.input_format),
        output_format: canonical(&request.output_format),
        quality: request.quality,
        mode: request.mode,
        input_bytes: request.input_bytes(),
        source_name: request.source_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use meshforge_core::config::ConversionLimits;
    use meshforge_core::types::ArtifactId;

    fn store(retention: Duration) -> JobStore {
        JobStore::new(ParameterValidator::new(ConversionLimits::default()), retention)
    }

    fn request() -> ConversionRequest {
        ConversionRequest::new(&b"ISO-10303-21;"[..], "STP", "stl").with_source_name("part.stp")
    }

    fn artifact(job_id: JobId) -> Artifact {
        Artifact {
            id: ArtifactId::new(),
            job_id,
            format: "stl".into(),
            mime_type: "model/stl".into(),
            size_bytes: 684,
            storage_path: format!("artifacts/{job_id}/x.stl"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_canonicalizes_and_sets_expiry() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.input_format, "step");
        assert_eq!(job.input_bytes, 13);
        assert_eq!(job.expires_at, job.created_at + chrono::Duration::seconds(60));
        assert_eq!(s.get(job.id).unwrap(), job);
    }

    #[test]
    fn test_invalid_request_creates_nothing() {
        let s = store(Duration::from_secs(60));
        let err = s.create(&request().with_deflection(10.0)).unwrap_err();
        assert!(matches!(
            err,
            JobStoreError::Validation(ValidationError::DeflectionOutOfRange { .. })
        ));
        assert!(s.is_empty());
    }

    #[test]
    fn test_full_lifecycle() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();

        let started = s.start(job.id).unwrap();
        assert_eq!(started.status, JobStatus::InProgress);
        assert!(started.started_at.is_some());

        let done = s.complete(job.id, artifact(job.id)).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        let completed_at = done.completed_at.unwrap();
        assert_eq!(done.expires_at, completed_at + chrono::Duration::seconds(60));
        assert!(done.artifact.is_some());
    }

    #[test]
    fn test_start_is_at_most_once() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();
        s.start(job.id).unwrap();
        assert!(matches!(
            s.start(job.id),
            Err(JobStoreError::InvalidState {
                status: JobStatus::InProgress,
                ..
            })
        ));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();
        s.fail(job.id, JobFailure::new(FailureKind::DecodeError, "bad")).unwrap();

        assert!(s.start(job.id).is_err());
        assert!(s.complete(job.id, artifact(job.id)).is_err());
        assert!(s.fail(job.id, JobFailure::new(FailureKind::Timeout, "x")).is_err());
        assert_eq!(s.get(job.id).unwrap().error.unwrap().kind, FailureKind::DecodeError);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();
        assert!(matches!(
            s.complete(job.id, artifact(job.id)),
            Err(JobStoreError::InvalidState { operation: "complete", .. })
        ));
    }

    #[test]
    fn test_unknown_id() {
        let s = store(Duration::from_secs(60));
        let id = JobId::new();
        assert_eq!(s.get(id), Err(JobStoreError::NotFound(id)));
        assert_eq!(s.start(id), Err(JobStoreError::NotFound(id)));
        assert_eq!(s.cancel(id), Err(JobStoreError::NotFound(id)));
    }

    #[test]
    fn test_cancel_only_pending() {
        let s = store(Duration::from_secs(60));
        let job = s.create(&request()).unwrap();
        let cancelled = s.cancel(job.id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
        assert_eq!(cancelled.error.unwrap().kind, FailureKind::Cancelled);

        let running = s.create(&request()).unwrap();
        s.start(running.id).unwrap();
        assert!(matches!(
            s.cancel(running.id),
            Err(JobStoreError::InvalidState { operation: "cancel", .. })
        ));
    }

    #[test]
    fn test_expired_jobs_hidden_then_swept() {
        let s = store(Duration::ZERO);
        let done = s.create(&request()).unwrap();
        s.start(done.id).unwrap();
        s.complete(done.id, artifact(done.id)).unwrap();

        let pending = s.create(&request()).unwrap();

        assert_eq!(s.get(done.id), Err(JobStoreError::NotFound(done.id)));
        assert!(s.get(pending.id).is_ok());

        let swept = s.sweep(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, done.id);
        assert!(s.get(pending.id).is_ok());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_sweep_keeps_unexpired() {
        let s = store(Duration::from_secs(3600));
        let job = s.create(&request()).unwrap();
        s.cancel(job.id).unwrap();
        assert!(s.sweep(Utc::now()).is_empty());
        assert_eq!(s.stats().failed, 1);
    }

    #[test]
    fn test_concurrent_starts_single_winner() {
        let s = Arc::new(store(Duration::from_secs(60)));
        let job = s.create(&request()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || s.start(job.id).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_stats() {
        let s = store(Duration::from_secs(60));
        let a = s.create(&request()).unwrap();
        let b = s.create(&request()).unwrap();
        s.create(&request()).unwrap();
        s.start(a.id).unwrap();
        s.cancel(b.id).unwrap();

        let stats = s.stats();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_error_kinds() {
        let id = JobId::new();
        let not_found: AppError = JobStoreError::NotFound(id).into();
        assert_eq!(not_found.kind, meshforge_core::error::ErrorKind::NotFound);

        let invalid: AppError = JobStoreError::InvalidState {
            id,
            status: JobStatus::Completed,
            operation: "cancel",
        }
        .into();
        assert_eq!(invalid.kind, meshforge_core::error::ErrorKind::InvalidState);
    }
}
