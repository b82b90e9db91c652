//! Conversion metrics.
//!
//! Counters are atomics; recent durations are kept in a bounded ring for
//! P50/P95/P99.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use meshforge_entity::FailureKind;

/// Maximum number of duration samples to keep in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Conversion metrics collector, shared by the pipeline and the dispatcher.
#[derive(Debug, Default)]
pub struct ConversionMetrics {
    conversions_started: AtomicU64,
    conversions_succeeded: AtomicU64,
    conversions_failed: AtomicU64,
    conversions_timed_out: AtomicU64,
    kernel_faults: AtomicU64,
    conversions_cancelled: AtomicU64,
    capacity_rejections: AtomicU64,
    total_input_bytes: AtomicU64,
    total_output_bytes: AtomicU64,
    duration_samples: Mutex<VecDeque<Duration>>,
}

impl ConversionMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversion began executing.
    pub fn record_started(&self, input_bytes: u64) {
        self.conversions_started.fetch_add(1, Ordering::Relaxed);
        self.total_input_bytes
            .fetch_add(input_bytes, Ordering::Relaxed);
    }

    /// A conversion produced an artifact.
    pub fn record_success(&self, duration: Duration, output_bytes: u64) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_output_bytes
            .fetch_add(output_bytes, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// A job ended failed.
    pub fn record_failure(&self, kind: FailureKind) {
        match kind {
            FailureKind::Cancelled => {
                self.conversions_cancelled.fetch_add(1, Ordering::Relaxed);
                return;
            }
            FailureKind::Timeout => {
                self.conversions_timed_out.fetch_add(1, Ordering::Relaxed);
            }
            FailureKind::KernelFault => {
                self.kernel_faults.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A submission was turned away for lack of capacity.
    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(duration);
        }
    }

    /// Current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut durations: Vec<Duration> = self
            .duration_samples
            .lock()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        durations.sort();

        MetricsSnapshot {
            conversions_started: self.conversions_started.load(Ordering::Relaxed),
            conversions_succeeded: self.conversions_succeeded.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            conversions_timed_out: self.conversions_timed_out.load(Ordering::Relaxed),
            kernel_faults: self.kernel_faults.load(Ordering::Relaxed),
            conversions_cancelled: self.conversions_cancelled.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            total_input_bytes: self.total_input_bytes.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            duration_p50: percentile(&durations, 50),
            duration_p95: percentile(&durations, 95),
            duration_p99: percentile(&durations, 99),
            sample_count: durations.len() as u64,
        }
    }
}

fn percentile(sorted: &[Duration], pct: usize) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let index = ((sorted.len() - 1) * pct) / 100;
    sorted.get(index).copied()
}

/// Point-in-time metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Conversions that began executing.
    pub conversions_started: u64,
    /// Conversions that produced an artifact.
    pub conversions_succeeded: u64,
    /// Conversions that ended failed (including timeouts and kernel faults).
    pub conversions_failed: u64,
    /// Failures due to the wall-clock bound.
    pub conversions_timed_out: u64,
    /// Failures due to a crashed kernel or conversion task.
    pub kernel_faults: u64,
    /// Pending jobs cancelled before starting.
    pub conversions_cancelled: u64,
    /// Submissions rejected with a capacity error.
    pub capacity_rejections: u64,
    /// Input bytes of started conversions.
    pub total_input_bytes: u64,
    /// Artifact bytes written.
    pub total_output_bytes: u64,
    /// P50 successful conversion duration.
    #[serde(with = "opt_millis")]
    pub duration_p50: Option<Duration>,
    /// P95 successful conversion duration.
    #[serde(with = "opt_millis")]
    pub duration_p95: Option<Duration>,
    /// P99 successful conversion duration.
    #[serde(with = "opt_millis")]
    pub duration_p99: Option<Duration>,
    /// Number of duration samples behind the percentiles.
    pub sample_count: u64,
}

/// Optional durations as whole milliseconds.
mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let m = ConversionMetrics::new();
        m.record_started(100);
        m.record_started(50);
        m.record_success(Duration::from_secs(5), 1000);
        m.record_failure(FailureKind::GeometryError);

        let snap = m.snapshot();
        assert_eq!(snap.conversions_started, 2);
        assert_eq!(snap.conversions_succeeded, 1);
        assert_eq!(snap.conversions_failed, 1);
        assert_eq!(snap.total_input_bytes, 150);
        assert_eq!(snap.total_output_bytes, 1000);
    }

    #[test]
    fn test_failure_kinds() {
        let m = ConversionMetrics::new();
        m.record_failure(FailureKind::Timeout);
        m.record_failure(FailureKind::KernelFault);
        m.record_failure(FailureKind::Cancelled);
        m.record_capacity_rejection();

        let snap = m.snapshot();
        assert_eq!(snap.conversions_timed_out, 1);
        assert_eq!(snap.kernel_faults, 1);
        assert_eq!(snap.conversions_failed, 2);
        assert_eq!(snap.conversions_cancelled, 1);
        assert_eq!(snap.capacity_rejections, 1);
    }

    #[test]
    fn test_metrics_percentiles() {
        let m = ConversionMetrics::new();
        for i in 1..=100 {
            m.record_success(Duration::from_millis(i * 10), 100);
        }

        let snap = m.snapshot();
        let p50 = snap.duration_p50.expect("p50");
        let p95 = snap.duration_p95.expect("p95");
        let p99 = snap.duration_p99.expect("p99");
        assert!(p50 < p95 && p95 <= p99);
        assert_eq!(snap.sample_count, 100);
    }

    #[test]
    fn test_metrics_empty_percentiles() {
        let snap = ConversionMetrics::new().snapshot();
        assert!(snap.duration_p50.is_none());
        assert!(snap.duration_p99.is_none());
    }

    #[test]
    fn test_sample_ring_is_bounded() {
        let m = ConversionMetrics::new();
        for _ in 0..(MAX_DURATION_SAMPLES + 10) {
            m.record_success(Duration::from_millis(1), 1);
        }
        assert_eq!(m.snapshot().sample_count, MAX_DURATION_SAMPLES as u64);
    }

    #[test]
    fn test_snapshot_serialization() {
        let m = ConversionMetrics::new();
        m.record_success(Duration::from_secs(3), 500);
        let json = serde_json::to_value(m.snapshot()).expect("serialize");
        assert_eq!(json["duration_p50"], 3000);
        let back: MetricsSnapshot = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.duration_p50, Some(Duration::from_secs(3)));
    }
}
