use serde::Serialize;
use std::sync::Mutex;

use crate::domain::error::{ErrorCode, TranscriptionError};

/// 文字起こしジョブのローカルメトリクス
pub struct TranscriptionMetrics {
    counters: Mutex<Counters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct Counters {
    jobs_submitted: u64,
    jobs_succeeded: u64,
    status_polls: u64,
    errors_request: u64,
    errors_job_failed: u64,
    errors_timeout: u64,
    errors_other: u64,
}

/// フェーズ別の所要時間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Submit,
    Poll,
    Fetch,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: Phase,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub jobs_submitted: u64,
    pub jobs_succeeded: u64,
    pub status_polls: u64,
    pub error_counts: ErrorCounts,
    pub avg_latency_ms: AvgLatency,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub request: u64,
    pub job_failed: u64,
    pub timeout: u64,
    pub other: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub submit: Option<f64>,
    pub poll: Option<f64>,
    pub fetch: Option<f64>,
}

const MAX_LATENCY_RECORDS: usize = 1000;

impl TranscriptionMetrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    fn with_counters(&self, f: impl FnOnce(&mut Counters)) {
        let mut c = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut c);
    }

    pub fn inc_jobs_submitted(&self) {
        self.with_counters(|c| c.jobs_submitted += 1);
    }

    pub fn inc_jobs_succeeded(&self) {
        self.with_counters(|c| c.jobs_succeeded += 1);
    }

    pub fn add_status_polls(&self, polls: u32) {
        self.with_counters(|c| c.status_polls += u64::from(polls));
    }

    pub fn record_error(&self, error: &TranscriptionError) {
        self.with_counters(|c| match error.code() {
            ErrorCode::Request => c.errors_request += 1,
            ErrorCode::JobFailed => c.errors_job_failed += 1,
            ErrorCode::Timeout => c.errors_timeout += 1,
            _ => c.errors_other += 1,
        });
    }

    pub fn record_latency(&self, phase: Phase, duration_ms: u64) {
        let record = LatencyRecord {
            phase,
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        latencies.push(record);
        if latencies.len() > MAX_LATENCY_RECORDS {
            let excess = latencies.len() - MAX_LATENCY_RECORDS;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());

        let avg = |phase: Phase| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        MetricsSummary {
            jobs_submitted: c.jobs_submitted,
            jobs_succeeded: c.jobs_succeeded,
            status_polls: c.status_polls,
            error_counts: ErrorCounts {
                request: c.errors_request,
                job_failed: c.errors_job_failed,
                timeout: c.errors_timeout,
                other: c.errors_other,
            },
            avg_latency_ms: AvgLatency {
                submit: avg(Phase::Submit),
                poll: avg(Phase::Poll),
                fetch: avg(Phase::Fetch),
            },
        }
    }
}

impl Default for TranscriptionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
