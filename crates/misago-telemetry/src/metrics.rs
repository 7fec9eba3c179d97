//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts pipeline runs by outcome and validation errors by code.

use std::fmt;
use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Final state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The operation went through.
    Completed,
    /// Validation errors stopped the operation.
    Rejected,
    /// A collaborator fault aborted the operation.
    Failed,
}

impl PipelineOutcome {
    /// Label value used in metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    hook_pipeline_runs_total: IntCounterVec,
    validation_errors_total: IntCounterVec,
}

/// Run totals of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Completed runs.
    pub completed_runs: u64,
    /// Runs rejected by validation errors.
    pub rejected_runs: u64,
    /// Runs aborted by faults.
    pub failed_runs: u64,
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let hook_pipeline_runs_total = counter_vec(
            "hook_pipeline_runs_total",
            "Hook pipeline runs by operation and outcome",
            &["operation", "outcome"],
        )?;
        let validation_errors_total = counter_vec(
            "validation_errors_total",
            "Validation errors reported by code",
            &["code"],
        )?;

        registry
            .register(Box::new(hook_pipeline_runs_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "hook_pipeline_runs_total",
                source,
            })?;
        registry
            .register(Box::new(validation_errors_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "validation_errors_total",
                source,
            })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                hook_pipeline_runs_total,
                validation_errors_total,
            }),
        })
    }

    /// Count one run of `operation`.
    pub fn inc_pipeline_run(&self, operation: &str, outcome: PipelineOutcome) {
        self.inner
            .hook_pipeline_runs_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    /// Count each validation error code reported by a run.
    pub fn inc_validation_errors<'a>(&self, codes: impl IntoIterator<Item = &'a str>) {
        for code in codes {
            self.inner
                .validation_errors_total
                .with_label_values(&[code])
                .inc();
        }
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Number of runs of `operation` that ended with `outcome`.
    #[must_use]
    pub fn pipeline_runs(&self, operation: &str, outcome: PipelineOutcome) -> u64 {
        self.inner
            .hook_pipeline_runs_total
            .with_label_values(&[operation, outcome.as_str()])
            .get()
    }

    /// Number of validation errors reported with `code`.
    #[must_use]
    pub fn validation_errors(&self, code: &str) -> u64 {
        self.inner
            .validation_errors_total
            .with_label_values(&[code])
            .get()
    }

    /// Take a point-in-time snapshot of the run counters of `operation`.
    #[must_use]
    pub fn snapshot(&self, operation: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            completed_runs: self.pipeline_runs(operation, PipelineOutcome::Completed),
            rejected_runs: self.pipeline_runs(operation, PipelineOutcome::Rejected),
            failed_runs: self.pipeline_runs(operation, PipelineOutcome::Failed),
        }
    }
}
