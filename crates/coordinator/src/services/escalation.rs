//! Escalation sink trait and implementations.
//!
//! On abort the coordinator files exactly one report through the sink.
//! This is the "page oncall" seam: callers plug in their alerting
//! transport here.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AbortReason;

/// Everything an operator needs to triage an aborted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortReport {
    /// Why the run was aborted.
    pub reason: AbortReason,
    /// When the abort was observed.
    pub occurred_at: DateTime<Utc>,
    /// How many units had been attempted before the abort.
    pub units_attempted: usize,
}

impl AbortReport {
    /// Creates a report timestamped now.
    pub fn new(reason: AbortReason, units_attempted: usize) -> Self {
        Self {
            reason,
            occurred_at: Utc::now(),
            units_attempted,
        }
    }
}

/// Receives abort reports for operator escalation.
#[async_trait]
pub trait EscalationSink: Send + Sync {
    /// Delivers one abort report. Called exactly once per aborted run.
    async fn report(&self, report: &AbortReport);
}

/// In-memory escalation sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEscalationSink {
    reports: Arc<RwLock<Vec<AbortReport>>>,
}

impl InMemoryEscalationSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports received.
    pub fn report_count(&self) -> usize {
        self.reports.read().unwrap().len()
    }

    /// The most recent abort reason, if any report was received.
    pub fn last_reason(&self) -> Option<AbortReason> {
        self.reports
            .read()
            .unwrap()
            .last()
            .map(|report| report.reason.clone())
    }
}

#[async_trait]
impl EscalationSink for InMemoryEscalationSink {
    async fn report(&self, report: &AbortReport) {
        self.reports.write().unwrap().push(report.clone());
    }
}

/// Escalation sink that emits reports to the tracing pipeline.
///
/// Suitable for callers whose alerting scrapes structured logs rather
/// than consuming reports directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEscalationSink;

#[async_trait]
impl EscalationSink for LogEscalationSink {
    async fn report(&self, report: &AbortReport) {
        tracing::error!(
            reason = %report.reason,
            unit = %report.reason.unit(),
            units_attempted = report.units_attempted,
            "coordinator run aborted"
        );
    }
}
