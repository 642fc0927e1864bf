//! Report Data Structures

use crate::metrics::DerivedMetrics;
use chrono::{DateTime, Utc};
use membench_ipc::{RecordGrammar, ResultRecord};
use serde::{Deserialize, Serialize};

/// Report schema version, bumped on breaking layout changes
pub const SCHEMA_VERSION: u32 = 1;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub results: Vec<ReportRow>,
    /// Set when the run stopped before the end of the suite
    pub failure: Option<FailureInfo>,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub grammar: RecordGrammar,
    pub system: SystemInfo,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
}

/// One completed test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    /// 1-based position in completion order
    pub position: usize,
    pub test_name: String,
    pub record: ResultRecord,
    pub metrics: DerivedMetrics,
}

impl ReportRow {
    /// Build a row for the `position`-th completed record
    pub fn new(position: usize, record: ResultRecord) -> Self {
        let metrics = DerivedMetrics::from_record(&record);
        Self {
            position,
            test_name: record.test_name().to_string(),
            record,
            metrics,
        }
    }
}

/// Why a run stopped early
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Suite index of the test that failed, if any
    pub test_index: Option<usize>,
    pub kind: String,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_tests: usize,
    pub completed: usize,
    pub failed: bool,
    pub total_duration_ms: f64,
}

impl Report {
    /// Assemble a report from completed rows
    pub fn new(
        meta: ReportMeta,
        total_tests: usize,
        results: Vec<ReportRow>,
        failure: Option<FailureInfo>,
        total_duration_ms: f64,
    ) -> Self {
        let summary = ReportSummary {
            total_tests,
            completed: results.len(),
            failed: failure.is_some(),
            total_duration_ms,
        };
        Self {
            meta,
            results,
            failure,
            summary,
        }
    }
}
