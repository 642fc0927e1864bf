//! Run Reporting
//!
//! Turns the event stream of one run into a [`Report`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! RunEvent stream (Started → Progress × N → Finished | Failed)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  collector  │  Rows with derived metrics, failure info
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  metadata   │  Version, timestamp, system info
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human table (JSON/CSV live in membench-report)
//! └─────────────┘
//! ```

mod formatting;
mod metadata;

pub use formatting::format_human_output;
pub use metadata::{build_report_meta, system_info};

use crate::orchestrator::{RunError, RunEvent};
use membench_report::{FailureInfo, Report, ReportMeta, ReportRow};

/// Accumulates the events of one run
#[derive(Debug, Default)]
pub struct RunCollector {
    total: usize,
    rows: Vec<ReportRow>,
    failure: Option<FailureInfo>,
    finished: bool,
}

impl RunCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event; returns the new row for `Progress` events
    pub fn observe(&mut self, event: RunEvent) -> Option<&ReportRow> {
        match event {
            RunEvent::Started { total } => {
                *self = Self {
                    total,
                    ..Self::default()
                };
                None
            }
            RunEvent::Progress {
                record, completed, ..
            } => {
                self.rows.push(ReportRow::new(completed, record));
                self.rows.last()
            }
            RunEvent::Finished => {
                self.finished = true;
                None
            }
            RunEvent::Failed { test_index, reason } => {
                self.finished = true;
                self.failure = Some(FailureInfo {
                    test_index: Some(test_index),
                    kind: failure_kind(&reason).to_string(),
                    message: reason.to_string(),
                });
                None
            }
        }
    }

    /// Whether a terminal event has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the run ended in `Failed`
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Build the report
    pub fn into_report(self, meta: ReportMeta, total_duration_ms: f64) -> Report {
        Report::new(meta, self.total, self.rows, self.failure, total_duration_ms)
    }
}

fn failure_kind(reason: &RunError) -> &'static str {
    match reason {
        RunError::Malformed(_) => "malformed",
        RunError::Measurement(_) => "measurement",
        RunError::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membench_ipc::{RecordGrammar, decode_record};

    fn progress(line: &str, completed: usize) -> RunEvent {
        RunEvent::Progress {
            record: decode_record(line, RecordGrammar::Detailed).unwrap(),
            completed,
            total: 2,
        }
    }

    #[test]
    fn test_collects_completed_run() {
        let mut collector = RunCollector::new();
        collector.observe(RunEvent::Started { total: 2 });
        let row = collector.observe(progress("8-bit|1024|1|1.0|10", 1)).unwrap();
        assert_eq!(row.position, 1);
        collector.observe(progress("16-bit|1024|2|1.0|10", 2));
        collector.observe(RunEvent::Finished);

        assert!(collector.is_finished());
        assert!(!collector.failed());
        let report = collector.into_report(build_report_meta(RecordGrammar::Detailed), 2.0);
        assert_eq!(report.summary.completed, 2);
        assert_eq!(report.summary.total_tests, 2);
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_collects_failure() {
        let mut collector = RunCollector::new();
        collector.observe(RunEvent::Started { total: 2 });
        collector.observe(progress("8-bit|1024|1|1.0|10", 1));
        collector.observe(RunEvent::Failed {
            test_index: 1,
            reason: RunError::Measurement("worker exited".to_string()),
        });

        assert!(collector.failed());
        let report = collector.into_report(build_report_meta(RecordGrammar::Detailed), 1.0);
        let failure = report.failure.unwrap();
        assert_eq!(failure.test_index, Some(1));
        assert_eq!(failure.kind, "measurement");
        assert!(report.summary.failed);
        assert_eq!(report.results.len(), 1);
    }
}
