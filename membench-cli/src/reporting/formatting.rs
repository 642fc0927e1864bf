//! Output Formatting
//!
//! Human-readable terminal table: one line per completed test with its
//! throughput and bandwidth, followed by the failure (if any) and a summary.

use membench_report::Report;

const HEADER_TEST: &str = "Test";
const HEADER_THROUGHPUT: &str = "Throughput";
const HEADER_BANDWIDTH: &str = "Bandwidth";

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Membench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let name_width = report
        .results
        .iter()
        .map(|r| r.test_name.len())
        .max()
        .unwrap_or(0)
        .max(HEADER_TEST.len());

    output.push_str(&format!(
        "  {:<width$}  {:>12}  {:>12}\n",
        HEADER_TEST,
        HEADER_THROUGHPUT,
        HEADER_BANDWIDTH,
        width = name_width
    ));
    output.push_str(&format!("  {}\n", "-".repeat(name_width + 28)));

    for row in &report.results {
        output.push_str(&format!(
            "  {:<width$}  {:>12}  {:>12}\n",
            row.test_name,
            row.metrics.throughput_display,
            row.metrics.bandwidth_display,
            width = name_width
        ));
    }

    if let Some(failure) = &report.failure {
        output.push('\n');
        match failure.test_index {
            Some(index) => output.push_str(&format!(
                "  ✗ stopped at test #{}: {}\n",
                index, failure.message
            )),
            None => output.push_str(&format!("  ✗ {}\n", failure.message)),
        }
    }

    let summary = &report.summary;
    output.push('\n');
    output.push_str(&format!(
        "Summary: {}/{} tests completed in {:.1} ms\n",
        summary.completed, summary.total_tests, summary.total_duration_ms
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::metadata::build_report_meta;
    use membench_ipc::{RecordGrammar, decode_record};
    use membench_report::{FailureInfo, ReportRow};

    fn report(failure: Option<FailureInfo>) -> Report {
        let rows = vec![
            ReportRow::new(
                1,
                decode_record("memset (4 thr)|1048576|4|10.0|100", RecordGrammar::Detailed)
                    .unwrap(),
            ),
            ReportRow::new(
                2,
                decode_record("copy|500000000|8|1000|1", RecordGrammar::Detailed).unwrap(),
            ),
        ];
        Report::new(
            build_report_meta(RecordGrammar::Detailed),
            3,
            rows,
            failure,
            12.0,
        )
    }

    #[test]
    fn test_table_rows() {
        let output = format_human_output(&report(None));
        assert!(output.contains("memset (4 thr)"));
        assert!(output.contains("10.5 GB/s"));
        assert!(output.contains("39.1 GB/s"));
        assert!(output.contains("500 ME/s"));
        assert!(output.contains("Summary: 2/3 tests completed"));
        assert!(!output.contains('✗'));
    }

    #[test]
    fn test_failure_line() {
        let output = format_human_output(&report(Some(FailureInfo {
            test_index: Some(2),
            kind: "malformed".to_string(),
            message: "bad record".to_string(),
        })));
        assert!(output.contains("stopped at test #2: bad record"));
    }
}
