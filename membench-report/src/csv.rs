//! CSV Output

use crate::report::Report;
use std::fmt::Write;

const HEADER: &str =
    "position,test,total_bytes,throughput,throughput_unit,bandwidth_mbps,throughput_display,bandwidth_display";

/// Generate a CSV report with one row per completed test.
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for row in &report.results {
        let m = &row.metrics;
        let total_bytes = m.total_bytes.map(|b| b.to_string()).unwrap_or_default();
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            row.position,
            escape(&row.test_name),
            total_bytes,
            m.throughput,
            m.throughput_unit,
            m.bandwidth_mbps,
            escape(&m.throughput_display),
            escape(&m.bandwidth_display),
        );
    }

    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    #[test]
    fn test_csv_rows() {
        let csv = generate_csv_report(&sample_report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("1,memset,419430400,"));
        assert!(lines[1].ends_with(",10.5 GB/s,39.1 GB/s"));
        assert!(lines[2].starts_with("2,copy,4000000000,"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("memset (4 thr)"), "memset (4 thr)");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
