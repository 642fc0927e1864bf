//! Derived Metrics
//!
//! Turns a decoded [`ResultRecord`] into throughput and bandwidth figures
//! and their display strings. Pure: the same record always formats to the
//! same bytes.
//!
//! ## Detailed records
//!
//! ```text
//! total_bytes = num_elements * element_size * repetitions
//! bandwidth   = (total_bytes / 1_048_576) / (duration_ms / 1000)   MB/s
//! throughput  = (num_elements * repetitions) / (duration_ms / 1000)
//! ```
//!
//! ## Summary records
//!
//! Throughput and bandwidth are taken from the record as-is.

use membench_ipc::ResultRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per MB in bandwidth figures
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Significant digits shown in display strings
pub const SIGNIFICANT_DIGITS: usize = 3;

/// Test-name prefix marking fill operations, reported in bytes
const FILL_PREFIX: &str = "memset";

/// Unit of the throughput figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThroughputUnit {
    /// Bytes per second (fill operations)
    Bytes,
    /// Elements per second
    Elements,
}

impl ThroughputUnit {
    /// Pick the unit from the test name
    pub fn for_test(test_name: &str) -> Self {
        if test_name.starts_with(FILL_PREFIX) {
            ThroughputUnit::Bytes
        } else {
            ThroughputUnit::Elements
        }
    }

    /// Suffix following the magnitude prefix (`B/s` or `E/s`)
    pub fn suffix(self) -> &'static str {
        match self {
            ThroughputUnit::Bytes => "B/s",
            ThroughputUnit::Elements => "E/s",
        }
    }
}

impl fmt::Display for ThroughputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Figures derived from one result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Bytes written across all repetitions (detailed records only)
    pub total_bytes: Option<u64>,
    /// Operations per second
    pub throughput: f64,
    /// Bandwidth in MB/s
    pub bandwidth_mbps: f64,
    /// Unit of `throughput`
    pub throughput_unit: ThroughputUnit,
    /// e.g. `10.5 GB/s`, `500 ME/s`
    pub throughput_display: String,
    /// e.g. `39.1 GB/s`, `976 MB/s`
    pub bandwidth_display: String,
}

impl DerivedMetrics {
    /// Compute metrics for a decoded record
    pub fn from_record(record: &ResultRecord) -> Self {
        let (total_bytes, throughput, bandwidth_mbps) = match record {
            ResultRecord::Detailed(r) => {
                let total_bytes = r
                    .num_elements
                    .saturating_mul(u64::from(r.element_size))
                    .saturating_mul(u64::from(r.repetitions));
                let seconds = r.duration_ms / 1000.0;
                // A run that never completed a pass has nothing to divide by
                let (throughput, bandwidth) = if seconds > 0.0 {
                    let ops = r.num_elements as f64 * f64::from(r.repetitions);
                    (ops / seconds, total_bytes as f64 / BYTES_PER_MB / seconds)
                } else {
                    (0.0, 0.0)
                };
                (Some(total_bytes), throughput, bandwidth)
            }
            ResultRecord::Summary(r) => (None, r.elements_per_second, r.bandwidth_mbps),
        };

        let throughput_unit = ThroughputUnit::for_test(record.test_name());

        Self {
            total_bytes,
            throughput,
            bandwidth_mbps,
            throughput_unit,
            throughput_display: format_throughput(throughput, throughput_unit),
            bandwidth_display: format_bandwidth(bandwidth_mbps),
        }
    }
}

/// Format a per-second rate with a `G` or `M` prefix
pub fn format_throughput(value: f64, unit: ThroughputUnit) -> String {
    if value > 1e9 {
        format!("{} G{}", format_significant(value / 1e9, SIGNIFICANT_DIGITS), unit)
    } else {
        format!("{} M{}", format_significant(value / 1e6, SIGNIFICANT_DIGITS), unit)
    }
}

/// Format a MB/s figure, switching to GB/s from 1024 MB/s up
pub fn format_bandwidth(mbps: f64) -> String {
    if mbps >= 1024.0 {
        format!("{} GB/s", format_significant(mbps / 1024.0, SIGNIFICANT_DIGITS))
    } else {
        format!("{} MB/s", format_significant(mbps, SIGNIFICANT_DIGITS))
    }
}

/// Round to `digits` significant digits and print without an exponent.
///
/// Ties on the exact binary value round half to even (`1.125` prints as
/// `1.12`). Trailing zeros are kept up to the requested precision (`2.50`),
/// and integer parts longer than `digits` are rounded rather than widened
/// (`1234` prints as `1230`).
pub fn format_significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);

    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }

    // `{:e}` rounds the exact value, carrying into the exponent (9.996 -> 1.00e1)
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let significand: String = mantissa.chars().filter(|c| *c != '.').collect();

    // Digits left of the decimal point
    let point = exponent + 1;
    let body = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), significand)
    } else if point as usize >= significand.len() {
        format!(
            "{}{}",
            significand,
            "0".repeat(point as usize - significand.len())
        )
    } else {
        let (int, frac) = significand.split_at(point as usize);
        format!("{}.{}", int, frac)
    };
    format!("{}{}", sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use membench_ipc::{RecordGrammar, decode_record};

    fn metrics(line: &str, grammar: RecordGrammar) -> DerivedMetrics {
        DerivedMetrics::from_record(&decode_record(line, grammar).unwrap())
    }

    #[test]
    fn test_fill_record() {
        let m = metrics("memset|1048576|4|10.0|100", RecordGrammar::Detailed);
        assert_eq!(m.total_bytes, Some(419_430_400));
        assert!((m.bandwidth_mbps - 40_000.0).abs() < 1e-6);
        assert_eq!(m.bandwidth_display, "39.1 GB/s");
        assert!((m.throughput - 1.048576e10).abs() < 1.0);
        assert_eq!(m.throughput_unit, ThroughputUnit::Bytes);
        assert_eq!(m.throughput_display, "10.5 GB/s");
    }

    #[test]
    fn test_copy_record() {
        let m = metrics("copy|500000000|8|1000|1", RecordGrammar::Detailed);
        assert_eq!(m.total_bytes, Some(4_000_000_000));
        assert!((m.bandwidth_mbps - 3814.697).abs() < 1e-3);
        assert_eq!(m.bandwidth_display, "3.73 GB/s");
        assert_eq!(m.throughput_unit, ThroughputUnit::Elements);
        assert_eq!(m.throughput_display, "500 ME/s");
    }

    #[test]
    fn test_summary_record() {
        let m = metrics("access|2.5e9|1500", RecordGrammar::Summary);
        assert_eq!(m.total_bytes, None);
        assert_eq!(m.throughput_display, "2.50 GE/s");
        assert_eq!(m.bandwidth_display, "1.46 GB/s");
    }

    #[test]
    fn test_zero_duration_yields_zero() {
        let m = metrics("8-bit|0|1|0|10", RecordGrammar::Detailed);
        assert_eq!(m.throughput, 0.0);
        assert_eq!(m.bandwidth_mbps, 0.0);
        assert_eq!(m.throughput_display, "0.00 ME/s");
        assert_eq!(m.bandwidth_display, "0.00 MB/s");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let record = decode_record("64-bit|2097152|8|3.3|10", RecordGrammar::Detailed).unwrap();
        let first = DerivedMetrics::from_record(&record);
        let second = DerivedMetrics::from_record(&record);
        assert_eq!(first.throughput_display, second.throughput_display);
        assert_eq!(first.bandwidth_display, second.bandwidth_display);
    }

    #[test]
    fn test_bandwidth_threshold() {
        assert_eq!(format_bandwidth(1023.9), "1020 MB/s");
        assert_eq!(format_bandwidth(1024.0), "1.00 GB/s");
    }

    #[test]
    fn test_throughput_threshold_is_exclusive() {
        assert_eq!(
            format_throughput(1e9, ThroughputUnit::Elements),
            "1000 ME/s"
        );
        assert_eq!(
            format_throughput(1.5e9, ThroughputUnit::Elements),
            "1.50 GE/s"
        );
    }

    #[test]
    fn test_significant_digits() {
        assert_eq!(format_significant(2.346, 3), "2.35");
        assert_eq!(format_significant(23.44, 3), "23.4");
        assert_eq!(format_significant(234.4, 3), "234");
        assert_eq!(format_significant(2.5, 3), "2.50");
        assert_eq!(format_significant(1234.0, 3), "1230");
        assert_eq!(format_significant(0.01234, 3), "0.0123");
        assert_eq!(format_significant(9.996, 3), "10.0");
        assert_eq!(format_significant(999.7, 3), "1000");
        assert_eq!(format_significant(0.0, 3), "0.00");
    }

    #[test]
    fn test_exact_ties_round_half_even() {
        assert_eq!(format_significant(1.125, 3), "1.12");
        assert_eq!(format_significant(1.375, 3), "1.38");
        assert_eq!(format_significant(2.5, 1), "2");
        assert_eq!(format_significant(3.5, 1), "4");
        assert_eq!(format_significant(1002.5, 4), "1002");
        // 1152 MB/s is exactly 1.125 GB/s
        assert_eq!(format_bandwidth(1152.0), "1.12 GB/s");
    }

    #[test]
    fn test_negative_values_keep_sign() {
        assert_eq!(format_significant(-0.01234, 3), "-0.0123");
        assert_eq!(format_significant(-1234.0, 3), "-1230");
    }
}
