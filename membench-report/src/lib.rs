#![warn(missing_docs)]
//! Membench Report - Metrics and Output
//!
//! Turns result records into user-facing figures and run reports:
//! - Derived throughput/bandwidth with three-significant-digit display strings
//! - JSON (machine-readable)
//! - CSV (spreadsheet-compatible)

mod csv;
mod json;
mod metrics;
mod report;

pub use csv::generate_csv_report;
pub use json::generate_json_report;
pub use metrics::{
    BYTES_PER_MB, DerivedMetrics, SIGNIFICANT_DIGITS, ThroughputUnit, format_bandwidth,
    format_significant, format_throughput,
};
pub use report::{
    FailureInfo, Report, ReportMeta, ReportRow, ReportSummary, SCHEMA_VERSION, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal table
    #[default]
    Human,
    /// JSON with full schema
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl OutputFormat {
    /// File extension used when writing to an output directory
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Human => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
