//! System Metadata Collection
//!
//! Collects system information for report metadata: OS, architecture,
//! CPU model and core count.
//!
//! Linux-specific data (CPU model) gracefully degrades on other platforms,
//! returning "Unknown".

use chrono::Utc;
use membench_ipc::RecordGrammar;
use membench_report::{ReportMeta, SCHEMA_VERSION, SystemInfo};

/// Build report metadata including system info
pub fn build_report_meta(grammar: RecordGrammar) -> ReportMeta {
    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        grammar,
        system: system_info(),
    }
}

/// Describe the host
pub fn system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: membench_core::available_cores() as u32,
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| parse_cpu_model(&content))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg_attr(not(any(target_os = "linux", test)), allow(dead_code))]
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|l| l.starts_with("model name") || l.starts_with("Hardware"))
        .and_then(|l| l.split(':').nth(1))
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_model() {
        let cpuinfo = "processor\t: 0\nmodel name\t: Example CPU @ 3.00GHz\nflags\t: fpu\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("Example CPU @ 3.00GHz")
        );
        assert_eq!(parse_cpu_model("processor\t: 0\n"), None);
    }

    #[test]
    fn test_meta_fields() {
        let meta = build_report_meta(RecordGrammar::Summary);
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.grammar, RecordGrammar::Summary);
        assert!(!meta.system.os.is_empty());
    }
}
