//! JSON Output

use crate::report::Report;

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    #[test]
    fn test_json_layout() {
        let json = generate_json_report(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["meta"]["schema_version"], 1);
        assert_eq!(value["meta"]["grammar"], "detailed");
        assert_eq!(value["results"][0]["test_name"], "memset");
        assert_eq!(value["results"][0]["record"]["grammar"], "detailed");
        assert_eq!(value["results"][1]["metrics"]["throughput_display"], "500 ME/s");
        assert!(value["failure"].is_null());
    }

    #[test]
    fn test_json_parses_back() {
        let json = generate_json_report(&sample_report()).unwrap();
        let report: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(report.results.len(), 2);
    }
}
