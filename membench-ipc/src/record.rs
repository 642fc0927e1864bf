//! Result Record Codec
//!
//! One record per completed test, `|`-delimited, in one of two grammars:
//!
//! ```text
//! detailed: testName|numElements|elementSize|durationMs|repetitions
//! summary:  testName|elementsPerSecond|bandwidthMBps
//! ```
//!
//! The record carries no version tag, so the grammar is always supplied by
//! the caller. Decoding never guesses from the field count.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field delimiter of the record grammar
pub const FIELD_DELIMITER: char = '|';

/// Which record layout the measurement layer emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordGrammar {
    /// Raw element count, element size, duration and repetitions
    #[default]
    Detailed,
    /// Already-derived elements/second and bandwidth
    Summary,
}

impl RecordGrammar {
    /// Number of `|`-separated fields a record of this grammar must have
    pub fn field_count(self) -> usize {
        match self {
            RecordGrammar::Detailed => 5,
            RecordGrammar::Summary => 3,
        }
    }
}

impl fmt::Display for RecordGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordGrammar::Detailed => f.write_str("detailed"),
            RecordGrammar::Summary => f.write_str("summary"),
        }
    }
}

impl FromStr for RecordGrammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "detailed" => Ok(RecordGrammar::Detailed),
            "summary" => Ok(RecordGrammar::Summary),
            other => Err(format!("Unknown record grammar: {}", other)),
        }
    }
}

/// Decoding failure: wrong field count or a numeric field that does not parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("malformed {grammar} record: expected {expected} fields, found {found}")]
    FieldCount {
        grammar: RecordGrammar,
        expected: usize,
        found: usize,
    },

    #[error("malformed record: field `{field}` has invalid value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Detailed layout: raw measurement of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRecord {
    /// Test identifier as reported by the measurement layer
    pub test_name: String,
    /// Elements in the buffer of the last successful pass
    pub num_elements: u64,
    /// Size of one element in bytes
    pub element_size: u32,
    /// Wall time of the timed passes in milliseconds
    pub duration_ms: f64,
    /// Number of passes over the buffer
    pub repetitions: u32,
}

/// Summary layout: throughput and bandwidth computed by the measurement layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Test identifier as reported by the measurement layer
    pub test_name: String,
    /// Elements processed per second
    pub elements_per_second: f64,
    /// Bandwidth in MB/s (1 MB = 1,048,576 bytes)
    pub bandwidth_mbps: f64,
}

/// A decoded result record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "grammar", rename_all = "kebab-case")]
pub enum ResultRecord {
    /// Detailed grammar
    Detailed(DetailedRecord),
    /// Summary grammar
    Summary(SummaryRecord),
}

impl ResultRecord {
    /// Test identifier carried in the first field
    pub fn test_name(&self) -> &str {
        match self {
            ResultRecord::Detailed(r) => &r.test_name,
            ResultRecord::Summary(r) => &r.test_name,
        }
    }

    /// Grammar this record was decoded with
    pub fn grammar(&self) -> RecordGrammar {
        match self {
            ResultRecord::Detailed(_) => RecordGrammar::Detailed,
            ResultRecord::Summary(_) => RecordGrammar::Summary,
        }
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultRecord::Detailed(r) => write!(
                f,
                "{}|{}|{}|{}|{}",
                r.test_name, r.num_elements, r.element_size, r.duration_ms, r.repetitions
            ),
            ResultRecord::Summary(r) => write!(
                f,
                "{}|{}|{}",
                r.test_name, r.elements_per_second, r.bandwidth_mbps
            ),
        }
    }
}

/// Decode a single record according to `grammar`.
///
/// A trailing line terminator is ignored. Every other byte is significant:
/// the test name is kept verbatim.
pub fn decode_record(line: &str, grammar: RecordGrammar) -> Result<ResultRecord, MalformedRecord> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

    if fields.len() != grammar.field_count() {
        return Err(MalformedRecord::FieldCount {
            grammar,
            expected: grammar.field_count(),
            found: fields.len(),
        });
    }

    let record = match grammar {
        RecordGrammar::Detailed => ResultRecord::Detailed(DetailedRecord {
            test_name: fields[0].to_string(),
            num_elements: parse_field("numElements", fields[1])?,
            element_size: parse_field("elementSize", fields[2])?,
            duration_ms: parse_float("durationMs", fields[3])?,
            repetitions: parse_field("repetitions", fields[4])?,
        }),
        RecordGrammar::Summary => ResultRecord::Summary(SummaryRecord {
            test_name: fields[0].to_string(),
            elements_per_second: parse_float("elementsPerSecond", fields[1])?,
            bandwidth_mbps: parse_float("bandwidthMBps", fields[2])?,
        }),
    };

    Ok(record)
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, MalformedRecord> {
    value.parse().map_err(|_| MalformedRecord::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

// NaN and infinities parse as f64 but never describe a measurement.
fn parse_float(field: &'static str, value: &str) -> Result<f64, MalformedRecord> {
    let parsed: f64 = parse_field(field, value)?;
    if !parsed.is_finite() {
        return Err(MalformedRecord::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_detailed() {
        let record = decode_record("memset|1048576|4|10.0|100", RecordGrammar::Detailed).unwrap();
        assert_eq!(
            record,
            ResultRecord::Detailed(DetailedRecord {
                test_name: "memset".to_string(),
                num_elements: 1_048_576,
                element_size: 4,
                duration_ms: 10.0,
                repetitions: 100,
            })
        );
        assert_eq!(record.test_name(), "memset");
        assert_eq!(record.grammar(), RecordGrammar::Detailed);
    }

    #[test]
    fn test_decode_summary() {
        let record = decode_record("access|2.5e9|1500", RecordGrammar::Summary).unwrap();
        match record {
            ResultRecord::Summary(r) => {
                assert_eq!(r.test_name, "access");
                assert_eq!(r.elements_per_second, 2.5e9);
                assert_eq!(r.bandwidth_mbps, 1500.0);
            }
            other => panic!("expected summary record, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_newline_ignored() {
        let record = decode_record("copy|10|8|1.5|2\r\n", RecordGrammar::Detailed).unwrap();
        assert_eq!(record.test_name(), "copy");
    }

    #[test]
    fn test_test_name_kept_verbatim() {
        let record = decode_record("memset (8 thr)|0|0", RecordGrammar::Summary).unwrap();
        assert_eq!(record.test_name(), "memset (8 thr)");
    }

    #[test]
    fn test_non_numeric_duration_is_malformed() {
        let err = decode_record("copy|100|8|fast|1", RecordGrammar::Detailed).unwrap_err();
        assert_eq!(
            err,
            MalformedRecord::InvalidNumber {
                field: "durationMs",
                value: "fast".to_string(),
            }
        );
    }

    #[test]
    fn test_fractional_element_count_is_malformed() {
        let err = decode_record("copy|1.5|8|10|1", RecordGrammar::Detailed).unwrap_err();
        assert!(matches!(
            err,
            MalformedRecord::InvalidNumber {
                field: "numElements",
                ..
            }
        ));
    }

    #[test]
    fn test_nan_is_malformed() {
        let err = decode_record("copy|NaN|1", RecordGrammar::Summary).unwrap_err();
        assert!(matches!(err, MalformedRecord::InvalidNumber { .. }));
    }

    #[test]
    fn test_grammar_is_never_inferred() {
        // A well-formed summary record is malformed under the detailed grammar.
        let err = decode_record("access|2.5e9|1500", RecordGrammar::Detailed).unwrap_err();
        assert_eq!(
            err,
            MalformedRecord::FieldCount {
                grammar: RecordGrammar::Detailed,
                expected: 5,
                found: 3,
            }
        );

        let err = decode_record("memset|1|4|10.0|100", RecordGrammar::Summary).unwrap_err();
        assert!(matches!(
            err,
            MalformedRecord::FieldCount {
                expected: 3,
                found: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_line_is_malformed() {
        let err = decode_record("", RecordGrammar::Summary).unwrap_err();
        assert!(matches!(err, MalformedRecord::FieldCount { found: 1, .. }));
    }

    #[test]
    fn test_encode_matches_wire_text() {
        let record = decode_record("64-bit|131072|8|12.5|10", RecordGrammar::Detailed).unwrap();
        assert_eq!(record.to_string(), "64-bit|131072|8|12.5|10");

        let record = decode_record("8-bit|0|0", RecordGrammar::Summary).unwrap();
        assert_eq!(record.to_string(), "8-bit|0|0");
    }

    #[test]
    fn test_grammar_from_str() {
        assert_eq!(
            "Detailed".parse::<RecordGrammar>().unwrap(),
            RecordGrammar::Detailed
        );
        assert_eq!(
            "summary".parse::<RecordGrammar>().unwrap(),
            RecordGrammar::Summary
        );
        assert!("compact".parse::<RecordGrammar>().is_err());
    }

    #[test]
    fn test_record_serializes_with_grammar_tag() {
        let record = decode_record("access|2.5e9|1500", RecordGrammar::Summary).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["grammar"], "summary");
        assert_eq!(json["test_name"], "access");
    }
}
