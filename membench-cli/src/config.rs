//! Configuration loading from membench.toml
//!
//! Membench configuration can be specified in a `membench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use membench_core::KernelConfig;
use membench_ipc::RecordGrammar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up by [`MembenchConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "membench.toml";

/// Membench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MembenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Kernel sizing configuration
    #[serde(default)]
    pub kernels: KernelsConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the measurement layer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Run kernels in a separate worker process (default)
    #[default]
    Process,
    /// Run kernels in-process (no isolation, useful for debugging)
    InProcess,
}

impl IsolationMode {
    /// Whether this mode provides process isolation
    pub fn is_isolated(self) -> bool {
        matches!(self, IsolationMode::Process)
    }
}

/// Runner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Isolation mode: "process" or "in-process"
    #[serde(default)]
    pub isolation: IsolationMode,
    /// Result record layout: "detailed" or "summary"
    #[serde(default)]
    pub grammar: RecordGrammar,
}

/// Kernel sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelsConfig {
    /// Element count of the first sizing attempt
    #[serde(default = "default_initial_elements")]
    pub initial_elements: u64,
    /// Largest buffer a kernel may allocate, in bytes
    #[serde(default = "default_max_allocation_bytes")]
    pub max_allocation_bytes: u64,
    /// Stop growing buffers once a timed batch exceeds this (e.g. "100ms")
    #[serde(default = "default_target_duration")]
    pub target_duration: String,
    /// Passes over the buffer per timed batch
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Threads for the multi-threaded kernels (0 = all cores)
    #[serde(default)]
    pub threads: usize,
}

impl Default for KernelsConfig {
    fn default() -> Self {
        Self {
            initial_elements: default_initial_elements(),
            max_allocation_bytes: default_max_allocation_bytes(),
            target_duration: default_target_duration(),
            repetitions: default_repetitions(),
            threads: 0,
        }
    }
}

fn default_initial_elements() -> u64 {
    1024
}
fn default_max_allocation_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_target_duration() -> String {
    "100ms".to_string()
}
fn default_repetitions() -> u32 {
    10
}

impl KernelsConfig {
    /// Resolve into kernel sizing parameters
    pub fn to_kernel_config(&self) -> anyhow::Result<KernelConfig> {
        let target_ns = MembenchConfig::parse_duration(&self.target_duration)?;
        if self.repetitions == 0 {
            anyhow::bail!("kernels.repetitions must be at least 1");
        }
        if self.initial_elements == 0 {
            anyhow::bail!("kernels.initial_elements must be at least 1");
        }
        Ok(KernelConfig {
            initial_elements: self.initial_elements,
            max_allocation_bytes: self.max_allocation_bytes,
            target_duration: Duration::from_nanos(target_ns),
            repetitions: self.repetitions,
        })
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output directory for reports written with `--output` pointing at a directory
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/membench".to_string()
}

impl MembenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(dir)
    }

    /// Walk up from `dir` looking for `membench.toml`
    pub fn discover_from(mut dir: PathBuf) -> Option<Self> {
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring invalid config");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Membench Configuration

[runner]
# Where kernels run: "process" (isolated worker) or "in-process"
isolation = "process"
# Result record layout: "detailed" or "summary"
grammar = "detailed"

[kernels]
# Element count of the first sizing attempt (doubles each step)
initial_elements = 1024
# Largest buffer a kernel may allocate, in bytes (1 GiB)
max_allocation_bytes = 1073741824
# Stop growing once a timed batch takes longer than this
target_duration = "100ms"
# Passes over the buffer per timed batch
repetitions = 10
# Threads for the multi-threaded kernels (0 = all cores)
threads = 0

[output]
# Default output format: human, json, csv
format = "human"
# Output directory for reports
directory = "target/membench"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MembenchConfig::default();
        assert_eq!(config.runner.isolation, IsolationMode::Process);
        assert_eq!(config.runner.grammar, RecordGrammar::Detailed);
        assert_eq!(config.kernels.target_duration, "100ms");
        assert_eq!(config.kernels.repetitions, 10);
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(MembenchConfig::parse_duration("3s").unwrap(), 3_000_000_000);
        assert_eq!(MembenchConfig::parse_duration("500ms").unwrap(), 500_000_000);
        assert_eq!(MembenchConfig::parse_duration("100us").unwrap(), 100_000);
        assert_eq!(MembenchConfig::parse_duration("1000ns").unwrap(), 1000);
        assert_eq!(MembenchConfig::parse_duration("2m").unwrap(), 120_000_000_000);
        assert_eq!(MembenchConfig::parse_duration("1.5s").unwrap(), 1_500_000_000);
        assert!(MembenchConfig::parse_duration("").is_err());
        assert!(MembenchConfig::parse_duration("5 parsecs").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            isolation = "in-process"
            grammar = "summary"

            [kernels]
            repetitions = 3
        "#;

        let config: MembenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.isolation, IsolationMode::InProcess);
        assert_eq!(config.runner.grammar, RecordGrammar::Summary);
        assert_eq!(config.kernels.repetitions, 3);
        // Defaults should still apply
        assert_eq!(config.kernels.initial_elements, 1024);
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_default_toml_parses() {
        let config: MembenchConfig = toml::from_str(&MembenchConfig::default_toml()).unwrap();
        let kernels = config.kernels.to_kernel_config().unwrap();
        let defaults = KernelConfig::default();
        assert_eq!(kernels.initial_elements, defaults.initial_elements);
        assert_eq!(kernels.max_allocation_bytes, defaults.max_allocation_bytes);
        assert_eq!(kernels.target_duration, defaults.target_duration);
        assert_eq!(kernels.repetitions, defaults.repetitions);
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let kernels = KernelsConfig {
            repetitions: 0,
            ..Default::default()
        };
        assert!(kernels.to_kernel_config().is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[kernels]\nrepetitions = 4\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = MembenchConfig::discover_from(nested).unwrap();
        assert_eq!(config.kernels.repetitions, 4);
    }
}
