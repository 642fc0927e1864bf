#![warn(missing_docs)]
//! Membench CLI Library
//!
//! Orchestration and command-line front end for membench. Use
//! `membench::run()` (or `membench_cli::run()`) in your main function.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     membench_cli::run()
//! }
//! ```

mod config;
mod orchestrator;
mod planner;
mod reporting;
mod supervisor;

pub use config::*;
pub use orchestrator::{
    BenchmarkSuite, EventSink, Orchestrator, RunError, RunEvent, RunHandle, RunOutcome, TestId,
};
pub use planner::{ExecutionPlan, build_plan};
pub use reporting::{RunCollector, build_report_meta, format_human_output, system_info};
pub use supervisor::*;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use membench_core::{
    KernelConfig, MeasurementLayer, NativeKernels, WorkerMain, available_cores, default_catalog,
};
use membench_ipc::RecordGrammar;
use membench_report::{OutputFormat, generate_csv_report, generate_json_report};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Membench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "membench")]
#[command(author, version, about = "Membench - memory write bandwidth benchmarks")]
pub struct Cli {
    /// Optional subcommand (List, Run); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter kernels by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: human, json, csv
    #[arg(long)]
    pub format: Option<String>,

    /// Write the report to a file.
    /// Optionally specify a path; defaults to <output.directory>/report.<ext>
    #[arg(short, long)]
    pub output: Option<Option<PathBuf>>,

    /// Result record layout: detailed or summary
    #[arg(long)]
    pub grammar: Option<RecordGrammar>,

    /// Run kernels in an isolated worker process
    /// Use --isolated=false to run in-process
    #[arg(long, action = clap::ArgAction::Set)]
    pub isolated: Option<bool>,

    /// Threads for the multi-threaded kernels (0 = all cores)
    #[arg(long, short = 'j')]
    pub threads: Option<usize>,

    /// Passes over the buffer per timed batch
    #[arg(long)]
    pub repetitions: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Dry run - list kernels without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Internal: Run as worker process (used by supervisor)
    #[arg(long, hide = true)]
    pub membench_worker: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the kernels that would run
    List,
    /// Run kernels (default)
    Run,
}

/// Run the Membench CLI with the given arguments.
/// This is the main entry point for the membench binary.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the Membench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // stdout belongs to the report (or the protocol, in a worker); logs go to stderr
    let filter = if cli.verbose {
        "membench=debug"
    } else {
        "membench=info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    // Discover membench.toml configuration (CLI flags override)
    let config = MembenchConfig::discover().unwrap_or_default();
    let settings = RunSettings::resolve(&cli, &config)?;

    // Handle worker mode first
    if cli.membench_worker {
        return run_worker_mode(&settings);
    }

    match cli.command {
        Some(Commands::List) => list_kernels(&settings),
        Some(Commands::Run) => run_kernels(&cli, &config, &settings),
        None if cli.dry_run => list_kernels(&settings),
        None => run_kernels(&cli, &config, &settings),
    }
}

/// Everything a run needs, layered: membench.toml defaults → CLI overrides.
#[derive(Debug, Clone)]
struct RunSettings {
    filter: String,
    filter_re: Regex,
    grammar: RecordGrammar,
    isolated: bool,
    kernel_config: KernelConfig,
    threads: usize,
    format: OutputFormat,
}

impl RunSettings {
    fn resolve(cli: &Cli, config: &MembenchConfig) -> anyhow::Result<Self> {
        let filter_re = Regex::new(&cli.filter)
            .map_err(|e| anyhow::anyhow!("Invalid filter {:?}: {}", cli.filter, e))?;

        let mut kernel_config = config.kernels.to_kernel_config()?;
        if let Some(repetitions) = cli.repetitions {
            if repetitions == 0 {
                anyhow::bail!("--repetitions must be at least 1");
            }
            kernel_config.repetitions = repetitions;
        }

        let threads = match cli.threads.unwrap_or(config.kernels.threads) {
            0 => available_cores(),
            n => n,
        };

        let format = cli
            .format
            .as_deref()
            .unwrap_or(&config.output.format)
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            filter: cli.filter.clone(),
            filter_re,
            grammar: cli.grammar.unwrap_or(config.runner.grammar),
            isolated: cli
                .isolated
                .unwrap_or(config.runner.isolation.is_isolated()),
            kernel_config,
            threads,
            format,
        })
    }

    fn plan(&self) -> ExecutionPlan {
        build_plan(default_catalog(self.threads), Some(&self.filter_re))
    }

    fn native_kernels(&self) -> NativeKernels {
        NativeKernels::new(self.plan().kernels, self.kernel_config.clone(), self.grammar)
    }

    /// Arguments that make a worker resolve the same suite as this process
    fn worker_args(&self) -> Vec<String> {
        vec![
            "--grammar".to_string(),
            self.grammar.to_string(),
            "--threads".to_string(),
            self.threads.to_string(),
            "--repetitions".to_string(),
            self.kernel_config.repetitions.to_string(),
            "--".to_string(),
            self.filter.clone(),
        ]
    }
}

/// Run as a worker process (IPC mode)
fn run_worker_mode(settings: &RunSettings) -> anyhow::Result<()> {
    let mut worker = WorkerMain::stdio(settings.native_kernels());
    worker
        .run()
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

fn list_kernels(settings: &RunSettings) -> anyhow::Result<()> {
    println!("Membench Plan:");

    let plan = settings.plan();
    for (index, kernel) in plan.kernels.iter().enumerate() {
        println!(
            "├── #{} {} ({:?}, {}-bit, {} thread{})",
            index,
            kernel.name,
            kernel.kind,
            kernel.element.bits(),
            kernel.threads,
            if kernel.threads == 1 { "" } else { "s" }
        );
    }

    println!("{} kernels found.", plan.kernels.len());
    Ok(())
}

fn run_kernels(cli: &Cli, config: &MembenchConfig, settings: &RunSettings) -> anyhow::Result<()> {
    let plan = settings.plan();
    if plan.kernels.is_empty() {
        println!("No kernels found.");
        return Ok(());
    }

    let mode_str = if settings.isolated {
        "isolated"
    } else {
        "in-process"
    };
    eprintln!(
        "Running {} kernels ({}, {} grammar, {} threads)...\n",
        plan.kernels.len(),
        mode_str,
        settings.grammar,
        settings.threads
    );

    let layer: Box<dyn MeasurementLayer> = if settings.isolated {
        Box::new(IsolatedMeasurement::spawn(settings.worker_args())?)
    } else {
        Box::new(settings.native_kernels())
    };

    let start_time = Instant::now();
    let (sink, events) = EventSink::channel();
    let orchestrator = Orchestrator::discover(layer, settings.grammar, sink)?;
    let handle = orchestrator.start();

    let pb = ProgressBar::new(orchestrator.total() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    // Marshal events onto this thread; the sink outlives the run so stop on the terminal event
    let mut collector = RunCollector::new();
    for event in events.iter() {
        let terminal = event.is_terminal();
        if let RunEvent::Started { total } = event {
            pb.set_length(total as u64);
        }
        if let Some(row) = collector.observe(event) {
            pb.set_message(format!(
                "{}: {}",
                row.test_name, row.metrics.throughput_display
            ));
            pb.inc(1);
        }
        if terminal {
            break;
        }
    }

    let outcome = handle.wait();
    if collector.failed() {
        pb.abandon_with_message("Failed");
    } else {
        pb.finish_with_message("Complete");
    }
    tracing::debug!(
        ?outcome,
        completed = handle.completed(),
        total = handle.total(),
        "run over"
    );

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let failed = collector.failed();
    let meta = build_report_meta(orchestrator.grammar());
    let report = collector.into_report(meta, total_duration_ms);

    // Generate output
    let output = match settings.format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_csv_report(&report),
        OutputFormat::Human => format_human_output(&report),
    };

    // Write output
    if let Some(path) = resolve_output_path(&cli.output, config, settings.format) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    // Exit with appropriate code
    if failed {
        if let Some(failure) = &report.failure {
            eprintln!("\nRun failed: {}", failure.message);
        }
        // Joins the run thread, which drops the layer and reaps the worker
        drop(orchestrator);
        std::process::exit(1);
    }

    Ok(())
}

/// Resolve the report path from the CLI flag or config directory.
fn resolve_output_path(
    cli_output: &Option<Option<PathBuf>>,
    config: &MembenchConfig,
    format: OutputFormat,
) -> Option<PathBuf> {
    match cli_output {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(
            PathBuf::from(&config.output.directory).join(format!("report.{}", format.extension())),
        ),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("membench").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = parse(&["--grammar", "summary", "--threads", "3", "--repetitions", "2", "^64"]);
        let mut config = MembenchConfig::default();
        config.output.format = "json".to_string();

        let settings = RunSettings::resolve(&cli, &config).unwrap();
        assert_eq!(settings.grammar, RecordGrammar::Summary);
        assert_eq!(settings.threads, 3);
        assert_eq!(settings.kernel_config.repetitions, 2);
        assert_eq!(settings.format, OutputFormat::Json);
        assert!(settings.isolated);
    }

    #[test]
    fn test_isolated_flag() {
        let cli = parse(&["--isolated=false"]);
        let settings = RunSettings::resolve(&cli, &MembenchConfig::default()).unwrap();
        assert!(!settings.isolated);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let cli = parse(&["("]);
        assert!(RunSettings::resolve(&cli, &MembenchConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let cli = parse(&["--format", "html"]);
        assert!(RunSettings::resolve(&cli, &MembenchConfig::default()).is_err());
    }

    #[test]
    fn test_worker_args_round_trip() {
        let cli = parse(&["--grammar", "summary", "--threads", "2", "memset"]);
        let settings = RunSettings::resolve(&cli, &MembenchConfig::default()).unwrap();

        let worker_cli = Cli::try_parse_from(
            ["membench", "--membench-worker"]
                .into_iter()
                .map(String::from)
                .chain(settings.worker_args()),
        )
        .unwrap();
        assert!(worker_cli.membench_worker);

        let worker_settings = RunSettings::resolve(&worker_cli, &MembenchConfig::default()).unwrap();
        let names = |s: &RunSettings| -> Vec<String> {
            s.plan().kernels.into_iter().map(|k| k.name).collect()
        };
        assert_eq!(names(&worker_settings), names(&settings));
        assert_eq!(names(&settings), vec!["memset (2 thr)".to_string()]);
        assert_eq!(worker_settings.grammar, RecordGrammar::Summary);
    }

    #[test]
    fn test_output_path_resolution() {
        let config = MembenchConfig::default();
        assert_eq!(resolve_output_path(&None, &config, OutputFormat::Json), None);
        assert_eq!(
            resolve_output_path(&Some(None), &config, OutputFormat::Csv),
            Some(PathBuf::from("target/membench/report.csv"))
        );
        assert_eq!(
            resolve_output_path(&Some(Some("out.json".into())), &config, OutputFormat::Json),
            Some(PathBuf::from("out.json"))
        );
    }
}
