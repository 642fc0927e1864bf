#![warn(missing_docs)]
//! # Membench
//!
//! Memory write bandwidth benchmarks with an observable run orchestrator.
//!
//! Membench measures how fast the host can write memory:
//! - **Native Kernels**: 8- to 128-bit element writes, multi-threaded writes and fills, buffer copy
//! - **Adaptive Sizing**: buffers double until a timed batch crosses the target duration
//! - **Process Isolation**: kernels run in a worker process; a crash fails the run, not the tool
//! - **Observable Runs**: typed `Started` / `Progress` / `Finished` / `Failed` events
//! - **Two Record Grammars**: raw detailed measurements or precomputed summaries
//! - **Reports**: human table, JSON and CSV with three-significant-digit figures
//!
//! ## Quick Start
//!
//! ```ignore
//! use membench::prelude::*;
//!
//! let kernels = NativeKernels::new(default_catalog(4), KernelConfig::default(), RecordGrammar::Detailed);
//! let (sink, events) = EventSink::channel();
//! let orchestrator = Orchestrator::discover(kernels, RecordGrammar::Detailed, sink)?;
//! orchestrator.start();
//!
//! for event in events.iter() {
//!     if let RunEvent::Progress { record, .. } = &event {
//!         let metrics = DerivedMetrics::from_record(record);
//!         println!("{}: {}", record.test_name(), metrics.bandwidth_display);
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! ```

// Re-export measurement types
pub use membench_core::{
    ElementWidth, KernelConfig, KernelDef, KernelKind, MeasurementError, MeasurementLayer,
    NativeKernels, WorkerMain, default_catalog,
};

// Re-export record codec
pub use membench_ipc::{
    DetailedRecord, MalformedRecord, RecordGrammar, ResultRecord, SummaryRecord, decode_record,
};

// Re-export orchestration
pub use membench_cli::{
    BenchmarkSuite, EventSink, IsolatedMeasurement, MembenchConfig, Orchestrator, RunError,
    RunEvent, RunHandle, RunOutcome, TestId,
};

// Re-export reporting
pub use membench_report::{DerivedMetrics, OutputFormat, Report, ThroughputUnit};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DerivedMetrics, EventSink, KernelConfig, MeasurementError, MeasurementLayer,
        NativeKernels, Orchestrator, RecordGrammar, RunEvent, RunOutcome, default_catalog,
    };
}

/// Run the membench CLI.
///
/// Call this from your main function.
pub use membench_cli::run;
