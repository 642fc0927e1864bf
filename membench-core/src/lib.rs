#![warn(missing_docs)]
//! Membench Core - Measurement Runtime
//!
//! This crate provides the measurement side of a benchmark run:
//! - `MeasurementLayer` contract the orchestrator drives
//! - Native memory-write kernels (per-width writes, multi-threaded fills, copy)
//! - Worker main loop serving a layer over stdin/stdout

mod kernels;
mod layer;
mod measure;
mod worker;

pub use kernels::{
    Element, ElementWidth, KernelConfig, KernelDef, KernelKind, NativeKernels, default_catalog,
    encode,
};
pub use layer::{MeasurementError, MeasurementLayer};
pub use measure::{Timer, available_cores, duration_ms};
pub use worker::WorkerMain;
