//! Measurement Layer Contract
//!
//! The orchestrator only ever talks to a [`MeasurementLayer`]. Calls are
//! blocking and single-shot: whatever a call returns is authoritative and is
//! never retried.

use thiserror::Error;

/// Errors raised by a measurement layer
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("test index {index} out of range (suite has {count} tests)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("measurement layer unavailable: {0}")]
    Unavailable(String),

    #[error("measurement protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The component that actually performs the memory tests.
pub trait MeasurementLayer: Send {
    /// Number of tests in the suite. Queried once, before any run.
    fn test_count(&mut self) -> Result<usize, MeasurementError>;

    /// Run the test at `index` and return its raw result record.
    fn run_one_test(&mut self, index: usize) -> Result<String, MeasurementError>;
}

impl<M: MeasurementLayer + ?Sized> MeasurementLayer for Box<M> {
    fn test_count(&mut self) -> Result<usize, MeasurementError> {
        (**self).test_count()
    }

    fn run_one_test(&mut self, index: usize) -> Result<String, MeasurementError> {
        (**self).run_one_test(index)
    }
}
