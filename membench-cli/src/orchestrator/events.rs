//! Run Events
//!
//! Typed notifications published by the orchestrator while a suite runs.
//! Every successful run produces exactly one `Started`, one `Progress` per
//! test in suite order, then one `Finished`. A run that stops early ends
//! with one `Failed` instead of `Finished`.

use membench_ipc::{MalformedRecord, ResultRecord};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use thiserror::Error;

/// Why a run stopped before the end of the suite
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Malformed(#[from] MalformedRecord),

    #[error("measurement failed: {0}")]
    Measurement(String),

    #[error("run cancelled")]
    Cancelled,
}

/// A progress notification
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The run began; `total` tests will be attempted
    Started {
        /// Number of tests in the suite
        total: usize,
    },
    /// One more test completed
    Progress {
        /// Decoded record of the test that just completed
        record: ResultRecord,
        /// Tests completed so far, including this one
        completed: usize,
        /// Number of tests in the suite
        total: usize,
    },
    /// Every test completed
    Finished,
    /// The run stopped at `test_index`
    Failed {
        /// Suite index of the test that did not complete
        test_index: usize,
        /// What went wrong
        reason: RunError,
    },
}

impl RunEvent {
    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Finished | RunEvent::Failed { .. })
    }
}

/// Where run events are delivered.
///
/// The callback runs on whichever thread emits the event: `Started` on the
/// thread that called `start`, everything else on the run's worker thread.
/// Use [`EventSink::channel`] to receive events on a thread of your choosing.
#[derive(Clone)]
pub struct EventSink {
    callback: Arc<dyn Fn(RunEvent) + Send + Sync>,
}

impl EventSink {
    /// Deliver events to a callback
    pub fn new(callback: impl Fn(RunEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Deliver events into a channel
    pub fn channel() -> (Self, Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel();
        let sink = Self::new(move |event| {
            // Receiver gone: nobody is listening any more
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    /// Publish one event.
    ///
    /// A panicking callback loses that event but never the run: the panic is
    /// logged and the run carries on to its terminal event.
    pub fn emit(&self, event: RunEvent) {
        if catch_unwind(AssertUnwindSafe(|| (self.callback)(event))).is_err() {
            tracing::error!("event callback panicked");
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}
