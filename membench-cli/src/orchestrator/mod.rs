//! Benchmark Orchestrator
//!
//! Runs a suite against a measurement layer on a background thread and
//! reports progress through an [`EventSink`].
//!
//! ## Run Lifecycle
//!
//! ```text
//!   Idle ──start()──▶ Running ──last test / failure / cancel──▶ Idle
//!                        │
//!          Started ─▶ Progress × N ─▶ Finished | Failed
//! ```
//!
//! At most one run exists at a time. `start()` during a run changes nothing
//! and hands back the in-flight run's handle.
//!
//! ## Modules
//!
//! - [`suite`] - Ordered test list discovered from the layer
//! - [`events`] - Run events and the sink they are delivered to
//! - [`session`] - Per-run state, handles and the worker loop

mod events;
mod session;
mod suite;

pub use events::{EventSink, RunError, RunEvent};
pub use session::{RunHandle, RunOutcome};
pub use suite::{BenchmarkSuite, TestId};

use membench_core::{MeasurementError, MeasurementLayer};
use membench_ipc::RecordGrammar;
use session::{RunSession, run_suite};
use std::sync::{Arc, Mutex, PoisonError};

/// Drives a [`BenchmarkSuite`] through a measurement layer
pub struct Orchestrator<M> {
    suite: BenchmarkSuite,
    layer: Arc<Mutex<M>>,
    grammar: RecordGrammar,
    sink: EventSink,
    current: Mutex<Option<Arc<RunSession>>>,
}

impl<M: MeasurementLayer + 'static> Orchestrator<M> {
    /// Create an idle orchestrator
    pub fn new(suite: BenchmarkSuite, layer: M, grammar: RecordGrammar, sink: EventSink) -> Self {
        Self {
            suite,
            layer: Arc::new(Mutex::new(layer)),
            grammar,
            sink,
            current: Mutex::new(None),
        }
    }

    /// Discover the suite from the layer, then create an idle orchestrator
    pub fn discover(
        mut layer: M,
        grammar: RecordGrammar,
        sink: EventSink,
    ) -> Result<Self, MeasurementError> {
        let suite = BenchmarkSuite::discover(&mut layer)?;
        Ok(Self::new(suite, layer, grammar, sink))
    }

    /// Start a run and return immediately.
    ///
    /// `Started` is delivered on the calling thread before this returns;
    /// the tests then run on a dedicated thread. If a run is already in
    /// progress nothing happens and its handle is returned.
    pub fn start(&self) -> RunHandle {
        let mut current = loop {
            let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = match current.as_ref() {
                Some(session) if session.is_running() => {
                    tracing::debug!("run already in progress, ignoring start");
                    return RunHandle::new(session.clone());
                }
                // Still delivering its last event; keep events of both runs ordered
                Some(session) if !session.is_complete() && !session.is_on_worker_thread() => {
                    session.clone()
                }
                _ => break current,
            };
            drop(current);
            previous.wait();
        };

        let total = self.suite.test_count();
        let session = Arc::new(RunSession::new(total));
        let previous = current.replace(session.clone());
        drop(current);
        if let Some(previous) = previous {
            previous.join();
        }

        tracing::info!(total, grammar = %self.grammar, "starting run");
        self.sink.emit(RunEvent::Started { total });

        let worker_session = session.clone();
        let layer = self.layer.clone();
        let suite = self.suite.clone();
        let grammar = self.grammar;
        let sink = self.sink.clone();

        let spawned = std::thread::Builder::new()
            .name("membench-run".to_string())
            .spawn(move || run_suite(&worker_session, &layer, &suite, grammar, &sink));

        match spawned {
            Ok(thread) => session.set_thread(thread),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn run thread");
                session.finish(
                    &self.sink,
                    RunOutcome::Failed { test_index: 0 },
                    RunEvent::Failed {
                        test_index: 0,
                        reason: RunError::Measurement(format!("failed to spawn run thread: {e}")),
                    },
                );
            }
        }

        RunHandle::new(session)
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.session().is_some_and(|s| s.is_running())
    }

    /// Tests completed by the current (or last) run
    pub fn completed(&self) -> usize {
        self.session().map_or(0, |s| s.completed())
    }

    /// Number of tests in the current (or last) run, else in the suite
    pub fn total(&self) -> usize {
        self.session()
            .map_or(self.suite.test_count(), |s| s.total())
    }

    /// Grammar records are decoded with
    pub fn grammar(&self) -> RecordGrammar {
        self.grammar
    }

    fn session(&self) -> Option<Arc<RunSession>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Dropping the orchestrator cancels an in-flight run and joins its thread,
/// so the measurement layer is released before `drop` returns.
impl<M> Drop for Orchestrator<M> {
    fn drop(&mut self) {
        let session = self
            .current
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            session.request_cancel();
            session.join();
        }
    }
}
