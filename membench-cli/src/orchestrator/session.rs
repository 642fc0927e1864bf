//! Run Session
//!
//! State of one run, shared between the orchestrator, the run's worker
//! thread and every [`RunHandle`] given out for it.

use super::events::{EventSink, RunError, RunEvent};
use super::suite::BenchmarkSuite;
use membench_core::MeasurementLayer;
use membench_ipc::{RecordGrammar, ResultRecord, decode_record};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread::{JoinHandle, ThreadId};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every test completed
    Completed,
    /// The test at `test_index` failed and the rest of the suite was skipped
    Failed {
        /// Suite index of the failing test
        test_index: usize,
    },
    /// Stopped on request after `completed` tests
    Cancelled {
        /// Tests completed before the stop
        completed: usize,
    },
}

pub(crate) struct RunSession {
    total: usize,
    completed: AtomicUsize,
    running: AtomicBool,
    cancel_requested: AtomicBool,
    worker_thread: OnceLock<ThreadId>,
    thread: Mutex<Option<JoinHandle<()>>>,
    outcome: Mutex<Option<RunOutcome>>,
    done: Condvar,
}

impl RunSession {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            running: AtomicBool::new(true),
            cancel_requested: AtomicBool::new(false),
            worker_thread: OnceLock::new(),
            thread: Mutex::new(None),
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn is_on_worker_thread(&self) -> bool {
        self.worker_thread.get() == Some(&std::thread::current().id())
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub(crate) fn set_thread(&self, thread: JoinHandle<()>) {
        *self.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread);
    }

    /// Wait for the run's thread to exit, releasing everything it holds
    pub(crate) fn join(&self) {
        if self.is_on_worker_thread() {
            return;
        }
        let thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("run thread panicked");
            }
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.outcome().is_some()
    }

    fn outcome(&self) -> Option<RunOutcome> {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the final event of this run has been delivered
    pub(crate) fn wait(&self) -> RunOutcome {
        let mut outcome = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = *outcome {
                return outcome;
            }
            outcome = self
                .done
                .wait(outcome)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Leave the running state, publish the final event, then wake waiters
    pub(crate) fn finish(&self, sink: &EventSink, outcome: RunOutcome, event: RunEvent) {
        self.running.store(false, Ordering::Release);
        sink.emit(event);
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.done.notify_all();
    }
}

/// Handle to a started run
#[derive(Clone)]
pub struct RunHandle {
    session: Arc<RunSession>,
}

impl RunHandle {
    pub(crate) fn new(session: Arc<RunSession>) -> Self {
        Self { session }
    }

    /// Block until the run is over and its last event has been delivered.
    ///
    /// Calling this from inside an event callback of the same run deadlocks.
    pub fn wait(&self) -> RunOutcome {
        self.session.wait()
    }

    /// Whether the run is over and its last event has been delivered
    pub fn is_finished(&self) -> bool {
        self.session.is_complete()
    }

    /// Ask the run to stop before its next test.
    ///
    /// A measurement already in progress is never interrupted; the stop takes
    /// effect once it returns.
    pub fn cancel(&self) {
        self.session.request_cancel();
    }

    /// Tests completed so far
    pub fn completed(&self) -> usize {
        self.session.completed()
    }

    /// Number of tests in the run
    pub fn total(&self) -> usize {
        self.session.total()
    }
}

/// Walk the suite on the current thread, publishing one event per test.
pub(crate) fn run_suite<M: MeasurementLayer>(
    session: &RunSession,
    layer: &Mutex<M>,
    suite: &BenchmarkSuite,
    grammar: RecordGrammar,
    sink: &EventSink,
) {
    let _ = session.worker_thread.set(std::thread::current().id());
    let total = session.total();

    for test in suite.iter() {
        let index = test.index();

        if session.cancel_requested.load(Ordering::Acquire) {
            let completed = session.completed();
            tracing::info!(completed, total, "run cancelled");
            session.finish(
                sink,
                RunOutcome::Cancelled { completed },
                RunEvent::Failed {
                    test_index: index,
                    reason: RunError::Cancelled,
                },
            );
            return;
        }

        tracing::debug!(test = %test, "running test");
        match run_test(layer, index, grammar) {
            Ok(record) => {
                let completed = session.completed.fetch_add(1, Ordering::AcqRel) + 1;
                tracing::debug!(test = record.test_name(), completed, total, "test completed");
                sink.emit(RunEvent::Progress {
                    record,
                    completed,
                    total,
                });
            }
            Err(reason) => {
                tracing::warn!(test = %test, error = %reason, "aborting run");
                session.finish(
                    sink,
                    RunOutcome::Failed { test_index: index },
                    RunEvent::Failed {
                        test_index: index,
                        reason,
                    },
                );
                return;
            }
        }
    }

    tracing::info!(total, "run finished");
    session.finish(sink, RunOutcome::Completed, RunEvent::Finished);
}

fn run_test<M: MeasurementLayer>(
    layer: &Mutex<M>,
    index: usize,
    grammar: RecordGrammar,
) -> Result<ResultRecord, RunError> {
    let mut layer = layer.lock().unwrap_or_else(PoisonError::into_inner);
    let raw = catch_unwind(AssertUnwindSafe(|| layer.run_one_test(index)))
        .map_err(|_| RunError::Measurement("measurement layer panicked".to_string()))?
        .map_err(|e| RunError::Measurement(e.to_string()))?;
    Ok(decode_record(&raw, grammar)?)
}
