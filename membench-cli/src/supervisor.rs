//! Supervisor Process
//!
//! Runs the native kernels in a worker process and exposes it to the
//! orchestrator as a [`MeasurementLayer`]. The worker is the current
//! executable started with `--membench-worker`; commands go over its stdin,
//! replies come back on its stdout, its stderr is inherited.

use membench_core::{MeasurementError, MeasurementLayer};
use membench_ipc::{
    FrameError, PROTOCOL_VERSION, RecordReader, RecordWriter, SupervisorCommand, WorkerMessage,
};
use std::env;
use std::io::ErrorKind;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Hidden flag that switches the binary into worker mode
pub const WORKER_FLAG: &str = "--membench-worker";

/// Grace period for a worker to exit after `SHUTDOWN`
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),

    #[error("Worker reported failure: {0}")]
    WorkerFailure(String),

    #[error("Worker protocol error: expected {expected}, got {got}")]
    ProtocolError { expected: String, got: String },
}

impl From<FrameError> for SupervisorError {
    fn from(e: FrameError) -> Self {
        SupervisorError::IpcError(e.to_string())
    }
}

impl From<SupervisorError> for MeasurementError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::ProtocolError { .. } => MeasurementError::Protocol(e.to_string()),
            other => MeasurementError::Unavailable(other.to_string()),
        }
    }
}

/// Worker process handle
pub struct WorkerHandle {
    child: Child,
    reader: RecordReader<ChildStdout>,
    writer: RecordWriter<ChildStdin>,
}

impl WorkerHandle {
    /// Spawn the current executable in worker mode with extra arguments
    pub fn spawn<I, S>(args: I) -> Result<Self, SupervisorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let binary = env::current_exe().map_err(SupervisorError::SpawnFailed)?;
        let mut command = Command::new(binary);
        command.arg(WORKER_FLAG).args(args);
        Self::spawn_command(command)
    }

    /// Spawn a worker from an arbitrary command (for testing)
    pub fn spawn_command(mut command: Command) -> Result<Self, SupervisorError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SupervisorError::IpcError(
                "worker pipes unavailable".to_string(),
            ));
        };

        let mut handle = Self {
            child,
            reader: RecordReader::new(stdout),
            writer: RecordWriter::new(stdin),
        };

        handle.wait_for_hello()?;
        tracing::debug!(pid = handle.child.id(), "worker ready");
        Ok(handle)
    }

    /// Wait for Hello message from worker and validate protocol version
    fn wait_for_hello(&mut self) -> Result<(), SupervisorError> {
        match self.read_message()? {
            WorkerMessage::Hello { protocol_version } if protocol_version == PROTOCOL_VERSION => {
                Ok(())
            }
            WorkerMessage::Hello { protocol_version } => Err(SupervisorError::ProtocolError {
                expected: format!("protocol version {}", PROTOCOL_VERSION),
                got: format!("protocol version {}", protocol_version),
            }),
            other => Err(SupervisorError::ProtocolError {
                expected: "HELLO".to_string(),
                got: other.to_string(),
            }),
        }
    }

    /// Send one command and read its reply
    fn request(&mut self, command: SupervisorCommand) -> Result<WorkerMessage, SupervisorError> {
        if let Err(e) = self.writer.write(&command) {
            return Err(self.crashed_or(e));
        }
        match self.read_message()? {
            WorkerMessage::Failure(message) => Err(SupervisorError::WorkerFailure(message)),
            reply => Ok(reply),
        }
    }

    fn read_message(&mut self) -> Result<WorkerMessage, SupervisorError> {
        match self.reader.read() {
            Ok(msg) => Ok(msg),
            Err(e) => Err(self.crashed_or(e)),
        }
    }

    /// A broken pipe or closed stream means the worker is gone. Any other
    /// stream error leaves the pipe out of sync, so a live worker is killed.
    fn crashed_or(&mut self, e: FrameError) -> SupervisorError {
        match e {
            FrameError::EndOfStream => {
                SupervisorError::WorkerCrashed(format!("worker exited ({})", self.reap()))
            }
            FrameError::Io(ref io) if io.kind() == ErrorKind::BrokenPipe => {
                SupervisorError::WorkerCrashed(format!("worker exited ({})", self.reap()))
            }
            FrameError::Io(_) | FrameError::LineTooLong { .. } => {
                if self.is_alive() {
                    tracing::warn!(
                        pid = self.child.id(),
                        error = %e,
                        "worker stream unusable, killing"
                    );
                    let _ = self.child.kill();
                }
                SupervisorError::WorkerCrashed(format!("{} ({})", e, self.reap()))
            }
            other => other.into(),
        }
    }

    fn reap(&mut self) -> String {
        match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(wait_err) => wait_err.to_string(),
        }
    }

    /// Check if worker process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Shutdown the worker gracefully
    pub fn shutdown(mut self) -> Result<(), SupervisorError> {
        self.writer.write(&SupervisorCommand::Shutdown)?;
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if !self.is_alive() {
            return;
        }
        // Graceful: SHUTDOWN first, brief wait, then kill
        let _ = self.writer.write(&SupervisorCommand::Shutdown);
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if self.is_alive() {
            tracing::warn!(pid = self.child.id(), "worker ignored shutdown, killing");
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Measurement layer backed by a worker process
pub struct IsolatedMeasurement {
    worker: WorkerHandle,
}

impl IsolatedMeasurement {
    /// Spawn a worker from the current executable
    pub fn spawn<I, S>(args: I) -> Result<Self, SupervisorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Ok(Self {
            worker: WorkerHandle::spawn(args)?,
        })
    }

    /// Wrap an already running worker
    pub fn from_worker(worker: WorkerHandle) -> Self {
        Self { worker }
    }
}

impl MeasurementLayer for IsolatedMeasurement {
    fn test_count(&mut self) -> Result<usize, MeasurementError> {
        match self.worker.request(SupervisorCommand::Count)? {
            WorkerMessage::Count(n) => Ok(n),
            other => Err(unexpected("COUNT", other).into()),
        }
    }

    fn run_one_test(&mut self, index: usize) -> Result<String, MeasurementError> {
        match self.worker.request(SupervisorCommand::Run { index })? {
            WorkerMessage::Record(record) => Ok(record),
            other => Err(unexpected("RECORD", other).into()),
        }
    }
}

fn unexpected(expected: &str, got: WorkerMessage) -> SupervisorError {
    SupervisorError::ProtocolError {
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn fake_worker(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    const WORKER_SCRIPT: &str = r#"
echo "HELLO 1"
while read cmd; do
  case "$cmd" in
    COUNT) echo "COUNT 2" ;;
    "RUN 0") echo "RECORD 8-bit|1024|1|0.5|10" ;;
    "RUN 1") exit 3 ;;
    SHUTDOWN) exit 0 ;;
    *) echo "FAILURE unknown command" ;;
  esac
done
"#;

    #[test]
    fn test_count_and_record() {
        let worker = WorkerHandle::spawn_command(fake_worker(WORKER_SCRIPT)).unwrap();
        let mut layer = IsolatedMeasurement::from_worker(worker);
        assert_eq!(layer.test_count().unwrap(), 2);
        assert_eq!(layer.run_one_test(0).unwrap(), "8-bit|1024|1|0.5|10");
    }

    #[test]
    fn test_worker_death_is_unavailable() {
        let worker = WorkerHandle::spawn_command(fake_worker(WORKER_SCRIPT)).unwrap();
        let mut layer = IsolatedMeasurement::from_worker(worker);
        assert!(matches!(
            layer.run_one_test(1),
            Err(MeasurementError::Unavailable(_))
        ));
        // Stays unavailable afterwards
        assert!(matches!(
            layer.run_one_test(0),
            Err(MeasurementError::Unavailable(_))
        ));
    }

    #[test]
    fn test_worker_failure_reply() {
        let worker = WorkerHandle::spawn_command(fake_worker(WORKER_SCRIPT)).unwrap();
        let mut layer = IsolatedMeasurement::from_worker(worker);
        assert!(matches!(
            layer.run_one_test(7),
            Err(MeasurementError::Unavailable(msg)) if msg.contains("unknown command")
        ));
    }

    #[test]
    fn test_garbled_reply_kills_live_worker() {
        // Invalid UTF-8, then keep the pipe open
        let script = r#"
echo "HELLO 1"
read cmd
printf 'COUNT \377\n'
while read cmd; do :; done
"#;
        let worker = WorkerHandle::spawn_command(fake_worker(script)).unwrap();
        let mut layer = IsolatedMeasurement::from_worker(worker);
        assert!(matches!(
            layer.test_count(),
            Err(MeasurementError::Unavailable(_))
        ));
        assert!(!layer.worker.is_alive());
    }

    #[test]
    fn test_protocol_version_mismatch() {
        let result = WorkerHandle::spawn_command(fake_worker("echo 'HELLO 99'; read x"));
        assert!(matches!(
            result,
            Err(SupervisorError::ProtocolError { .. })
        ));
    }

    #[test]
    fn test_missing_hello() {
        let result = WorkerHandle::spawn_command(fake_worker("exit 0"));
        assert!(matches!(result, Err(SupervisorError::WorkerCrashed(_))));
    }

    #[test]
    fn test_spawn_failure() {
        let result = WorkerHandle::spawn_command(Command::new("/nonexistent/membench-worker"));
        assert!(matches!(result, Err(SupervisorError::SpawnFailed(_))));
    }

    #[test]
    fn test_graceful_shutdown() {
        let worker = WorkerHandle::spawn_command(fake_worker(WORKER_SCRIPT)).unwrap();
        worker.shutdown().unwrap();
    }
}
