//! Worker Process Entry Point
//!
//! Serves a [`MeasurementLayer`] to a supervisor over stdin/stdout. stdout
//! carries the protocol only; diagnostics go to stderr.

use crate::layer::MeasurementLayer;
use membench_ipc::{
    FrameError, PROTOCOL_VERSION, RecordReader, RecordWriter, SupervisorCommand, WorkerMessage,
};
use std::io::{Read, Write};

/// Worker main loop
pub struct WorkerMain<L, R: Read, W: Write> {
    layer: L,
    reader: RecordReader<R>,
    writer: RecordWriter<W>,
}

impl<L: MeasurementLayer> WorkerMain<L, std::io::Stdin, std::io::Stdout> {
    /// Create a worker talking over the process's stdin/stdout
    pub fn stdio(layer: L) -> Self {
        Self::with_io(layer, std::io::stdin(), std::io::stdout())
    }
}

impl<L: MeasurementLayer, R: Read, W: Write> WorkerMain<L, R, W> {
    /// Create a worker over arbitrary streams
    pub fn with_io(layer: L, reader: R, writer: W) -> Self {
        Self {
            layer,
            reader: RecordReader::new(reader),
            writer: RecordWriter::new(writer),
        }
    }

    /// Run the worker main loop until `SHUTDOWN` or the supervisor hangs up
    pub fn run(&mut self) -> Result<(), FrameError> {
        // Send capabilities
        self.writer.write(&WorkerMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        })?;

        loop {
            let command: SupervisorCommand = match self.reader.read() {
                Ok(cmd) => cmd,
                Err(FrameError::EndOfStream) => break,
                Err(FrameError::InvalidFrame(e)) => {
                    tracing::warn!(error = %e, "ignoring malformed command");
                    self.writer.write(&WorkerMessage::Failure(e))?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let reply = match command {
                SupervisorCommand::Count => match self.layer.test_count() {
                    Ok(n) => WorkerMessage::Count(n),
                    Err(e) => WorkerMessage::Failure(e.to_string()),
                },
                SupervisorCommand::Run { index } => {
                    tracing::debug!(index, "running test");
                    match self.layer.run_one_test(index) {
                        Ok(record) => WorkerMessage::Record(record),
                        Err(e) => WorkerMessage::Failure(e.to_string()),
                    }
                }
                SupervisorCommand::Shutdown => break,
            };

            self.writer.write(&reply)?;
        }

        Ok(())
    }
}
