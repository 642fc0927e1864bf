#![warn(missing_docs)]
//! Membench IPC Protocol
//!
//! The text contract between the measurement layer and the orchestrator.
//! A measurement produces one `|`-delimited result record per test; records
//! and worker commands travel newline-delimited over stdin/stdout when the
//! measurement layer runs in an isolated worker process.

mod framing;
mod messages;
mod record;

pub use framing::{FrameError, MAX_LINE_LEN, RecordReader, RecordWriter};
pub use messages::{ProtocolError, SupervisorCommand, WorkerMessage};
pub use record::{
    DetailedRecord, FIELD_DELIMITER, MalformedRecord, RecordGrammar, ResultRecord, SummaryRecord,
    decode_record,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;
