//! IPC Message Types
//!
//! Text messages exchanged between the supervisor and a worker process,
//! one per line:
//!
//! ```text
//! supervisor → worker:  COUNT | RUN <index> | SHUTDOWN
//! worker → supervisor:  HELLO <version> | COUNT <n> | RECORD <record> | FAILURE <message>
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing a protocol line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown message verb: {0:?}")]
    UnknownVerb(String),

    #[error("missing argument for {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument for {verb}: {value:?}")]
    InvalidArgument { verb: &'static str, value: String },
}

/// Commands sent from Supervisor to Worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorCommand {
    /// Ask for the number of tests in the worker's suite
    Count,
    /// Run a single test by suite index
    Run {
        /// Zero-based position in the suite
        index: usize,
    },
    /// Request graceful shutdown
    Shutdown,
}

/// Messages sent from Worker to Supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Initial handshake
    Hello {
        /// Protocol version for compatibility
        protocol_version: u32,
    },
    /// Reply to [`SupervisorCommand::Count`]
    Count(usize),
    /// Reply to [`SupervisorCommand::Run`]: the raw result record text
    Record(String),
    /// The requested command could not be served
    Failure(String),
}

impl fmt::Display for SupervisorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorCommand::Count => f.write_str("COUNT"),
            SupervisorCommand::Run { index } => write!(f, "RUN {}", index),
            SupervisorCommand::Shutdown => f.write_str("SHUTDOWN"),
        }
    }
}

impl FromStr for SupervisorCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = split_verb(s);
        match verb {
            "COUNT" => Ok(SupervisorCommand::Count),
            "SHUTDOWN" => Ok(SupervisorCommand::Shutdown),
            "RUN" => {
                let index = parse_arg("RUN", arg)?;
                Ok(SupervisorCommand::Run { index })
            }
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for WorkerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMessage::Hello { protocol_version } => write!(f, "HELLO {}", protocol_version),
            WorkerMessage::Count(n) => write!(f, "COUNT {}", n),
            WorkerMessage::Record(record) => write!(f, "RECORD {}", record),
            // Messages are single-line on the wire
            WorkerMessage::Failure(message) => {
                write!(f, "FAILURE {}", message.replace(['\n', '\r'], " "))
            }
        }
    }
}

impl FromStr for WorkerMessage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = split_verb(s);
        match verb {
            "HELLO" => Ok(WorkerMessage::Hello {
                protocol_version: parse_arg("HELLO", arg)?,
            }),
            "COUNT" => Ok(WorkerMessage::Count(parse_arg("COUNT", arg)?)),
            "RECORD" => arg
                .map(|r| WorkerMessage::Record(r.to_string()))
                .ok_or(ProtocolError::MissingArgument("RECORD")),
            "FAILURE" => Ok(WorkerMessage::Failure(arg.unwrap_or_default().to_string())),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

/// Split `VERB rest` at the first space; the rest is kept verbatim.
fn split_verb(s: &str) -> (&str, Option<&str>) {
    match s.split_once(' ') {
        Some((verb, rest)) => (verb, Some(rest)),
        None => (s, None),
    }
}

fn parse_arg<T: FromStr>(verb: &'static str, arg: Option<&str>) -> Result<T, ProtocolError> {
    let value = arg.ok_or(ProtocolError::MissingArgument(verb))?;
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidArgument {
            verb,
            value: value.to_string(),
        })
}
