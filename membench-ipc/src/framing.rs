//! Newline-Delimited Line Framing
//!
//! Provides message boundaries over stream-based IPC (stdin/stdout).
//! One record or protocol message per line.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Maximum line length (64 KB) to prevent memory exhaustion
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Errors that can occur while reading or writing lines
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line too long: {size} bytes (max {max} bytes)")]
    LineTooLong { size: usize, max: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("End of stream")]
    EndOfStream,
}

/// Line writer for records and protocol messages
pub struct RecordWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> RecordWriter<W> {
    /// Create a new line writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write one line and flush it
    ///
    /// Frame format:
    /// ```text
    /// <payload without newlines>\n
    /// ```
    pub fn write_line(&mut self, line: &str) -> Result<(), FrameError> {
        if line.contains('\n') {
            return Err(FrameError::InvalidFrame(
                "payload contains a newline".to_string(),
            ));
        }
        if line.len() > MAX_LINE_LEN {
            return Err(FrameError::LineTooLong {
                size: line.len(),
                max: MAX_LINE_LEN,
            });
        }

        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;

        // Flush to ensure the peer sees the line right away
        self.writer.flush()?;

        Ok(())
    }

    /// Write any displayable message as one line
    pub fn write<T: std::fmt::Display>(&mut self, message: &T) -> Result<(), FrameError> {
        self.write_line(&message.to_string())
    }
}

/// Line reader for records and protocol messages
pub struct RecordReader<R: Read> {
    reader: BufReader<R>,
    buf: String,
}

impl<R: Read> RecordReader<R> {
    /// Create a new line reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: String::new(),
        }
    }

    /// Read the next line without its terminator
    pub fn read_line(&mut self) -> Result<String, FrameError> {
        self.buf.clear();
        let n = (&mut self.reader)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_line(&mut self.buf)?;

        if n == 0 {
            return Err(FrameError::EndOfStream);
        }

        if !self.buf.ends_with('\n') {
            if n > MAX_LINE_LEN {
                return Err(FrameError::LineTooLong {
                    size: n,
                    max: MAX_LINE_LEN,
                });
            }
            // Peer closed the stream mid-line
            return Err(FrameError::EndOfStream);
        }

        Ok(self.buf.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Read the next line and parse it into a message
    pub fn read<T>(&mut self) -> Result<T, FrameError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let line = self.read_line()?;
        line.parse()
            .map_err(|e: T::Err| FrameError::InvalidFrame(e.to_string()))
    }
}
