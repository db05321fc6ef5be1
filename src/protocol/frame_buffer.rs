//! Frame buffer for splitting a byte stream into frame bodies.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForLength`: Need at least 3 bytes
//! - `WaitingForBody`: Length parsed, need N more body bytes
//!
//! The session does not use this buffer: it reads one response at a time
//! straight from the connection. It is public API for the other side of
//! the wire, code that receives arbitrary chunks of a stream. Verifier
//! stand-ins in tests decode commands with [`FrameBuffer::push_commands`],
//! and recorded verifier output can be checked with [`decode_responses`].
//!
//! # Example
//!
//! ```
//! use verifier_client::protocol::{Command, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let frame = Command::module().encode().unwrap();
//!
//! assert!(buffer.push(&frame[..2]).unwrap().is_empty());
//! let bodies = buffer.push(&frame[2..]).unwrap();
//! assert_eq!(bodies.len(), 1);
//! assert_eq!(Command::decode_body(&bodies[0]).unwrap(), Command::module());
//! ```

use bytes::{Bytes, BytesMut};

use super::frame::{Command, Response};
use super::wire_format::{decode_length, LENGTH_PREFIX_SIZE};
use crate::error::{Result, VerifierError};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete length prefix.
    WaitingForLength,
    /// Prefix parsed, waiting for body bytes.
    WaitingForBody { size: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frame
/// bodies.
pub struct FrameBuffer {
    /// Accumulated bytes.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer (4KB initial capacity).
    pub fn new() -> Self {
        Self::with_capacity(4 * 1024)
    }

    /// Create a new frame buffer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForLength,
        }
    }

    /// Push data into the buffer and extract all complete frame bodies.
    ///
    /// Partial frames stay buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::ZeroSizeMessage`] if a frame declares
    /// length 0. The buffer should be discarded afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut bodies = Vec::new();
        while let Some(body) = self.try_extract_one()? {
            bodies.push(body);
        }
        Ok(bodies)
    }

    /// Push data and decode every complete body as a [`Command`].
    pub fn push_commands(&mut self, data: &[u8]) -> Result<Vec<Command>> {
        self.push(data)?
            .iter()
            .map(|body| Command::decode_body(body))
            .collect()
    }

    /// Push data and decode every complete body as a [`Response`].
    pub fn push_responses(&mut self, data: &[u8]) -> Result<Vec<Response>> {
        self.push(data)?.into_iter().map(Response::from_body).collect()
    }

    /// Signal end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::TruncatedResponse`] if a frame was cut
    /// short, so a partial message is never taken for a complete one.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::WaitingForLength if self.buffer.is_empty() => Ok(()),
            State::WaitingForLength => Err(VerifierError::TruncatedResponse {
                expected: LENGTH_PREFIX_SIZE,
                received: self.buffer.len(),
            }),
            State::WaitingForBody { size } => Err(VerifierError::TruncatedResponse {
                expected: size,
                received: self.buffer.len(),
            }),
        }
    }

    /// Try to extract a single body from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::WaitingForLength => {
                    if self.buffer.len() < LENGTH_PREFIX_SIZE {
                        return Ok(None);
                    }
                    let prefix = [self.buffer[0], self.buffer[1], self.buffer[2]];
                    let size = decode_length(prefix)?;
                    let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);
                    self.state = State::WaitingForBody { size };
                }
                State::WaitingForBody { size } => {
                    if self.buffer.len() < size {
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(size).freeze();
                    self.state = State::WaitingForLength;
                    return Ok(Some(body));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a complete byte stream into responses.
///
/// Fails if the stream ends inside a frame.
pub fn decode_responses(stream: &[u8]) -> Result<Vec<Response>> {
    let mut buffer = FrameBuffer::with_capacity(stream.len());
    let responses = buffer.push_responses(stream)?;
    buffer.finish()?;
    Ok(responses)
}
