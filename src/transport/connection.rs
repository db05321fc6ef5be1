//! One established connection to the verifier.
//!
//! Reads and writes are byte-exact and each blocking call is bounded by the
//! I/O timeout. Every failure is mapped onto the transport error kinds of
//! [`VerifierError`].

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{Result, VerifierError};
use crate::protocol::{decode_length, Command, Response, LENGTH_PREFIX_SIZE};

/// A connected, half-duplex stream to the verifier.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    io_timeout: Duration,
    peer: String,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(stream: S, io_timeout: Duration, peer: impl Into<String>) -> Self {
        Self {
            stream,
            io_timeout,
            peer: peer.into(),
        }
    }

    /// Description of the remote end, for logs.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Read exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::PrematureEof`] if the stream ends first
    /// - [`VerifierError::Io`] on a read error or timeout
    pub async fn read_exactly(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        let mut filled = 0;

        while filled < n {
            let read = timeout(self.io_timeout, self.stream.read(&mut buf[filled..]))
                .await
                .map_err(|_| self.timed_out("read"))?
                .map_err(|e| VerifierError::io(&e))?;
            if read == 0 {
                return Err(VerifierError::PrematureEof {
                    bytes_short: n - filled,
                });
            }
            filled += read;
        }

        Ok(buf.freeze())
    }

    /// Write all bytes and flush.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::ShortWrite`] if the stream stops accepting bytes
    ///   without reporting an error
    /// - [`VerifierError::Io`] on a write error or timeout
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = 0;

        while written < bytes.len() {
            let n = timeout(self.io_timeout, self.stream.write(&bytes[written..]))
                .await
                .map_err(|_| self.timed_out("write"))?
                .map_err(|e| VerifierError::io(&e))?;
            if n == 0 {
                return Err(VerifierError::ShortWrite {
                    written,
                    expected: bytes.len(),
                });
            }
            written += n;
        }

        timeout(self.io_timeout, self.stream.flush())
            .await
            .map_err(|_| self.timed_out("flush"))?
            .map_err(|e| VerifierError::io(&e))
    }

    /// Read one response frame.
    pub async fn read_response(&mut self) -> Result<Response> {
        let prefix = self.read_exactly(LENGTH_PREFIX_SIZE).await?;
        let size = decode_length([prefix[0], prefix[1], prefix[2]])?;
        let body = self.read_exactly(size).await?;
        Response::from_body(body)
    }

    /// Encode and send one command.
    ///
    /// Encoding happens before any byte is written, so an oversized
    /// command leaves the stream untouched.
    pub async fn send_command(&mut self, command: &Command) -> Result<()> {
        let frame = command.encode()?;
        tracing::debug!(
            peer = %self.peer,
            opcode = command.opcode.name(),
            body_len = frame.len() - LENGTH_PREFIX_SIZE,
            "sending command"
        );
        self.write_all(&frame).await
    }

    /// Send one command and read its response.
    pub async fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.send_command(command).await?;
        let response = self.read_response().await?;
        tracing::debug!(
            peer = %self.peer,
            opcode = command.opcode.name(),
            code = response.code,
            message_len = response.message.len(),
            "received response"
        );
        Ok(response)
    }

    /// Shut the stream down and release it.
    ///
    /// The stream is dropped whatever the outcome; the error only reports
    /// that the orderly shutdown failed.
    pub async fn close(mut self) -> Result<()> {
        let result = timeout(self.io_timeout, self.stream.shutdown()).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(VerifierError::io(&e)),
            Err(_) => Err(self.timed_out("shutdown")),
        }
    }

    fn timed_out(&self, op: &str) -> VerifierError {
        VerifierError::Io {
            errno: None,
            message: format!("{op} timed out after {:?}", self.io_timeout),
        }
    }
}
