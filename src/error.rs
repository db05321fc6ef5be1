//! Error types for verifier-client.

use thiserror::Error;

/// Main error type for all verifier operations.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The connection to the verifier could not be established.
    #[error("Unable to connect to verifier (errno={errno:?}): {message}")]
    Connection {
        /// OS error number, if the failure carried one.
        errno: Option<i32>,
        /// Human readable cause.
        message: String,
    },

    /// I/O error while reading from or writing to an established connection.
    #[error("Verifier socket error (errno={errno:?}): {message}")]
    Io {
        /// OS error number, if the failure carried one.
        errno: Option<i32>,
        /// Human readable cause.
        message: String,
    },

    /// The verifier closed the stream before a full message arrived.
    #[error("Unexpected EOF from verifier, {bytes_short} bytes short")]
    PrematureEof {
        /// Number of bytes still missing when the stream ended.
        bytes_short: usize,
    },

    /// The write primitive accepted fewer bytes than requested without failing.
    #[error("Not all bytes could be written ({written} of {expected})")]
    ShortWrite {
        /// Bytes written before the write stalled.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// The command body does not fit the 3-byte length prefix.
    #[error("Message of {length} bytes is too long for the verifier")]
    MessageTooLong {
        /// Encoded body length.
        length: usize,
    },

    /// The verifier announced a frame of size zero.
    #[error("Verifier returned a message of size zero")]
    ZeroSizeMessage,

    /// A byte stream ended in the middle of a frame.
    #[error("Truncated response: expected {expected} bytes, received {received}")]
    TruncatedResponse {
        /// Declared frame size.
        expected: usize,
        /// Bytes available when the stream ended.
        received: usize,
    },

    /// The greeting sent on connect was not OK.
    #[error("Communication with the verifier could not be initialised (code={code:#04x}): {message}")]
    HandshakeRejected {
        /// Response code of the greeting.
        code: u8,
        /// Greeting message.
        message: String,
    },

    /// MOD or IFACE was not answered with MORE.
    #[error("Unexpected verifier response (code={code:#04x}): {message}")]
    UnexpectedHandshakeResponse {
        /// Response code received.
        code: u8,
        /// Response message.
        message: String,
    },

    /// The verifier refused to delete a stored revision.
    #[error("Deletion of revision {revision} of {locator} failed (code={code:#04x}): {message}")]
    DeletionRejected {
        /// Locator of the module.
        locator: String,
        /// Revision that was to be deleted.
        revision: i64,
        /// Response code received.
        code: u8,
        /// Response message.
        message: String,
    },

    /// QUIT was not answered with GOODBYE.
    #[error("Verifier did not say goodbye (code={code:#04x}): {message}")]
    NoGoodbye {
        /// Response code received.
        code: u8,
        /// Response message.
        message: String,
    },

    /// A command body could not be decoded.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Text mode was requested for a document that is not verified.
    #[error("There is nothing to render")]
    NothingToRender,

    /// TEXT or FINISH was issued before the MOD/IFACE handshake.
    #[error("Session is not in text mode")]
    NotInTextMode,

    /// Deletion revisions must be positive.
    #[error("Invalid revision {0}, must be greater than 0")]
    InvalidRevision(i64),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VerifierError {
    /// Build a [`VerifierError::Connection`] from an I/O error.
    pub fn connection(err: &std::io::Error) -> Self {
        Self::Connection {
            errno: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    /// Build a [`VerifierError::Io`] from an I/O error.
    pub fn io(err: &std::io::Error) -> Self {
        Self::Io {
            errno: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    /// Check if this error came from the transport layer.
    ///
    /// Transport errors leave the connection in an unknown state, so a
    /// session that observes one must be discarded.
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Io { .. }
                | Self::PrematureEof { .. }
                | Self::ShortWrite { .. }
        )
    }

    /// Check if this error ends the session it occurred in.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.is_io()
            || matches!(
                self,
                Self::HandshakeRejected { .. }
                    | Self::ZeroSizeMessage
                    | Self::TruncatedResponse { .. }
            )
    }
}

impl From<std::io::Error> for VerifierError {
    fn from(err: std::io::Error) -> Self {
        Self::io(&err)
    }
}

/// Result type alias using VerifierError.
pub type Result<T> = std::result::Result<T, VerifierError>;
