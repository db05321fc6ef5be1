//! Session state machine over one verifier connection.
//!
//! ```text
//! DISCONNECTED ──ensure_connected──► CONNECTED ──enter_text_mode──► TEXT_MODE
//!      ▲                                 │                              │
//!      └──────── close / fatal error ────┴──────── finish / close ──────┘
//! ```
//!
//! A session belongs to one rendering context and is used sequentially.
//! The connection is opened lazily and released on `close`, on `finish`,
//! on any transport failure, and (without QUIT) when the session is
//! dropped.
//!
//! # Example
//!
//! ```ignore
//! use verifier_client::{RenderMode, Session, TcpConnector, VerifierConfig};
//!
//! let mut session = Session::new(TcpConnector::new(VerifierConfig::default()), RenderMode::Module);
//! session.enter_text_mode().await?;
//! let feedback = session.send_text("thm (foo () () x)").await?;
//! let completion = session.finish().await?;
//! ```

use crate::error::{Result, VerifierError};
use crate::protocol::{Command, Response};
use crate::transport::{Connection, Connector};

/// What a document sends to the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// Nothing; the document never talks to the verifier.
    None,
    /// A proof module.
    Module,
    /// The interface module stored under `locator`.
    Interface {
        /// Canonical locator of the document.
        locator: String,
    },
}

impl RenderMode {
    /// Interface mode for `locator`.
    pub fn interface(locator: impl Into<String>) -> Self {
        Self::Interface {
            locator: locator.into(),
        }
    }

    /// Check if documents in this mode are sent to the verifier.
    #[inline]
    pub fn is_verified(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Greeting accepted, no MOD/IFACE yet.
    Connected,
    /// MOD/IFACE accepted, TEXT chunks may be sent.
    TextMode,
}

/// Result of a FINISH exchange.
///
/// The session is closed by then; `close_error` reports a failed QUIT or
/// shutdown, which does not change the verdict.
#[derive(Debug)]
pub struct Completion {
    /// Verifier answer to FINISH.
    pub response: Response,
    /// Error raised while closing, if any.
    pub close_error: Option<VerifierError>,
}

impl Completion {
    /// FINISH was answered with OK.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.response.is_ok()
    }

    /// Verifier message as text.
    pub fn message(&self) -> String {
        self.response.message_string()
    }
}

/// A verifier session for one document context.
pub struct Session<C: Connector> {
    connector: C,
    mode: RenderMode,
    conn: Option<Connection<C::Stream>>,
    text_mode: bool,
    greeting: Option<String>,
}

impl<C: Connector> Session<C> {
    /// Create a disconnected session. No I/O happens until first use.
    pub fn new(connector: C, mode: RenderMode) -> Self {
        Self {
            connector,
            mode,
            conn: None,
            text_mode: false,
            greeting: None,
        }
    }

    /// Render mode fixed at construction.
    pub fn mode(&self) -> &RenderMode {
        &self.mode
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        match (&self.conn, self.text_mode) {
            (None, _) => SessionState::Disconnected,
            (Some(_), false) => SessionState::Connected,
            (Some(_), true) => SessionState::TextMode,
        }
    }

    /// Check if a connection is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Check if the MOD/IFACE handshake completed on this connection.
    #[inline]
    pub fn is_text_mode(&self) -> bool {
        self.text_mode
    }

    /// Greeting message of the current connection.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Connect if disconnected and check the greeting.
    ///
    /// # Errors
    ///
    /// Transport errors from connecting or reading the greeting, or
    /// [`VerifierError::HandshakeRejected`] if the greeting is not OK. The
    /// session stays disconnected in every error case.
    pub async fn ensure_connected(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let mut conn = self.connector.connect().await?;
        let greeting = match conn.read_response().await {
            Ok(greeting) => greeting,
            Err(e) => {
                release(conn).await;
                return Err(e);
            }
        };

        if !greeting.is_ok() {
            release(conn).await;
            return Err(VerifierError::HandshakeRejected {
                code: greeting.code,
                message: greeting.message_string(),
            });
        }

        tracing::debug!(greeting = %greeting.message_str(), "verifier greeting accepted");
        self.greeting = Some(greeting.message_string());
        self.conn = Some(conn);
        self.text_mode = false;
        Ok(())
    }

    /// Send MOD or IFACE once per connection.
    ///
    /// Does nothing if already in text mode.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::NothingToRender`] in [`RenderMode::None`], before
    ///   any connection is made
    /// - [`VerifierError::UnexpectedHandshakeResponse`] if the verifier does
    ///   not answer MORE; the connection stays usable
    pub async fn enter_text_mode(&mut self) -> Result<()> {
        if self.text_mode {
            return Ok(());
        }

        let command = match &self.mode {
            RenderMode::None => return Err(VerifierError::NothingToRender),
            RenderMode::Module => Command::module(),
            RenderMode::Interface { locator } => Command::interface_latest(locator),
        };

        self.ensure_connected().await?;
        let response = self.exchange(&command).await?;
        if !response.is_more() {
            return Err(VerifierError::UnexpectedHandshakeResponse {
                code: response.code,
                message: response.message_string(),
            });
        }

        self.text_mode = true;
        Ok(())
    }

    /// Submit one chunk of proof text, trailing CR/LF stripped.
    ///
    /// The verifier's answer is returned as is; interpreting the code is
    /// up to the caller.
    pub async fn send_text(&mut self, chunk: &str) -> Result<Response> {
        if !self.text_mode {
            return Err(VerifierError::NotInTextMode);
        }
        self.exchange(&Command::text(chunk)).await
    }

    /// End text streaming, then close the session.
    ///
    /// The session is disconnected when this returns, whatever the outcome.
    pub async fn finish(&mut self) -> Result<Completion> {
        if !self.text_mode {
            return Err(VerifierError::NotInTextMode);
        }

        let result = self.exchange(&Command::finish()).await;
        let closed = self.close().await;

        match result {
            Ok(response) => Ok(Completion {
                response,
                close_error: closed.err(),
            }),
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!("close after failed FINISH also failed: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Ask the verifier to drop one stored revision of `locator`.
    ///
    /// Works in any render mode and connects if needed.
    ///
    /// # Errors
    ///
    /// [`VerifierError::DeletionRejected`] if the answer is not OK. Such a
    /// rejection is routine and leaves the connection usable.
    pub async fn request_deletion(&mut self, locator: &str, revision: i64) -> Result<()> {
        if revision <= 0 {
            return Err(VerifierError::InvalidRevision(revision));
        }

        self.ensure_connected().await?;
        let response = self.exchange(&Command::delete(locator, revision)).await?;
        if !response.is_ok() {
            return Err(VerifierError::DeletionRejected {
                locator: locator.to_string(),
                revision,
                code: response.code,
                message: response.message_string(),
            });
        }
        Ok(())
    }

    /// Say goodbye and release the connection.
    ///
    /// Does nothing when disconnected. The session is disconnected when
    /// this returns even if it fails: a failed QUIT, a missing GOODBYE or a
    /// failed shutdown is only reported.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        self.text_mode = false;
        self.greeting = None;

        let quit = conn.exchange(&Command::quit()).await;
        let peer = conn.peer().to_string();
        let shutdown = conn.close().await;

        let result = match quit {
            Ok(response) if response.is_goodbye() => shutdown,
            Ok(response) => {
                if let Err(e) = shutdown {
                    tracing::debug!("shutdown after missing GOODBYE failed: {}", e);
                }
                Err(VerifierError::NoGoodbye {
                    code: response.code,
                    message: response.message_string(),
                })
            }
            Err(e) => {
                if let Err(shutdown_err) = shutdown {
                    tracing::debug!("shutdown after failed QUIT failed: {}", shutdown_err);
                }
                Err(e)
            }
        };

        match &result {
            Ok(()) => tracing::info!("closed verifier session with {}", peer),
            Err(e) => tracing::warn!("verifier session with {} closed uncleanly: {}", peer, e),
        }
        result
    }

    /// One request/response on the open connection.
    ///
    /// A fatal failure drops the connection before it is returned.
    async fn exchange(&mut self, command: &Command) -> Result<Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(VerifierError::Io {
                errno: None,
                message: format!("cannot send {}: not connected", command.opcode.name()),
            });
        };

        let result = conn.exchange(command).await;
        match result {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_fatal() {
                    self.invalidate(&e).await;
                }
                Err(e)
            }
        }
    }

    /// Drop the connection after a failure, without QUIT.
    async fn invalidate(&mut self, cause: &VerifierError) {
        self.text_mode = false;
        self.greeting = None;
        if let Some(conn) = self.conn.take() {
            tracing::warn!("discarding verifier connection to {}: {}", conn.peer(), cause);
            release(conn).await;
        }
    }
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        if let Some(conn) = &self.conn {
            tracing::warn!(
                "verifier session with {} dropped while connected; closing without QUIT",
                conn.peer()
            );
        }
    }
}

/// Best-effort shutdown of a connection nobody will use again.
async fn release<S>(conn: Connection<S>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    if let Err(e) = conn.close().await {
        tracing::debug!("releasing verifier connection failed: {}", e);
    }
}
