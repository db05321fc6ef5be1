//! Opening connections to the verifier.
//!
//! [`Connector`] is the seam between the session and the network: the
//! session only asks for a fresh [`Connection`] and never sees sockets.
//! [`TcpConnector`] is the production implementation.
//!
//! # Example
//!
//! ```ignore
//! use verifier_client::config::VerifierConfig;
//! use verifier_client::transport::{Connector, TcpConnector};
//!
//! let connector = TcpConnector::new(VerifierConfig::default());
//! let mut conn = connector.connect().await?;
//! let greeting = conn.read_response().await?;
//! ```

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::Connection;
use crate::config::VerifierConfig;
use crate::error::{Result, VerifierError};

/// Source of connections to the verifier.
pub trait Connector {
    /// Stream type of the produced connections.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new connection.
    ///
    /// Fails with [`VerifierError::Connection`] if the connection cannot be
    /// established.
    fn connect(&self) -> impl Future<Output = Result<Connection<Self::Stream>>> + Send;
}

/// Connects over TCP using a [`VerifierConfig`].
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: VerifierConfig,
}

impl TcpConnector {
    /// Create a connector for the configured endpoint.
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<Connection<TcpStream>> {
        let endpoint = self.config.endpoint();
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&endpoint)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(VerifierError::connection(&e)),
            Err(_) => {
                return Err(VerifierError::Connection {
                    errno: None,
                    message: format!(
                        "connecting to {endpoint} timed out after {:?}",
                        self.config.connect_timeout
                    ),
                })
            }
        };

        // Requests are small and strictly request/response.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!("failed to set TCP_NODELAY on {}: {}", endpoint, e);
        }

        tracing::info!("connected to verifier at {}", endpoint);
        Ok(Connection::new(stream, self.config.io_timeout(), endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = TcpConnector::new(VerifierConfig {
            port,
            ..VerifierConfig::default()
        });

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let conn = connector.connect().await.unwrap();
        accept.await.unwrap();

        assert_eq!(conn.peer(), format!("127.0.0.1:{port}"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let connector = TcpConnector::new(VerifierConfig {
            port,
            connect_timeout: Duration::from_secs(2),
            ..VerifierConfig::default()
        });

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, VerifierError::Connection { .. }));
        assert!(err.is_io());
    }
}
