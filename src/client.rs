//! Client builder and entry points.
//!
//! The [`VerifierClientBuilder`] provides a fluent API for configuring the
//! verifier endpoint. The [`VerifierClient`] hands out sessions, page
//! renderers and deletion notifiers that all connect through the same
//! [`TcpConnector`] settings.
//!
//! # Example
//!
//! ```ignore
//! use verifier_client::{RenderMode, VerifierClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VerifierClient::builder()
//!         .address("127.0.0.1")
//!         .port(3141)
//!         .build()?;
//!
//!     let mut session = client.session(RenderMode::Module);
//!     session.enter_text_mode().await?;
//!     let feedback = session.send_text("( foo )").await?;
//!     println!("{}", feedback.message_str());
//!     let completion = session.finish().await?;
//!     println!("{}", completion.message());
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use crate::config::VerifierConfig;
use crate::deletion::DeletionNotifier;
use crate::error::Result;
use crate::host::PageRenderer;
use crate::session::{RenderMode, Session};
use crate::transport::TcpConnector;

/// Builder for configuring and creating a [`VerifierClient`].
#[derive(Debug, Clone, Default)]
pub struct VerifierClientBuilder {
    config: VerifierConfig,
    env_overrides: bool,
}

impl VerifierClientBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from a JSON configuration file.
    pub fn config_file(self, path: &Path) -> Result<Self> {
        Ok(self.config(VerifierConfig::load(path)?))
    }

    /// Set the verifier address.
    ///
    /// Default: 127.0.0.1
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Set the verifier port.
    ///
    /// Default: 3141
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the connect timeout.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the timeout for each read and write.
    ///
    /// Defaults to the connect timeout.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = Some(timeout);
        self
    }

    /// Let `VERIFIER_ADDR` and `VERIFIER_PORT` override the settings.
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Validate the settings and build the client.
    pub fn build(self) -> Result<VerifierClient> {
        let mut config = self.config;
        if self.env_overrides {
            config.apply_env_overrides();
        }
        config.validate()?;

        tracing::debug!("verifier client configured for {}", config.endpoint());
        Ok(VerifierClient {
            connector: TcpConnector::new(config),
        })
    }
}

/// Entry point for talking to a verifier over TCP.
///
/// Cheap to clone; holds no connection itself.
#[derive(Debug, Clone)]
pub struct VerifierClient {
    connector: TcpConnector,
}

impl VerifierClient {
    /// Create a new client builder.
    pub fn builder() -> VerifierClientBuilder {
        VerifierClientBuilder::new()
    }

    /// The configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        self.connector.config()
    }

    /// The connector sessions are opened with.
    pub fn connector(&self) -> &TcpConnector {
        &self.connector
    }

    /// Create a session for a document in the given mode.
    pub fn session(&self, mode: RenderMode) -> Session<TcpConnector> {
        Session::new(self.connector.clone(), mode)
    }

    /// Create a renderer for one page.
    pub fn page_renderer(&self, mode: RenderMode) -> PageRenderer<TcpConnector> {
        PageRenderer::new(self.connector.clone(), mode)
    }

    /// Create a notifier for revision deletions.
    pub fn deletion_notifier(&self) -> DeletionNotifier<TcpConnector> {
        DeletionNotifier::new(self.connector.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifierError;
    use crate::session::SessionState;

    #[test]
    fn test_builder_defaults() {
        let client = VerifierClient::builder().build().unwrap();
        assert_eq!(client.config().address, "127.0.0.1");
        assert_eq!(client.config().port, 3141);
        assert_eq!(client.config().connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_configuration() {
        let client = VerifierClient::builder()
            .address("10.0.0.5")
            .port(4000)
            .connect_timeout(Duration::from_secs(3))
            .io_timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        assert_eq!(client.config().endpoint(), "10.0.0.5:4000");
        assert_eq!(client.config().io_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_builder_rejects_invalid() {
        let err = VerifierClient::builder().port(0).build().unwrap_err();
        assert!(matches!(err, VerifierError::Config(_)));

        let err = VerifierClient::builder().address("").build().unwrap_err();
        assert!(matches!(err, VerifierError::Config(_)));
    }

    #[test]
    fn test_handles_start_disconnected() {
        let client = VerifierClient::builder().build().unwrap();

        let session = client.session(RenderMode::Module);
        assert_eq!(session.state(), SessionState::Disconnected);

        let notifier = client.deletion_notifier();
        assert_eq!(notifier.session().mode(), &RenderMode::None);

        let renderer = client.page_renderer(RenderMode::interface("Interface:Logic"));
        assert!(!renderer.session().is_connected());
    }
}
