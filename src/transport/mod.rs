//! Transport module - connections to the verifier.
//!
//! Provides:
//! - [`Connection`] - exact reads and full writes over one stream, with timeouts
//! - [`Connector`] - opens connections; [`TcpConnector`] over TCP

mod connection;
mod tcp;

pub use connection::Connection;
pub use tcp::{Connector, TcpConnector};
