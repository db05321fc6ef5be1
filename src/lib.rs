//! # verifier-client
//!
//! Client side of the proof verifier's binary protocol.
//!
//! A document host streams proof text to a verifier daemon over TCP and
//! shows the per-chunk feedback, and tells the daemon when stored module
//! revisions go away.
//!
//! ## Architecture
//!
//! - **Protocol**: length-prefixed command and response frames
//! - **Transport**: exact reads and full writes over TCP, with timeouts
//! - **Session**: connect, greet, MOD/IFACE, TEXT chunks, FINISH, QUIT
//! - **Host adapter**: per-tag rendering and revision lifecycle events
//!
//! ## Example
//!
//! ```ignore
//! use verifier_client::{RenderMode, VerifierClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VerifierClient::builder().build()?;
//!
//!     let mut page = client.page_renderer(RenderMode::Module);
//!     let tag = page.render_tag("( foo )").await;
//!     let outcome = page.finish_page().await;
//!
//!     let mut notifier = client.deletion_notifier();
//!     let report = notifier.notify("Interface:Logic", [5, 3, 1]).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deletion;
pub mod error;
pub mod host;
pub mod protocol;
pub mod session;
pub mod transport;

mod client;

pub use client::{VerifierClient, VerifierClientBuilder};
pub use config::VerifierConfig;
pub use deletion::{DeletionNotifier, DeletionReport};
pub use error::VerifierError;
pub use host::{PageOutcome, PageRenderer, RevisionEvent, TagOutput};
pub use session::{Completion, RenderMode, Session, SessionState};
pub use transport::{Connector, TcpConnector};
