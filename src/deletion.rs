//! One-shot deletion requests for the revisions of a module.
//!
//! When a document is deleted, moved or merged, every stored revision of
//! it is announced to the verifier with a DEL request. Each request is
//! independent: a rejected or failed one is logged and the loop goes on,
//! and the session is closed exactly once at the end.

use crate::error::VerifierError;
use crate::session::{RenderMode, Session};
use crate::transport::Connector;

/// Outcome of one deletion run.
#[derive(Debug)]
pub struct DeletionReport {
    /// Locator whose revisions were deleted.
    pub locator: String,
    /// Revisions a DEL was attempted for, in order.
    pub attempted: Vec<i64>,
    /// Revisions that failed, with the reason.
    pub failures: Vec<(i64, VerifierError)>,
    /// Error from the final close, if any.
    pub close_error: Option<VerifierError>,
}

impl DeletionReport {
    fn new(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            attempted: Vec::new(),
            failures: Vec::new(),
            close_error: None,
        }
    }

    /// Number of revisions the verifier confirmed.
    pub fn succeeded(&self) -> usize {
        self.attempted.len() - self.failures.len()
    }

    /// Check if every request and the close succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.close_error.is_none()
    }
}

/// Request deletion of each revision on `session`, then close it.
///
/// Never stops early; the order of `revisions` is kept but carries no
/// meaning for the verifier.
pub async fn delete_revisions<C, I>(
    session: &mut Session<C>,
    locator: &str,
    revisions: I,
) -> DeletionReport
where
    C: Connector,
    I: IntoIterator<Item = i64>,
{
    let mut report = DeletionReport::new(locator);

    for revision in revisions {
        report.attempted.push(revision);
        match session.request_deletion(locator, revision).await {
            Ok(()) => tracing::debug!("deleted revision {} of {}", revision, locator),
            Err(e) => {
                tracing::warn!("{}", e);
                report.failures.push((revision, e));
            }
        }
    }

    if let Err(e) = session.close().await {
        report.close_error = Some(e);
    }
    report
}

/// Sends deletion requests over its own session.
///
/// Usable whether or not a rendering session is active elsewhere.
pub struct DeletionNotifier<C: Connector> {
    session: Session<C>,
}

impl<C: Connector> DeletionNotifier<C> {
    /// Create a notifier; it connects on first use.
    pub fn new(connector: C) -> Self {
        Self {
            session: Session::new(connector, RenderMode::None),
        }
    }

    /// Delete every given revision of `locator`.
    pub async fn notify<I>(&mut self, locator: &str, revisions: I) -> DeletionReport
    where
        I: IntoIterator<Item = i64>,
    {
        delete_revisions(&mut self.session, locator, revisions).await
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<C> {
        &self.session
    }
}
