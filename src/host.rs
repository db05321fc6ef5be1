//! Thin adapter between a document host and the session.
//!
//! The host renders tags one by one, finalises each page once, and reports
//! revision lifecycle events. Everything here returns typed outcomes; turning
//! them into markup is the host's business.

use crate::deletion::{DeletionNotifier, DeletionReport};
use crate::error::VerifierError;
use crate::protocol::Response;
use crate::session::{RenderMode, Session};
use crate::transport::Connector;

/// What to show in place of one tag.
#[derive(Debug)]
pub enum TagOutput {
    /// Document is not verified; show the text as is.
    Passthrough(String),
    /// Verifier feedback for the chunk, sanitised by the verifier.
    Verified(Response),
    /// The chunk could not be submitted.
    Failed(VerifierError),
    /// An earlier tag on the page lost the connection; nothing was sent.
    Skipped,
}

/// What to append after the last tag of a page.
#[derive(Debug)]
pub enum PageOutcome {
    /// FINISH answered OK.
    Success(String),
    /// FINISH answered with another code.
    Failure(String),
    /// An error raised while finishing or closing.
    Error(VerifierError),
    /// A tag failed to submit, so the module was not verified as a whole.
    Aborted,
}

/// Renders the tags of one page through one session.
pub struct PageRenderer<C: Connector> {
    session: Session<C>,
    /// A tag lost the connection; later tags are not sent.
    aborted: bool,
    /// A tag was not submitted; the page will not be finished.
    incomplete: bool,
}

impl<C: Connector> PageRenderer<C> {
    /// Create a renderer for a page in the given mode.
    pub fn new(connector: C, mode: RenderMode) -> Self {
        Self {
            session: Session::new(connector, mode),
            aborted: false,
            incomplete: false,
        }
    }

    /// Render one tag.
    ///
    /// Errors become [`TagOutput::Failed`] so the rest of the page still
    /// renders. A failed tag leaves a gap in the module, so the page is
    /// reported as [`PageOutcome::Aborted`] instead of being finished.
    pub async fn render_tag(&mut self, text: &str) -> TagOutput {
        if !self.session.mode().is_verified() {
            return TagOutput::Passthrough(text.to_string());
        }
        if self.aborted {
            return TagOutput::Skipped;
        }

        let result = match self.session.enter_text_mode().await {
            Ok(()) => self.session.send_text(text).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => TagOutput::Verified(response),
            Err(e) => {
                tracing::error!("verifier tag failed: {}", e);
                self.incomplete = true;
                if e.is_fatal() {
                    self.aborted = true;
                }
                TagOutput::Failed(e)
            }
        }
    }

    /// Finish the page and release the session.
    ///
    /// Returns nothing for a page without verified tags.
    pub async fn finish_page(&mut self) -> Vec<PageOutcome> {
        let mut outcomes = Vec::new();

        if self.incomplete {
            outcomes.push(PageOutcome::Aborted);
        }

        if self.incomplete || !self.session.is_text_mode() {
            if let Err(e) = self.session.close().await {
                tracing::error!("closing verifier session failed: {}", e);
                outcomes.push(PageOutcome::Error(e));
            }
            self.aborted = false;
            self.incomplete = false;
            return outcomes;
        }

        match self.session.finish().await {
            Ok(completion) => {
                let message = completion.message();
                if completion.is_success() {
                    outcomes.push(PageOutcome::Success(message));
                } else {
                    outcomes.push(PageOutcome::Failure(message));
                }
                if let Some(e) = completion.close_error {
                    tracing::error!("closing verifier session failed: {}", e);
                    outcomes.push(PageOutcome::Error(e));
                }
            }
            Err(e) => {
                tracing::error!("finishing verifier session failed: {}", e);
                outcomes.push(PageOutcome::Error(e));
            }
        }
        outcomes
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<C> {
        &self.session
    }
}

/// A change to a document's stored revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionEvent {
    /// The document was deleted.
    Deleted {
        /// Locator of the deleted document.
        locator: String,
        /// Its revisions.
        revisions: Vec<i64>,
    },
    /// The document was moved to a new locator.
    Moved {
        /// Previous locator.
        from: String,
        /// New locator.
        to: String,
        /// Revisions now stored under `to`.
        revisions: Vec<i64>,
    },
    /// One document's history was merged into another.
    Merged {
        /// Merged-away locator.
        source: String,
        /// Locator receiving the history.
        destination: String,
        /// Revisions now stored under `destination`.
        revisions: Vec<i64>,
    },
}

impl RevisionEvent {
    /// Locator whose stored state is stale after the event.
    pub fn locator(&self) -> &str {
        match self {
            Self::Deleted { locator, .. } => locator,
            Self::Moved { to, .. } => to,
            Self::Merged { destination, .. } => destination,
        }
    }

    /// Locator the revisions came from, for moves and merges.
    pub fn previous_locator(&self) -> Option<&str> {
        match self {
            Self::Deleted { .. } => None,
            Self::Moved { from, .. } => Some(from),
            Self::Merged { source, .. } => Some(source),
        }
    }

    /// Revisions to delete.
    pub fn revisions(&self) -> &[i64] {
        match self {
            Self::Deleted { revisions, .. }
            | Self::Moved { revisions, .. }
            | Self::Merged { revisions, .. } => revisions,
        }
    }
}

/// Forward a revision event to the verifier as deletion requests.
pub async fn handle_revision_event<C: Connector>(
    notifier: &mut DeletionNotifier<C>,
    event: &RevisionEvent,
) -> DeletionReport {
    match event.previous_locator() {
        Some(previous) => tracing::debug!(
            "{} revisions of {} now stored under {}",
            event.revisions().len(),
            previous,
            event.locator()
        ),
        None => tracing::debug!(
            "{} revisions of {} deleted",
            event.revisions().len(),
            event.locator()
        ),
    }

    let report = notifier
        .notify(event.locator(), event.revisions().iter().copied())
        .await;
    if !report.is_clean() {
        tracing::warn!(
            "{} of {} deletions for {} failed (previous locator: {})",
            report.failures.len(),
            report.attempted.len(),
            report.locator,
            event.previous_locator().unwrap_or("none")
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_locator_is_destination() {
        let moved = RevisionEvent::Moved {
            from: "Interface:Old".to_string(),
            to: "Interface:New".to_string(),
            revisions: vec![1, 2],
        };
        assert_eq!(moved.locator(), "Interface:New");
        assert_eq!(moved.previous_locator(), Some("Interface:Old"));
        assert_eq!(moved.revisions(), &[1, 2]);

        let merged = RevisionEvent::Merged {
            source: "Main:A".to_string(),
            destination: "Main:B".to_string(),
            revisions: vec![9],
        };
        assert_eq!(merged.locator(), "Main:B");
        assert_eq!(merged.previous_locator(), Some("Main:A"));

        let deleted = RevisionEvent::Deleted {
            locator: "Main:C".to_string(),
            revisions: vec![],
        };
        assert_eq!(deleted.locator(), "Main:C");
        assert_eq!(deleted.previous_locator(), None);
        assert!(deleted.revisions().is_empty());
    }
}
