/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Submission outcome types.
//!
//! This module defines what [`Sequencer::try_submit`] reports for a
//! directive that was accepted.
//!
//! [`Sequencer::try_submit`]: super::Sequencer::try_submit

/// Outcome of an accepted submission.
///
/// # Examples
///
/// ```
/// use directive_sequencer::sequencer::SubmitOutcome;
///
/// assert!(SubmitOutcome::Queued.is_queued());
/// assert!(!SubmitOutcome::Discarded.is_queued());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    /// Pre-handled and appended to the handling queue.
    Queued,

    /// Tagged with a session token other than the active one and dropped.
    /// The caller should not retry.
    Discarded,

    /// Accepted by the router, but already settled before it could be
    /// queued: it completed or failed during pre-handling, or was cancelled
    /// by a concurrent session change.
    Resolved,
}

impl SubmitOutcome {
    /// Returns `true` if the directive is waiting in the handling queue.
    #[inline]
    #[must_use]
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }
}
