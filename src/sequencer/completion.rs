/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Completion channel handed to the router.
//!
//! The channel carries only the issuing Sequencer's handle and the
//! directive's message id. Reports are routed through the registry, so a
//! channel may safely outlive the Sequencer that created it.

use super::registry::{self, SequencerHandle};
use tracing::debug;

/// Reports the outcome of a pre-handled directive back to its Sequencer.
///
/// Cloning is cheap; every clone reports for the same directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChannel {
    handle: SequencerHandle,
    message_id: String,
}

impl CompletionChannel {
    pub(crate) fn new(handle: SequencerHandle, message_id: impl Into<String>) -> Self {
        Self {
            handle,
            message_id: message_id.into(),
        }
    }

    /// Message id of the directive this channel reports for.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Handle of the Sequencer that issued this channel.
    #[must_use]
    pub fn handle(&self) -> SequencerHandle {
        self.handle
    }

    /// Reports that handling finished successfully.
    ///
    /// A no-op if the Sequencer has already shut down.
    pub fn complete(&self) {
        let delivered = registry::with_registered(self.handle, |shared| {
            shared.on_handling_completed(&self.message_id);
        });
        if delivered.is_none() {
            debug!(
                handle = %self.handle,
                message_id = %self.message_id,
                reason = "sequencerAlreadyShutDown",
                "completion report ignored"
            );
        }
    }

    /// Reports that handling failed.
    ///
    /// The failure cancels everything still pending in the directive's
    /// session. A no-op if the Sequencer has already shut down.
    pub fn fail(&self, description: &str) {
        let delivered = registry::with_registered(self.handle, |shared| {
            shared.on_handling_failed(&self.message_id, description);
        });
        if delivered.is_none() {
            debug!(
                handle = %self.handle,
                message_id = %self.message_id,
                description,
                reason = "sequencerAlreadyShutDown",
                "failure report ignored"
            );
        }
    }
}
