/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Router interface used by the Sequencer.
//!
//! The router owns handler registration and lookup. The Sequencer only
//! decides when a directive is pre-handled, handled or cancelled; the router
//! decides who does the work.

use super::completion::CompletionChannel;
use super::directive::Directive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Blocking policy declared by a handler when it accepts a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingPolicy {
    /// The execution queue is held until the directive reports completion
    /// or failure through its [`CompletionChannel`].
    Blocking,

    /// The next directive may start as soon as `handle` returns.
    #[default]
    None,
}

impl BlockingPolicy {
    /// Returns `true` for [`BlockingPolicy::Blocking`].
    #[inline]
    #[must_use]
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Blocking)
    }
}

/// Maps directives onto handlers.
///
/// None of these methods are called while the Sequencer holds its state lock,
/// so implementations may block, take their time, or report through the
/// completion channel before returning.
pub trait DirectiveRouter: Send + Sync {
    /// Pre-handles `directive`.
    ///
    /// The router keeps `channel` to report completion or failure later, and
    /// may also use it synchronously before returning. Returns `true` if a
    /// handler accepted the directive.
    fn pre_handle(&self, directive: Arc<Directive>, channel: CompletionChannel) -> bool;

    /// Handles `directive`.
    ///
    /// Returns `None` if no handler accepted it, otherwise the blocking
    /// policy the Sequencer must observe.
    fn handle(&self, directive: &Arc<Directive>) -> Option<BlockingPolicy>;

    /// Cancels `directive`.
    fn cancel(&self, directive: &Arc<Directive>);
}
