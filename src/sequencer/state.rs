/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Lock-protected Sequencer state.
//!
//! Everything in this module runs with the Sequencer's state lock held. It
//! never calls out to the router; callers release the lock around router
//! calls and use [`SequencerState::should_wake`] to decide whether the worker
//! needs a notification.
//!
//! A directive lives in at most one of the pre-handle slot, the handling
//! queue and the canceling queue.

use super::directive::Directive;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Occupant of the pre-handle slot, tagged with the ticket issued when it
/// entered.
#[derive(Debug)]
struct PreHandleSlot {
    ticket: u64,
    directive: Arc<Directive>,
}

/// Where a completion or failure report found its directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    PreHandling,
    Handling,
    Canceling,
    NotFound,
}

#[derive(Debug, Default)]
pub(crate) struct SequencerState {
    dialog_request_id: String,
    pre_handling: Option<PreHandleSlot>,
    next_ticket: u64,
    handling_queue: VecDeque<Arc<Directive>>,
    canceling_queue: VecDeque<Arc<Directive>>,
    is_handling: bool,
    is_shutting_down: bool,
}

impl SequencerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Worker wake predicate.
    pub(crate) fn should_wake(&self) -> bool {
        !self.canceling_queue.is_empty()
            || (!self.handling_queue.is_empty() && !self.is_handling)
            || self.is_shutting_down
    }

    pub(crate) fn dialog_request_id(&self) -> &str {
        &self.dialog_request_id
    }

    pub(crate) fn set_dialog_request_id(&mut self, dialog_request_id: String) {
        self.dialog_request_id = dialog_request_id;
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.is_shutting_down
    }

    pub(crate) fn begin_shutdown(&mut self) {
        self.queue_all_for_cancellation();
        self.is_shutting_down = true;
    }

    /// Places `directive` in the pre-handle slot and returns the ticket that
    /// identifies this occupancy.
    pub(crate) fn begin_pre_handle(&mut self, directive: Arc<Directive>) -> u64 {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let ticket = self.next_ticket;
        self.pre_handling = Some(PreHandleSlot { ticket, directive });
        ticket
    }

    /// Clears the slot if it still holds the occupancy identified by
    /// `ticket`.
    ///
    /// Returns `false` when a report or a bulk cancellation already took the
    /// directive out of the slot while the router was pre-handling it.
    pub(crate) fn finish_pre_handle(&mut self, ticket: u64) -> bool {
        match &self.pre_handling {
            Some(slot) if slot.ticket == ticket => {
                self.pre_handling = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn enqueue(&mut self, directive: Arc<Directive>) {
        self.handling_queue.push_back(directive);
    }

    /// Moves every pending directive to the canceling queue.
    ///
    /// Clears the session token so late arrivals for the invalidated turn are
    /// dropped at intake. The handling queue keeps its order and the
    /// pre-handled directive, being the newest arrival, goes last.
    pub(crate) fn queue_all_for_cancellation(&mut self) {
        self.dialog_request_id.clear();
        if let Some(slot) = self.pre_handling.take() {
            self.handling_queue.push_back(slot.directive);
        }
        self.canceling_queue.extend(self.handling_queue.drain(..));
        self.is_handling = false;
    }

    /// Takes the whole canceling queue, or `None` if it is empty.
    pub(crate) fn take_canceling(&mut self) -> Option<VecDeque<Arc<Directive>>> {
        if self.canceling_queue.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.canceling_queue))
    }

    /// Marks the head of the handling queue as executing and returns it.
    ///
    /// Returns `None` if the queue is empty or the head is already executing.
    pub(crate) fn begin_handling(&mut self) -> Option<Arc<Directive>> {
        if self.is_handling {
            return None;
        }
        let head = self.handling_queue.front().cloned()?;
        self.is_handling = true;
        Some(head)
    }

    /// Settles a non-blocking or rejected execution of `directive`.
    ///
    /// Pops the head only if it is still `directive`. Returns `false` if the
    /// head changed underneath the handler.
    pub(crate) fn finish_handling(&mut self, directive: &Arc<Directive>) -> bool {
        self.is_handling = false;
        match self.handling_queue.front() {
            Some(head) if Arc::ptr_eq(head, directive) => {
                self.handling_queue.pop_front();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn handling_front_id(&self) -> Option<&str> {
        self.handling_queue.front().map(|d| d.message_id())
    }

    pub(crate) fn pre_handling_id(&self) -> Option<&str> {
        self.pre_handling.as_ref().map(|slot| slot.directive.message_id())
    }

    /// Applies a completion report for `message_id`.
    ///
    /// Looks in the slot, then the handling queue, then the canceling queue,
    /// and removes the first match.
    pub(crate) fn on_completed(&mut self, message_id: &str) -> Resolution {
        if self.take_pre_handling(message_id) {
            Resolution::PreHandling
        } else if self.remove_from_handling(message_id) {
            Resolution::Handling
        } else if self.remove_from_canceling(message_id) {
            Resolution::Canceling
        } else {
            Resolution::NotFound
        }
    }

    /// Applies a failure report for `message_id`.
    ///
    /// Same lookup as [`Self::on_completed`]. A match in the slot or the
    /// handling queue also cancels everything else still pending.
    pub(crate) fn on_failed(&mut self, message_id: &str) -> Resolution {
        let resolution = if self.take_pre_handling(message_id) {
            Resolution::PreHandling
        } else if self.remove_from_handling(message_id) {
            Resolution::Handling
        } else if self.remove_from_canceling(message_id) {
            return Resolution::Canceling;
        } else {
            return Resolution::NotFound;
        };
        self.queue_all_for_cancellation();
        resolution
    }

    fn take_pre_handling(&mut self, message_id: &str) -> bool {
        if self.pre_handling_id() == Some(message_id) {
            self.pre_handling = None;
            true
        } else {
            false
        }
    }

    fn remove_from_handling(&mut self, message_id: &str) -> bool {
        let Some(index) = find(&self.handling_queue, message_id) else {
            return false;
        };
        if self.is_handling && index == 0 {
            self.is_handling = false;
        }
        self.handling_queue.remove(index);
        true
    }

    fn remove_from_canceling(&mut self, message_id: &str) -> bool {
        let Some(index) = find(&self.canceling_queue, message_id) else {
            return false;
        };
        self.canceling_queue.remove(index);
        true
    }

    pub(crate) fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            dialog_request_id: self.dialog_request_id.clone(),
            pre_handling: self.pre_handling_id().map(str::to_owned),
            handling_queue: ids(&self.handling_queue),
            canceling_queue: ids(&self.canceling_queue),
            is_handling: self.is_handling,
            is_shutting_down: self.is_shutting_down,
        }
    }
}

fn find(queue: &VecDeque<Arc<Directive>>, message_id: &str) -> Option<usize> {
    queue.iter().position(|d| d.message_id() == message_id)
}

fn ids(queue: &VecDeque<Arc<Directive>>) -> Vec<String> {
    queue.iter().map(|d| d.message_id().to_owned()).collect()
}

/// Point-in-time copy of a Sequencer's state, keyed by message id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequencerSnapshot {
    /// Active session token. Empty after a bulk cancellation.
    pub dialog_request_id: String,

    /// Directive currently being pre-handled, if any.
    pub pre_handling: Option<String>,

    /// Directives awaiting or undergoing execution, head first.
    pub handling_queue: Vec<String>,

    /// Directives awaiting a cancel callback, in cancellation order.
    pub canceling_queue: Vec<String>,

    /// Whether the head of the handling queue is executing.
    pub is_handling: bool,

    pub is_shutting_down: bool,
}

impl SequencerSnapshot {
    /// Number of containers holding `message_id`. Never more than one.
    #[must_use]
    pub fn occurrences(&self, message_id: &str) -> usize {
        usize::from(self.pre_handling.as_deref() == Some(message_id))
            + self.handling_queue.iter().filter(|id| *id == message_id).count()
            + self.canceling_queue.iter().filter(|id| *id == message_id).count()
    }

    /// Returns `true` if nothing is pre-handling, queued or awaiting cancel.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pre_handling.is_none() && self.handling_queue.is_empty() && self.canceling_queue.is_empty()
    }
}
