/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Core Sequencer implementation.
//!
//! This module provides the Sequencer, which serializes pre-handling,
//! execution and cancellation of directives for a single active session,
//! and the worker loop that drives it.
//!
//! # Locking
//!
//! Two locks, always taken in this order: the submission lock, which keeps
//! overlapping `submit` calls from interleaving, then the state lock. A
//! registry entry guard may be held while taking the state lock. The state
//! lock is never held across a router call or an exception report.

use super::completion::CompletionChannel;
use super::config::SequencerConfig;
use super::directive::Directive;
use super::exception::{ExceptionEncounteredSender, ExceptionErrorType};
use super::outcome::SubmitOutcome;
use super::registry::{self, SequencerHandle};
use super::router::{BlockingPolicy, DirectiveRouter};
use super::state::{Resolution, SequencerSnapshot, SequencerState};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

/// State shared between a Sequencer, its worker thread and, through the
/// registry, its completion channels.
pub(crate) struct Shared {
    handle: SequencerHandle,
    state: Mutex<SequencerState>,
    wake: Condvar,
    router: Arc<dyn DirectiveRouter>,
}

impl Shared {
    fn notify_if_ready(&self, state: &SequencerState) {
        if state.should_wake() {
            self.wake.notify_one();
        }
    }

    pub(crate) fn on_handling_completed(&self, message_id: &str) {
        let mut state = self.state.lock();
        debug!(
            handle = %self.handle,
            message_id,
            pre_handling = state.pre_handling_id().unwrap_or("(none)"),
            "on handling completed"
        );
        if state.on_completed(message_id) == Resolution::NotFound {
            debug!(handle = %self.handle, message_id, reason = "notPending", "completion report ignored");
        }
        self.notify_if_ready(&state);
    }

    pub(crate) fn on_handling_failed(&self, message_id: &str, description: &str) {
        let mut state = self.state.lock();
        debug!(
            handle = %self.handle,
            message_id,
            pre_handling = state.pre_handling_id().unwrap_or("(none)"),
            description,
            "on handling failed"
        );
        match state.on_failed(message_id) {
            Resolution::PreHandling | Resolution::Handling => {
                info!(handle = %self.handle, message_id, "handling failed, cancelling pending directives");
            }
            Resolution::Canceling => {}
            Resolution::NotFound => {
                debug!(handle = %self.handle, message_id, reason = "notPending", "failure report ignored");
            }
        }
        self.notify_if_ready(&state);
    }

    /// Worker loop. Cancellations are always drained before the next
    /// directive is handled.
    fn run_loop(&self) {
        let mut state = self.state.lock();
        loop {
            self.wake.wait_while(&mut state, |state| !state.should_wake());
            if !self.process_canceling_queue(&mut state)
                && !self.handle_next(&mut state)
                && state.is_shutting_down()
            {
                break;
            }
        }
    }

    fn process_canceling_queue(&self, state: &mut MutexGuard<'_, SequencerState>) -> bool {
        let Some(batch) = state.take_canceling() else {
            return false;
        };
        MutexGuard::unlocked(state, || {
            for directive in &batch {
                debug!(message_id = directive.message_id(), "cancelling directive");
                self.router.cancel(directive);
            }
        });
        true
    }

    fn handle_next(&self, state: &mut MutexGuard<'_, SequencerState>) -> bool {
        let Some(directive) = state.begin_handling() else {
            return false;
        };
        let policy = MutexGuard::unlocked(state, || self.router.handle(&directive));
        match policy {
            Some(BlockingPolicy::Blocking) => {}
            Some(BlockingPolicy::None) => {
                if !state.finish_handling(&directive) {
                    debug!(
                        message_id = directive.message_id(),
                        reason = "settledDuringHandle",
                        "handling queue head already advanced"
                    );
                }
            }
            None => {
                if !state.finish_handling(&directive) {
                    error!(
                        expected = directive.message_id(),
                        front = state.handling_front_id().unwrap_or("(empty)"),
                        reason = "handlingQueueFrontChangedWithoutBeingHandled",
                        "handle directive failed"
                    );
                }
                warn!(
                    message_id = directive.message_id(),
                    reason = "notAccepted",
                    "handle rejected, cancelling pending directives"
                );
                state.queue_all_for_cancellation();
            }
        }
        true
    }
}

/// Serializes directive processing for one active session.
///
/// Directives are pre-handled on the submitting thread, then executed one at
/// a time, in arrival order, on a dedicated worker thread. Changing the
/// active session, a rejected execution or a failure report cancels
/// everything still pending.
///
/// # Examples
///
/// ```
/// use directive_sequencer::sequencer::{
///     BlockingPolicy, CompletionChannel, Directive, DirectiveRouter, Sequencer,
/// };
/// use std::sync::Arc;
///
/// struct AcceptAll;
///
/// impl DirectiveRouter for AcceptAll {
///     fn pre_handle(&self, _: Arc<Directive>, _: CompletionChannel) -> bool {
///         true
///     }
///     fn handle(&self, _: &Arc<Directive>) -> Option<BlockingPolicy> {
///         Some(BlockingPolicy::None)
///     }
///     fn cancel(&self, _: &Arc<Directive>) {}
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sequencer = Sequencer::new(Arc::new(AcceptAll))?;
/// sequencer.set_active_session("turn-1");
///
/// let directive = Arc::new(Directive::new("Speaker", "SetVolume", "msg-1", "turn-1"));
/// assert!(sequencer.submit(directive));
///
/// sequencer.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Sequencer {
    handle: SequencerHandle,
    shared: Arc<Shared>,

    /// Serializes `submit` calls. Always taken before the state lock.
    submit_lock: Mutex<()>,

    worker: Mutex<Option<JoinHandle<()>>>,
    exception_sender: Option<Arc<dyn ExceptionEncounteredSender>>,
}

impl Sequencer {
    /// Creates a Sequencer with the default configuration and starts its
    /// worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Spawn`] if the worker thread cannot be
    /// started.
    pub fn new(router: Arc<dyn DirectiveRouter>) -> Result<Self, SequencerError> {
        Self::builder(router).build()
    }

    /// Returns a builder for a Sequencer routing through `router`.
    #[must_use]
    pub fn builder(router: Arc<dyn DirectiveRouter>) -> SequencerBuilder {
        SequencerBuilder {
            router,
            config: SequencerConfig::default(),
            exception_sender: None,
        }
    }

    /// Handle under which this Sequencer receives completion reports.
    #[must_use]
    pub fn handle(&self) -> SequencerHandle {
        self.handle
    }

    /// Current session token. Empty after any bulk cancellation.
    #[must_use]
    pub fn active_session(&self) -> String {
        self.shared.state.lock().dialog_request_id().to_owned()
    }

    #[must_use]
    pub fn snapshot(&self) -> SequencerSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Replaces the active session token.
    ///
    /// Setting the current token again is a no-op. Any other value first
    /// cancels every pending directive.
    pub fn set_active_session(&self, dialog_request_id: impl Into<String>) {
        let dialog_request_id = dialog_request_id.into();
        let mut state = self.shared.state.lock();
        if state.dialog_request_id() == dialog_request_id {
            warn!(
                handle = %self.handle,
                dialog_request_id = %dialog_request_id,
                reason = "unchanged",
                "set active session ignored"
            );
            return;
        }
        info!(handle = %self.handle, dialog_request_id = %dialog_request_id, "set active session");
        state.queue_all_for_cancellation();
        state.set_dialog_request_id(dialog_request_id);
        self.shared.notify_if_ready(&state);
    }

    /// Submits a directive, returning `true` if it was accepted.
    ///
    /// A directive for another session is accepted and silently discarded.
    /// See [`Self::try_submit`] for the detailed outcome.
    pub fn submit(&self, directive: Arc<Directive>) -> bool {
        self.try_submit(directive).is_ok()
    }

    /// Submits a directive and reports what happened to it.
    ///
    /// The router pre-handles the directive on the calling thread. If it is
    /// accepted and has not already been settled through its completion
    /// channel, it joins the handling queue.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::MalformedDirective`] if the directive has no
    ///   message id.
    /// - [`SequencerError::ShuttingDown`] after [`Self::shutdown`].
    /// - [`SequencerError::Rejected`] if no handler accepted it. This is also
    ///   reported to the exception sender, if one is configured.
    pub fn try_submit(&self, directive: Arc<Directive>) -> Result<SubmitOutcome, SequencerError> {
        let result = self.submit_locked(&directive);
        if let (Err(SequencerError::Rejected { .. }), Some(sender)) = (&result, &self.exception_sender) {
            sender.send_exception_encountered(
                &directive.to_json(),
                ExceptionErrorType::UnsupportedOperation,
                "Unsupported operation",
            );
        }
        result
    }

    fn submit_locked(&self, directive: &Arc<Directive>) -> Result<SubmitOutcome, SequencerError> {
        if directive.message_id().is_empty() {
            error!(handle = %self.handle, reason = "emptyMessageId", "submit failed");
            return Err(SequencerError::MalformedDirective {
                reason: "empty message id",
            });
        }

        let _submitting = self.submit_lock.lock();
        let mut state = self.shared.state.lock();
        if state.is_shutting_down() {
            warn!(
                handle = %self.handle,
                message_id = directive.message_id(),
                reason = "shuttingDown",
                "submit failed"
            );
            return Err(SequencerError::ShuttingDown);
        }
        if directive.dialog_request_id() != state.dialog_request_id() {
            info!(
                handle = %self.handle,
                message_id = directive.message_id(),
                directive_dialog_request_id = directive.dialog_request_id(),
                dialog_request_id = state.dialog_request_id(),
                reason = "dialogRequestIdDoesNotMatch",
                "directive dropped"
            );
            return Ok(SubmitOutcome::Discarded);
        }

        let ticket = state.begin_pre_handle(Arc::clone(directive));
        let channel = CompletionChannel::new(self.handle, directive.message_id());
        let accepted = MutexGuard::unlocked(&mut state, || {
            self.shared.router.pre_handle(Arc::clone(directive), channel)
        });
        let still_pending = state.finish_pre_handle(ticket);

        if !accepted {
            debug!(handle = %self.handle, message_id = directive.message_id(), "pre-handle rejected");
            return Err(SequencerError::Rejected {
                message_id: directive.message_id().to_owned(),
            });
        }
        if !still_pending {
            debug!(
                handle = %self.handle,
                message_id = directive.message_id(),
                "directive settled during pre-handle"
            );
            return Ok(SubmitOutcome::Resolved);
        }

        state.enqueue(Arc::clone(directive));
        self.shared.notify_if_ready(&state);
        Ok(SubmitOutcome::Queued)
    }

    /// Stops the Sequencer.
    ///
    /// Deregisters the handle first, so completion reports arriving from now
    /// on are dropped, then cancels everything pending and waits for the
    /// worker to drain the cancellations and exit. Safe to call repeatedly;
    /// [`Drop`] calls it too.
    pub fn shutdown(&self) {
        if registry::deregister(self.handle) {
            info!(handle = %self.handle, "shutting down");
        }
        {
            let mut state = self.shared.state.lock();
            state.begin_shutdown();
            self.shared.wake.notify_one();
        }

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            warn!(handle = %self.handle, reason = "calledFromWorker", "shutdown not waiting for worker");
            return;
        }
        if worker.join().is_err() {
            error!(handle = %self.handle, "worker thread panicked");
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for a [`Sequencer`].
pub struct SequencerBuilder {
    router: Arc<dyn DirectiveRouter>,
    config: SequencerConfig,
    exception_sender: Option<Arc<dyn ExceptionEncounteredSender>>,
}

impl SequencerBuilder {
    #[must_use]
    pub fn config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Reports directives no handler accepted to `sender`.
    #[must_use]
    pub fn exception_sender(mut self, sender: Arc<dyn ExceptionEncounteredSender>) -> Self {
        self.exception_sender = Some(sender);
        self
    }

    /// Registers the Sequencer and starts its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Spawn`] if the worker thread cannot be
    /// started.
    pub fn build(self) -> Result<Sequencer, SequencerError> {
        let handle = registry::allocate();
        let shared = Arc::new(Shared {
            handle,
            state: Mutex::new(SequencerState::new()),
            wake: Condvar::new(),
            router: self.router,
        });

        let mut builder = thread::Builder::new().name(self.config.worker_name.clone());
        if let Some(stack_size) = self.config.worker_stack_size {
            builder = builder.stack_size(stack_size);
        }
        let worker_shared = Arc::clone(&shared);
        let worker = builder.spawn(move || {
            let span = info_span!("directive_sequencer", handle = %handle);
            let _entered = span.enter();
            worker_shared.run_loop();
            debug!("worker stopped");
        })?;

        registry::register(handle, &shared);
        debug!(handle = %handle, worker = %self.config.worker_name, "sequencer started");

        Ok(Sequencer {
            handle,
            shared,
            submit_lock: Mutex::new(()),
            worker: Mutex::new(Some(worker)),
            exception_sender: self.exception_sender,
        })
    }
}

/// Errors that can occur when interacting with the Sequencer.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The Sequencer has been shut down.
    #[error("sequencer has been shut down")]
    ShuttingDown,

    /// The directive cannot be processed as given.
    #[error("malformed directive: {reason}")]
    MalformedDirective {
        /// What is wrong with the directive.
        reason: &'static str,
    },

    /// No handler accepted the directive during pre-handling.
    #[error("directive {message_id} was not accepted by any handler")]
    Rejected {
        /// Message id of the rejected directive.
        message_id: String,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn sequencer worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("invalid sequencer configuration: {0}")]
    Config(#[from] serde_json::Error),
}
