/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! # Directive Sequencer
//!
//! Ordered execution of session-scoped directives.
//!
//! A producer submits directives tagged with a dialog request id. The
//! [`Sequencer`] pre-handles each one through a [`DirectiveRouter`], runs
//! them strictly one at a time in arrival order on a dedicated worker thread,
//! honours each handler's [`BlockingPolicy`], and cancels everything still in
//! flight when the active session changes, a handler rejects a directive, a
//! directive reports failure, or the Sequencer shuts down.
//!
//! Handlers report asynchronously through a [`CompletionChannel`]. Channels
//! hold only a handle into a process-wide registry, so reports that arrive
//! after the Sequencer has shut down are dropped instead of touching it.
//!
//! The router, handler registration and the directive wire format are out of
//! scope; the router is a trait the embedding application implements.

pub mod sequencer;

pub use sequencer::{
    BlockingPolicy, CompletionChannel, Directive, DirectiveRouter, ExceptionEncounteredSender,
    ExceptionErrorType, Sequencer, SequencerBuilder, SequencerConfig, SequencerError,
    SequencerHandle, SequencerSnapshot, SubmitOutcome,
};
