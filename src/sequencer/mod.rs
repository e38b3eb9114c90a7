/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer module for ordered, session-scoped directive processing.
//!
//! This module provides a Sequencer that accepts directives tagged with a
//! session token, pre-handles them through a [`DirectiveRouter`], executes
//! them one at a time in arrival order, and cancels everything still pending
//! when the session changes or a directive fails.
//!
//! # Architecture
//!
//! - `submit` pre-handles on the calling thread, with a pre-handle slot that
//!   detects completion reports racing in before the router returns
//! - A dedicated worker thread drains cancellations first, then hands the
//!   head of the handling queue to the router
//! - A [`BlockingPolicy::Blocking`] directive holds the queue until it
//!   reports through its [`CompletionChannel`]
//! - Completion channels reach their Sequencer through a process-wide
//!   registry of handles, so late reports after shutdown are dropped
//!
//! # Examples
//!
//! ```no_run
//! use directive_sequencer::sequencer::{Directive, DirectiveRouter, Sequencer};
//! use std::sync::Arc;
//!
//! # fn example(router: Arc<dyn DirectiveRouter>) -> Result<(), Box<dyn std::error::Error>> {
//! let sequencer = Sequencer::new(router)?;
//! sequencer.set_active_session("turn-1");
//!
//! let directive = Arc::new(Directive::new("SpeechSynthesizer", "Speak", "msg-1", "turn-1"));
//! sequencer.try_submit(directive)?;
//!
//! // A new turn cancels whatever is left of the old one.
//! sequencer.set_active_session("turn-2");
//!
//! sequencer.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod core;
pub mod directive;
pub mod exception;
pub mod outcome;
pub mod registry;
pub mod router;
mod state;


// Re-export main types
pub use completion::CompletionChannel;
pub use config::SequencerConfig;
pub use self::core::{Sequencer, SequencerBuilder, SequencerError};
pub use directive::Directive;
pub use exception::{ExceptionEncounteredSender, ExceptionErrorType};
pub use outcome::SubmitOutcome;
pub use registry::SequencerHandle;
pub use router::{BlockingPolicy, DirectiveRouter};
pub use state::SequencerSnapshot;
