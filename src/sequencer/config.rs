/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Sequencer configuration.

use super::core::SequencerError;
use serde::{Deserialize, Serialize};

/// Default name given to the worker thread.
pub const DEFAULT_WORKER_NAME: &str = "directive-sequencer";

/// Settings applied when a Sequencer is built.
///
/// # Examples
///
/// ```
/// use directive_sequencer::sequencer::SequencerConfig;
///
/// let config = SequencerConfig::from_json(r#"{ "worker_name": "dialog" }"#).unwrap();
/// assert_eq!(config.worker_name, "dialog");
/// assert_eq!(config.worker_stack_size, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Name of the worker thread, visible in debuggers and panic messages.
    pub worker_name: String,

    /// Stack size for the worker thread. Uses the platform default if unset.
    pub worker_stack_size: Option<usize>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            worker_name: DEFAULT_WORKER_NAME.to_owned(),
            worker_stack_size: None,
        }
    }
}

impl SequencerConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] if the text is not valid JSON or a
    /// field has the wrong type.
    pub fn from_json(text: &str) -> Result<Self, SequencerError> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    #[must_use]
    pub fn with_worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = Some(bytes);
        self
    }
}
