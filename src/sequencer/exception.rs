/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Upstream reporting of directives that could not be processed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an exception reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionErrorType {
    /// The directive was malformed or not expected.
    UnexpectedInformationReceived,

    /// No handler accepted the directive.
    UnsupportedOperation,

    /// The client failed while processing the directive.
    InternalError,
}

impl ExceptionErrorType {
    /// Wire name of the error type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnexpectedInformationReceived => "UNEXPECTED_INFORMATION_RECEIVED",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ExceptionErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends exception reports for directives the client refused.
///
/// Called without any Sequencer lock held.
pub trait ExceptionEncounteredSender: Send + Sync {
    fn send_exception_encountered(
        &self,
        unparsed_directive: &str,
        error: ExceptionErrorType,
        description: &str,
    );
}
