/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Directive value type.
//!
//! A directive is the unit of work submitted to the Sequencer. It is tagged
//! with a unique message id and the dialog request id (session token) of the
//! turn it belongs to. The Sequencer never mutates a directive; it is shared
//! as `Arc<Directive>` between the Sequencer, the router and handler code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of work routed through the Sequencer.
///
/// # Examples
///
/// ```
/// use directive_sequencer::sequencer::Directive;
///
/// let directive = Directive::new("SpeechSynthesizer", "Speak", "msg-1", "turn-1");
/// assert_eq!(directive.message_id(), "msg-1");
/// assert_eq!(directive.dialog_request_id(), "turn-1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    namespace: String,
    name: String,
    message_id: String,
    #[serde(default)]
    dialog_request_id: String,
    #[serde(default)]
    payload: Value,
}

impl Directive {
    /// Creates a directive with an empty (`null`) payload.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        message_id: impl Into<String>,
        dialog_request_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            message_id: message_id.into(),
            dialog_request_id: dialog_request_id.into(),
            payload: Value::Null,
        }
    }

    /// Attaches a payload to the directive.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Parses a directive from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the text is not a
    /// valid directive.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serializes the directive to JSON.
    ///
    /// Falls back to an empty object if the payload cannot be rendered, which
    /// only happens for maps with non-string keys.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Interface namespace, e.g. `SpeechSynthesizer`.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directive name within its namespace, e.g. `Speak`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique identifier of this directive.
    #[inline]
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Session token of the turn this directive belongs to.
    #[inline]
    #[must_use]
    pub fn dialog_request_id(&self) -> &str {
        &self.dialog_request_id
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
