//! Host Messages
//!
//! Messages sent from the host to a window's surface over its outbound channel.
//! Every message is addressed to exactly one surface; there is no broadcast.
//!
//! # Correlation
//!
//! Surfaces choose the tokens used to match asynchronous traffic:
//!
//! - [`CallbackId`] tags the single reply to a remote invocation
//! - [`EventId`] tags every payload forwarded for one event subscription
//!
//! The host never generates or reuses these tokens itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages from the host to a surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HostMessage {
    /// Result of a remote invocation, tagged with the caller's callback id
    Reply {
        /// Correlation token supplied with the invocation
        callback_id: CallbackId,
        /// Operation result
        value: Value,
    },

    /// Payload of a host event the surface subscribed to
    Event {
        /// Subscription token chosen by the surface
        event_id: EventId,
        /// Event arguments as emitted on the host bus
        args: Vec<Value>,
    },

    /// Unicast from another surface (`remote_send`)
    Forward {
        /// Event name chosen by the sending surface
        event_name: String,
        /// Event arguments
        args: Vec<Value>,
    },

    /// Ask the surface to run its own shutdown flow (`remote_app_quit`)
    AppQuit {
        /// `Some("quit")` when triggered from the status-icon menu
        reason: Option<String>,
    },

    /// A link inside the surface asked for a new window; open it externally
    OpenUrl {
        /// The requested URL
        url: String,
    },

    /// Show a yes/no dialog on the host's behalf (close confirmation,
    /// crash recovery)
    ///
    /// Only sent to shells hosting a window out of process; the answer comes
    /// back as `ShellFrame::ConfirmAnswer`.
    Confirm {
        /// Question text
        message: String,
        /// Affirmative button
        confirm_label: String,
        /// Negative button
        cancel_label: String,
    },
}

impl HostMessage {
    /// Short name used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::Event { .. } => "event",
            Self::Forward { .. } => "forward",
            Self::AppQuit { .. } => "app_quit",
            Self::OpenUrl { .. } => "open_url",
            Self::Confirm { .. } => "confirm",
        }
    }
}

/// Correlation token for a remote invocation reply
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub String);

impl CallbackId {
    /// Wrap a surface-supplied token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation token for an event subscription
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Wrap a surface-supplied token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
