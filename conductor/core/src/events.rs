//! Surface Events and Native Signals
//!
//! Everything that flows *into* the host:
//!
//! - [`SurfaceEvent`]: messages a surface sends over its inbound channel
//! - [`WindowSignal`]: lifecycle and navigation signals raised by the native
//!   window that hosts a surface
//! - [`TrayAction`]: interactions with a window's status icon
//!
//! # Design Philosophy
//!
//! Surfaces and native windows only report what happened. Whether a close is
//! honored, a navigation allowed, or a call answered is decided by the
//! conductor.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::{CallbackId, EventId};

/// Events from a surface to the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// The surface asks the whole application to quit (`app_quit`)
    AppQuit,

    /// Invoke a host operation by name (`remote_invoke`)
    RemoteInvoke {
        /// Operation name
        method: String,
        /// Correlation token for the reply
        callback_id: CallbackId,
        /// Operation arguments, opaque to the broker
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Unicast to another named surface (`remote_send`)
    RemoteSend {
        /// Target window name
        target: String,
        /// Event name delivered to the target
        event_name: String,
        /// Event arguments
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Subscribe to a host event (`remote_on`)
    RemoteOn {
        /// Token chosen by the surface
        event_id: EventId,
        /// Host event name
        event_name: String,
    },

    /// Drop a subscription (`remote_off`)
    RemoteOff {
        /// Token used when subscribing
        event_id: EventId,
    },

    /// Emit on the host event bus under the name `event_id` (`remote_emit`)
    RemoteEmit {
        /// Event name on the bus
        event_id: EventId,
        /// Event arguments
        #[serde(default)]
        args: Vec<Value>,
    },

    /// The surface finished booting (`app_ready`)
    AppReady {
        /// Window that should get a status icon, if any
        window_name: Option<String>,
    },
}

impl SurfaceEvent {
    /// Short name used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppQuit => "app_quit",
            Self::RemoteInvoke { .. } => "remote_invoke",
            Self::RemoteSend { .. } => "remote_send",
            Self::RemoteOn { .. } => "remote_on",
            Self::RemoteOff { .. } => "remote_off",
            Self::RemoteEmit { .. } => "remote_emit",
            Self::AppReady { .. } => "app_ready",
        }
    }
}

/// Signals raised by a native window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowSignal {
    /// The user or the host asked the window to close; preventable
    CloseRequested,
    /// The window is gone
    Closed,
    /// The surface content finished loading
    LoadFinished,
    /// The surface content crashed
    Crashed,
    /// In-surface navigation to `url`; preventable
    WillNavigate {
        /// Navigation target
        url: String,
    },
    /// The surface asked to open `url` in a new window; preventable
    NewWindow {
        /// Requested URL
        url: String,
    },
}

impl WindowSignal {
    /// Short name used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CloseRequested => "close_requested",
            Self::Closed => "closed",
            Self::LoadFinished => "load_finished",
            Self::Crashed => "crashed",
            Self::WillNavigate { .. } => "will_navigate",
            Self::NewWindow { .. } => "new_window",
        }
    }
}

/// Host decision for a preventable native signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Let the native default proceed
    Allow,
    /// Cancel the native default
    Prevent,
}

impl Verdict {
    /// Whether the native default was cancelled
    #[must_use]
    pub fn is_prevented(self) -> bool {
        matches!(self, Self::Prevent)
    }
}

/// Callback through which the native layer learns the host's [`Verdict`]
///
/// Invoked exactly once, on the conductor task, while the signal is handled.
pub struct SignalResponder(Box<dyn FnOnce(Verdict) + Send>);

impl SignalResponder {
    /// Wrap a native callback
    pub fn new(f: impl FnOnce(Verdict) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Deliver the verdict
    pub fn respond(self, verdict: Verdict) {
        (self.0)(verdict);
    }
}

impl fmt::Debug for SignalResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignalResponder")
    }
}

/// Interactions with a window's status icon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrayAction {
    /// "Open" entry of the context menu
    Open,
    /// "Exit" entry of the context menu
    Exit,
    /// Primary click on the icon
    Click,
}
