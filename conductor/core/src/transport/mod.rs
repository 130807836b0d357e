//! Transport Layer for Shell-Host IPC
//!
//! Surface shells that run outside the host process (a webview launcher, a
//! test driver) attach to a window over a Unix socket. This module holds the
//! wire types and the frame codec they share with the daemon.
//!
//! # Protocol
//!
//! ```text
//!   shell                                     host
//!     │ ── ShellFrame::Attach { window } ──────► │  must be the first frame
//!     │ ── ShellFrame::Surface(event) ─────────► │  surface events
//!     │ ── ShellFrame::RequestClose / ... ─────► │  native window signals
//!     │ ◄───────────────────────── HostMessage ─ │  replies, events, control
//!     │ ◄───────────────── HostMessage::Confirm ─ │  native dialog
//!     │ ── ShellFrame::ConfirmAnswer ──────────► │  the user's choice
//! ```
//!
//! # Security
//!
//! - The daemon validates the peer UID of every connection
//! - Socket files are created with 0600 permissions
//! - No network exposure

pub mod frame;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::SurfaceEvent;

pub use frame::{read_frame, write_frame, FrameDecoder, FrameEncoder, MAX_FRAME_SIZE};

/// Errors on a shell connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// IO error from the socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Message serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A frame announced a payload above [`MAX_FRAME_SIZE`]
    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// Announced payload size
        size: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Frame checksum mismatch - data corruption detected
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Expected checksum value
        expected: u32,
        /// Actual checksum value received
        actual: u32,
    },

    /// The peer broke the attach protocol
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The peer is not allowed to connect
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Frames a shell sends to the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShellFrame {
    /// Bind this connection to an open window
    Attach {
        /// Window name
        window: String,
    },
    /// A surface event from the attached window
    Surface(SurfaceEvent),
    /// The user asked to close the window
    RequestClose,
    /// The surface content finished loading
    Loaded,
    /// The surface wants to navigate to `url`
    Navigate {
        /// Navigation target
        url: String,
    },
    /// The surface wants to open `url` in a new window
    NewWindow {
        /// Requested URL
        url: String,
    },
    /// The user focused the window
    Focus,
    /// The surface content crashed
    Crashed,
    /// The user answered a `HostMessage::Confirm` dialog
    ConfirmAnswer {
        /// Whether the user chose to exit
        accepted: bool,
    },
}

impl ShellFrame {
    /// Short name used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attach { .. } => "attach",
            Self::Surface(event) => event.kind(),
            Self::RequestClose => "request_close",
            Self::Loaded => "loaded",
            Self::Navigate { .. } => "navigate",
            Self::NewWindow { .. } => "new_window",
            Self::Focus => "focus",
            Self::Crashed => "crashed",
            Self::ConfirmAnswer { .. } => "confirm_answer",
        }
    }
}
