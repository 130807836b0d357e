//! Close Confirmation
//!
//! Per-window state machine deciding what happens when a window is asked to
//! close.
//!
//! ```text
//!            close (forced)
//!   Open ─────────────────────────────────────────► ConfirmedClose ──► Closed
//!    │  ▲                                                  ▲
//!    │  │ declined                                         │ affirmed
//!    │  │                                                  │
//!    └──┴── close within debounce window ──► PendingConfirm┘
//! ```
//!
//! The first close request of a burst is never honored directly: the surface
//! is told a quit is pending so it can run its own shutdown flow and ask
//! again. A second request inside the debounce window raises a confirmation
//! dialog instead.

use std::time::{Duration, Instant};

/// Default debounce window between two close requests
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_millis(3000);

/// Lifecycle state of a window with respect to closing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseState {
    /// Normal operation
    Open,
    /// A confirmation dialog is on screen
    PendingConfirm,
    /// The native close is allowed to proceed
    ConfirmedClose,
    /// The native window is gone
    Closed,
}

/// What the conductor must do with a close request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseDecision {
    /// Let the native close proceed
    Proceed,
    /// Cancel the native close and show the confirmation dialog
    Confirm,
    /// Cancel the native close; a dialog is already showing
    AwaitingConfirmation,
    /// Cancel the native close and tell the surface a quit is pending
    NotifyPendingQuit,
}

impl CloseDecision {
    /// Whether the native close should be cancelled
    #[must_use]
    pub fn prevents_close(self) -> bool {
        !matches!(self, Self::Proceed)
    }
}

/// Close-confirmation state for one window
#[derive(Clone, Debug)]
pub struct CloseGuard {
    state: CloseState,
    last_close_request: Option<Instant>,
    confirm_window: Duration,
}

impl Default for CloseGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_WINDOW)
    }
}

impl CloseGuard {
    /// Create a guard with the given debounce window
    #[must_use]
    pub fn new(confirm_window: Duration) -> Self {
        Self {
            state: CloseState::Open,
            last_close_request: None,
            confirm_window,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> CloseState {
        self.state
    }

    /// Time of the last unconfirmed close request
    #[must_use]
    pub fn last_close_request(&self) -> Option<Instant> {
        self.last_close_request
    }

    /// Handle a close request at `now`
    ///
    /// `forced` is the window's marked-for-close flag.
    pub fn on_close_requested(&mut self, forced: bool, now: Instant) -> CloseDecision {
        if forced {
            self.state = CloseState::ConfirmedClose;
            return CloseDecision::Proceed;
        }

        match self.state {
            CloseState::PendingConfirm => return CloseDecision::AwaitingConfirmation,
            CloseState::ConfirmedClose | CloseState::Closed => return CloseDecision::Proceed,
            CloseState::Open => {}
        }

        let within_window = self
            .last_close_request
            .is_some_and(|t0| now.saturating_duration_since(t0) < self.confirm_window);

        if within_window {
            self.state = CloseState::PendingConfirm;
            CloseDecision::Confirm
        } else {
            self.last_close_request = Some(now);
            CloseDecision::NotifyPendingQuit
        }
    }

    /// Record the user's answer to the confirmation dialog
    ///
    /// Returns `true` when the window must now be force-closed. A declined
    /// dialog leaves the last request time untouched.
    pub fn on_confirmation(&mut self, accepted: bool) -> bool {
        if self.state != CloseState::PendingConfirm {
            return false;
        }
        if accepted {
            self.state = CloseState::ConfirmedClose;
        } else {
            self.state = CloseState::Open;
        }
        accepted
    }

    /// The native window reported that it closed
    pub fn on_closed(&mut self) {
        self.state = CloseState::Closed;
    }
}
