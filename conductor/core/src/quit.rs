//! Quit Orchestrator
//!
//! Decides when the host process should terminate and performs the
//! controlled shutdown: global shortcuts are released, the native event loop
//! is told to exit, and the conductor loop stops.
//!
//! The process should quit once no window is open that is not marked for
//! forced close. A window that is on its way out does not keep the process
//! alive.

use crate::platform::Platform;
use crate::surface_registry::WindowRegistry;

/// Why the conductor loop stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The last window closed
    AllWindowsClosed,
    /// A surface or the status-icon menu asked to quit
    Requested,
    /// The process received a termination signal
    Signal,
    /// Every input sender was dropped
    Disconnected,
}

/// Tracks whether shutdown has started
#[derive(Debug, Default)]
pub struct QuitOrchestrator {
    exit_reason: Option<ExitReason>,
}

impl QuitOrchestrator {
    /// Create an orchestrator that has not quit
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the process should terminate given the open windows
    #[must_use]
    pub fn should_quit(registry: &WindowRegistry) -> bool {
        !registry.has_live_window()
    }

    /// Shut down once; later calls are no-ops
    ///
    /// Returns whether this call performed the shutdown.
    pub fn quit(&mut self, platform: &dyn Platform, reason: ExitReason) -> bool {
        if self.exit_reason.is_some() {
            tracing::debug!(reason = ?reason, "Quit already in progress");
            return false;
        }
        tracing::info!(reason = ?reason, "Quitting host process");

        if let Err(err) = platform.unregister_all_shortcuts() {
            tracing::debug!(error = %err, "Failed to release global shortcuts");
        }
        platform.exit();

        self.exit_reason = Some(reason);
        true
    }

    /// Whether shutdown has started
    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.exit_reason.is_some()
    }

    /// Reason given to the first [`quit`](Self::quit) call
    #[must_use]
    pub fn exit_reason(&self) -> Option<&ExitReason> {
        self.exit_reason.as_ref()
    }
}
