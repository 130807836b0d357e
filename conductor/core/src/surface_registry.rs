//! Surface Registry - Window Lifecycle Bookkeeping
//!
//! This module owns the mapping from window name to window entry. The
//! `WindowRegistry` allows the conductor to:
//!
//! - Allocate unique window names (`main`, `main-<n>`)
//! - Reject duplicate names at insertion
//! - Route messages to one named surface
//! - Track forced-close marks and the designated main window
//! - Resolve the window that should receive focus
//!
//! # Architecture
//!
//! ```text
//!                      WindowRegistry
//!                     ┌──────────────────────────────────────┐
//!                     │ HashMap<String, WindowEntry>          │
//!                     │ HashSet<String> marked_for_close      │
//!                     │ Option<String>  main_window           │
//!                     └───────────────┬──────────────────────┘
//!                                     │
//!              ┌──────────────────────┼──────────────────────┐
//!              │                      │                      │
//!       ┌──────▼──────┐       ┌───────▼──────┐       ┌───────▼──────┐
//!       │    login    │       │     main     │       │    main-0    │
//!       └─────────────┘       └──────────────┘       └──────────────┘
//! ```
//!
//! # Confinement
//!
//! The registry is owned by the conductor and only touched from the
//! conductor task, so it carries no lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::close_guard::CloseGuard;
use crate::messages::HostMessage;
use crate::platform::{NativeWindow, PlatformError, WindowOptions};

/// Name of the designated main window
pub const MAIN_WINDOW: &str = "main";

/// Name of the login window
pub const LOGIN_WINDOW: &str = "login";

/// Errors raised while creating windows
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A window with this name is already open
    #[error("The window with name '{0}' has already been created")]
    DuplicateName(String),

    /// The native layer refused to create the window
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Registry entry for one open window
pub struct WindowEntry {
    /// Registry key
    pub name: String,
    /// Native window, exclusively owned by this entry
    pub handle: Box<dyn NativeWindow>,
    /// Options the window was created with
    pub options: WindowOptions,
    /// URL loaded into the surface, if any
    pub url: Option<String>,
    /// Channel to the window's surface
    pub outbound: mpsc::Sender<HostMessage>,
    /// Close-confirmation state; `None` for windows that close freely
    pub close_guard: Option<CloseGuard>,
    /// When the window was created
    pub created_at: Instant,
}

impl WindowEntry {
    /// Create an entry for a freshly opened window
    #[must_use]
    pub fn new(
        name: String,
        handle: Box<dyn NativeWindow>,
        options: WindowOptions,
        url: Option<String>,
        outbound: mpsc::Sender<HostMessage>,
        close_guard: Option<CloseGuard>,
    ) -> Self {
        Self {
            name,
            handle,
            options,
            url,
            outbound,
            close_guard,
            created_at: Instant::now(),
        }
    }

    /// Send a message to this window's surface without waiting
    pub fn send(&self, message: HostMessage) -> SendOutcome {
        match self.outbound.try_send(message) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(_)) => SendOutcome::Backlogged,
            Err(TrySendError::Closed(_)) => SendOutcome::Disconnected,
        }
    }

    /// Restore or show, then focus
    pub fn show_and_focus(&mut self) {
        if self.handle.is_minimized() {
            self.handle.restore();
        } else {
            self.handle.show();
        }
        self.handle.focus();
    }
}

impl fmt::Debug for WindowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowEntry")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("close_state", &self.close_guard.as_ref().map(CloseGuard::state))
            .finish_non_exhaustive()
    }
}

/// Result of sending to one surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was queued
    Sent,
    /// The surface's channel is full
    Backlogged,
    /// The surface is gone
    Disconnected,
    /// No window with that name
    UnknownWindow,
}

impl SendOutcome {
    /// Whether the message was queued
    #[must_use]
    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Registry of open windows
#[derive(Default)]
pub struct WindowRegistry {
    windows: HashMap<String, WindowEntry>,
    /// Names whose next close bypasses confirmation; never cleared
    marked_for_close: HashSet<String>,
    main_window: Option<String>,
    next_index: u64,
}

impl WindowRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the name for a new window
    ///
    /// A requested name is returned as is. Otherwise the first unnamed window
    /// becomes `main` and later ones `main-0`, `main-1`, ...
    pub fn allocate_name(&mut self, requested: Option<&str>) -> String {
        if let Some(name) = requested {
            return name.to_string();
        }
        if self.main_window.is_none() && !self.windows.contains_key(MAIN_WINDOW) {
            return MAIN_WINDOW.to_string();
        }
        loop {
            let candidate = format!("{MAIN_WINDOW}-{}", self.next_index);
            self.next_index += 1;
            if !self.windows.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Fail with `DuplicateName` if `name` is open
    pub fn ensure_available(&self, name: &str) -> Result<(), RegistryError> {
        if self.windows.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Insert a new window
    pub fn insert(&mut self, entry: WindowEntry) -> Result<(), RegistryError> {
        self.ensure_available(&entry.name)?;
        let name = entry.name.clone();
        self.windows.insert(name.clone(), entry);
        tracing::info!(window = %name, open = self.windows.len(), "Window registered");
        Ok(())
    }

    /// Remove a closed window
    pub fn remove(&mut self, name: &str) -> Option<WindowEntry> {
        let entry = self.windows.remove(name);
        if entry.is_some() {
            if self.main_window.as_deref() == Some(name) {
                self.main_window = None;
            }
            tracing::info!(window = %name, open = self.windows.len(), "Window unregistered");
        }
        entry
    }

    /// Look up a window
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WindowEntry> {
        self.windows.get(name)
    }

    /// Look up a window mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut WindowEntry> {
        self.windows.get_mut(name)
    }

    /// Whether a window is open
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.windows.contains_key(name)
    }

    /// Number of open windows
    #[must_use]
    pub fn count(&self) -> usize {
        self.windows.len()
    }

    /// Names of all open windows, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.windows.keys().cloned().collect();
        names.sort();
        names
    }

    /// Designate `name` as the main window
    ///
    /// Only an open window named `main` qualifies, and only while no main
    /// window is designated. Returns whether `name` became the main window.
    pub fn designate_main(&mut self, name: &str) -> bool {
        if name != MAIN_WINDOW || self.main_window.is_some() || !self.windows.contains_key(name) {
            return false;
        }
        self.main_window = Some(name.to_string());
        true
    }

    /// The designated main window, if open
    #[must_use]
    pub fn main_window(&self) -> Option<&str> {
        self.main_window.as_deref()
    }

    /// Mark `name` so its next close bypasses confirmation
    pub fn mark_for_close(&mut self, name: &str) {
        self.marked_for_close.insert(name.to_string());
    }

    /// Whether `name` is marked for forced close
    #[must_use]
    pub fn is_marked_for_close(&self, name: &str) -> bool {
        self.marked_for_close.contains(name)
    }

    /// Whether any open window is not marked for forced close
    #[must_use]
    pub fn has_live_window(&self) -> bool {
        self.windows
            .keys()
            .any(|name| !self.marked_for_close.contains(name))
    }

    /// Window that should receive focus-related actions
    ///
    /// The focused window, else the main window, else any open window.
    #[must_use]
    pub fn current_focus_window(&self) -> Option<&str> {
        if let Some(entry) = self.windows.values().find(|e| e.handle.is_focused()) {
            return Some(entry.name.as_str());
        }
        if let Some(main) = self.main_window.as_deref() {
            if self.windows.contains_key(main) {
                return Some(main);
            }
        }
        self.windows.keys().min().map(String::as_str)
    }

    /// Outbound channel of a window
    #[must_use]
    pub fn outbound(&self, name: &str) -> Option<mpsc::Sender<HostMessage>> {
        self.windows.get(name).map(|e| e.outbound.clone())
    }

    /// Send a message to a specific surface
    pub fn send_to(&self, name: &str, message: HostMessage) -> SendOutcome {
        let Some(entry) = self.windows.get(name) else {
            tracing::debug!(window = %name, "Attempted to send to unknown window");
            return SendOutcome::UnknownWindow;
        };
        let kind = message.kind();
        let outcome = entry.send(message);
        if !outcome.is_sent() {
            tracing::warn!(window = %name, kind, outcome = ?outcome, "Cannot send message to surface");
        }
        outcome
    }

    /// Summary of the registry state
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            open: self.names(),
            marked_for_close: self
                .windows
                .keys()
                .filter(|n| self.marked_for_close.contains(*n))
                .count(),
            main_window: self.main_window.clone(),
        }
    }
}

impl fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("windows", &self.names())
            .field("main_window", &self.main_window)
            .field("marked_for_close", &self.marked_for_close)
            .finish()
    }
}

/// Summary of open windows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySummary {
    /// Open window names, sorted
    pub open: Vec<String>,
    /// How many open windows are marked for forced close
    pub marked_for_close: usize,
    /// Designated main window
    pub main_window: Option<String>,
}
