//! Native Platform Abstraction
//!
//! Trait definitions for everything the conductor needs from the native
//! layer: windows, status icons, modal questions, the about panel, global
//! shortcuts and process exit. This keeps the core free of any GUI toolkit.
//!
//! # Design Philosophy
//!
//! The native layer is a collaborator, not an owner:
//! - It creates handles on request and hands them to the registry
//! - It reports what happens to those handles as [`WindowSignal`]s and
//!   [`TrayAction`]s through the [`HostHandle`] it was given
//! - It never decides lifecycle policy itself
//!
//! [`WindowSignal`]: crate::events::WindowSignal
//! [`TrayAction`]: crate::events::TrayAction

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::conductor::HostHandle;
use crate::messages::HostMessage;

/// Errors reported by the native layer
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The native window could not be created
    #[error("Failed to create window '{name}': {reason}")]
    WindowCreation {
        /// Requested window name
        name: String,
        /// Native failure description
        reason: String,
    },

    /// The status icon could not be created
    #[error("Failed to create status icon for '{window}': {reason}")]
    StatusIcon {
        /// Window the icon belongs to
        window: String,
        /// Native failure description
        reason: String,
    },

    /// Global shortcut registration call failed
    #[error("Global shortcut error: {0}")]
    Shortcut(String),
}

/// Window creation options
///
/// Field defaults follow the native toolkit defaults; the conductor layers
/// application defaults on top in `create_app_window`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    /// Registry key; allocated by the registry when absent
    pub name: Option<String>,
    /// Initial width
    pub width: u32,
    /// Initial height
    pub height: u32,
    /// Minimum width
    pub min_width: u32,
    /// Minimum height
    pub min_height: u32,
    /// Initial x position
    pub x: Option<i32>,
    /// Initial y position
    pub y: Option<i32>,
    /// Content URL; relative URLs resolve against the root path
    pub url: Option<String>,
    /// Fragment appended to the URL when it has none (default `/<name>`)
    pub hash_route: Option<String>,
    /// Window title
    pub title: Option<String>,
    /// Whether the user may resize the window
    pub resizable: bool,
    /// Show immediately on creation
    pub show: bool,
    /// Show and focus once the content finished loading
    pub show_after_load: bool,
    /// Hide the menu bar until Alt is pressed
    pub auto_hide_menu_bar: bool,
    /// Background color shown before the content paints
    pub background_color: String,
    /// Enable developer tooling for this window
    pub debug: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            name: None,
            width: 800,
            height: 600,
            min_width: 0,
            min_height: 0,
            x: None,
            y: None,
            url: None,
            hash_route: None,
            title: None,
            resizable: true,
            show: false,
            show_after_load: true,
            auto_hide_menu_bar: !cfg!(target_os = "macos"),
            background_color: "#ffffff".to_string(),
            debug: false,
        }
    }
}

impl WindowOptions {
    /// Options for a named window with otherwise default settings
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the size
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the content URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Partial window options as sent by surfaces
///
/// Every present field replaces the corresponding field of the base options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOverrides {
    /// See [`WindowOptions::name`]
    pub name: Option<String>,
    /// See [`WindowOptions::width`]
    pub width: Option<u32>,
    /// See [`WindowOptions::height`]
    pub height: Option<u32>,
    /// See [`WindowOptions::min_width`]
    pub min_width: Option<u32>,
    /// See [`WindowOptions::min_height`]
    pub min_height: Option<u32>,
    /// See [`WindowOptions::x`]
    pub x: Option<i32>,
    /// See [`WindowOptions::y`]
    pub y: Option<i32>,
    /// See [`WindowOptions::url`]
    pub url: Option<String>,
    /// See [`WindowOptions::hash_route`]
    pub hash_route: Option<String>,
    /// See [`WindowOptions::title`]
    pub title: Option<String>,
    /// See [`WindowOptions::resizable`]
    pub resizable: Option<bool>,
    /// See [`WindowOptions::show`]
    pub show: Option<bool>,
    /// See [`WindowOptions::show_after_load`]
    pub show_after_load: Option<bool>,
    /// See [`WindowOptions::debug`]
    pub debug: Option<bool>,
}

impl WindowOverrides {
    /// Overlay these overrides on `base`
    #[must_use]
    pub fn apply(self, mut base: WindowOptions) -> WindowOptions {
        if self.name.is_some() {
            base.name = self.name;
        }
        if let Some(width) = self.width {
            base.width = width;
        }
        if let Some(height) = self.height {
            base.height = height;
        }
        if let Some(min_width) = self.min_width {
            base.min_width = min_width;
        }
        if let Some(min_height) = self.min_height {
            base.min_height = min_height;
        }
        if self.x.is_some() {
            base.x = self.x;
        }
        if self.y.is_some() {
            base.y = self.y;
        }
        if self.url.is_some() {
            base.url = self.url;
        }
        if self.hash_route.is_some() {
            base.hash_route = self.hash_route;
        }
        if self.title.is_some() {
            base.title = self.title;
        }
        if let Some(resizable) = self.resizable {
            base.resizable = resizable;
        }
        if let Some(show) = self.show {
            base.show = show;
        }
        if let Some(show_after_load) = self.show_after_load {
            base.show_after_load = show_after_load;
        }
        if let Some(debug) = self.debug {
            base.debug = debug;
        }
        base
    }
}

/// Fully resolved request handed to [`Platform::open_window`]
#[derive(Clone, Debug)]
pub struct WindowSpec {
    /// Registry key
    pub name: String,
    /// Creation options
    pub options: WindowOptions,
    /// Resolved URL to load, if any
    pub url: Option<String>,
}

/// Status icon creation request
#[derive(Clone, Debug, PartialEq)]
pub struct TrayIconSpec {
    /// Initial image
    pub image: PathBuf,
    /// Hover text
    pub tooltip: String,
    /// Label of the "open" menu entry
    pub open_label: String,
    /// Label of the "exit" menu entry
    pub exit_label: String,
}

/// Modal question shown before a confirmed close
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmPrompt {
    /// Question text
    pub message: String,
    /// Affirmative button (default)
    pub confirm_label: String,
    /// Negative button
    pub cancel_label: String,
}

/// Contents of the application's about panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AboutPanel {
    /// Application title
    pub application_name: String,
    /// Package version
    pub application_version: String,
    /// Copyright line
    pub copyright: String,
    /// Build marker, `[debug]` in debug mode
    pub version: String,
}

/// A native window owned by the registry
pub trait NativeWindow: Send {
    /// Make the window visible
    fn show(&mut self);
    /// Give the window input focus
    fn focus(&mut self);
    /// Restore from minimized state
    fn restore(&mut self);
    /// Whether the window is minimized
    fn is_minimized(&self) -> bool;
    /// Whether the window is visible
    fn is_visible(&self) -> bool;
    /// Whether the window currently has focus
    fn is_focused(&self) -> bool;
    /// Ask the window to close
    ///
    /// The native layer answers with `WindowSignal::CloseRequested` and, if
    /// the host allows it, `WindowSignal::Closed`.
    fn close(&mut self);
    /// Load the surface content again
    fn reload(&mut self);
}

/// A native status icon
pub trait StatusIcon: Send {
    /// Swap the displayed image
    fn set_image(&mut self, image: &Path);
    /// Remove the icon from the status area
    fn destroy(&mut self);
}

/// Everything the conductor needs from the native layer
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Create a native window for `spec`
    ///
    /// `outbound` carries every [`HostMessage`] for the window's surface;
    /// `host` is where the window reports its signals and surface events.
    fn open_window(
        &self,
        spec: &WindowSpec,
        outbound: mpsc::Receiver<HostMessage>,
        host: HostHandle,
    ) -> Result<Box<dyn NativeWindow>, PlatformError>;

    /// Create a status icon for `window`; interactions go to `host`
    fn create_status_icon(
        &self,
        window: &str,
        spec: &TrayIconSpec,
        host: HostHandle,
    ) -> Result<Box<dyn StatusIcon>, PlatformError>;

    /// Ask the user a yes/no question attached to `window`
    ///
    /// Returns `true` when the affirmative button was chosen.
    async fn confirm(&self, window: &str, prompt: &ConfirmPrompt) -> bool;

    /// Fill the application's about panel
    ///
    /// Platforms without an about panel ignore this.
    fn set_about_panel(&self, _about: &AboutPanel) {}

    /// Release every global keyboard shortcut registration
    fn unregister_all_shortcuts(&self) -> Result<(), PlatformError>;

    /// Terminate the native event loop
    fn exit(&self);
}
