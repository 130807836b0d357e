//! Status-Icon Manager
//!
//! At most one status icon per window name. Creating an icon for a name that
//! already has one destroys the old icon first. While an icon is in alert
//! mode, every animation tick swaps its image between the normal frame and a
//! transparent frame, which makes it blink.
//!
//! Menu and click wiring live in the native layer; it reports interactions
//! back as [`TrayAction`](crate::events::TrayAction)s which the conductor
//! turns into focus or quit requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::conductor::HostHandle;
use crate::config::HostConfig;
use crate::platform::{Platform, PlatformError, StatusIcon, TrayIconSpec};

/// Image shown on macOS and used as the bright alert frame
pub const ICON_16: &str = "tray-icon-16.png";
/// Image shown on other platforms
pub const ICON_32: &str = "tray-icon-32.png";
/// Dark alert frame
pub const ICON_TRANSPARENT: &str = "tray-icon-transparent.png";

/// Images and labels used for every status icon
#[derive(Clone, Debug, PartialEq)]
pub struct TrayAssets {
    /// Initial image
    pub icon: PathBuf,
    /// Alert frames, alternated on each tick
    pub frames: [PathBuf; 2],
    /// Hover text
    pub tooltip: String,
    /// "Open" menu label
    pub open_label: String,
    /// "Exit" menu label
    pub exit_label: String,
}

impl TrayAssets {
    /// Resolve assets under the configured media directory
    #[must_use]
    pub fn from_config(config: &HostConfig) -> Self {
        let media = config.media_dir();
        let icon = if cfg!(target_os = "macos") {
            ICON_16
        } else {
            ICON_32
        };
        Self {
            icon: media.join(icon),
            frames: [media.join(ICON_16), media.join(ICON_TRANSPARENT)],
            tooltip: config.labels.title.clone(),
            open_label: config.labels.tray_open.clone(),
            exit_label: config.labels.tray_exit.clone(),
        }
    }

    fn spec(&self) -> TrayIconSpec {
        TrayIconSpec {
            image: self.icon.clone(),
            tooltip: self.tooltip.clone(),
            open_label: self.open_label.clone(),
            exit_label: self.exit_label.clone(),
        }
    }
}

/// Status icon of one window
pub struct TrayContext {
    /// Native icon
    pub icon: Box<dyn StatusIcon>,
    /// Animation counter, wraps on overflow
    pub icon_counter: u32,
    /// Whether the icon is blinking
    pub alert: bool,
}

impl std::fmt::Debug for TrayContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrayContext")
            .field("icon_counter", &self.icon_counter)
            .field("alert", &self.alert)
            .finish_non_exhaustive()
    }
}

/// Owner of every status icon
#[derive(Debug)]
pub struct TrayManager {
    assets: TrayAssets,
    trays: HashMap<String, TrayContext>,
}

impl TrayManager {
    /// Create a manager with no icons
    #[must_use]
    pub fn new(assets: TrayAssets) -> Self {
        Self {
            assets,
            trays: HashMap::new(),
        }
    }

    /// Assets used for new icons
    #[must_use]
    pub fn assets(&self) -> &TrayAssets {
        &self.assets
    }

    /// Create the status icon of `window`, replacing any existing one
    pub fn create(
        &mut self,
        platform: &dyn Platform,
        window: &str,
        host: HostHandle,
    ) -> Result<(), PlatformError> {
        self.remove(window);
        let icon = platform.create_status_icon(window, &self.assets.spec(), host)?;
        self.trays.insert(
            window.to_string(),
            TrayContext {
                icon,
                icon_counter: 0,
                alert: false,
            },
        );
        tracing::info!(window = %window, "Status icon created");
        Ok(())
    }

    /// Destroy the status icon of `window`, if any
    pub fn remove(&mut self, window: &str) -> bool {
        match self.trays.remove(window) {
            Some(mut tray) => {
                tray.icon.destroy();
                tracing::debug!(window = %window, "Status icon removed");
                true
            }
            None => false,
        }
    }

    /// Destroy every status icon
    pub fn remove_all(&mut self) {
        for (_, mut tray) in self.trays.drain() {
            tray.icon.destroy();
        }
    }

    /// Start or stop the alert animation of `window`
    ///
    /// Returns `false` when the window has no icon. Stopping restores the
    /// normal image.
    pub fn set_alert(&mut self, window: &str, alert: bool) -> bool {
        let Some(tray) = self.trays.get_mut(window) else {
            return false;
        };
        tray.alert = alert;
        if !alert {
            tray.icon_counter = 0;
            tray.icon.set_image(&self.assets.icon);
        }
        true
    }

    /// Advance the alert animation by one frame
    pub fn tick(&mut self) {
        for tray in self.trays.values_mut().filter(|t| t.alert) {
            tray.icon_counter = tray.icon_counter.wrapping_add(1);
            let frame: &Path = &self.assets.frames[(tray.icon_counter % 2) as usize];
            tray.icon.set_image(frame);
        }
    }

    /// Whether any icon is blinking
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.trays.values().any(|t| t.alert)
    }

    /// Whether `window` has an icon
    #[must_use]
    pub fn contains(&self, window: &str) -> bool {
        self.trays.contains_key(window)
    }

    /// Status icon of `window`
    #[must_use]
    pub fn get(&self, window: &str) -> Option<&TrayContext> {
        self.trays.get(window)
    }

    /// Number of live icons
    #[must_use]
    pub fn len(&self) -> usize {
        self.trays.len()
    }

    /// Whether there are no icons
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trays.is_empty()
    }
}
