//! Host Configuration
//!
//! Centralized configuration for the host process, supporting a TOML file at
//! `~/.config/host-conductor/conductor.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! `root_path` has no default. A configuration without it fails
//! [`HostConfig::validate`].
//!
//! # Example Configuration
//!
//! ```toml
//! [app]
//! root_path = "/opt/app/resources"
//! debug = false
//! dev_server_url = "http://localhost:9080"
//!
//! [app.start_window]
//! name = "login"
//! width = 400
//! height = 650
//!
//! [media]
//! image_path = "media/"
//!
//! [labels]
//! title = "Workbench"
//! exit_msg = "Are you sure you want to exit?"
//!
//! [package]
//! name = "workbench"
//! version = "2.1.0"
//! copyright = "Copyright (C) 2019 Workbench"
//!
//! [timing]
//! confirm_window_ms = 3000
//! tray_flash_interval_ms = 500
//!
//! [transport]
//! surface_channel_capacity = 256
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable for the root path
pub const ENV_ROOT: &str = "HOST_CONDUCTOR_ROOT";
/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "HOST_CONDUCTOR_DEBUG";
/// Environment variable for the development server URL
pub const ENV_DEV_URL: &str = "HOST_CONDUCTOR_DEV_URL";
/// Environment variable for the media directory
pub const ENV_IMAGE_PATH: &str = "HOST_CONDUCTOR_IMAGE_PATH";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Configuration Sections
// =============================================================================

/// Media asset locations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory of images, relative to the root path, with trailing slash
    pub image_path: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_path: "media/".to_string(),
        }
    }
}

/// User-visible strings the host itself shows
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Application title, also the status-icon tooltip
    pub title: String,
    /// Affirmative button of the exit dialog
    pub exit_sure: String,
    /// Negative button of the exit dialog
    pub exit_cancel: String,
    /// Question of the exit dialog
    pub exit_msg: String,
    /// "Open" entry of the status-icon menu
    pub tray_open: String,
    /// "Exit" entry of the status-icon menu
    pub tray_exit: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            title: "Host".to_string(),
            exit_sure: "Exit".to_string(),
            exit_cancel: "Cancel".to_string(),
            exit_msg: "Are you sure you want to exit?".to_string(),
            tray_open: "Open".to_string(),
            tray_exit: "Exit".to_string(),
        }
    }
}

/// Package metadata exposed to surfaces
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Copyright line shown in the about panel
    pub copyright: String,
}

impl Default for PackageInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            copyright: String::new(),
        }
    }
}

/// Window created by `openOrCreateWindow` when nothing is open
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartWindow {
    /// Window name
    pub name: String,
    /// Initial width
    pub width: u32,
    /// Initial height
    pub height: u32,
}

impl Default for StartWindow {
    fn default() -> Self {
        Self {
            name: "login".to_string(),
            width: 400,
            height: 650,
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// App section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppToml {
    /// Directory holding `index.html` and the media directory
    pub root_path: Option<PathBuf>,
    /// Debug mode
    pub debug: Option<bool>,
    /// Development server serving the surfaces
    pub dev_server_url: Option<String>,
    /// Start window
    pub start_window: Option<StartWindow>,
}

/// Timing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Close-request debounce window in milliseconds
    pub confirm_window_ms: Option<u64>,
    /// Status-icon alert animation period in milliseconds
    pub tray_flash_interval_ms: Option<u64>,
}

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Per-surface outbound queue capacity
    pub surface_channel_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostToml {
    /// App section
    pub app: AppToml,
    /// Media section
    pub media: Option<MediaConfig>,
    /// Labels section
    pub labels: Option<Labels>,
    /// Package section
    pub package: Option<PackageInfo>,
    /// Timing section
    pub timing: TimingToml,
    /// Transport section
    pub transport: TransportToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the host
///
/// Serializes to the object returned by the `appConfig` operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostConfig {
    /// Directory holding `index.html` and the media directory
    pub root_path: PathBuf,
    /// Media asset locations
    pub media: MediaConfig,
    /// User-visible strings
    pub labels: Labels,
    /// Package metadata
    #[serde(rename = "pkg")]
    pub package: PackageInfo,
    /// Development server serving the surfaces, if any
    pub dev_server_url: Option<String>,
    /// Debug mode
    pub debug: bool,
    /// Close-request debounce window in milliseconds
    pub confirm_window_ms: u64,
    /// Status-icon alert animation period in milliseconds
    pub tray_flash_interval_ms: u64,
    /// Per-surface outbound queue capacity
    pub surface_channel_capacity: usize,
    /// Window created when nothing is open
    pub start_window: StartWindow,

    /// Path to the config file that was loaded (if any)
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,

    #[serde(skip)]
    source: ConfigSource,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::new(),
            media: MediaConfig::default(),
            labels: Labels::default(),
            package: PackageInfo::default(),
            dev_server_url: None,
            debug: false,
            confirm_window_ms: 3000,
            tray_flash_interval_ms: 500,
            surface_channel_capacity: 256,
            start_window: StartWindow::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl HostConfig {
    /// Default configuration rooted at `root_path`
    #[must_use]
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Directory holding the status-icon images
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.root_path.join(&self.media.image_path)
    }

    /// Close-request debounce window
    #[must_use]
    pub fn confirm_window(&self) -> Duration {
        Duration::from_millis(self.confirm_window_ms)
    }

    /// Status-icon alert animation period
    #[must_use]
    pub fn tray_flash_interval(&self) -> Duration {
        Duration::from_millis(self.tray_flash_interval_ms)
    }

    /// Check values that have no usable default
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a missing root path or zero-sized
    /// queue and interval settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "root_path must be set".to_string(),
            ));
        }
        if self.surface_channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "surface_channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.tray_flash_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tray_flash_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/host-conductor/conductor.toml` or
/// `~/.config/host-conductor/conductor.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("host-conductor").join("conductor.toml"))
}

/// Load configuration from the default file and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<HostConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<HostConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration from a specific path, reading variables through `env`
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<HostConfig, ConfigError> {
    let mut config = HostConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: HostToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn apply_toml_config(config: &mut HostConfig, toml: HostToml) {
    if let Some(root) = toml.app.root_path {
        config.root_path = root;
    }
    if let Some(debug) = toml.app.debug {
        config.debug = debug;
    }
    if toml.app.dev_server_url.is_some() {
        config.dev_server_url = toml.app.dev_server_url;
    }
    if let Some(start) = toml.app.start_window {
        config.start_window = start;
    }
    if let Some(media) = toml.media {
        config.media = media;
    }
    if let Some(labels) = toml.labels {
        config.labels = labels;
    }
    if let Some(package) = toml.package {
        config.package = package;
    }
    if let Some(ms) = toml.timing.confirm_window_ms {
        config.confirm_window_ms = ms;
    }
    if let Some(ms) = toml.timing.tray_flash_interval_ms {
        config.tray_flash_interval_ms = ms;
    }
    if let Some(capacity) = toml.transport.surface_channel_capacity {
        config.surface_channel_capacity = capacity;
    }
}

fn apply_env_config(config: &mut HostConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(root) = env(ENV_ROOT) {
        config.root_path = PathBuf::from(root);
        config.source = ConfigSource::Env;
    }
    if let Some(debug) = env(ENV_DEBUG) {
        config.debug = debug != "0" && debug.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(url) = env(ENV_DEV_URL) {
        config.dev_server_url = Some(url).filter(|u| !u.is_empty());
        config.source = ConfigSource::Env;
    }
    if let Some(path) = env(ENV_IMAGE_PATH) {
        config.media.image_path = path;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Root path override
    pub root_path: Option<PathBuf>,

    /// Debug mode override
    pub debug: Option<bool>,

    /// Development server override
    pub dev_server_url: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set root path override
    #[must_use]
    pub fn with_root_path(mut self, path: PathBuf) -> Self {
        self.root_path = Some(path);
        self
    }

    /// Set debug override
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set development server override
    #[must_use]
    pub fn with_dev_server_url(mut self, url: String) -> Self {
        self.dev_server_url = Some(url);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut HostConfig) {
        if self.root_path.is_some() || self.debug.is_some() || self.dev_server_url.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref root) = self.root_path {
            config.root_path = root.clone();
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(ref url) = self.dev_server_url {
            config.dev_server_url = Some(url.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
