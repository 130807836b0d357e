//! Host Conductor Core - Window Control for Embedded Web Surfaces
//!
//! This crate is the host-process side of a desktop application whose UI
//! lives in web surfaces. It owns every window, answers remote calls coming
//! from the surfaces, relays host events to them, guards accidental closes,
//! drives the status icon, and decides when the process ends.
//!
//! It depends on no GUI toolkit. The native layer is reached through the
//! [`Platform`] trait; [`headless::HeadlessPlatform`] implements it in memory
//! for tests and for the socket daemon.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Web Surfaces                              │
//! │   ┌──────────┐    ┌──────────┐    ┌──────────┐                   │
//! │   │  "main"  │    │ "login"  │    │ "main-0" │   ...             │
//! │   └────┬─────┘    └────┬─────┘    └────┬─────┘                   │
//! │        └───────────────┼───────────────┘                         │
//! │                 SurfaceEvent (up)                                │
//! │                 HostMessage (down)                               │
//! └────────────────────────┼─────────────────────────────────────────┘
//!                          │
//! ┌────────────────────────┼─────────────────────────────────────────┐
//! │                 HOST CONDUCTOR CORE                              │
//! │  ┌─────────────────────┴──────────────────────────────────────┐  │
//! │  │                       Conductor                            │  │
//! │  │ ┌──────────┐ ┌────────┐ ┌───────┐ ┌──────┐ ┌────────────┐  │  │
//! │  │ │ Registry │ │ Broker │ │ Relay │ │ Tray │ │    Quit    │  │  │
//! │  │ │ + guards │ │        │ │       │ │      │ │            │  │  │
//! │  │ └──────────┘ └────────┘ └───────┘ └──────┘ └────────────┘  │  │
//! │  └────────────────────────────┬───────────────────────────────┘  │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 │ Platform
//!                      native windows, tray, dialogs
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use host_conductor::{Conductor, HostConfig, headless::HeadlessPlatform};
//!
//! #[tokio::main]
//! async fn main() {
//!     let platform = Arc::new(HeadlessPlatform::new());
//!     let mut conductor = Conductor::new(HostConfig::new("/opt/app"), platform).unwrap();
//!
//!     // Open the first window, then serve until the last one closes
//!     conductor.ready().unwrap();
//!     let reason = conductor.run().await;
//!     println!("exited: {reason:?}");
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`conductor`]: The event loop that owns everything below
//! - [`surface_registry`]: Named windows and their outbound channels
//! - [`broker`]: Remote invocation table and reply delivery
//! - [`operations`]: The built-in operations
//! - [`relay`]: Host event subscriptions
//! - [`close_guard`]: Per-window close confirmation state machine
//! - [`tray`]: Status icons and the alert animation
//! - [`quit`]: Process shutdown
//! - [`platform`]: The native toolkit seam
//! - [`headless`]: In-memory platform
//! - [`config`]: Configuration loading
//! - [`transport`]: Frame codec for out-of-process surfaces

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod broker;
pub mod close_guard;
pub mod conductor;
pub mod config;
pub mod events;
pub mod headless;
pub mod messages;
pub mod operations;
pub mod platform;
pub mod quit;
pub mod relay;
pub mod surface_registry;
pub mod transport;
pub mod tray;

// Re-exports for convenience
pub use broker::{
    Broker, BrokerError, BrokerStats, BrokerStatsSnapshot, BuiltinOperation, Delivery,
    HostOperation, Invocation, InvokeOutcome, Operation, OperationError, OperationTable,
};
pub use close_guard::{CloseDecision, CloseGuard, CloseState, DEFAULT_CONFIRM_WINDOW};
pub use conductor::{Conductor, HostHandle, HostInput};
pub use events::{SignalResponder, SurfaceEvent, TrayAction, Verdict, WindowSignal};
pub use messages::{CallbackId, EventId, HostMessage};
pub use platform::{
    AboutPanel, ConfirmPrompt, NativeWindow, Platform, PlatformError, StatusIcon, TrayIconSpec,
    WindowOptions, WindowOverrides, WindowSpec,
};
pub use quit::{ExitReason, QuitOrchestrator};
pub use relay::{EmitResult, EventRelay, Subscription};
pub use surface_registry::{
    RegistryError, RegistrySummary, SendOutcome, WindowEntry, WindowRegistry, LOGIN_WINDOW,
    MAIN_WINDOW,
};
pub use transport::{ShellFrame, TransportError};
pub use tray::{TrayAssets, TrayContext, TrayManager};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, HostConfig, HostToml,
};
