//! Conductor - The Host Core
//!
//! The Conductor is the single owner of all host-side state. It orchestrates:
//! - Window creation, focus and closing through the native platform
//! - Remote invocations from surfaces and their replies
//! - Host event subscriptions and unicast between surfaces
//! - Close confirmation, status icons and process shutdown
//!
//! # Design Philosophy
//!
//! The Conductor is toolkit-agnostic. It doesn't know whether windows are
//! native, attached over a socket, or simulated in a test. It communicates
//! through:
//! - `HostInput`: everything arriving from surfaces and the native layer
//! - `HostMessage`: messages sent to one surface's outbound channel
//!
//! # Architecture
//!
//! ```text
//!   surfaces ─┐                                   ┌─► surface "main"
//!   native  ──┼─► HostHandle ─► inbox ─► Conductor ┼─► surface "login"
//!   tray    ──┘   (unbounded)     one input/turn  └─► surface "main-0"
//! ```
//!
//! All components are plain values owned by the Conductor and touched from
//! one task only. Work that has to wait (confirmation dialogs, deferred
//! operations) runs on spawned tasks and reports back through the inbox or
//! straight to a surface's outbound channel.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use url::Url;

use crate::broker::{
    Broker, BuiltinOperation, BrokerStats, InvokeOutcome, Operation, OperationTable,
};
use crate::close_guard::{CloseDecision, CloseGuard};
use crate::config::{ConfigError, HostConfig};
use crate::events::{SignalResponder, SurfaceEvent, TrayAction, Verdict, WindowSignal};
use crate::messages::{CallbackId, HostMessage};
use crate::platform::{
    AboutPanel, ConfirmPrompt, Platform, PlatformError, WindowOptions, WindowOverrides, WindowSpec,
};
use crate::quit::{ExitReason, QuitOrchestrator};
use crate::relay::{EmitResult, EventRelay};
use crate::surface_registry::{
    RegistryError, SendOutcome, WindowEntry, WindowRegistry, LOGIN_WINDOW, MAIN_WINDOW,
};
use crate::tray::{TrayAssets, TrayManager};

/// Default width of application windows
pub const APP_WINDOW_WIDTH: u32 = 900;
/// Default height of application windows
pub const APP_WINDOW_HEIGHT: u32 = 650;
/// Minimum width of application windows
pub const APP_WINDOW_MIN_WIDTH: u32 = 400;
/// Minimum height of application windows
pub const APP_WINDOW_MIN_HEIGHT: u32 = 650;

/// Page loaded into surfaces without an explicit URL
pub const INDEX_PAGE: &str = "index.html";
/// Fragment selecting the login page
pub const LOGIN_FRAGMENT: &str = "login-page";

/// Question shown when a debug window's content crashes
pub const CRASH_MESSAGE: &str = "The renderer process has been crashed, you can reload or close it.";

/// Everything the Conductor reacts to
#[derive(Debug)]
pub enum HostInput {
    /// A surface sent an event
    Surface {
        /// Window hosting the surface
        window: String,
        /// The event
        event: SurfaceEvent,
    },

    /// A native window raised a signal
    Window {
        /// Window name
        window: String,
        /// The signal
        signal: WindowSignal,
        /// Receives the verdict for preventable signals
        respond: Option<SignalResponder>,
    },

    /// The user interacted with a status icon
    Tray {
        /// Window the icon belongs to
        window: String,
        /// The interaction
        action: TrayAction,
    },

    /// The user answered a close-confirmation dialog
    CloseConfirmed {
        /// Window the dialog belonged to
        window: String,
        /// Whether the user chose to exit
        accepted: bool,
    },

    /// The user answered the crash dialog of a debug window
    CrashAnswered {
        /// Window whose content crashed
        window: String,
        /// Whether the user chose to reload
        reload: bool,
    },

    /// The application was re-activated (dock click, second launch)
    Activate,

    /// The process was asked to terminate
    Shutdown,
}

/// Cloneable sender into the Conductor's inbox
///
/// Sends never block and never fail while the Conductor is alive.
#[derive(Clone, Debug)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostInput>,
}

impl HostHandle {
    /// Create a handle and the inbox it feeds
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostInput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an input; `false` if the Conductor is gone
    pub fn send(&self, input: HostInput) -> bool {
        self.tx.send(input).is_ok()
    }

    /// Queue a surface event
    pub fn surface_event(&self, window: impl Into<String>, event: SurfaceEvent) -> bool {
        self.send(HostInput::Surface {
            window: window.into(),
            event,
        })
    }

    /// Queue a native window signal
    pub fn window_signal(
        &self,
        window: impl Into<String>,
        signal: WindowSignal,
        respond: Option<SignalResponder>,
    ) -> bool {
        self.send(HostInput::Window {
            window: window.into(),
            signal,
            respond,
        })
    }

    /// Queue a status-icon interaction
    pub fn tray_action(&self, window: impl Into<String>, action: TrayAction) -> bool {
        self.send(HostInput::Tray {
            window: window.into(),
            action,
        })
    }

    /// Queue an application re-activation
    pub fn activate(&self) -> bool {
        self.send(HostInput::Activate)
    }

    /// Queue a termination request
    pub fn shutdown(&self) -> bool {
        self.send(HostInput::Shutdown)
    }

    /// Whether the Conductor has gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// A handle whose inbox is already gone
    fn detached() -> Self {
        let (handle, _inbox) = Self::channel();
        handle
    }
}

/// The Conductor - owner of every window, subscription and status icon
pub struct Conductor<P: Platform> {
    /// Configuration
    config: HostConfig,
    /// Native layer
    platform: Arc<P>,
    /// Open windows
    registry: WindowRegistry,
    /// Remote invocation broker
    broker: Broker,
    /// Host event bus
    relay: EventRelay,
    /// Status icons
    trays: TrayManager,
    /// Shutdown state
    quit: QuitOrchestrator,
    /// Own sender, held until `run` starts
    host: Option<HostHandle>,
    /// Reaches the inbox while anyone else still holds a sender
    weak_host: mpsc::WeakUnboundedSender<HostInput>,
    /// Inputs waiting to be processed
    inbox: mpsc::UnboundedReceiver<HostInput>,
}

impl<P: Platform> std::fmt::Debug for Conductor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor")
            .field("registry", &self.registry)
            .field("relay", &self.relay)
            .field("trays", &self.trays)
            .field("quit", &self.quit)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> Conductor<P> {
    /// Create a Conductor with the built-in operations
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the configuration has no root path.
    pub fn new(config: HostConfig, platform: Arc<P>) -> Result<Self, ConfigError> {
        Self::with_operations(config, platform, OperationTable::with_builtins())
    }

    /// Create a Conductor with a custom operation table
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the configuration has no root path.
    pub fn with_operations(
        config: HostConfig,
        platform: Arc<P>,
        operations: OperationTable,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (host, inbox) = HostHandle::channel();
        let weak_host = host.tx.downgrade();
        let trays = TrayManager::new(TrayAssets::from_config(&config));

        tracing::info!(
            root = %config.root_path.display(),
            debug = config.debug,
            operations = operations.names().len(),
            "Conductor created"
        );

        Ok(Self {
            config,
            platform,
            registry: WindowRegistry::new(),
            broker: Broker::new(operations),
            relay: EventRelay::new(),
            trays,
            quit: QuitOrchestrator::new(),
            host: Some(host),
            weak_host,
            inbox,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Handle for feeding inputs into this Conductor
    #[must_use]
    pub fn handle(&self) -> HostHandle {
        self.host
            .clone()
            .or_else(|| self.weak_host.upgrade().map(|tx| HostHandle { tx }))
            .unwrap_or_else(HostHandle::detached)
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Native platform
    #[must_use]
    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Open windows
    #[must_use]
    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    /// Host event bus
    #[must_use]
    pub fn relay(&self) -> &EventRelay {
        &self.relay
    }

    /// Status icons
    #[must_use]
    pub fn trays(&self) -> &TrayManager {
        &self.trays
    }

    /// Broker counters
    #[must_use]
    pub fn broker_stats(&self) -> BrokerStats {
        self.broker.stats()
    }

    /// Whether shutdown has started
    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.quit.is_quitting()
    }

    /// Why shutdown started, if it did
    #[must_use]
    pub fn exit_reason(&self) -> Option<&ExitReason> {
        self.quit.exit_reason()
    }

    // =========================================================================
    // Event Loop
    // =========================================================================

    /// Open the first window and fill the about panel
    ///
    /// # Errors
    ///
    /// Returns an error if the start window cannot be created.
    pub fn ready(&mut self) -> Result<(), RegistryError> {
        self.open_or_create_window()?;
        self.platform.set_about_panel(&self.about_panel());
        Ok(())
    }

    /// About panel contents derived from the configuration
    #[must_use]
    pub fn about_panel(&self) -> AboutPanel {
        AboutPanel {
            application_name: self.config.labels.title.clone(),
            application_version: self.config.package.version.clone(),
            copyright: self.config.package.copyright.clone(),
            version: if self.config.debug {
                "[debug]".to_string()
            } else {
                String::new()
            },
        }
    }

    /// Process inputs until shutdown
    ///
    /// Also drives the status-icon alert animation. The Conductor drops its
    /// own sender here, so the loop ends with `ExitReason::Disconnected`
    /// once no handle, window or pending dialog can reach it any more.
    pub async fn run(mut self) -> ExitReason {
        self.host = None;
        let mut flash = tokio::time::interval(self.config.tray_flash_interval());
        flash.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.quit.is_quitting() {
            tokio::select! {
                input = self.inbox.recv() => match input {
                    Some(input) => self.dispatch(input),
                    None => {
                        self.quit(ExitReason::Disconnected);
                    }
                },
                _ = flash.tick(), if self.trays.is_animating() => self.trays.tick(),
            }
        }

        let reason = self
            .quit
            .exit_reason()
            .cloned()
            .unwrap_or(ExitReason::Disconnected);
        tracing::info!(reason = ?reason, "Conductor stopped");
        reason
    }

    /// Wait for one input and process it
    ///
    /// Returns `false` once shutdown has started.
    pub async fn step(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(input) => {
                self.dispatch(input);
                !self.quit.is_quitting()
            }
            None => false,
        }
    }

    /// Process every input already queued, without waiting
    ///
    /// Inputs queued while draining are processed too. Returns how many
    /// inputs were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(input) = self.inbox.try_recv() {
            self.dispatch(input);
            handled += 1;
        }
        handled
    }

    /// Process one input
    pub fn dispatch(&mut self, input: HostInput) {
        match input {
            HostInput::Surface { window, event } => self.handle_surface_event(&window, event),
            HostInput::Window {
                window,
                signal,
                respond,
            } => {
                let kind = signal.kind();
                let verdict = self.handle_window_signal(&window, signal);
                tracing::trace!(window = %window, signal = kind, verdict = ?verdict, "Window signal handled");
                if let Some(respond) = respond {
                    respond.respond(verdict);
                }
            }
            HostInput::Tray { window, action } => self.handle_tray_action(&window, action),
            HostInput::CloseConfirmed { window, accepted } => {
                self.handle_close_confirmed(&window, accepted);
            }
            HostInput::CrashAnswered { window, reload } => {
                if let Some(entry) = self.registry.get_mut(&window) {
                    if reload {
                        entry.handle.reload();
                    } else {
                        entry.handle.close();
                    }
                }
            }
            HostInput::Activate => {
                if let Err(e) = self.open_or_create_window() {
                    tracing::warn!(error = %e, "Failed to re-open a window on activation");
                }
            }
            HostInput::Shutdown => {
                self.quit(ExitReason::Signal);
            }
        }
    }

    // =========================================================================
    // Surface Events
    // =========================================================================

    fn handle_surface_event(&mut self, window: &str, event: SurfaceEvent) {
        if self.quit.is_quitting() {
            tracing::debug!(window = %window, kind = event.kind(), "Ignoring surface event during shutdown");
            return;
        }

        match event {
            SurfaceEvent::AppQuit => {
                self.quit(ExitReason::Requested);
            }
            SurfaceEvent::RemoteInvoke {
                method,
                callback_id,
                args,
            } => {
                self.invoke(window, &method, callback_id, args);
            }
            SurfaceEvent::RemoteSend {
                target,
                event_name,
                args,
            } => {
                let outcome = self
                    .registry
                    .send_to(&target, HostMessage::Forward { event_name, args });
                if outcome == SendOutcome::UnknownWindow {
                    tracing::debug!(from = %window, target = %target, "Dropped message to unknown window");
                }
            }
            SurfaceEvent::RemoteOn {
                event_id,
                event_name,
            } => match self.registry.outbound(window) {
                Some(outbound) => self.relay.subscribe(window, outbound, event_id, &event_name),
                None => {
                    tracing::warn!(window = %window, event_name = %event_name, "Subscription from unknown window");
                }
            },
            SurfaceEvent::RemoteOff { event_id } => {
                self.relay.unsubscribe(window, &event_id);
            }
            SurfaceEvent::RemoteEmit { event_id, args } => {
                self.emit_event(event_id.as_str(), &args);
            }
            SurfaceEvent::AppReady { window_name } => {
                tracing::info!(window = %window, tray = ?window_name, "Surface ready");
                if let Some(name) = window_name {
                    if let Err(e) = self.create_tray_icon(Some(&name)) {
                        tracing::warn!(window = %name, error = %e, "Failed to create status icon");
                    }
                }
            }
        }
    }

    /// Run a remote invocation on behalf of `window`
    ///
    /// The reply, if any, goes to `window`'s surface tagged with
    /// `callback_id`.
    pub fn invoke(
        &mut self,
        window: &str,
        method: &str,
        callback_id: CallbackId,
        args: Vec<Value>,
    ) -> InvokeOutcome {
        let Some(outbound) = self.registry.outbound(window) else {
            tracing::warn!(window = %window, method = %method, "Remote call from unknown window");
            return InvokeOutcome::Rejected;
        };

        let operation = match self.broker.resolve(window, method) {
            Ok(op) => op,
            Err(_) => return InvokeOutcome::Unknown,
        };

        tracing::debug!(window = %window, method = %method, callback_id = %callback_id, "Accepted remote call");

        let result = match operation {
            Operation::Builtin(BuiltinOperation::Quit) => {
                self.quit(ExitReason::Requested);
                return InvokeOutcome::Suppressed;
            }
            Operation::Builtin(op) => self.run_builtin(op, &args),
            Operation::Custom(op) => op.invoke(args),
        };

        self.broker
            .deliver(window, method, callback_id, &outbound, result)
    }

    /// Publish `args` on the host event bus under `event_name`
    pub fn emit_event(&mut self, event_name: &str, args: &[Value]) -> EmitResult {
        let result = self.relay.emit(event_name, args);
        tracing::debug!(
            event_name = %event_name,
            delivered = result.delivered,
            pruned = result.pruned,
            "Host event emitted"
        );
        result
    }

    // =========================================================================
    // Native Signals
    // =========================================================================

    fn handle_window_signal(&mut self, window: &str, signal: WindowSignal) -> Verdict {
        match signal {
            WindowSignal::CloseRequested => self.on_close_requested(window),
            WindowSignal::Closed => {
                self.on_closed(window);
                Verdict::Allow
            }
            WindowSignal::Crashed => {
                self.on_crashed(window);
                Verdict::Allow
            }
            WindowSignal::LoadFinished => {
                if let Some(entry) = self.registry.get_mut(window) {
                    if entry.options.show_after_load {
                        entry.handle.show();
                        entry.handle.focus();
                    }
                }
                Verdict::Allow
            }
            WindowSignal::WillNavigate { url } => {
                let current = self.registry.get(window).and_then(|e| e.url.as_deref());
                if same_origin(current, &url) {
                    Verdict::Allow
                } else {
                    tracing::debug!(window = %window, url = %url, "Blocked navigation");
                    Verdict::Prevent
                }
            }
            WindowSignal::NewWindow { url } => {
                self.registry.send_to(window, HostMessage::OpenUrl { url });
                Verdict::Prevent
            }
        }
    }

    fn on_close_requested(&mut self, window: &str) -> Verdict {
        if self.quit.is_quitting() {
            return Verdict::Allow;
        }

        let forced = self.registry.is_marked_for_close(window);
        let Some(entry) = self.registry.get_mut(window) else {
            return Verdict::Allow;
        };
        let Some(guard) = entry.close_guard.as_mut() else {
            return Verdict::Allow;
        };

        let decision = guard.on_close_requested(forced, Instant::now());
        tracing::debug!(window = %window, decision = ?decision, "Close requested");

        match decision {
            CloseDecision::Proceed => Verdict::Allow,
            CloseDecision::NotifyPendingQuit => {
                entry.send(HostMessage::AppQuit { reason: None });
                Verdict::Prevent
            }
            CloseDecision::Confirm => {
                let prompt = ConfirmPrompt {
                    message: self.config.labels.exit_msg.clone(),
                    confirm_label: self.config.labels.exit_sure.clone(),
                    cancel_label: self.config.labels.exit_cancel.clone(),
                };
                self.spawn_dialog(window, prompt, |window, accepted| {
                    HostInput::CloseConfirmed { window, accepted }
                });
                Verdict::Prevent
            }
            CloseDecision::AwaitingConfirmation => Verdict::Prevent,
        }
    }

    /// Show `prompt` on a spawned task; the answer re-enters as `answer(..)`
    fn spawn_dialog(&self, window: &str, prompt: ConfirmPrompt, answer: fn(String, bool) -> HostInput) {
        let platform = Arc::clone(&self.platform);
        let host = self.handle();
        let window = window.to_string();
        let span = tracing::info_span!("dialog", window = %window);

        tokio::spawn(
            async move {
                let accepted = platform.confirm(&window, &prompt).await;
                tracing::debug!(accepted, "Dialog answered");
                host.send(answer(window, accepted));
            }
            .instrument(span),
        );
    }

    fn on_crashed(&mut self, window: &str) {
        let Some(entry) = self.registry.get(window) else {
            return;
        };
        tracing::error!(window = %window, debug = entry.options.debug, "Surface content crashed");
        if !entry.options.debug {
            return;
        }

        let prompt = ConfirmPrompt {
            message: CRASH_MESSAGE.to_string(),
            confirm_label: "Reload".to_string(),
            cancel_label: "Close".to_string(),
        };
        self.spawn_dialog(window, prompt, |window, reload| HostInput::CrashAnswered {
            window,
            reload,
        });
    }

    fn handle_close_confirmed(&mut self, window: &str, accepted: bool) {
        let confirmed = self
            .registry
            .get_mut(window)
            .and_then(|e| e.close_guard.as_mut())
            .is_some_and(|g| g.on_confirmation(accepted));
        if confirmed {
            self.close_window(window);
        }
    }

    fn on_closed(&mut self, window: &str) {
        if let Some(mut entry) = self.registry.remove(window) {
            if let Some(guard) = entry.close_guard.as_mut() {
                guard.on_closed();
            }
        }
        self.relay.remove_window(window);
        self.trays.remove(window);
        self.try_quit_on_all_windows_closed();
    }

    // =========================================================================
    // Status Icons
    // =========================================================================

    fn handle_tray_action(&mut self, window: &str, action: TrayAction) {
        tracing::debug!(window = %window, action = ?action, "Status icon action");
        match action {
            TrayAction::Open => {
                self.show_and_focus_window(None);
            }
            TrayAction::Click => {
                self.show_and_focus_window(Some(window));
            }
            TrayAction::Exit => {
                self.registry.send_to(
                    window,
                    HostMessage::AppQuit {
                        reason: Some("quit".to_string()),
                    },
                );
            }
        }
    }

    /// Create the status icon of `name` (default `main`)
    ///
    /// # Errors
    ///
    /// Returns an error if the native icon cannot be created.
    pub fn create_tray_icon(&mut self, name: Option<&str>) -> Result<(), PlatformError> {
        let name = name.unwrap_or(MAIN_WINDOW);
        self.trays.create(&*self.platform, name, self.handle())
    }

    /// Remove the status icon of `name`
    pub fn remove_tray_icon(&mut self, name: &str) -> bool {
        self.trays.remove(name)
    }

    /// Start or stop the alert animation of `name`'s status icon
    pub fn set_tray_alert(&mut self, name: &str, alert: bool) -> bool {
        self.trays.set_alert(name, alert)
    }

    // =========================================================================
    // Windows
    // =========================================================================

    /// Create a plain window
    ///
    /// Plain windows close without confirmation.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if a window with the name is open, or the platform
    /// error if the native window cannot be created.
    pub fn create_window(&mut self, options: WindowOptions) -> Result<String, RegistryError> {
        self.open_window(options, None)
    }

    /// Create an application window with the close-confirmation flow
    ///
    /// `overrides` are applied over the application defaults. The name is
    /// taken from `overrides`, then `name`, then allocated.
    ///
    /// # Errors
    ///
    /// Same as [`create_window`](Self::create_window).
    pub fn create_app_window(
        &mut self,
        overrides: WindowOverrides,
        name: Option<&str>,
    ) -> Result<String, RegistryError> {
        let requested = overrides.name.clone().or_else(|| name.map(str::to_string));
        let name = self.registry.allocate_name(requested.as_deref());

        let debug = self.config.debug;
        let base = WindowOptions {
            name: Some(name.clone()),
            width: APP_WINDOW_WIDTH,
            height: APP_WINDOW_HEIGHT,
            min_width: APP_WINDOW_MIN_WIDTH,
            min_height: APP_WINDOW_MIN_HEIGHT,
            url: self.app_url(&name),
            resizable: debug,
            debug,
            ..WindowOptions::default()
        };
        let mut options = overrides.apply(base);
        options.name = Some(name);

        let guard = CloseGuard::new(self.config.confirm_window());
        let name = self.open_window(options, Some(guard))?;
        self.registry.designate_main(&name);
        Ok(name)
    }

    fn open_window(
        &mut self,
        mut options: WindowOptions,
        close_guard: Option<CloseGuard>,
    ) -> Result<String, RegistryError> {
        let name = self.registry.allocate_name(options.name.as_deref());
        self.registry.ensure_available(&name)?;
        options.name = Some(name.clone());

        let spec = WindowSpec {
            url: Some(self.resolve_url(&name, &options)),
            name: name.clone(),
            options,
        };
        let (tx, rx) = mpsc::channel(self.config.surface_channel_capacity);
        let handle = self.platform.open_window(&spec, rx, self.handle())?;

        let entry = WindowEntry::new(name.clone(), handle, spec.options, spec.url, tx, close_guard);
        self.registry.insert(entry)?;
        Ok(name)
    }

    fn app_url(&self, name: &str) -> Option<String> {
        let dev = self.config.dev_server_url.as_deref();
        match (name, dev) {
            (MAIN_WINDOW, Some(dev)) => Some(dev.to_string()),
            (MAIN_WINDOW, None) => Some(INDEX_PAGE.to_string()),
            (LOGIN_WINDOW, Some(dev)) => {
                Some(format!("{}/#{LOGIN_FRAGMENT}", dev.trim_end_matches('/')))
            }
            (LOGIN_WINDOW, None) => Some(format!("{INDEX_PAGE}#{LOGIN_FRAGMENT}")),
            _ => None,
        }
    }

    /// URL loaded into the surface of a window
    ///
    /// Relative URLs resolve against the root path. Debug mode adds the
    /// `react_perf` query flag. The hash route (default `/<name>`, empty to
    /// disable) is appended when the URL has no fragment.
    #[must_use]
    pub fn resolve_url(&self, name: &str, options: &WindowOptions) -> String {
        let raw = options.url.as_deref().unwrap_or(INDEX_PAGE);
        let absolute = if ["file://", "http://", "https://"]
            .iter()
            .any(|scheme| raw.starts_with(scheme))
        {
            raw.to_string()
        } else {
            let root = self.config.root_path.to_string_lossy();
            format!("file://{}/{}", root.trim_end_matches('/'), raw)
        };

        let (mut base, fragment) = match absolute.split_once('#') {
            Some((base, fragment)) => (base.to_string(), Some(fragment.to_string())),
            None => (absolute, None),
        };

        if self.config.debug {
            base.push(if base.contains('?') { '&' } else { '?' });
            base.push_str("react_perf");
        }

        let fragment = fragment.or_else(|| {
            let route = options
                .hash_route
                .clone()
                .unwrap_or_else(|| format!("/{name}"));
            (!route.is_empty()).then_some(route)
        });

        match fragment {
            Some(fragment) => format!("{base}#{fragment}"),
            None => base,
        }
    }

    /// Force-close a window, skipping confirmation
    ///
    /// The window stays marked for forced close, also for later windows that
    /// reuse its name. Returns `false` if no such window is open.
    pub fn close_window(&mut self, name: &str) -> bool {
        if !self.registry.contains(name) {
            return false;
        }
        self.registry.mark_for_close(name);
        if let Some(entry) = self.registry.get_mut(name) {
            tracing::info!(window = %name, "Closing window");
            entry.handle.close();
        }
        true
    }

    /// Restore or show a window, then focus it (default `main`)
    pub fn show_and_focus_window(&mut self, name: Option<&str>) -> bool {
        let name = name.unwrap_or(MAIN_WINDOW);
        match self.registry.get_mut(name) {
            Some(entry) => {
                entry.show_and_focus();
                true
            }
            None => false,
        }
    }

    /// Bring up a window
    ///
    /// With nothing open, creates the configured start window and returns its
    /// name. Otherwise shows and focuses the current focus window if it is
    /// hidden.
    ///
    /// # Errors
    ///
    /// Returns an error if the start window cannot be created.
    pub fn open_or_create_window(&mut self) -> Result<Option<String>, RegistryError> {
        let current = self.registry.current_focus_window().map(str::to_string);
        match current {
            None => {
                let start = self.config.start_window.clone();
                let overrides = WindowOverrides {
                    width: Some(start.width),
                    height: Some(start.height),
                    min_width: Some(start.width),
                    min_height: Some(start.height),
                    ..WindowOverrides::default()
                };
                self.create_app_window(overrides, Some(&start.name)).map(Some)
            }
            Some(name) => {
                if let Some(entry) = self.registry.get_mut(&name) {
                    if !entry.handle.is_visible() {
                        entry.handle.show();
                        entry.handle.focus();
                    }
                }
                Ok(None)
            }
        }
    }

    /// Window that focus-related actions target
    #[must_use]
    pub fn current_focus_window(&self) -> Option<String> {
        self.registry.current_focus_window().map(str::to_string)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Quit if no open window is left that is not marked for forced close
    pub fn try_quit_on_all_windows_closed(&mut self) -> bool {
        let should_quit = QuitOrchestrator::should_quit(&self.registry);
        tracing::debug!(should_quit, open = self.registry.count(), "Checking for last window");
        if should_quit {
            self.quit(ExitReason::AllWindowsClosed);
        }
        should_quit
    }

    /// Shut down the host; later calls are no-ops
    pub fn quit(&mut self, reason: ExitReason) -> bool {
        let performed = self.quit.quit(&*self.platform, reason);
        if performed {
            self.trays.remove_all();
        }
        performed
    }
}

/// Whether `target` has the same (non-opaque) origin as `current`
fn same_origin(current: Option<&str>, target: &str) -> bool {
    let Some(current) = current.and_then(|c| Url::parse(c).ok()) else {
        return false;
    };
    let Ok(target) = Url::parse(target) else {
        return false;
    };
    let origin = current.origin();
    origin.is_tuple() && origin == target.origin()
}
