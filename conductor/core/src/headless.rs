//! Headless Platform
//!
//! A [`Platform`] with no GUI toolkit behind it. Windows, status icons and
//! dialogs are plain records in shared state, so the host can run as a
//! daemon (surfaces attach over a socket) and tests can drive and observe
//! every native interaction.
//!
//! # Behavior
//!
//! - `close()` on a window raises `CloseRequested`; when the host allows it
//!   the window is destroyed and `Closed` follows, like a real toolkit
//! - Confirmation dialogs answer from a script first, then from whoever
//!   routes the window's prompts (an attached shell); with neither they decline
//! - Shortcut release can be made to fail to exercise the quit path

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::conductor::HostHandle;
use crate::events::{SignalResponder, Verdict, WindowSignal};
use crate::messages::HostMessage;
use crate::platform::{
    AboutPanel, ConfirmPrompt, NativeWindow, Platform, PlatformError, StatusIcon, TrayIconSpec, WindowSpec,
};

/// Observable state of one headless window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Window name
    pub name: String,
    /// Loaded URL
    pub url: Option<String>,
    /// Whether the window is shown
    pub visible: bool,
    /// Whether the window has focus
    pub focused: bool,
    /// Whether the window is minimized
    pub minimized: bool,
    /// Whether the window was destroyed
    pub destroyed: bool,
    /// How many times the host called `close()`
    pub close_calls: usize,
    /// How many times the content was reloaded
    pub reloads: usize,
}

struct WindowRecord {
    snapshot: WindowSnapshot,
    outbound: Option<mpsc::Receiver<HostMessage>>,
    host: HostHandle,
}

#[derive(Debug)]
struct IconRecord {
    window: String,
    spec: TrayIconSpec,
    images: Vec<PathBuf>,
    destroyed: bool,
}

#[derive(Default)]
struct HeadlessState {
    windows: HashMap<String, WindowRecord>,
    icons: Vec<IconRecord>,
    confirm_answers: VecDeque<bool>,
    prompts: Vec<(String, ConfirmPrompt)>,
    prompt_routes: HashMap<String, mpsc::UnboundedSender<ConfirmPrompt>>,
    pending_answers: HashMap<String, oneshot::Sender<bool>>,
    fail_windows: Vec<String>,
    shortcut_releases: usize,
    fail_shortcuts: bool,
    exit_calls: usize,
    about: Option<AboutPanel>,
}

impl HeadlessState {
    fn focus_only(&mut self, name: &str) {
        for (key, record) in &mut self.windows {
            record.snapshot.focused = key == name && !record.snapshot.destroyed;
        }
    }
}

/// In-memory native layer
#[derive(Clone, Default)]
pub struct HeadlessPlatform {
    state: Arc<Mutex<HeadlessState>>,
}

impl std::fmt::Debug for HeadlessPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeadlessPlatform")
            .field("windows", &state.windows.len())
            .field("icons", &state.icons.len())
            .field("exit_calls", &state.exit_calls)
            .finish()
    }
}

impl HeadlessPlatform {
    /// Create an empty platform
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Native-side actions
    // =========================================================================

    /// Take the surface end of a window's outbound channel
    ///
    /// Returns `None` if the window is unknown or its receiver was taken.
    pub fn take_outbound(&self, name: &str) -> Option<mpsc::Receiver<HostMessage>> {
        self.state
            .lock()
            .windows
            .get_mut(name)
            .and_then(|r| r.outbound.take())
    }

    /// Host handle the window was created with
    #[must_use]
    pub fn host_for(&self, name: &str) -> Option<HostHandle> {
        self.state.lock().windows.get(name).map(|r| r.host.clone())
    }

    /// Simulate the user closing a window
    ///
    /// Returns `false` if the window is unknown or already destroyed.
    pub fn request_close(&self, name: &str) -> bool {
        let host = {
            let state = self.state.lock();
            match state.windows.get(name) {
                Some(r) if !r.snapshot.destroyed => r.host.clone(),
                _ => return false,
            }
        };
        send_close_request(&self.state, &host, name);
        true
    }

    /// Simulate the native window dying without a close request
    ///
    /// Returns `false` if the window is unknown or already destroyed.
    pub fn destroy(&self, name: &str) -> bool {
        let host = {
            let mut state = self.state.lock();
            match state.windows.get_mut(name) {
                Some(r) if !r.snapshot.destroyed => {
                    r.snapshot.destroyed = true;
                    r.snapshot.visible = false;
                    r.snapshot.focused = false;
                    r.host.clone()
                }
                _ => return false,
            }
        };
        host.window_signal(name, WindowSignal::Closed, None)
    }

    /// Simulate the surface content finishing its load
    pub fn finish_load(&self, name: &str) -> bool {
        let Some(host) = self.host_for(name) else {
            return false;
        };
        host.window_signal(name, WindowSignal::LoadFinished, None)
    }

    /// Simulate the surface content crashing
    pub fn crash(&self, name: &str) -> bool {
        let Some(host) = self.host_for(name) else {
            return false;
        };
        host.window_signal(name, WindowSignal::Crashed, None)
    }

    /// Simulate the user minimizing a window
    pub fn minimize(&self, name: &str) {
        if let Some(record) = self.state.lock().windows.get_mut(name) {
            record.snapshot.minimized = true;
            record.snapshot.focused = false;
        }
    }

    /// Simulate the user hiding a window
    pub fn hide(&self, name: &str) {
        if let Some(record) = self.state.lock().windows.get_mut(name) {
            record.snapshot.visible = false;
            record.snapshot.focused = false;
        }
    }

    /// Simulate the user focusing a window
    pub fn focus(&self, name: &str) {
        self.state.lock().focus_only(name);
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Queue the answer to the next confirmation dialog
    pub fn script_confirm(&self, accepted: bool) {
        self.state.lock().confirm_answers.push_back(accepted);
    }

    /// Deliver confirmation dialogs of `window` to the returned receiver
    ///
    /// Each dialog stays open until [`answer_prompt`](Self::answer_prompt)
    /// or [`release_prompts`](Self::release_prompts). Routing again replaces
    /// the previous receiver.
    pub fn route_prompts(&self, window: &str) -> mpsc::UnboundedReceiver<ConfirmPrompt> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().prompt_routes.insert(window.to_string(), tx);
        rx
    }

    /// Answer the open confirmation dialog of `window`
    ///
    /// Returns `false` if no dialog is waiting.
    pub fn answer_prompt(&self, window: &str, accepted: bool) -> bool {
        let pending = self.state.lock().pending_answers.remove(window);
        pending.is_some_and(|tx| tx.send(accepted).is_ok())
    }

    /// Stop routing dialogs of `window`; an open dialog is declined
    pub fn release_prompts(&self, window: &str) {
        let mut state = self.state.lock();
        state.prompt_routes.remove(window);
        state.pending_answers.remove(window);
    }

    /// Make the next creation of `name` fail
    pub fn fail_next_window(&self, name: &str) {
        self.state.lock().fail_windows.push(name.to_string());
    }

    /// Make shortcut release fail
    pub fn fail_shortcut_release(&self, fail: bool) {
        self.state.lock().fail_shortcuts = fail;
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// State of a window
    #[must_use]
    pub fn window(&self, name: &str) -> Option<WindowSnapshot> {
        self.state
            .lock()
            .windows
            .get(name)
            .map(|r| r.snapshot.clone())
    }

    /// Names of windows that were created and not destroyed, sorted
    #[must_use]
    pub fn live_windows(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .windows
            .values()
            .filter(|r| !r.snapshot.destroyed)
            .map(|r| r.snapshot.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Confirmation dialogs shown so far, with their window
    #[must_use]
    pub fn prompts(&self) -> Vec<(String, ConfirmPrompt)> {
        self.state.lock().prompts.clone()
    }

    /// Status icons ever created
    #[must_use]
    pub fn icons_created(&self) -> usize {
        self.state.lock().icons.len()
    }

    /// Status icons of `window` that were not destroyed
    #[must_use]
    pub fn live_icons(&self, window: &str) -> usize {
        self.state
            .lock()
            .icons
            .iter()
            .filter(|i| i.window == window && !i.destroyed)
            .count()
    }

    /// Images set on the most recent icon of `window`, after creation
    #[must_use]
    pub fn icon_images(&self, window: &str) -> Vec<PathBuf> {
        self.state
            .lock()
            .icons
            .iter()
            .rev()
            .find(|i| i.window == window)
            .map(|i| i.images.clone())
            .unwrap_or_default()
    }

    /// Spec of the most recent icon of `window`
    #[must_use]
    pub fn icon_spec(&self, window: &str) -> Option<TrayIconSpec> {
        self.state
            .lock()
            .icons
            .iter()
            .rev()
            .find(|i| i.window == window)
            .map(|i| i.spec.clone())
    }

    /// How many times global shortcuts were released
    #[must_use]
    pub fn shortcut_releases(&self) -> usize {
        self.state.lock().shortcut_releases
    }

    /// Contents of the about panel, once set
    #[must_use]
    pub fn about_panel(&self) -> Option<AboutPanel> {
        self.state.lock().about.clone()
    }

    /// How many times the event loop was told to exit
    #[must_use]
    pub fn exit_calls(&self) -> usize {
        self.state.lock().exit_calls
    }
}

fn send_close_request(state: &Arc<Mutex<HeadlessState>>, host: &HostHandle, name: &str) {
    let state = Arc::clone(state);
    let closed_host = host.clone();
    let window = name.to_string();
    let responder = SignalResponder::new(move |verdict| {
        if verdict == Verdict::Allow {
            if let Some(record) = state.lock().windows.get_mut(&window) {
                record.snapshot.destroyed = true;
                record.snapshot.visible = false;
                record.snapshot.focused = false;
            }
            closed_host.window_signal(&window, WindowSignal::Closed, None);
        }
    });
    host.window_signal(name, WindowSignal::CloseRequested, Some(responder));
}

struct HeadlessWindow {
    name: String,
    state: Arc<Mutex<HeadlessState>>,
    host: HostHandle,
}

impl HeadlessWindow {
    fn with_record<R>(&self, f: impl FnOnce(&mut WindowSnapshot) -> R) -> Option<R> {
        self.state
            .lock()
            .windows
            .get_mut(&self.name)
            .map(|r| f(&mut r.snapshot))
    }
}

impl NativeWindow for HeadlessWindow {
    fn show(&mut self) {
        self.with_record(|w| w.visible = true);
    }

    fn focus(&mut self) {
        self.state.lock().focus_only(&self.name);
    }

    fn restore(&mut self) {
        self.with_record(|w| {
            w.minimized = false;
            w.visible = true;
        });
    }

    fn is_minimized(&self) -> bool {
        self.with_record(|w| w.minimized).unwrap_or(false)
    }

    fn is_visible(&self) -> bool {
        self.with_record(|w| w.visible).unwrap_or(false)
    }

    fn is_focused(&self) -> bool {
        self.with_record(|w| w.focused).unwrap_or(false)
    }

    fn close(&mut self) {
        self.with_record(|w| w.close_calls += 1);
        send_close_request(&self.state, &self.host, &self.name);
    }

    fn reload(&mut self) {
        self.with_record(|w| w.reloads += 1);
    }
}

struct HeadlessIcon {
    index: usize,
    state: Arc<Mutex<HeadlessState>>,
}

impl StatusIcon for HeadlessIcon {
    fn set_image(&mut self, image: &Path) {
        if let Some(icon) = self.state.lock().icons.get_mut(self.index) {
            icon.images.push(image.to_path_buf());
        }
    }

    fn destroy(&mut self) {
        if let Some(icon) = self.state.lock().icons.get_mut(self.index) {
            icon.destroyed = true;
        }
    }
}

#[async_trait]
impl Platform for HeadlessPlatform {
    fn open_window(
        &self,
        spec: &WindowSpec,
        outbound: mpsc::Receiver<HostMessage>,
        host: HostHandle,
    ) -> Result<Box<dyn NativeWindow>, PlatformError> {
        let mut state = self.state.lock();
        if let Some(pos) = state.fail_windows.iter().position(|n| n == &spec.name) {
            state.fail_windows.remove(pos);
            return Err(PlatformError::WindowCreation {
                name: spec.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }

        let snapshot = WindowSnapshot {
            name: spec.name.clone(),
            url: spec.url.clone(),
            visible: spec.options.show,
            focused: false,
            minimized: false,
            destroyed: false,
            close_calls: 0,
            reloads: 0,
        };
        state.windows.insert(
            spec.name.clone(),
            WindowRecord {
                snapshot,
                outbound: Some(outbound),
                host: host.clone(),
            },
        );
        tracing::debug!(window = %spec.name, url = ?spec.url, "Headless window opened");

        Ok(Box::new(HeadlessWindow {
            name: spec.name.clone(),
            state: Arc::clone(&self.state),
            host,
        }))
    }

    fn create_status_icon(
        &self,
        window: &str,
        spec: &TrayIconSpec,
        _host: HostHandle,
    ) -> Result<Box<dyn StatusIcon>, PlatformError> {
        let mut state = self.state.lock();
        state.icons.push(IconRecord {
            window: window.to_string(),
            spec: spec.clone(),
            images: Vec::new(),
            destroyed: false,
        });
        Ok(Box::new(HeadlessIcon {
            index: state.icons.len() - 1,
            state: Arc::clone(&self.state),
        }))
    }

    async fn confirm(&self, window: &str, prompt: &ConfirmPrompt) -> bool {
        let answer = {
            let mut state = self.state.lock();
            state.prompts.push((window.to_string(), prompt.clone()));
            if let Some(accepted) = state.confirm_answers.pop_front() {
                return accepted;
            }

            let routed = state
                .prompt_routes
                .get(window)
                .is_some_and(|route| route.send(prompt.clone()).is_ok());
            if !routed {
                state.prompt_routes.remove(window);
                return false;
            }

            let (tx, rx) = oneshot::channel();
            state.pending_answers.insert(window.to_string(), tx);
            rx
        };

        // A dropped sender means the dialog was dismissed
        answer.await.unwrap_or(false)
    }

    fn set_about_panel(&self, about: &AboutPanel) {
        self.state.lock().about = Some(about.clone());
    }

    fn unregister_all_shortcuts(&self) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.shortcut_releases += 1;
        if state.fail_shortcuts {
            return Err(PlatformError::Shortcut("release refused".to_string()));
        }
        Ok(())
    }

    fn exit(&self) {
        self.state.lock().exit_calls += 1;
    }
}
