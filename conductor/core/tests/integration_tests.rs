//! Integration tests for the host conductor
//!
//! These tests drive a Conductor over the headless platform the way a real
//! native layer and real surfaces would: inputs go through the HostHandle,
//! native windows answer close requests through their responders, and
//! surfaces read their outbound channels.
//!
//! Tests cover:
//! - Quit orchestration with several windows
//! - The close-confirmation flow and forced closes
//! - Event relay isolation between surfaces
//! - Remote invocation replies and unknown operations
//! - Status icon lifecycle
//! - Navigation and new-window guards
//! - Configuration loading feeding the Conductor

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use host_conductor::config::{load_config_with_env, ConfigOverrides, ConfigSource};
use host_conductor::broker::{InvokeOutcome, Invocation, OperationError, OperationTable};
use host_conductor::headless::HeadlessPlatform;
use host_conductor::conductor::CRASH_MESSAGE;
use host_conductor::{
    AboutPanel, CallbackId, Conductor, EventId, ExitReason, HostConfig, HostInput, HostMessage, SignalResponder,
    SurfaceEvent, TrayAction, Verdict, WindowOptions, WindowOverrides, WindowSignal, LOGIN_WINDOW,
    MAIN_WINDOW,
};

// =============================================================================
// Helpers
// =============================================================================

fn host() -> (Conductor<HeadlessPlatform>, Arc<HeadlessPlatform>) {
    host_with(HostConfig::new("/opt/app"))
}

fn host_with(config: HostConfig) -> (Conductor<HeadlessPlatform>, Arc<HeadlessPlatform>) {
    let platform = Arc::new(HeadlessPlatform::new());
    let conductor = Conductor::new(config, Arc::clone(&platform)).unwrap();
    (conductor, platform)
}

fn drain_messages(rx: &mut mpsc::Receiver<HostMessage>) -> Vec<HostMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

/// Send a preventable signal and return the verdict the host gave
fn signal_verdict(
    conductor: &mut Conductor<HeadlessPlatform>,
    window: &str,
    signal: WindowSignal,
) -> Verdict {
    let (tx, rx) = std::sync::mpsc::channel();
    let responder = SignalResponder::new(move |verdict| {
        let _ = tx.send(verdict);
    });
    conductor
        .handle()
        .window_signal(window, signal, Some(responder));
    conductor.drain();
    rx.try_recv().unwrap()
}

async fn next_input(conductor: &mut Conductor<HeadlessPlatform>) {
    tokio::time::timeout(Duration::from_secs(1), conductor.step())
        .await
        .expect("confirmation answer should arrive");
}

// =============================================================================
// Test 1: Quit Orchestration
// =============================================================================

/// The process keeps running while any window not marked for forced close
/// remains, and shuts down exactly once after the last one goes.
#[tokio::test]
async fn test_quit_after_last_window_closes() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some(LOGIN_WINDOW))
        .unwrap();
    assert_eq!(c.registry().names(), vec![LOGIN_WINDOW, MAIN_WINDOW]);

    // Forced close of login leaves main alive
    assert!(c.close_window(LOGIN_WINDOW));
    c.drain();
    assert!(!c.registry().contains(LOGIN_WINDOW));
    assert!(!c.is_quitting());
    assert_eq!(platform.exit_calls(), 0);

    // Closing main ends the process
    assert!(c.close_window(MAIN_WINDOW));
    c.drain();
    assert!(c.is_quitting());
    assert_eq!(c.exit_reason(), Some(&ExitReason::AllWindowsClosed));
    assert_eq!(platform.exit_calls(), 1);
    assert_eq!(platform.shortcut_releases(), 1);
    assert!(platform.live_windows().is_empty());
}

/// A window marked for forced close no longer keeps the process alive.
#[tokio::test]
async fn test_marked_window_does_not_keep_process_alive() {
    let (mut c, platform) = host();
    c.create_window(WindowOptions::named("about")).unwrap();
    c.create_window(WindowOptions::named("help")).unwrap();

    // Mark "help" without processing its close yet
    c.close_window("help");
    assert!(!c.try_quit_on_all_windows_closed());

    // Only "about" reports closed; "help" is still open but marked
    c.dispatch(HostInput::Window {
        window: "about".to_string(),
        signal: WindowSignal::Closed,
        respond: None,
    });

    assert!(c.registry().contains("help"));
    assert!(c.is_quitting());
    assert_eq!(c.exit_reason(), Some(&ExitReason::AllWindowsClosed));
    assert_eq!(platform.exit_calls(), 1);
}

#[tokio::test]
async fn test_explicit_quit_is_idempotent() {
    let (mut c, platform) = host();
    c.ready().unwrap();
    platform.fail_shortcut_release(true);

    let handle = c.handle();
    handle.surface_event(LOGIN_WINDOW, SurfaceEvent::AppQuit);
    handle.shutdown();
    handle.surface_event(
        LOGIN_WINDOW,
        SurfaceEvent::RemoteInvoke {
            method: "quit".to_string(),
            callback_id: CallbackId::new("cb-quit"),
            args: vec![],
        },
    );
    c.drain();

    // Shortcut release failure does not stop the exit
    assert_eq!(platform.shortcut_releases(), 1);
    assert_eq!(platform.exit_calls(), 1);
    assert_eq!(c.exit_reason(), Some(&ExitReason::Requested));
}

#[tokio::test]
async fn test_run_returns_exit_reason() {
    let (mut c, _platform) = host();
    c.ready().unwrap();
    let handle = c.handle();
    handle.shutdown();

    let reason = tokio::time::timeout(Duration::from_secs(1), c.run())
        .await
        .unwrap();
    assert_eq!(reason, ExitReason::Signal);
}

/// With no window open and every handle dropped, nothing can reach the
/// loop any more and it stops on its own.
#[tokio::test]
async fn test_run_ends_when_every_sender_is_gone() {
    let (c, platform) = host();
    drop(c.handle());

    let reason = tokio::time::timeout(Duration::from_secs(1), c.run())
        .await
        .expect("loop should stop once disconnected");
    assert_eq!(reason, ExitReason::Disconnected);
    assert_eq!(platform.exit_calls(), 1);
}

/// An open window still holds a sender, so dropping outside handles does
/// not stop the loop until that window is gone.
#[tokio::test]
async fn test_open_window_keeps_loop_alive() {
    let (mut c, platform) = host();
    c.create_window(WindowOptions::named("about")).unwrap();
    drop(c.handle());

    let run = tokio::spawn(c.run());
    tokio::task::yield_now().await;
    assert!(!run.is_finished());

    platform.request_close("about");
    let reason = tokio::time::timeout(Duration::from_secs(1), run)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reason, ExitReason::AllWindowsClosed);
}

// =============================================================================
// Test 2: Close Confirmation
// =============================================================================

/// First close asks the surface to run its quit flow; a second close inside
/// the window opens the dialog; accepting force-closes the window.
#[tokio::test]
async fn test_double_close_confirms_then_closes() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    platform.request_close(MAIN_WINDOW);
    c.drain();
    assert_eq!(
        drain_messages(&mut surface),
        vec![HostMessage::AppQuit { reason: None }]
    );
    assert!(c.registry().contains(MAIN_WINDOW));
    assert!(platform.prompts().is_empty());

    platform.script_confirm(true);
    platform.request_close(MAIN_WINDOW);
    c.drain();
    assert!(drain_messages(&mut surface).is_empty());

    // Dialog answer comes back through the inbox
    next_input(&mut c).await;
    c.drain();

    let prompts = platform.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, MAIN_WINDOW);
    assert!(!c.registry().contains(MAIN_WINDOW));
    assert!(platform.window(MAIN_WINDOW).unwrap().destroyed);
    assert!(c.is_quitting());
}

#[tokio::test]
async fn test_declined_dialog_keeps_window() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    platform.request_close(MAIN_WINDOW);
    platform.script_confirm(false);
    platform.request_close(MAIN_WINDOW);
    c.drain();
    next_input(&mut c).await;
    c.drain();

    assert!(c.registry().contains(MAIN_WINDOW));
    assert!(!platform.window(MAIN_WINDOW).unwrap().destroyed);
    assert!(!c.is_quitting());
}

/// While a dialog is up, further close requests neither close the window
/// nor stack a second dialog.
#[tokio::test]
async fn test_close_during_pending_dialog_is_prevented() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    platform.request_close(MAIN_WINDOW);
    c.drain();

    platform.script_confirm(false);
    let first = signal_verdict(&mut c, MAIN_WINDOW, WindowSignal::CloseRequested);
    let second = signal_verdict(&mut c, MAIN_WINDOW, WindowSignal::CloseRequested);
    assert_eq!(first, Verdict::Prevent);
    assert_eq!(second, Verdict::Prevent);

    next_input(&mut c).await;
    assert_eq!(platform.prompts().len(), 1);
}

#[tokio::test]
async fn test_forced_close_skips_confirmation() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    let mut surface = platform.take_outbound("settings").unwrap();

    assert!(c.close_window("settings"));
    c.drain();

    assert!(drain_messages(&mut surface).is_empty());
    assert!(platform.prompts().is_empty());
    assert!(!c.registry().contains("settings"));
    assert_eq!(platform.window("settings").unwrap().close_calls, 1);
}

/// The forced-close mark survives the window and applies to a new window
/// that reuses the name.
#[tokio::test]
async fn test_forced_close_mark_is_sticky() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    c.close_window("settings");
    c.drain();

    c.create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    let mut surface = platform.take_outbound("settings").unwrap();
    platform.request_close("settings");
    c.drain();

    assert!(drain_messages(&mut surface).is_empty());
    assert!(!c.registry().contains("settings"));
    assert!(c.registry().is_marked_for_close("settings"));
}

#[tokio::test]
async fn test_plain_window_closes_freely() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_window(WindowOptions::named("about")).unwrap();

    let verdict = signal_verdict(&mut c, "about", WindowSignal::CloseRequested);
    assert_eq!(verdict, Verdict::Allow);

    platform.request_close("about");
    c.drain();
    assert!(!c.registry().contains("about"));
    assert!(!c.is_quitting());
}

// =============================================================================
// Test 3: Event Relay
// =============================================================================

/// Each subscriber gets events under its own token, and unsubscribing one
/// does not affect the other.
#[tokio::test]
async fn test_relay_isolates_subscribers() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    let mut main = platform.take_outbound(MAIN_WINDOW).unwrap();
    let mut settings = platform.take_outbound("settings").unwrap();

    let handle = c.handle();
    handle.surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteOn {
            event_id: EventId::new("e1"),
            event_name: "theme-changed".to_string(),
        },
    );
    handle.surface_event(
        "settings",
        SurfaceEvent::RemoteOn {
            event_id: EventId::new("e2"),
            event_name: "theme-changed".to_string(),
        },
    );
    handle.surface_event(
        "settings",
        SurfaceEvent::RemoteEmit {
            event_id: EventId::new("theme-changed"),
            args: vec![json!("dark")],
        },
    );
    c.drain();

    assert_eq!(
        drain_messages(&mut main),
        vec![HostMessage::Event {
            event_id: EventId::new("e1"),
            args: vec![json!("dark")],
        }]
    );
    assert_eq!(
        drain_messages(&mut settings),
        vec![HostMessage::Event {
            event_id: EventId::new("e2"),
            args: vec![json!("dark")],
        }]
    );

    handle.surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteOff {
            event_id: EventId::new("e1"),
        },
    );
    handle.surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteEmit {
            event_id: EventId::new("theme-changed"),
            args: vec![json!("light")],
        },
    );
    c.drain();

    assert!(drain_messages(&mut main).is_empty());
    assert_eq!(drain_messages(&mut settings).len(), 1);
}

#[tokio::test]
async fn test_closed_window_loses_subscriptions() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_window(WindowOptions::named("about")).unwrap();

    c.handle().surface_event(
        "about",
        SurfaceEvent::RemoteOn {
            event_id: EventId::new("e1"),
            event_name: "sync".to_string(),
        },
    );
    c.drain();
    assert_eq!(c.relay().subscriber_count("sync"), 1);

    platform.request_close("about");
    c.drain();
    assert_eq!(c.relay().subscriber_count("sync"), 0);
    assert_eq!(c.emit_event("sync", &[]).delivered, 0);
}

#[tokio::test]
async fn test_remote_send_unicast() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some(LOGIN_WINDOW))
        .unwrap();
    let mut main = platform.take_outbound(MAIN_WINDOW).unwrap();
    let mut login = platform.take_outbound(LOGIN_WINDOW).unwrap();

    let handle = c.handle();
    handle.surface_event(
        LOGIN_WINDOW,
        SurfaceEvent::RemoteSend {
            target: MAIN_WINDOW.to_string(),
            event_name: "logged-in".to_string(),
            args: vec![json!({"user": "ada"})],
        },
    );
    handle.surface_event(
        LOGIN_WINDOW,
        SurfaceEvent::RemoteSend {
            target: "nowhere".to_string(),
            event_name: "lost".to_string(),
            args: vec![],
        },
    );
    c.drain();

    assert_eq!(
        drain_messages(&mut main),
        vec![HostMessage::Forward {
            event_name: "logged-in".to_string(),
            args: vec![json!({"user": "ada"})],
        }]
    );
    assert!(drain_messages(&mut login).is_empty());
}

// =============================================================================
// Test 4: Remote Invocation
// =============================================================================

#[tokio::test]
async fn test_remote_invoke_replies_with_callback_id() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    c.handle().surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteInvoke {
            method: "createAppWindow".to_string(),
            callback_id: CallbackId::new("cb-7"),
            args: vec![json!(null), json!("settings")],
        },
    );
    c.drain();

    assert_eq!(
        drain_messages(&mut surface),
        vec![HostMessage::Reply {
            callback_id: CallbackId::new("cb-7"),
            value: json!("settings"),
        }]
    );
    assert!(c.registry().contains("settings"));
    assert_eq!(c.broker_stats().snapshot().replies_sent, 1);
}

#[tokio::test]
async fn test_unknown_operation_gets_no_reply() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    c.handle().surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteInvoke {
            method: "formatDisk".to_string(),
            callback_id: CallbackId::new("cb-1"),
            args: vec![],
        },
    );
    c.drain();

    let waited = tokio::time::timeout(Duration::from_millis(50), surface.recv()).await;
    assert!(waited.is_err(), "unknown operations must not reply");

    let stats = c.broker_stats().snapshot();
    assert_eq!(stats.unknown, 1);
    assert_eq!(stats.replies_sent, 0);
}

#[tokio::test]
async fn test_failed_operation_gets_no_reply() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    c.handle().surface_event(
        MAIN_WINDOW,
        SurfaceEvent::RemoteInvoke {
            method: "closeWindow".to_string(),
            callback_id: CallbackId::new("cb-2"),
            args: vec![],
        },
    );
    c.drain();

    assert!(drain_messages(&mut surface).is_empty());
    assert_eq!(c.broker_stats().snapshot().rejected, 1);
}

/// An application-supplied `quit` still runs, but never answers the caller.
#[tokio::test]
async fn test_custom_quit_runs_without_reply() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut operations = OperationTable::with_builtins();
    let counter = Arc::clone(&calls);
    operations.register("quit", move |_args: Vec<serde_json::Value>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, OperationError>(Invocation::Immediate(json!("bye")))
    });

    let platform = Arc::new(HeadlessPlatform::new());
    let mut c = Conductor::with_operations(
        HostConfig::new("/opt/app"),
        Arc::clone(&platform),
        operations,
    )
    .unwrap();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    let outcome = c.invoke(MAIN_WINDOW, "quit", CallbackId::new("cb-q"), vec![]);

    assert!(matches!(outcome, InvokeOutcome::Suppressed));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(drain_messages(&mut surface).is_empty());
    assert_eq!(c.broker_stats().snapshot().replies_sent, 0);
}

// =============================================================================
// Test 5: Status Icons
// =============================================================================

#[tokio::test]
async fn test_app_ready_creates_single_icon() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    let handle = c.handle();
    for _ in 0..2 {
        handle.surface_event(
            MAIN_WINDOW,
            SurfaceEvent::AppReady {
                window_name: Some(MAIN_WINDOW.to_string()),
            },
        );
    }
    c.drain();

    assert_eq!(platform.icons_created(), 2);
    assert_eq!(platform.live_icons(MAIN_WINDOW), 1);
    assert_eq!(c.trays().len(), 1);
}

#[tokio::test]
async fn test_tray_menu_actions() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_tray_icon(None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    platform.minimize(MAIN_WINDOW);
    c.handle().tray_action(MAIN_WINDOW, TrayAction::Open);
    c.drain();
    let snapshot = platform.window(MAIN_WINDOW).unwrap();
    assert!(!snapshot.minimized);
    assert!(snapshot.focused);

    c.handle().tray_action(MAIN_WINDOW, TrayAction::Exit);
    c.drain();
    assert_eq!(
        drain_messages(&mut surface),
        vec![HostMessage::AppQuit {
            reason: Some("quit".to_string()),
        }]
    );
    assert!(!c.is_quitting());
}

#[tokio::test]
async fn test_icons_removed_on_close_and_quit() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_window(WindowOptions::named("about")).unwrap();
    c.create_tray_icon(None).unwrap();
    c.create_tray_icon(Some("about")).unwrap();

    platform.request_close("about");
    c.drain();
    assert_eq!(platform.live_icons("about"), 0);
    assert_eq!(platform.live_icons(MAIN_WINDOW), 1);

    c.quit(ExitReason::Requested);
    assert_eq!(platform.live_icons(MAIN_WINDOW), 0);
    assert!(c.trays().is_empty());
}

// =============================================================================
// Test 6: Navigation Guards
// =============================================================================

#[tokio::test]
async fn test_navigation_limited_to_same_origin() {
    let mut config = HostConfig::new("/opt/app");
    config.dev_server_url = Some("http://localhost:3000".to_string());
    let (mut c, _platform) = host_with(config);
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    let same = signal_verdict(
        &mut c,
        MAIN_WINDOW,
        WindowSignal::WillNavigate {
            url: "http://localhost:3000/settings".to_string(),
        },
    );
    let other = signal_verdict(
        &mut c,
        MAIN_WINDOW,
        WindowSignal::WillNavigate {
            url: "https://example.com/".to_string(),
        },
    );
    assert_eq!(same, Verdict::Allow);
    assert_eq!(other, Verdict::Prevent);
}

#[tokio::test]
async fn test_file_surface_never_navigates() {
    let (mut c, _platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    let verdict = signal_verdict(
        &mut c,
        MAIN_WINDOW,
        WindowSignal::WillNavigate {
            url: "file:///opt/app/index.html".to_string(),
        },
    );
    assert_eq!(verdict, Verdict::Prevent);
}

#[tokio::test]
async fn test_new_window_opens_externally() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();

    let verdict = signal_verdict(
        &mut c,
        MAIN_WINDOW,
        WindowSignal::NewWindow {
            url: "https://example.com/docs".to_string(),
        },
    );

    assert_eq!(verdict, Verdict::Prevent);
    assert_eq!(c.registry().count(), 1);
    assert_eq!(
        drain_messages(&mut surface),
        vec![HostMessage::OpenUrl {
            url: "https://example.com/docs".to_string(),
        }]
    );
}

// =============================================================================
// Test 7: Startup and Activation
// =============================================================================

#[tokio::test]
async fn test_ready_opens_login_window() {
    let (mut c, platform) = host();
    c.ready().unwrap();

    assert_eq!(c.registry().names(), vec![LOGIN_WINDOW]);
    let snapshot = platform.window(LOGIN_WINDOW).unwrap();
    assert_eq!(
        snapshot.url.as_deref(),
        Some("file:///opt/app/index.html#login-page")
    );
    assert!(!snapshot.visible);

    platform.finish_load(LOGIN_WINDOW);
    c.drain();
    let snapshot = platform.window(LOGIN_WINDOW).unwrap();
    assert!(snapshot.visible);
    assert!(snapshot.focused);
}

#[tokio::test]
async fn test_activate_shows_hidden_window() {
    let (mut c, platform) = host();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    platform.hide(MAIN_WINDOW);

    c.handle().activate();
    c.drain();

    assert_eq!(c.registry().count(), 1);
    assert!(platform.window(MAIN_WINDOW).unwrap().visible);
}

/// The about panel is filled from the title, package and debug flag.
#[tokio::test]
async fn test_ready_fills_about_panel() {
    let mut config = HostConfig::new("/opt/app");
    config.debug = true;
    config.labels.title = "Workbench".to_string();
    config.package.version = "2.1.0".to_string();
    config.package.copyright = "Copyright (C) Workbench".to_string();
    let (mut c, platform) = host_with(config);
    assert!(platform.about_panel().is_none());

    c.ready().unwrap();

    assert_eq!(
        platform.about_panel(),
        Some(AboutPanel {
            application_name: "Workbench".to_string(),
            application_version: "2.1.0".to_string(),
            copyright: "Copyright (C) Workbench".to_string(),
            version: "[debug]".to_string(),
        })
    );
}

// =============================================================================
// Test 8: Crash Recovery
// =============================================================================

fn debug_window(name: &str) -> WindowOptions {
    WindowOptions {
        debug: true,
        ..WindowOptions::named(name)
    }
}

#[tokio::test]
async fn test_crash_dialog_reloads_debug_window() {
    let (mut c, platform) = host();
    c.create_window(debug_window("inspector")).unwrap();
    platform.script_confirm(true);

    platform.crash("inspector");
    c.drain();
    next_input(&mut c).await;

    let prompts = platform.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, "inspector");
    assert_eq!(prompts[0].1.message, CRASH_MESSAGE);
    let snapshot = platform.window("inspector").unwrap();
    assert_eq!(snapshot.reloads, 1);
    assert!(!snapshot.destroyed);
}

#[tokio::test]
async fn test_crash_dialog_can_close_debug_window() {
    let (mut c, platform) = host();
    c.create_window(debug_window("inspector")).unwrap();
    c.create_window(WindowOptions::named("about")).unwrap();
    platform.script_confirm(false);

    platform.crash("inspector");
    c.drain();
    next_input(&mut c).await;
    c.drain();

    assert!(!c.registry().contains("inspector"));
    assert_eq!(platform.window("inspector").unwrap().reloads, 0);
    assert_eq!(platform.live_windows(), vec!["about"]);
}

#[tokio::test]
async fn test_crash_without_debug_shows_no_dialog() {
    let (mut c, platform) = host();
    c.create_window(WindowOptions::named("about")).unwrap();

    platform.crash("about");
    c.drain();

    assert!(platform.prompts().is_empty());
    assert!(c.registry().contains("about"));
}

// =============================================================================
// Test 9: Configuration
// =============================================================================

#[tokio::test]
async fn test_toml_config_drives_conductor() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[app]
root_path = "/srv/desktop"
debug = true

[timing]
confirm_window_ms = 1500

[labels]
title = "Desk"
exit_sure = "Quit"
exit_cancel = "Stay"
exit_msg = "Really quit?"
tray_open = "Show"
tray_exit = "Quit"
"#
    )
    .unwrap();

    let mut config = load_config_with_env(Some(file.path().to_path_buf()), |_| None).unwrap();
    assert_eq!(config.source(), ConfigSource::File);
    ConfigOverrides::new()
        .with_debug(false)
        .apply(&mut config);

    let (mut c, platform) = host_with(config);
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    assert_eq!(
        platform.window(MAIN_WINDOW).unwrap().url.as_deref(),
        Some("file:///srv/desktop/index.html#/main")
    );

    platform.request_close(MAIN_WINDOW);
    platform.script_confirm(false);
    platform.request_close(MAIN_WINDOW);
    c.drain();
    next_input(&mut c).await;

    let prompts = platform.prompts();
    assert_eq!(prompts[0].1.message, "Really quit?");
    assert_eq!(prompts[0].1.confirm_label, "Quit");
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = HostConfig::new("/opt/app");
    config.surface_channel_capacity = 0;
    let result = Conductor::new(config, Arc::new(HeadlessPlatform::new()));
    assert!(result.is_err());
}
