//! Chaos tests for the host conductor
//!
//! These tests verify the host degrades gracefully when surfaces misbehave
//! or disappear. Each scenario runs in isolation against the headless
//! platform.
//!
//! # Scenarios
//!
//! 1. **Vanished surface**: a surface drops its receiver mid-session
//! 2. **Backlogged surface**: a surface stops reading its channel
//! 3. **Late deferred reply**: the caller closes before its reply is ready
//! 4. **Native failure**: the platform refuses to create a window
//! 5. **Input storm**: many tasks feed the inbox at once
//! 6. **Ghost windows**: inputs name windows that do not exist
//!
//! # Running
//!
//! ```bash
//! cargo test --test chaos_tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Notify;

use host_conductor::headless::HeadlessPlatform;
use host_conductor::{
    CallbackId, Conductor, Delivery, EventId, HostConfig, Invocation, InvokeOutcome,
    OperationError, OperationTable, RegistryError, SurfaceEvent, WindowOverrides, WindowSignal,
    MAIN_WINDOW,
};

fn host_with(config: HostConfig) -> (Conductor<HeadlessPlatform>, Arc<HeadlessPlatform>) {
    let platform = Arc::new(HeadlessPlatform::new());
    let conductor = Conductor::new(config, Arc::clone(&platform)).unwrap();
    (conductor, platform)
}

fn subscribe(c: &mut Conductor<HeadlessPlatform>, window: &str, event_id: &str, name: &str) {
    c.handle().surface_event(
        window,
        SurfaceEvent::RemoteOn {
            event_id: EventId::new(event_id),
            event_name: name.to_string(),
        },
    );
    c.drain();
}

// =============================================================================
// Scenario 1: Vanished Surface
// =============================================================================

/// A surface that dropped its receiver loses its subscriptions on the next
/// emit, and replies to it count as send failures.
#[tokio::test]
async fn chaos_vanished_surface() {
    let (mut c, platform) = host_with(HostConfig::new("/opt/app"));
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    subscribe(&mut c, MAIN_WINDOW, "e1", "sync");
    subscribe(&mut c, "settings", "e2", "sync");

    drop(platform.take_outbound(MAIN_WINDOW));

    let result = c.emit_event("sync", &[json!(1)]);
    assert_eq!(result.delivered, 1);
    assert_eq!(result.pruned, 1);
    assert_eq!(c.relay().subscriber_count("sync"), 1);

    let outcome = c.invoke(
        MAIN_WINDOW,
        "windowNames",
        CallbackId::new("cb-1"),
        vec![],
    );
    assert!(matches!(outcome, InvokeOutcome::Replied(Delivery::SendFailed)));
    assert_eq!(c.broker_stats().snapshot().send_failures, 1);
}

// =============================================================================
// Scenario 2: Backlogged Surface
// =============================================================================

/// A full channel drops events but keeps the subscription, and delivery
/// resumes once the surface reads again.
#[tokio::test]
async fn chaos_backlogged_surface() {
    let mut config = HostConfig::new("/opt/app");
    config.surface_channel_capacity = 2;
    let (mut c, platform) = host_with(config);
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();
    subscribe(&mut c, MAIN_WINDOW, "e1", "tick");

    for i in 0..5 {
        c.emit_event("tick", &[json!(i)]);
    }
    assert_eq!(c.relay().subscriber_count("tick"), 1);

    let mut received = 0;
    while surface.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 2);

    let result = c.emit_event("tick", &[json!(99)]);
    assert_eq!(result.delivered, 1);
    assert_eq!(result.backlogged, 0);
}

// =============================================================================
// Scenario 3: Late Deferred Reply
// =============================================================================

/// A deferred operation finishing after its caller went away reports a
/// send failure instead of panicking.
#[tokio::test]
async fn chaos_deferred_reply_after_close() {
    let gate = Arc::new(Notify::new());
    let op_gate = Arc::clone(&gate);

    let mut table = OperationTable::with_builtins();
    table.register(
        "slowLookup",
        move |_args: Vec<Value>| -> Result<Invocation, OperationError> {
            let gate = Arc::clone(&op_gate);
            Ok(Invocation::deferred(async move {
                gate.notified().await;
                Ok(json!("late"))
            }))
        },
    );

    let platform = Arc::new(HeadlessPlatform::new());
    let mut c =
        Conductor::with_operations(HostConfig::new("/opt/app"), Arc::clone(&platform), table)
            .unwrap();
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    c.create_window(host_conductor::WindowOptions::named("about"))
        .unwrap();
    let surface = platform.take_outbound("about").unwrap();

    let outcome = c.invoke("about", "slowLookup", CallbackId::new("cb-9"), vec![]);
    let InvokeOutcome::Deferred(task) = outcome else {
        panic!("expected a deferred reply");
    };

    platform.request_close("about");
    c.drain();
    drop(surface);
    assert!(!c.registry().contains("about"));

    gate.notify_one();
    let delivery = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivery, Delivery::SendFailed);
    assert!(!c.is_quitting());
}

// =============================================================================
// Scenario 4: Native Failure
// =============================================================================

/// A refused native window leaves no trace in the registry and the name can
/// be used again.
#[tokio::test]
async fn chaos_window_creation_failure() {
    let (mut c, platform) = host_with(HostConfig::new("/opt/app"));
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    platform.fail_next_window("settings");
    let err = c
        .create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Platform(_)));
    assert!(!c.registry().contains("settings"));
    assert_eq!(c.registry().count(), 1);

    let name = c
        .create_app_window(WindowOverrides::default(), Some("settings"))
        .unwrap();
    assert_eq!(name, "settings");
}

// =============================================================================
// Scenario 5: Input Storm
// =============================================================================

/// Many producers feeding the inbox concurrently lose nothing.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chaos_input_storm() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 50;

    let mut config = HostConfig::new("/opt/app");
    config.surface_channel_capacity = PRODUCERS * PER_PRODUCER;
    let (mut c, platform) = host_with(config);
    c.create_app_window(WindowOverrides::default(), None).unwrap();
    let mut surface = platform.take_outbound(MAIN_WINDOW).unwrap();
    subscribe(&mut c, MAIN_WINDOW, "e1", "storm");

    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let handle = c.handle();
        producers.push(tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                assert!(handle.surface_event(
                    MAIN_WINDOW,
                    SurfaceEvent::RemoteEmit {
                        event_id: EventId::new("storm"),
                        args: vec![json!(p), json!(i)],
                    },
                ));
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    assert_eq!(c.drain(), PRODUCERS * PER_PRODUCER);

    let mut received = 0;
    while surface.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, PRODUCERS * PER_PRODUCER);
}

/// Handles notice when the conductor is gone.
#[tokio::test]
async fn chaos_conductor_dropped() {
    let (c, _platform) = host_with(HostConfig::new("/opt/app"));
    let handle = c.handle();
    drop(c);

    assert!(handle.is_closed());
    assert!(!handle.activate());
}

// =============================================================================
// Scenario 6: Ghost Windows
// =============================================================================

/// Inputs naming unknown windows are dropped without side effects.
#[tokio::test]
async fn chaos_ghost_windows() {
    let (mut c, platform) = host_with(HostConfig::new("/opt/app"));
    c.create_app_window(WindowOverrides::default(), None).unwrap();

    let handle = c.handle();
    handle.surface_event(
        "ghost",
        SurfaceEvent::RemoteOn {
            event_id: EventId::new("e1"),
            event_name: "sync".to_string(),
        },
    );
    handle.surface_event(
        "ghost",
        SurfaceEvent::RemoteInvoke {
            method: "windowNames".to_string(),
            callback_id: CallbackId::new("cb"),
            args: vec![],
        },
    );
    handle.window_signal("ghost", WindowSignal::LoadFinished, None);
    handle.window_signal("ghost", WindowSignal::Closed, None);
    c.drain();

    assert_eq!(c.relay().subscriber_count("sync"), 0);
    assert_eq!(c.registry().names(), vec![MAIN_WINDOW]);
    assert_eq!(c.broker_stats().snapshot().replies_sent, 0);
    assert!(!c.is_quitting());
    assert_eq!(platform.exit_calls(), 0);
    assert!(!c.close_window("ghost"));
}
