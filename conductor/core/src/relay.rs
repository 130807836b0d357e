//! Event Relay
//!
//! Lets surfaces subscribe to named events on the host bus. Each payload
//! emitted under a subscribed name is forwarded to the subscriber's surface,
//! tagged with the event id the surface chose when subscribing.
//!
//! ```text
//!   emit("tick", args)
//!        │
//!        ▼
//!   routes["tick"] = [ (main,  e1) ──► HostMessage::Event { e1, args } ──► main
//!                      (login, e9) ──► HostMessage::Event { e9, args } ──► login ]
//! ```
//!
//! A binding is identified by `(window, event_id)`. Two windows may use the
//! same event id without interfering, and re-subscribing with an id that is
//! already bound replaces the old binding.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::messages::{EventId, HostMessage};

/// One surface's subscription to a host event
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Subscribing window
    pub window: String,
    /// Token chosen by the surface
    pub event_id: EventId,
    /// Subscriber's outbound channel
    pub outbound: mpsc::Sender<HostMessage>,
}

/// Summary of one [`EventRelay::emit`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitResult {
    /// Payloads queued for a surface
    pub delivered: usize,
    /// Payloads dropped because a surface was backlogged
    pub backlogged: usize,
    /// Subscriptions pruned because their surface is gone
    pub pruned: usize,
}

/// Host event bus with per-surface subscriptions
#[derive(Debug, Default)]
pub struct EventRelay {
    routes: HashMap<String, Vec<Subscription>>,
}

impl EventRelay {
    /// Create an empty relay
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `event_id` of `window` to the host event `event_name`
    ///
    /// Any existing binding for the same window and event id is dropped
    /// first, whatever event it was bound to.
    pub fn subscribe(
        &mut self,
        window: &str,
        outbound: mpsc::Sender<HostMessage>,
        event_id: EventId,
        event_name: &str,
    ) {
        let replaced = self.unsubscribe(window, &event_id);
        tracing::debug!(
            window = %window,
            event_id = %event_id,
            event_name = %event_name,
            replaced,
            "Subscribed to host event"
        );
        self.routes
            .entry(event_name.to_string())
            .or_default()
            .push(Subscription {
                window: window.to_string(),
                event_id,
                outbound,
            });
    }

    /// Remove the binding for `(window, event_id)`
    ///
    /// Returns whether a binding existed.
    pub fn unsubscribe(&mut self, window: &str, event_id: &EventId) -> bool {
        let mut removed = false;
        self.routes.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|s| !(s.window == window && &s.event_id == event_id));
            removed |= subs.len() != before;
            !subs.is_empty()
        });
        removed
    }

    /// Drop every binding owned by `window`
    pub fn remove_window(&mut self, window: &str) -> usize {
        let mut removed = 0;
        self.routes.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|s| s.window != window);
            removed += before - subs.len();
            !subs.is_empty()
        });
        if removed > 0 {
            tracing::debug!(window = %window, removed, "Dropped subscriptions of closed window");
        }
        removed
    }

    /// Deliver `args` to every subscriber of `event_name`, in subscription order
    ///
    /// Subscribers whose surface is gone are pruned.
    pub fn emit(&mut self, event_name: &str, args: &[Value]) -> EmitResult {
        let mut result = EmitResult::default();
        let Some(subs) = self.routes.get_mut(event_name) else {
            return result;
        };

        subs.retain(|sub| {
            let message = HostMessage::Event {
                event_id: sub.event_id.clone(),
                args: args.to_vec(),
            };
            match sub.outbound.try_send(message) {
                Ok(()) => {
                    result.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        window = %sub.window,
                        event_id = %sub.event_id,
                        event_name = %event_name,
                        "Surface backlogged, event dropped"
                    );
                    result.backlogged += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(
                        window = %sub.window,
                        event_id = %sub.event_id,
                        event_name = %event_name,
                        "Surface gone, removing subscription"
                    );
                    result.pruned += 1;
                    false
                }
            }
        });

        if subs.is_empty() {
            self.routes.remove(event_name);
        }
        result
    }

    /// Number of bindings for `event_name`
    #[must_use]
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.routes.get(event_name).map_or(0, Vec::len)
    }

    /// Total number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Whether there are no bindings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
