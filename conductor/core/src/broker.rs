//! Remote Invocation Broker
//!
//! Surfaces call host operations by name. The broker resolves the name in an
//! operation table that is fixed at startup, and delivers the result back to
//! the calling surface tagged with the caller's callback id.
//!
//! # Delivery Rules
//!
//! ```text
//!   remote_invoke(method, callback_id, args)
//!        │
//!        ├── unknown method ─────────────► BrokerError, logged, no reply
//!        ├── quit ───────────────────────► no reply (process is exiting)
//!        ├── Err(e) ─────────────────────► logged, no reply
//!        ├── Immediate(v) ───────────────► Reply now
//!        └── Deferred(fut) ──► spawn ──┬─► Ok(v): Reply when resolved
//!                                      └─► Err(e): logged, no reply
//! ```
//!
//! Failures never travel back to the surface; a caller waiting on a reply
//! that never comes applies its own timeout. Every swallowed path is counted
//! in [`BrokerStats`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::messages::{CallbackId, HostMessage};
use crate::platform::PlatformError;
use crate::surface_registry::RegistryError;

/// Errors resolving an operation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// No operation is registered under this name
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
}

/// Errors raised by an operation
#[derive(Debug, Error)]
pub enum OperationError {
    /// Arguments could not be decoded
    #[error("Invalid arguments for '{operation}': {reason}")]
    InvalidArguments {
        /// Operation name
        operation: String,
        /// Decode failure
        reason: String,
    },

    /// Window bookkeeping refused the request
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The native layer failed
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Any other failure
    #[error("{0}")]
    Failed(String),
}

impl OperationError {
    /// Build an `InvalidArguments` error
    pub fn invalid_arguments(operation: &str, reason: impl fmt::Display) -> Self {
        Self::InvalidArguments {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result of running an operation
pub enum Invocation {
    /// The value is available now
    Immediate(Value),
    /// The value arrives later
    Deferred(BoxFuture<'static, Result<Value, OperationError>>),
}

impl Invocation {
    /// Wrap a future as a deferred invocation
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(v) => f.debug_tuple("Immediate").field(v).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// An operation registered by the embedding application
pub trait HostOperation: Send + Sync {
    /// Run the operation with the caller's arguments
    fn invoke(&self, args: Vec<Value>) -> Result<Invocation, OperationError>;
}

impl<F> HostOperation for F
where
    F: Fn(Vec<Value>) -> Result<Invocation, OperationError> + Send + Sync,
{
    fn invoke(&self, args: Vec<Value>) -> Result<Invocation, OperationError> {
        self(args)
    }
}

/// Operations implemented by the conductor itself
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinOperation {
    /// `createAppWindow(overrides?, name?)`
    CreateAppWindow,
    /// `createWindow(options)`
    CreateWindow,
    /// `closeWindow(name)`
    CloseWindow,
    /// `showAndFocusWindow(name?)`
    ShowAndFocusWindow,
    /// `openOrCreateWindow()`
    OpenOrCreateWindow,
    /// `createTrayIcon(name?)`
    CreateTrayIcon,
    /// `removeTrayIcon(name)`
    RemoveTrayIcon,
    /// `setTrayAlert(name, alert)`
    SetTrayAlert,
    /// `tryQuitOnAllWindowsClosed()`
    TryQuitOnAllWindowsClosed,
    /// `currentFocusWindow()`
    CurrentFocusWindow,
    /// `windowNames()`
    WindowNames,
    /// `appConfig()`
    AppConfig,
    /// `rootPath()`
    RootPath,
    /// `quit()`
    Quit,
}

impl BuiltinOperation {
    /// Every built-in operation
    pub const ALL: [Self; 14] = [
        Self::CreateAppWindow,
        Self::CreateWindow,
        Self::CloseWindow,
        Self::ShowAndFocusWindow,
        Self::OpenOrCreateWindow,
        Self::CreateTrayIcon,
        Self::RemoveTrayIcon,
        Self::SetTrayAlert,
        Self::TryQuitOnAllWindowsClosed,
        Self::CurrentFocusWindow,
        Self::WindowNames,
        Self::AppConfig,
        Self::RootPath,
        Self::Quit,
    ];

    /// Name surfaces use to call the operation
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::CreateAppWindow => "createAppWindow",
            Self::CreateWindow => "createWindow",
            Self::CloseWindow => "closeWindow",
            Self::ShowAndFocusWindow => "showAndFocusWindow",
            Self::OpenOrCreateWindow => "openOrCreateWindow",
            Self::CreateTrayIcon => "createTrayIcon",
            Self::RemoveTrayIcon => "removeTrayIcon",
            Self::SetTrayAlert => "setTrayAlert",
            Self::TryQuitOnAllWindowsClosed => "tryQuitOnAllWindowsClosed",
            Self::CurrentFocusWindow => "currentFocusWindow",
            Self::WindowNames => "windowNames",
            Self::AppConfig => "appConfig",
            Self::RootPath => "rootPath",
            Self::Quit => "quit",
        }
    }
}

/// An entry of the operation table
#[derive(Clone)]
pub enum Operation {
    /// Implemented by the conductor
    Builtin(BuiltinOperation),
    /// Registered by the embedding application
    Custom(Arc<dyn HostOperation>),
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(op) => f.debug_tuple("Builtin").field(op).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Name → operation mapping
#[derive(Clone, Debug, Default)]
pub struct OperationTable {
    operations: HashMap<String, Operation>,
}

impl OperationTable {
    /// An empty table
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table holding every built-in operation
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        for op in BuiltinOperation::ALL {
            table
                .operations
                .insert(op.wire_name().to_string(), Operation::Builtin(op));
        }
        table
    }

    /// Register an application operation, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, operation: impl HostOperation + 'static) {
        self.operations
            .insert(name.into(), Operation::Custom(Arc::new(operation)));
    }

    /// Look up an operation by name
    pub fn resolve(&self, name: &str) -> Result<Operation, BrokerError> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownOperation(name.to_string()))
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }
}

/// How a reply attempt ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The reply was queued for the surface
    Sent,
    /// The surface could not take the reply
    SendFailed,
    /// The operation failed; nothing was sent
    Rejected,
}

/// What happened to one invocation
#[derive(Debug)]
pub enum InvokeOutcome {
    /// An immediate value was handled
    Replied(Delivery),
    /// The reply will be handled when the task completes
    Deferred(JoinHandle<Delivery>),
    /// The operation never replies (`quit`)
    Suppressed,
    /// The operation failed synchronously; nothing was sent
    Rejected,
    /// The operation name is unknown; nothing was sent
    Unknown,
}

#[derive(Debug, Default)]
struct StatsInner {
    replies_sent: AtomicU64,
    send_failures: AtomicU64,
    rejected: AtomicU64,
    unknown: AtomicU64,
}

/// Shared broker counters
#[derive(Clone, Debug, Default)]
pub struct BrokerStats {
    inner: Arc<StatsInner>,
}

/// Point-in-time copy of [`BrokerStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrokerStatsSnapshot {
    /// Replies queued for a surface
    pub replies_sent: u64,
    /// Replies that could not be queued
    pub send_failures: u64,
    /// Operations that failed
    pub rejected: u64,
    /// Calls to unknown operations
    pub unknown: u64,
}

impl BrokerStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counters
    #[must_use]
    pub fn snapshot(&self) -> BrokerStatsSnapshot {
        BrokerStatsSnapshot {
            replies_sent: self.inner.replies_sent.load(Ordering::Relaxed),
            send_failures: self.inner.send_failures.load(Ordering::Relaxed),
            rejected: self.inner.rejected.load(Ordering::Relaxed),
            unknown: self.inner.unknown.load(Ordering::Relaxed),
        }
    }
}

/// Resolves operations and delivers their replies
#[derive(Debug)]
pub struct Broker {
    table: OperationTable,
    stats: BrokerStats,
}

impl Broker {
    /// Create a broker over `table`
    #[must_use]
    pub fn new(table: OperationTable) -> Self {
        Self {
            table,
            stats: BrokerStats::default(),
        }
    }

    /// The operation table
    #[must_use]
    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    /// Shared counters
    #[must_use]
    pub fn stats(&self) -> BrokerStats {
        self.stats.clone()
    }

    /// Resolve `method`, counting and logging unknown names
    pub fn resolve(&self, window: &str, method: &str) -> Result<Operation, BrokerError> {
        self.table.resolve(method).inspect_err(|err| {
            BrokerStats::bump(&self.stats.inner.unknown);
            tracing::warn!(window = %window, method = %method, error = %err, "Remote invocation rejected");
        })
    }

    /// Deliver the result of an operation to the caller
    ///
    /// Must be called from within a tokio runtime when `result` is deferred.
    pub fn deliver(
        &self,
        window: &str,
        method: &str,
        callback_id: CallbackId,
        outbound: &mpsc::Sender<HostMessage>,
        result: Result<Invocation, OperationError>,
    ) -> InvokeOutcome {
        if method == BuiltinOperation::Quit.wire_name() {
            return self.discard(window, method, result);
        }

        match result {
            Err(err) => {
                BrokerStats::bump(&self.stats.inner.rejected);
                tracing::warn!(window = %window, method = %method, error = %err, "Remote invocation failed");
                InvokeOutcome::Rejected
            }
            Ok(Invocation::Immediate(value)) => {
                let message = HostMessage::Reply { callback_id, value };
                let delivery = match outbound.try_send(message) {
                    Ok(()) => {
                        BrokerStats::bump(&self.stats.inner.replies_sent);
                        Delivery::Sent
                    }
                    Err(err) => {
                        BrokerStats::bump(&self.stats.inner.send_failures);
                        tracing::warn!(window = %window, method = %method, error = %err, "Cannot deliver reply");
                        Delivery::SendFailed
                    }
                };
                InvokeOutcome::Replied(delivery)
            }
            Ok(Invocation::Deferred(future)) => {
                let outbound = outbound.clone();
                let stats = self.stats.clone();
                let span = tracing::debug_span!("deferred_reply", window = %window, method = %method, callback_id = %callback_id);
                let handle = tokio::spawn(
                    async move {
                        match future.await {
                            Ok(value) => {
                                let message = HostMessage::Reply { callback_id, value };
                                if outbound.send(message).await.is_ok() {
                                    BrokerStats::bump(&stats.inner.replies_sent);
                                    Delivery::Sent
                                } else {
                                    BrokerStats::bump(&stats.inner.send_failures);
                                    tracing::warn!("Surface gone before deferred reply");
                                    Delivery::SendFailed
                                }
                            }
                            Err(err) => {
                                BrokerStats::bump(&stats.inner.rejected);
                                tracing::warn!(error = %err, "Deferred invocation failed");
                                Delivery::Rejected
                            }
                        }
                    }
                    .instrument(span),
                );
                InvokeOutcome::Deferred(handle)
            }
        }
    }

    /// Run a `quit` result to completion without replying
    fn discard(
        &self,
        window: &str,
        method: &str,
        result: Result<Invocation, OperationError>,
    ) -> InvokeOutcome {
        match result {
            Err(err) => {
                BrokerStats::bump(&self.stats.inner.rejected);
                tracing::warn!(window = %window, method = %method, error = %err, "Remote invocation failed");
                InvokeOutcome::Rejected
            }
            Ok(Invocation::Immediate(_)) => InvokeOutcome::Suppressed,
            Ok(Invocation::Deferred(future)) => {
                let span = tracing::debug_span!("discarded_reply", window = %window, method = %method);
                tokio::spawn(
                    async move {
                        if let Err(err) = future.await {
                            tracing::warn!(error = %err, "Deferred invocation failed");
                        }
                    }
                    .instrument(span),
                );
                InvokeOutcome::Suppressed
            }
        }
    }
}
