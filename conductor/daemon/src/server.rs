//! Daemon Server Implementation
//!
//! This module provides the socket front end of the host daemon:
//! - Accepts shell connections on a Unix socket
//! - Binds each connection to one conductor window (`Attach`)
//! - Feeds shell frames into the conductor and writes host messages back
//! - Supports graceful shutdown
//!
//! # Multi-Surface Architecture
//!
//! ```text
//!                     DaemonServer
//!                          │
//!          ┌───────────────┼───────────────┐
//!          │               │               │
//!     shell "main"   shell "login"   shell "main-0"
//!       (conn-1)        (conn-2)        (conn-3)
//!          │               │               │
//!          └───────────────┴───────────────┘
//!                          │ HostHandle
//!                      Conductor
//! ```
//!
//! A shell that disconnects takes its window with it: the window is reported
//! closed, as if the native window had died. The attached shell also shows
//! the window's dialogs (close confirmation, crash recovery) and sends back
//! the user's choice.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use host_conductor::headless::HeadlessPlatform;
use host_conductor::transport::{read_frame, write_frame, FrameDecoder};
use host_conductor::{HostHandle, HostMessage, ShellFrame, TransportError, WindowSignal};

/// Unique identifier for a shell connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state tracking
struct ConnectionState {
    /// When the connection was established
    connected_at: Instant,
    /// Remote peer UID (from SO_PEERCRED)
    peer_uid: Option<u32>,
    /// Window the shell attached to
    window: Option<String>,
    /// Handle to abort the connection task
    abort_handle: tokio::task::AbortHandle,
}

/// Configuration for the daemon server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
        }
    }
}

/// Get the default socket path
///
/// Uses `XDG_RUNTIME_DIR` if available, otherwise `/tmp/host-conductor-$UID/`
#[must_use]
pub fn default_socket_path() -> PathBuf {
    match std::env::var("XDG_RUNTIME_DIR") {
        Ok(runtime_dir) => PathBuf::from(runtime_dir)
            .join("host-conductor")
            .join("conductor.sock"),
        Err(_) => PathBuf::from(format!(
            "/tmp/host-conductor-{}/conductor.sock",
            nix::unistd::getuid()
        )),
    }
}

/// Everything a connection task needs
#[derive(Clone)]
struct Shared {
    platform: Arc<HeadlessPlatform>,
    host: HostHandle,
    connections: Arc<DashMap<ConnectionId, ConnectionState>>,
}

/// The socket front end of the daemon
pub struct DaemonServer {
    /// Path to the Unix socket
    socket_path: PathBuf,
    /// Server configuration
    server_config: ServerConfig,
    /// State shared with connection tasks
    shared: Shared,
}

impl DaemonServer {
    /// Create a server feeding `host` and attaching to windows of `platform`
    #[must_use]
    pub fn new(
        socket_path: PathBuf,
        platform: Arc<HeadlessPlatform>,
        host: HostHandle,
        server_config: ServerConfig,
    ) -> Self {
        Self {
            socket_path,
            server_config,
            shared: Shared {
                platform,
                host,
                connections: Arc::new(DashMap::new()),
            },
        }
    }

    /// Get peer credentials from Unix socket
    #[cfg(unix)]
    fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
        use std::os::unix::io::AsRawFd;

        let fd = stream.as_raw_fd();
        // SAFETY: ucred is plain old data; getsockopt fills at most `len` bytes
        let mut cred: libc::ucred = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: fd is a live socket owned by `stream`
        let result = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                std::ptr::addr_of_mut!(cred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if result == 0 {
            Some(cred.uid)
        } else {
            None
        }
    }

    /// Prepare the socket path (create directory, remove stale socket)
    fn prepare_socket(&self) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create socket directory: {parent:?}"))?;
                info!(path = ?parent, "Created socket directory");
            }
        }

        if self.socket_path.exists() {
            warn!(path = ?self.socket_path, "Removing stale socket file");
            fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove stale socket: {:?}", self.socket_path)
            })?;
        }

        Ok(())
    }

    /// Bind the socket with owner-only permissions
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be prepared or bound.
    pub fn bind(&self) -> Result<UnixListener> {
        self.prepare_socket()?;

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to {:?}", self.socket_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.socket_path, perms)?;
        }

        info!(path = ?self.socket_path, "Listening for connections");
        Ok(listener)
    }

    /// Accept connections until `shutdown` flips to `true`
    ///
    /// # Errors
    ///
    /// Returns an error if the socket file cannot be removed afterwards.
    pub async fn serve(
        &self,
        listener: UnixListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, stopping accept loop");
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => self.admit(stream),
                    Err(e) => error!(error = %e, "Accept failed"),
                },
            }
        }

        self.shutdown()
    }

    /// Run the server: bind, then serve until shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or removed.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    fn admit(&self, stream: UnixStream) {
        if self.shared.connections.len() >= self.server_config.max_connections {
            warn!("Connection limit reached, rejecting new connection");
            return;
        }

        let peer_uid = Self::get_peer_uid(&stream);
        let our_uid = nix::unistd::getuid().as_raw();
        if let Err(e) = authorize_peer(peer_uid, our_uid) {
            warn!(error = %e, peer_uid = ?peer_uid, our_uid = our_uid, "Rejecting connection");
            return;
        }

        let conn_id = ConnectionId::new();
        info!(
            conn_id = %conn_id,
            peer_uid = ?peer_uid,
            active_connections = self.shared.connections.len() + 1,
            "New connection accepted"
        );

        // Start only after the state is registered
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let shared = self.shared.clone();
        let task = tokio::spawn(
            async move {
                if registered_rx.await.is_ok() {
                    handle_connection(conn_id, stream, shared).await;
                }
            }
            .instrument(tracing::info_span!("connection", %conn_id)),
        );

        self.shared.connections.insert(
            conn_id,
            ConnectionState {
                connected_at: Instant::now(),
                peer_uid,
                window: None,
                abort_handle: task.abort_handle(),
            },
        );
        let _ = registered_tx.send(());
    }

    /// Graceful shutdown
    fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown");

        let conn_ids: Vec<ConnectionId> =
            self.shared.connections.iter().map(|r| *r.key()).collect();
        for conn_id in conn_ids {
            if let Some((_, state)) = self.shared.connections.remove(&conn_id) {
                info!(conn_id = %conn_id, window = ?state.window, "Aborting connection");
                state.abort_handle.abort();
            }
        }

        if self.socket_path.exists() {
            fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove socket: {:?}", self.socket_path))?;
            info!(path = ?self.socket_path, "Socket file removed");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Get number of active connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.connections.len()
    }

    /// Get connection statistics
    #[must_use]
    pub fn connection_stats(&self) -> HashMap<ConnectionId, ConnectionStats> {
        self.shared
            .connections
            .iter()
            .map(|r| {
                let state = r.value();
                (
                    *r.key(),
                    ConnectionStats {
                        connected_at: state.connected_at,
                        peer_uid: state.peer_uid,
                        window: state.window.clone(),
                        uptime_secs: state.connected_at.elapsed().as_secs(),
                    },
                )
            })
            .collect()
    }
}

/// Statistics for a single connection
#[derive(Debug, Clone)]
pub struct ConnectionStats {
    /// When the connection was established
    pub connected_at: Instant,
    /// Peer UID
    pub peer_uid: Option<u32>,
    /// Attached window
    pub window: Option<String>,
    /// Connection uptime in seconds
    pub uptime_secs: u64,
}

/// Accept peers running as the daemon's user or as root
///
/// Peers whose credentials cannot be read are let through; the socket's 0600
/// mode already limits who can connect.
fn authorize_peer(peer_uid: Option<u32>, our_uid: u32) -> Result<(), TransportError> {
    match peer_uid {
        Some(uid) if uid != our_uid && uid != 0 => Err(TransportError::AuthenticationFailed(
            format!("peer uid {uid} is not {our_uid}"),
        )),
        _ => Ok(()),
    }
}

/// Handle a single shell connection
///
/// The first frame must attach the connection to an open window whose
/// surface is not yet claimed. After that, frames from the shell go to the
/// conductor and messages for the window go to the shell.
async fn handle_connection(conn_id: ConnectionId, stream: UnixStream, shared: Shared) {
    debug!("Connection handler started");

    let (mut reader, mut writer) = stream.into_split();
    let mut decoder = FrameDecoder::new();

    let (window, outbound) = match attach(&mut reader, &mut decoder, &shared.platform).await {
        Ok(attached) => attached,
        Err(e) => {
            warn!(error = %e, "Attach failed");
            shared.connections.remove(&conn_id);
            return;
        }
    };
    if let Some(mut state) = shared.connections.get_mut(&conn_id) {
        state.window = Some(window.clone());
    }
    info!(window = %window, "Shell attached");

    let mut outbound: mpsc::Receiver<HostMessage> = outbound;
    let mut prompts = shared.platform.route_prompts(&window);
    let mut closed_by_host = false;
    loop {
        tokio::select! {
            frame = read_frame::<_, ShellFrame>(&mut reader, &mut decoder) => match frame {
                Ok(frame) => forward(&shared, &window, frame),
                Err(TransportError::ConnectionClosed) => {
                    info!("Shell disconnected (EOF)");
                    break;
                }
                Err(e @ (TransportError::ChecksumMismatch { .. }
                | TransportError::SerializationError(_))) => {
                    warn!(error = %e, "Dropped undecodable frame");
                }
                Err(e) => {
                    error!(error = %e, "Read error");
                    break;
                }
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write_frame(&mut writer, &message).await {
                        error!(error = %e, kind = message.kind(), "Write error");
                        break;
                    }
                }
                None => {
                    info!("Window closed by host");
                    closed_by_host = true;
                    break;
                }
            },
            Some(prompt) = prompts.recv() => {
                let message = HostMessage::Confirm {
                    message: prompt.message,
                    confirm_label: prompt.confirm_label,
                    cancel_label: prompt.cancel_label,
                };
                if let Err(e) = write_frame(&mut writer, &message).await {
                    error!(error = %e, kind = message.kind(), "Write error");
                    break;
                }
            },
        }
    }

    shared.platform.release_prompts(&window);
    // The shell owned the window's surface; without it the window is gone.
    // Once the host dropped the window its name may belong to a new one.
    if !closed_by_host && !outbound.is_closed() {
        shared.platform.destroy(&window);
    }
    shared.connections.remove(&conn_id);

    info!(
        active_connections = shared.connections.len(),
        "Connection handler finished"
    );
}

async fn attach(
    reader: &mut tokio::net::unix::OwnedReadHalf,
    decoder: &mut FrameDecoder,
    platform: &HeadlessPlatform,
) -> Result<(String, mpsc::Receiver<HostMessage>), TransportError> {
    match read_frame::<_, ShellFrame>(reader, decoder).await? {
        ShellFrame::Attach { window } => match platform.take_outbound(&window) {
            Some(outbound) => Ok((window, outbound)),
            None => Err(TransportError::Protocol(format!(
                "window {window:?} is not open or already attached"
            ))),
        },
        other => Err(TransportError::Protocol(format!(
            "expected attach, got {}",
            other.kind()
        ))),
    }
}

/// Translate one shell frame into conductor input
fn forward(shared: &Shared, window: &str, frame: ShellFrame) {
    debug!(window = %window, kind = frame.kind(), "Shell frame");
    match frame {
        ShellFrame::Attach { .. } => warn!("Ignoring repeated attach"),
        ShellFrame::Surface(event) => {
            shared.host.surface_event(window, event);
        }
        ShellFrame::RequestClose => {
            shared.platform.request_close(window);
        }
        ShellFrame::Loaded => {
            shared.platform.finish_load(window);
        }
        ShellFrame::Navigate { url } => {
            shared
                .host
                .window_signal(window, WindowSignal::WillNavigate { url }, None);
        }
        ShellFrame::NewWindow { url } => {
            shared
                .host
                .window_signal(window, WindowSignal::NewWindow { url }, None);
        }
        ShellFrame::Focus => shared.platform.focus(window),
        ShellFrame::Crashed => {
            shared.platform.crash(window);
        }
        ShellFrame::ConfirmAnswer { accepted } => {
            if !shared.platform.answer_prompt(window, accepted) {
                debug!(window = %window, "No close dialog waiting for an answer");
            }
        }
    }
}
