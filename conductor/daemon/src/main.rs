//! Host Conductor Daemon
//!
//! Runs a conductor over the headless platform and lets surface shells attach
//! to its windows through a Unix socket.
//!
//! # Usage
//!
//! ```bash
//! # Start with default socket path ($XDG_RUNTIME_DIR/host-conductor/conductor.sock)
//! host-conductor-daemon --root /opt/app
//!
//! # Custom socket and configuration file
//! host-conductor-daemon --socket /tmp/host.sock --config ./host.toml
//!
//! # With verbose logging
//! RUST_LOG=debug host-conductor-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `HOST_CONDUCTOR_SOCKET`: Custom Unix socket path
//! - `HOST_CONDUCTOR_ROOT`: Application root path
//! - `HOST_CONDUCTOR_DEBUG`: Debug mode
//! - `HOST_CONDUCTOR_DEV_URL`: Development server URL
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown (removes PID file and socket)

mod server;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use host_conductor::headless::HeadlessPlatform;
use host_conductor::{load_config_from_path, Conductor, ConfigOverrides, HostHandle};

use crate::server::{default_socket_path, DaemonServer, ServerConfig};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "host-conductor-daemon", version, about)]
struct Args {
    /// Unix socket path
    #[arg(long, env = "HOST_CONDUCTOR_SOCKET")]
    socket: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/host-conductor/conductor.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Application root path
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Load surfaces from a development server
    #[arg(long)]
    dev_url: Option<String>,

    /// Maximum number of attached shells
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

/// Get the default PID file path next to the socket
fn pid_path_for(socket: &Path) -> PathBuf {
    socket.with_file_name("conductor.pid")
}

/// Write the PID file
fn write_pid_file(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();
    let mut file = fs::File::create(path)?;
    writeln!(file, "{pid}")?;

    info!(pid = pid, path = ?path, "PID file created");
    Ok(())
}

/// Remove the PID file
fn remove_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(error = %e, path = ?path, "Failed to remove PID file");
        } else {
            info!(path = ?path, "PID file removed");
        }
    }
}

/// Turn SIGINT/SIGTERM into a conductor shutdown
fn spawn_signal_handler(host: HostHandle) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            () = ctrl_c => info!("Received Ctrl+C, shutting down"),
            () = terminate => info!("Received SIGTERM, shutting down"),
        }

        host.shutdown();
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("host_conductor_daemon=info".parse()?)
                .add_directive("host_conductor=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!(pid = std::process::id(), "Starting host conductor daemon");

    let mut config = load_config_from_path(
        args.config
            .clone()
            .or_else(host_conductor::default_config_path),
    )
    .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(root) = args.root.clone() {
        overrides = overrides.with_root_path(root);
    }
    if args.debug {
        overrides = overrides.with_debug(true);
    }
    if let Some(url) = args.dev_url.clone() {
        overrides = overrides.with_dev_server_url(url);
    }
    overrides.apply(&mut config);
    info!(source = %config.source(), root = %config.root_path.display(), "Configuration loaded");

    let platform = Arc::new(HeadlessPlatform::new());
    let mut conductor = Conductor::new(config, Arc::clone(&platform))
        .context("Invalid configuration")?;
    conductor.ready().context("Failed to open the start window")?;

    let socket_path = args.socket.clone().unwrap_or_else(default_socket_path);
    let pid_path = pid_path_for(&socket_path);
    write_pid_file(&pid_path).with_context(|| {
        format!("Failed to write PID file at {pid_path:?}. Check directory permissions.")
    })?;

    let server = DaemonServer::new(
        socket_path.clone(),
        Arc::clone(&platform),
        conductor.handle(),
        ServerConfig {
            max_connections: args.max_connections,
        },
    );
    let listener = match server.bind() {
        Ok(listener) => listener,
        Err(e) => {
            remove_pid_file(&pid_path);
            return Err(e.context("Another daemon may be running"));
        }
    };

    let server = Arc::new(server);
    let (stop_tx, stop_rx) = watch::channel(false);
    let server_task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(listener, stop_rx).await })
    };

    spawn_signal_handler(conductor.handle());
    info!(path = ?socket_path, "Ready to accept connections");

    let reason = conductor.run().await;
    info!(
        reason = ?reason,
        active_connections = server.connection_count(),
        "Conductor finished, stopping server"
    );
    for (conn_id, stats) in server.connection_stats() {
        info!(
            conn_id = %conn_id,
            window = ?stats.window,
            peer_uid = ?stats.peer_uid,
            uptime_secs = stats.uptime_secs,
            "Dropping attached shell"
        );
    }

    let _ = stop_tx.send(true);
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Shutdown error"),
        Err(e) => error!(error = %e, "Server task failed"),
    }

    remove_pid_file(&pid_path);
    info!("Host conductor daemon stopped cleanly");
    Ok(())
}
