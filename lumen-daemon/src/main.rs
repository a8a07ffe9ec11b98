//! Lumen operator daemon
//!
//! Runs next to the operator UI, owns the output window and the content
//! channel, and takes commands on a Unix socket. `lumen-daemon ctl '<json>'`
//! sends a single command to a running daemon.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lumen_broadcaster::ContentBroadcaster;
use lumen_displays::{
    detect_display_server, DisplayBackend, DisplayCapture, DisplayTopology, SessionInfo,
    VirtualBackend, WinitBackend, XrandrBackend,
};

use lumen_daemon::{
    send_command, ControlCommand, ControlConfig, ControlSurface, DisplayBackendKind,
    IpcServer, MemoryWindowBackend, OutputWindowController, ProcessWindowBackend, WindowBackend,
};

#[derive(Parser, Debug)]
#[command(name = "lumen-daemon", version, about = "Lumen presentation operator daemon")]
struct Cli {
    /// Configuration file (default: ~/.config/lumen/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the configured virtual displays and run output processes without
    /// windows
    #[arg(long)]
    headless: bool,

    /// Track output windows in memory instead of spawning lumen-output
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one JSON command to a running daemon and print the response
    Ctl {
        /// e.g. '{"command":"create_output","display_id":2}'
        json: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = match &cli.config {
        Some(path) => ControlConfig::load_from(path),
        None => ControlConfig::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(Command::Ctl { json }) = cli.command {
        return run_ctl(&config, &json).await;
    }

    info!("Starting Lumen daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config.config_path.display());

    run_daemon(config, cli.headless, cli.dry_run).await
}

async fn run_ctl(config: &ControlConfig, json: &str) -> Result<()> {
    let command: ControlCommand =
        serde_json::from_str(json).context("Command is not a valid control command")?;
    let socket_path = config.ipc_socket_path()?;

    let response = send_command(&socket_path, &command).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn xrandr_backend(session: &SessionInfo) -> Arc<dyn DisplayBackend> {
    if !session.xrandr_is_authoritative() {
        warn!("xrandr only sees XWayland outputs in this session; display geometry may be approximate");
    }
    Arc::new(XrandrBackend::new())
}

async fn run_daemon(config: ControlConfig, headless: bool, dry_run: bool) -> Result<()> {
    let session = detect_display_server();
    info!(
        "Display server: {:?} (confidence {:?}, desktop {:?})",
        session.server, session.confidence, session.desktop_environment
    );

    let backend_kind = if headless {
        DisplayBackendKind::Virtual
    } else {
        config.display_backend
    };
    let display_backend: Arc<dyn DisplayBackend> = match backend_kind {
        DisplayBackendKind::Virtual => {
            info!("Using {} virtual display(s)", config.virtual_displays.len());
            Arc::new(VirtualBackend::new(config.virtual_displays.clone()))
        }
        DisplayBackendKind::Winit => match WinitBackend::spawn() {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                warn!("Window-system display enumeration unavailable ({}); using xrandr", e);
                xrandr_backend(&session)
            }
        },
        DisplayBackendKind::Xrandr => xrandr_backend(&session),
    };
    let topology = DisplayTopology::new(display_backend);

    let displays = topology.displays().await;
    info!("{} display(s) connected", displays.len());
    for connected in &displays {
        info!(
            "  - [{}] {} {}x{} at ({}, {}){}",
            connected.id,
            connected.friendly_name,
            connected.bounds.width,
            connected.bounds.height,
            connected.bounds.x,
            connected.bounds.y,
            if connected.is_primary { " (primary)" } else { "" }
        );
    }

    let output_socket = config.output_socket_path()?;
    let channel = Arc::new(
        ContentBroadcaster::new(&output_socket)
            .await
            .context("Failed to create content channel")?,
    );
    channel
        .start()
        .await
        .context("Failed to start content channel")?;

    let window_backend: Arc<dyn WindowBackend> = if dry_run {
        info!("Dry run: output windows are tracked in memory only");
        Arc::new(MemoryWindowBackend::new())
    } else {
        let binary = config.output_binary();
        info!("Output process: {}", binary.display());
        Arc::new(
            ProcessWindowBackend::new(binary, output_socket.clone()).with_headless(headless),
        )
    };

    let capture = DisplayCapture::detect(config.capture_thumbnail_width)
        .with_timeout(config.capture_timeout());
    match capture.tool() {
        Some(tool) => info!("Display capture via {}", tool.command()),
        None => warn!("No capture tool found; capture_display will return nothing"),
    }

    let controller = Arc::new(OutputWindowController::new(
        topology.clone(),
        window_backend,
        channel,
        capture,
        config.controller_options(),
    ));
    let surface = Arc::new(ControlSurface::new(
        controller.clone(),
        config.history_limit,
        config.default_transition,
        config.auto_advance_delay(),
    ));

    let watcher = topology.spawn_watcher(config.topology_poll_interval());
    let monitor = controller.spawn_display_monitor();

    let ipc_socket = config.ipc_socket_path()?;
    let capture_dir = lumen_paths::get_capture_dir()
        .unwrap_or_else(|_| std::env::temp_dir().join("lumen-captures"));
    let ipc_server = IpcServer::new(&ipc_socket, surface.clone(), capture_dir)
        .context("Failed to start IPC server")?;

    info!("Lumen daemon ready");

    tokio::select! {
        result = ipc_server.run() => {
            if let Err(e) = result {
                error!("IPC server error: {}", e);
            }
        }
        _ = surface.shutdown_requested() => {
            info!("Shutdown requested over IPC");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down...");
    watcher.abort();
    monitor.abort();
    surface.shutdown().await;
    drop(ipc_server);
    info!("Lumen daemon stopped");

    Ok(())
}
