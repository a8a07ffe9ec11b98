//! Lumen output process
//!
//! Spawned by the operator daemon, one per output window:
//!
//! ```text
//! lumen-output --socket <path> --display-id 2 --x=1920 --y=0 --width=1920 --height=1080
//! ```
//!
//! The window event loop owns the main thread; the content channel and the
//! stdin command reader run on a tokio runtime beside it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

use lumen_broadcaster::{OutputEvent, OutputReceiver};
use lumen_output::{
    read_commands, CommandsEnd, ContentRenderer, LogSurface, LoopEvent, OutputApp, OutputLoop,
    Placement,
};

/// How long exit waits on tasks still blocked on stdin or the socket
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "lumen-output", version, about = "Lumen full-screen output surface")]
struct Args {
    /// Content channel socket (default: the platform socket directory)
    #[arg(long)]
    socket: Option<PathBuf>,

    #[arg(long)]
    display_id: u32,

    #[arg(long, allow_hyphen_values = true)]
    x: i32,

    #[arg(long, allow_hyphen_values = true)]
    y: i32,

    #[arg(long)]
    width: u32,

    #[arg(long)]
    height: u32,

    /// Start hidden until a `show` command arrives
    #[arg(long)]
    hidden: bool,

    /// Show a test pattern instead of attaching to the content channel
    #[arg(long)]
    test_pattern: bool,

    /// Log frames instead of opening a window
    #[arg(long)]
    headless: bool,

    /// Milliseconds between frames while animating
    #[arg(long, default_value_t = 16)]
    frame_interval_ms: u64,
}

impl Args {
    fn placement(&self) -> Placement {
        Placement {
            display_id: self.display_id,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // stdout is left alone; the daemon only reads our exit status
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let (stop_commands, commands_shutdown) = oneshot::channel();
    let result = if args.headless {
        run_headless(&runtime, &args, commands_shutdown)
    } else {
        run_window(&runtime, &args, commands_shutdown)
    };

    let _ = stop_commands.send(());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    info!("Output process exiting");
    result
}

/// Attach to the content channel unless showing a test pattern.
fn spawn_receiver(
    runtime: &Runtime,
    args: &Args,
) -> Result<Option<mpsc::UnboundedReceiver<OutputEvent>>> {
    if args.test_pattern {
        info!("Test pattern on display {}", args.display_id);
        return Ok(None);
    }

    let socket_path = match &args.socket {
        Some(path) => path.clone(),
        None => lumen_paths::get_output_socket_path()
            .context("Failed to resolve content channel socket")?,
    };
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut receiver = OutputReceiver::new(socket_path);
    runtime.spawn(async move { receiver.listen(event_tx).await });
    Ok(Some(event_rx))
}

fn run_headless(runtime: &Runtime, args: &Args, shutdown: oneshot::Receiver<()>) -> Result<()> {
    let placement = args.placement();
    let surface = LogSurface::new(placement, !args.hidden);
    let mut output = OutputLoop::new(ContentRenderer::default(), surface)
        .with_frame_interval(args.frame_interval());

    let event_rx = match spawn_receiver(runtime, args)? {
        Some(event_rx) => event_rx,
        None => {
            output = output.with_test_pattern(placement);
            // Closed at once; the pattern ignores content
            mpsc::unbounded_channel().1
        }
    };

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    runtime.spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        read_commands(stdin, |command| command_tx.send(command).is_ok(), shutdown)
            .await
            .log();
    });

    runtime.block_on(output.run(event_rx, command_rx));
    Ok(())
}

fn run_window(runtime: &Runtime, args: &Args, shutdown: oneshot::Receiver<()>) -> Result<()> {
    let event_loop = EventLoop::<LoopEvent>::with_user_event()
        .build()
        .context("Failed to create window event loop")?;

    if let Some(mut event_rx) = spawn_receiver(runtime, args)? {
        let proxy = event_loop.create_proxy();
        runtime.spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if proxy.send_event(LoopEvent::Output(event)).is_err() {
                    break;
                }
            }
        });
    }

    let proxy = event_loop.create_proxy();
    runtime.spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        let end = read_commands(
            stdin,
            |command| proxy.send_event(LoopEvent::Command(command)).is_ok(),
            shutdown,
        )
        .await;
        end.log();
        if matches!(end, CommandsEnd::Eof) {
            let _ = proxy.send_event(LoopEvent::CommandsEnded);
        }
    });

    let mut app = OutputApp::new(args.placement(), !args.hidden, args.frame_interval());
    if args.test_pattern {
        app = app.with_test_pattern();
    }

    event_loop
        .run_app(&mut app)
        .context("Window event loop failed")?;

    match app.take_failure() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
