//! Window commands from the daemon, one JSON object per stdin line

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use lumen_broadcaster::WindowCommand;

/// Why the command stream stopped
#[derive(Debug)]
pub enum CommandsEnd {
    /// The daemon closed our stdin
    Eof,
    /// Whoever consumed the commands went away
    Dropped,
    /// The process is exiting
    Shutdown,
    Failed(io::Error),
}

impl CommandsEnd {
    /// Only a read failure while running is worth a warning.
    pub fn log(&self) {
        match self {
            CommandsEnd::Eof => debug!("Window command stream closed"),
            CommandsEnd::Dropped | CommandsEnd::Shutdown => debug!("Window command reader stopped"),
            CommandsEnd::Failed(e) => warn!("Failed to read window commands: {}", e),
        }
    }
}

/// Forward parsed commands until EOF, shutdown or `forward` returns `false`.
///
/// Malformed lines are skipped. Shutdown wins over a read that fails in the
/// same instant, so runtime teardown never reports as a failure.
pub async fn read_commands<R, F>(
    reader: R,
    mut forward: F,
    mut shutdown: oneshot::Receiver<()>,
) -> CommandsEnd
where
    R: AsyncBufRead + Unpin,
    F: FnMut(WindowCommand) -> bool,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => return CommandsEnd::Shutdown,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WindowCommand>(line) {
                    Ok(command) => {
                        if !forward(command) {
                            return CommandsEnd::Dropped;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed window command: {}", e),
                }
            }
            Ok(None) => return CommandsEnd::Eof,
            Err(e) => return CommandsEnd::Failed(e),
        }
    }
}
