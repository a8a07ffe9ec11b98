//! Output window abstraction
//!
//! The controller never talks to a windowing toolkit directly. It asks a
//! [`WindowBackend`] to open a full-screen, frameless, always-on-top surface
//! at a display's bounds and drives the returned [`OutputWindow`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use lumen_displays::Bounds;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Failed to open output window: {0}")]
    Open(String),

    #[error("Output window is gone")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WindowError>;

/// Placement and mode of a window to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub display_id: u32,
    pub bounds: Bounds,
    pub visible: bool,
    /// Show the calibration pattern instead of attaching to the content channel
    pub test_pattern: bool,
}

#[async_trait]
pub trait WindowBackend: Send + Sync {
    async fn open(&self, request: &WindowRequest) -> Result<Box<dyn OutputWindow>>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait OutputWindow: Send {
    async fn show(&mut self) -> Result<()>;

    async fn hide(&mut self) -> Result<()>;

    async fn move_to(&mut self, display_id: u32, bounds: Bounds) -> Result<()>;

    async fn close(&mut self) -> Result<()>;

    /// Non-blocking liveness check.
    fn is_alive(&mut self) -> bool;
}

/// One call observed by a [`MemoryWindowBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Open { window: u64, request: WindowRequest },
    Show { window: u64 },
    Hide { window: u64 },
    Move { window: u64, display_id: u32, bounds: Bounds },
    Close { window: u64 },
}

#[derive(Default)]
struct MemoryState {
    calls: Vec<WindowCall>,
    fail_opens: bool,
    open_delay: Option<Duration>,
    alive: Vec<Arc<AtomicBool>>,
}

/// Windows that exist only as a call log
///
/// Backs `--dry-run` and the controller tests. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryWindowBackend {
    state: Arc<Mutex<MemoryState>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryWindowBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.state.lock().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, WindowCall::Open { .. }))
            .count()
    }

    /// Make every subsequent `open` fail.
    pub fn fail_opens(&self, fail: bool) {
        self.state.lock().fail_opens = fail;
    }

    /// Hold every `open` for `delay` before it completes.
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        self.state.lock().open_delay = delay;
    }

    /// Simulate every open window's process dying.
    pub fn kill_all(&self) {
        for alive in &self.state.lock().alive {
            alive.store(false, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl WindowBackend for MemoryWindowBackend {
    async fn open(&self, request: &WindowRequest) -> Result<Box<dyn OutputWindow>> {
        let delay = self.state.lock().open_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_opens {
            return Err(WindowError::Open("memory backend set to fail".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let alive = Arc::new(AtomicBool::new(true));
        state.alive.push(alive.clone());
        state.calls.push(WindowCall::Open {
            window: id,
            request: *request,
        });

        Ok(Box::new(MemoryWindow {
            id,
            alive,
            state: self.state.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryWindow {
    id: u64,
    alive: Arc<AtomicBool>,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWindow {
    fn record(&self, call: WindowCall) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(WindowError::Closed);
        }
        self.state.lock().calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl OutputWindow for MemoryWindow {
    async fn show(&mut self) -> Result<()> {
        self.record(WindowCall::Show { window: self.id })
    }

    async fn hide(&mut self) -> Result<()> {
        self.record(WindowCall::Hide { window: self.id })
    }

    async fn move_to(&mut self, display_id: u32, bounds: Bounds) -> Result<()> {
        self.record(WindowCall::Move {
            window: self.id,
            display_id,
            bounds,
        })
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.record(WindowCall::Close { window: self.id });
        self.alive.store(false, Ordering::SeqCst);
        result
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
