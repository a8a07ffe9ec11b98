use parking_lot::RwLock;

use crate::descriptor::RawDisplay;
use crate::error::{Result, TopologyError};

/// Source of raw display records
///
/// Implementations may block (spawn a subprocess, query the window system);
/// `DisplayTopology` always calls them off the async runtime.
pub trait DisplayBackend: Send + Sync {
    fn enumerate(&self) -> Result<Vec<RawDisplay>>;

    fn name(&self) -> &'static str;
}

/// In-memory display set
///
/// Used for `--headless` runs and by tests to simulate hot-plug.
#[derive(Default)]
pub struct VirtualBackend {
    displays: RwLock<Vec<RawDisplay>>,
    failing: RwLock<Option<String>>,
}

impl VirtualBackend {
    pub fn new(displays: Vec<RawDisplay>) -> Self {
        Self {
            displays: RwLock::new(displays),
            failing: RwLock::new(None),
        }
    }

    /// Replaces any display with the same id.
    pub fn connect(&self, display: RawDisplay) {
        let mut displays = self.displays.write();
        displays.retain(|d| d.id != display.id);
        displays.push(display);
    }

    pub fn disconnect(&self, id: u32) -> bool {
        let mut displays = self.displays.write();
        let before = displays.len();
        displays.retain(|d| d.id != id);
        displays.len() != before
    }

    /// Make every enumeration fail with `reason` until cleared with `None`.
    pub fn set_failing(&self, reason: Option<String>) {
        *self.failing.write() = reason;
    }
}

impl DisplayBackend for VirtualBackend {
    fn enumerate(&self) -> Result<Vec<RawDisplay>> {
        if let Some(reason) = self.failing.read().as_ref() {
            return Err(TopologyError::Enumeration(reason.clone()));
        }
        Ok(self.displays.read().clone())
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Bounds;

    #[test]
    fn test_connect_replaces_same_id() {
        let backend = VirtualBackend::new(vec![RawDisplay::new(
            1,
            "A",
            Bounds::new(0, 0, 1920, 1080),
            true,
        )]);
        backend.connect(RawDisplay::new(1, "A", Bounds::new(0, 0, 2560, 1440), true));
        let displays = backend.enumerate().unwrap();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].bounds.width, 2560);
    }

    #[test]
    fn test_disconnect_and_failure() {
        let backend = VirtualBackend::new(vec![RawDisplay::new(
            1,
            "A",
            Bounds::new(0, 0, 1920, 1080),
            true,
        )]);
        assert!(backend.disconnect(1));
        assert!(!backend.disconnect(1));

        backend.set_failing(Some("no session".to_string()));
        assert!(backend.enumerate().is_err());
        backend.set_failing(None);
        assert!(backend.enumerate().unwrap().is_empty());
    }
}
