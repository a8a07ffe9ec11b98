use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::DisplayBackend;
use crate::descriptor::DisplayDescriptor;
use crate::error::{Result, TopologyError};

const EVENT_CAPACITY: usize = 32;

/// Hot-plug notification
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Added(DisplayDescriptor),
    Removed(u32),
    MetricsChanged(DisplayDescriptor),
}

impl DisplayEvent {
    pub fn display_id(&self) -> u32 {
        match self {
            DisplayEvent::Added(d) | DisplayEvent::MetricsChanged(d) => d.id,
            DisplayEvent::Removed(id) => *id,
        }
    }
}

/// Live view of the connected displays
///
/// Every query re-enumerates through the backend. Cloning shares the
/// backend and the subscriber list.
#[derive(Clone)]
pub struct DisplayTopology {
    backend: Arc<dyn DisplayBackend>,
    events: broadcast::Sender<DisplayEvent>,
}

impl DisplayTopology {
    pub fn new(backend: Arc<dyn DisplayBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, events }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Enumerate, surfacing backend failures.
    pub async fn try_displays(&self) -> Result<Vec<DisplayDescriptor>> {
        let backend = self.backend.clone();
        let raw = tokio::task::spawn_blocking(move || backend.enumerate())
            .await
            .map_err(|e| TopologyError::Enumeration(format!("enumeration task failed: {}", e)))??;

        Ok(raw.into_iter().map(DisplayDescriptor::from_raw).collect())
    }

    /// All current displays; empty when enumeration fails.
    pub async fn displays(&self) -> Vec<DisplayDescriptor> {
        match self.try_displays().await {
            Ok(displays) => displays,
            Err(e) => {
                warn!("Display enumeration failed ({}): {}", self.backend.name(), e);
                Vec::new()
            }
        }
    }

    pub async fn primary(&self) -> Option<DisplayDescriptor> {
        primary_of(&self.displays().await).cloned()
    }

    pub async fn secondary(&self) -> Option<DisplayDescriptor> {
        secondary_of(&self.displays().await).cloned()
    }

    pub async fn by_id(&self, id: u32) -> Option<DisplayDescriptor> {
        self.displays().await.into_iter().find(|d| d.id == id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    /// Deliver an event to every current subscriber.
    pub fn publish(&self, event: DisplayEvent) -> usize {
        debug!("Display event: {:?}", event);
        // Err only means nobody is listening
        self.events.send(event).unwrap_or(0)
    }

    /// Enumerate once and publish the differences against `known`.
    ///
    /// A failed enumeration publishes nothing and leaves `known` alone, so a
    /// transient backend error never looks like every display unplugging.
    pub async fn poll_changes(&self, known: &mut Vec<DisplayDescriptor>) -> usize {
        let current = match self.try_displays().await {
            Ok(current) => current,
            Err(e) => {
                warn!("Skipping topology poll: {}", e);
                return 0;
            }
        };

        let events = diff(known, &current);
        let count = events.len();
        for event in events {
            match &event {
                DisplayEvent::Added(d) => info!("Display connected: {} ({})", d.friendly_name, d.id),
                DisplayEvent::Removed(id) => info!("Display disconnected: {}", id),
                DisplayEvent::MetricsChanged(d) => {
                    info!("Display metrics changed: {} ({})", d.friendly_name, d.id)
                }
            }
            self.publish(event);
        }

        *known = current;
        count
    }

    /// Poll the backend on `interval` and publish hot-plug events.
    pub fn spawn_watcher(&self, interval: Duration) -> JoinHandle<()> {
        let topology = self.clone();
        tokio::spawn(async move {
            let mut known = topology.displays().await;
            info!(
                "Display watcher started ({} backend, {} displays, every {:?})",
                topology.backend_name(),
                known.len(),
                interval
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                topology.poll_changes(&mut known).await;
            }
        })
    }
}

/// Display flagged primary, else the first enumerated.
pub fn primary_of(displays: &[DisplayDescriptor]) -> Option<&DisplayDescriptor> {
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
}

/// First non-primary display; `None` unless at least two are connected.
pub fn secondary_of(displays: &[DisplayDescriptor]) -> Option<&DisplayDescriptor> {
    if displays.len() <= 1 {
        return None;
    }
    displays.iter().find(|d| !d.is_primary)
}

/// Removals first, then additions and metric changes in enumeration order.
pub fn diff(previous: &[DisplayDescriptor], current: &[DisplayDescriptor]) -> Vec<DisplayEvent> {
    let mut events: Vec<DisplayEvent> = previous
        .iter()
        .filter(|old| !current.iter().any(|d| d.id == old.id))
        .map(|old| DisplayEvent::Removed(old.id))
        .collect();

    for display in current {
        match previous.iter().find(|old| old.id == display.id) {
            None => events.push(DisplayEvent::Added(display.clone())),
            Some(old) if old.metrics_differ(display) => {
                events.push(DisplayEvent::MetricsChanged(display.clone()))
            }
            Some(_) => {}
        }
    }

    events
}
