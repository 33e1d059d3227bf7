//! Owns the bus plus the two background tasks implied by the design: a
//! periodic snapshot loop and (when persistence is enabled) a sink flush
//! loop. Both are stoppable: `stop()` signals the loops and waits
//! (bounded) for them to exit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use concord_core::{ConcordError, FlowType};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::alerts::AlertManager;
use crate::bus::{BusStats, ObservationBus, SharedBus};
use crate::flow_event::FlowEvent;
use crate::persistence::PersistenceSink;
use crate::ring::Ring;

#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_published: u64,
    pub ring_size: usize,
    pub events_by_type: HashMap<String, u64>,
    pub events_by_severity: HashMap<String, u64>,
    pub active_alerts: usize,
}

pub struct ObservationManagerConfig {
    pub ring_capacity: usize,
    pub snapshot_interval: Duration,
    pub snapshot_capacity: usize,
    pub alerts_enabled: bool,
    pub alert_ring_capacity: usize,
}

impl Default for ObservationManagerConfig {
    fn default() -> Self {
        Self {
            ring_capacity: crate::bus::DEFAULT_RING_CAPACITY,
            snapshot_interval: Duration::from_secs(5),
            snapshot_capacity: 1_000,
            alerts_enabled: true,
            alert_ring_capacity: 1_000,
        }
    }
}

/// The Observation Manager: composes the bus, the optional alert
/// manager, the optional persistence sink, and the two background
/// loops named in the concurrency design.
pub struct ObservationManager {
    pub bus: SharedBus,
    pub alerts: Option<Arc<AlertManager>>,
    persistence: Mutex<Option<Arc<PersistenceSink>>>,
    snapshots: Arc<Mutex<Ring<FlowSnapshot>>>,
    snapshot_interval: Duration,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    snapshot_task: Mutex<Option<JoinHandle<()>>>,
}

impl ObservationManager {
    pub fn new(config: ObservationManagerConfig) -> Arc<Self> {
        let bus = Arc::new(ObservationBus::new(config.ring_capacity));
        let alerts = if config.alerts_enabled {
            Some(Arc::new(AlertManager::new(config.alert_ring_capacity)))
        } else {
            None
        };
        let manager = Arc::new(Self {
            bus: bus.clone(),
            alerts: alerts.clone(),
            persistence: Mutex::new(None),
            snapshots: Arc::new(Mutex::new(Ring::new(config.snapshot_capacity))),
            snapshot_interval: config.snapshot_interval,
            shutdown_tx: Mutex::new(None),
            snapshot_task: Mutex::new(None),
        });

        if let Some(alert_mgr) = &manager.alerts {
            let alert_mgr = alert_mgr.clone();
            bus.subscribe(
                "__alert_manager",
                None,
                Box::new(move |event: &FlowEvent| alert_mgr.handle_event(event)),
            );
        }

        manager
    }

    pub fn enable_persistence(&self, sink: PersistenceSink) {
        let sink = Arc::new(sink);
        *self.persistence.lock() = Some(sink.clone());
        self.bus.subscribe(
            "__persistence_sink",
            None,
            Box::new(move |event: &FlowEvent| {
                if let Err(e) = sink.record(event.clone()) {
                    warn!(error = %e, "persistence sink failed to record event");
                }
            }),
        );
    }

    pub fn publish(&self, event: FlowEvent) {
        self.bus.publish(event);
    }

    pub fn flush_persistence(&self) -> Result<(), ConcordError> {
        if let Some(sink) = self.persistence.lock().as_ref() {
            sink.flush()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> BusStats {
        self.bus.stats()
    }

    pub fn recent_snapshots(&self, n: usize) -> Vec<FlowSnapshot> {
        self.snapshots.lock().last_n(n).into_iter().cloned().collect()
    }

    fn take_snapshot(&self) -> FlowSnapshot {
        let stats = self.bus.stats();
        FlowSnapshot {
            timestamp: Utc::now(),
            total_published: stats.total_published,
            ring_size: stats.ring_size,
            events_by_type: stats.events_by_type,
            events_by_severity: stats.events_by_severity,
            active_alerts: self.alerts.as_ref().map(|a| a.recent(usize::MAX).len()).unwrap_or(0),
        }
    }

    /// Starts the periodic snapshot loop. Idempotent: calling twice
    /// without an intervening `stop()` is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.snapshot_task.lock().is_some() {
            return;
        }
        let (tx, mut rx) = watch::channel(false);
        *self.shutdown_tx.lock() = Some(tx);

        let manager = self.clone();
        let interval = self.snapshot_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = manager.take_snapshot();
                        manager.snapshots.lock().push(snapshot);
                        debug!("observation snapshot captured");
                    }
                    _ = rx.changed() => {
                        if *rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        *self.snapshot_task.lock() = Some(handle);
    }

    /// Signals the snapshot loop to stop and waits (bounded) for it to
    /// exit, then drains the persistence sink's buffer.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(true);
        }
        let handle = self.snapshot_task.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
        if let Err(e) = self.flush_persistence() {
            warn!(error = %e, "failed to flush persistence sink on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::Severity;

    #[tokio::test]
    async fn start_and_stop_is_clean() {
        let manager = ObservationManager::new(ObservationManagerConfig {
            snapshot_interval: Duration::from_millis(20),
            ..Default::default()
        });
        manager.start();
        manager.publish(FlowEvent::new(FlowType::System, "boot", Severity::Info, "boot"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        manager.stop().await;
        assert!(!manager.recent_snapshots(10).is_empty());
    }

    #[tokio::test]
    async fn critical_event_surfaces_as_alert() {
        let manager = ObservationManager::new(ObservationManagerConfig::default());
        manager.publish(FlowEvent::new(
            FlowType::System,
            "disk_full",
            Severity::Critical,
            "disk full",
        ));
        assert_eq!(manager.alerts.as_ref().unwrap().recent(10).len(), 1);
    }
}
