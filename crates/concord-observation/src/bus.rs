//! In-process pub/sub of `FlowEvent`s, with a bounded recent-events ring.
//!
//! `publish` never blocks on a slow subscriber: the event is recorded and
//! the lock released before any callback runs, and a panicking callback
//! is caught at the dispatch boundary so it cannot affect the bus or
//! other subscribers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use concord_core::FlowType;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::flow_event::FlowEvent;
use crate::ring::Ring;

pub const DEFAULT_RING_CAPACITY: usize = 10_000;

pub type SubscriberCallback = Box<dyn Fn(&FlowEvent) + Send + Sync>;

struct Subscriber {
    callback: SubscriberCallback,
    filter: Option<FlowType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusStats {
    pub total_published: u64,
    pub ring_size: usize,
    pub ring_capacity: usize,
    pub subscriber_count: usize,
    pub events_by_type: HashMap<String, u64>,
    pub events_by_severity: HashMap<String, u64>,
}

struct Inner {
    ring: Ring<FlowEvent>,
    events_by_type: HashMap<String, u64>,
    events_by_severity: HashMap<String, u64>,
}

/// The Observation Bus: `publish`/`subscribe`/`unsubscribe`/`recent`/
/// `since`/`stats`, all safe under concurrent callers.
pub struct ObservationBus {
    inner: Mutex<Inner>,
    subscribers: DashMap<String, Subscriber>,
    total_published: AtomicU64,
}

impl ObservationBus {
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: Ring::new(ring_capacity),
                events_by_type: HashMap::new(),
                events_by_severity: HashMap::new(),
            }),
            subscribers: DashMap::new(),
            total_published: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: FlowEvent) {
        // Record and release the lock before touching any subscriber.
        {
            let mut inner = self.inner.lock();
            *inner.events_by_type.entry(event.flow_type.to_string()).or_insert(0) += 1;
            *inner.events_by_severity.entry(event.severity.to_string()).or_insert(0) += 1;
            inner.ring.push(event.clone());
        }
        self.total_published.fetch_add(1, Ordering::Relaxed);

        for entry in self.subscribers.iter() {
            let sub = entry.value();
            if let Some(filter) = sub.filter {
                if filter != event.flow_type {
                    continue;
                }
            }
            let callback = &sub.callback;
            let event_ref = &event;
            if catch_unwind(AssertUnwindSafe(|| callback(event_ref))).is_err() {
                warn!(subscriber_id = %entry.key(), "observation bus subscriber callback panicked; suppressed");
            }
        }
    }

    pub fn subscribe(&self, id: impl Into<String>, filter: Option<FlowType>, callback: SubscriberCallback) {
        self.subscribers.insert(id.into(), Subscriber { callback, filter });
    }

    pub fn unsubscribe(&self, id: &str) {
        self.subscribers.remove(id);
    }

    pub fn recent(&self, n: usize, flow_type: Option<FlowType>) -> Vec<FlowEvent> {
        let inner = self.inner.lock();
        match flow_type {
            None => inner.ring.last_n(n).into_iter().cloned().collect(),
            Some(ft) => {
                let mut out: Vec<FlowEvent> = inner
                    .ring
                    .iter()
                    .filter(|e| e.flow_type == ft)
                    .cloned()
                    .collect();
                if out.len() > n {
                    out = out.split_off(out.len() - n);
                }
                out
            }
        }
    }

    pub fn since(&self, timestamp: DateTime<Utc>, flow_type: Option<FlowType>) -> Vec<FlowEvent> {
        let inner = self.inner.lock();
        inner
            .ring
            .iter()
            .filter(|e| e.timestamp >= timestamp)
            .filter(|e| flow_type.map_or(true, |ft| e.flow_type == ft))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> BusStats {
        let inner = self.inner.lock();
        BusStats {
            total_published: self.total_published.load(Ordering::Relaxed),
            ring_size: inner.ring.len(),
            ring_capacity: inner.ring.capacity(),
            subscriber_count: self.subscribers.len(),
            events_by_type: inner.events_by_type.clone(),
            events_by_severity: inner.events_by_severity.clone(),
        }
    }
}

impl Default for ObservationBus {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

pub type SharedBus = Arc<ObservationBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::Severity;
    use std::sync::atomic::AtomicUsize;

    fn ev(flow_type: FlowType, name: &str) -> FlowEvent {
        FlowEvent::new(flow_type, name, Severity::Info, name)
    }

    #[test]
    fn ring_respects_capacity_and_order() {
        let bus = ObservationBus::new(2);
        bus.publish(ev(FlowType::System, "a"));
        bus.publish(ev(FlowType::System, "b"));
        bus.publish(ev(FlowType::System, "c"));
        let recent = bus.recent(10, None);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_name, "b");
        assert_eq!(recent[1].event_name, "c");
    }

    #[test]
    fn publish_does_not_block_on_panicking_subscriber() {
        let bus = ObservationBus::new(10);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        bus.subscribe("panicker", None, Box::new(|_e| panic!("boom")));
        bus.subscribe(
            "counter",
            None,
            Box::new(move |_e| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.publish(ev(FlowType::System, "x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filter_restricts_delivery() {
        let bus = ObservationBus::new(10);
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.subscribe(
            "alignment-only",
            Some(FlowType::Alignment),
            Box::new(move |_e| {
                count2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.publish(ev(FlowType::System, "irrelevant"));
        bus.publish(ev(FlowType::Alignment, "relevant"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stats_tracks_totals_and_breakdowns() {
        let bus = ObservationBus::new(10);
        bus.publish(ev(FlowType::Negotiation, "n"));
        bus.publish(ev(FlowType::Negotiation, "n2"));
        let stats = bus.stats();
        assert_eq!(stats.total_published, 2);
        assert_eq!(stats.events_by_type.get("negotiation"), Some(&2));
    }
}
