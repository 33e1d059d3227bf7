//! Bounded ring of `RollbackPoint` audit snapshots. A snapshot is
//! recorded by `start_canary`; `rollback` scans newest-to-oldest for a
//! matching `variant_id` but never reapplies it — the snapshot is
//! audit only.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::variant::VariantStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub status: VariantStatus,
    pub changes: HashMap<String, Value>,
    pub canary_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackPoint {
    pub point_id: String,
    pub variant_id: String,
    pub state_snapshot: VariantSnapshot,
    pub created_at: DateTime<Utc>,
}

impl RollbackPoint {
    pub fn new(variant_id: impl Into<String>, state_snapshot: VariantSnapshot) -> Self {
        Self {
            point_id: Uuid::new_v4().to_string(),
            variant_id: variant_id.into(),
            state_snapshot,
            created_at: Utc::now(),
        }
    }
}

/// Bounded, arrival-ordered deque of rollback points, evicting the
/// oldest once `capacity` is exceeded.
#[derive(Debug)]
pub struct RollbackRing {
    capacity: usize,
    points: VecDeque<RollbackPoint>,
}

impl RollbackRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), points: VecDeque::new() }
    }

    pub fn push(&mut self, point: RollbackPoint) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Newest-to-oldest scan for the most recent point matching
    /// `variant_id`. Does not remove it — the ring is an audit trail.
    pub fn most_recent_for(&self, variant_id: &str) -> Option<&RollbackPoint> {
        self.points.iter().rev().find(|p| p.variant_id == variant_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RollbackPoint> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> VariantSnapshot {
        VariantSnapshot { status: VariantStatus::Canary, changes: HashMap::new(), canary_percentage: 0.1 }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut ring = RollbackRing::new(2);
        ring.push(RollbackPoint::new("v1", snap()));
        ring.push(RollbackPoint::new("v2", snap()));
        ring.push(RollbackPoint::new("v3", snap()));
        assert_eq!(ring.len(), 2);
        assert!(ring.most_recent_for("v1").is_none());
    }

    #[test]
    fn most_recent_for_prefers_latest_matching() {
        let mut ring = RollbackRing::new(10);
        ring.push(RollbackPoint::new("v1", VariantSnapshot { canary_percentage: 0.1, ..snap() }));
        ring.push(RollbackPoint::new("v1", VariantSnapshot { canary_percentage: 0.3, ..snap() }));
        let found = ring.most_recent_for("v1").unwrap();
        assert_eq!(found.state_snapshot.canary_percentage, 0.3);
    }
}
