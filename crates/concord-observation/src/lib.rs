//! Observation Bus: in-process pub/sub of structured flow events, a
//! bounded recent-event ring, an optional append-only persistence sink,
//! and rule-driven alerts.

pub mod alerts;
pub mod bus;
pub mod flow_event;
pub mod manager;
pub mod persistence;
pub mod ring;

pub use alerts::{Alert, AlertManager, AlertRule};
pub use bus::{BusStats, ObservationBus, SharedBus, DEFAULT_RING_CAPACITY};
pub use flow_event::FlowEvent;
pub use manager::{FlowSnapshot, ObservationManager, ObservationManagerConfig};
pub use persistence::{PersistenceConfig, PersistenceSink};
pub use ring::Ring;
