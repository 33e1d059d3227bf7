//! Negotiation State Machine: session-scoped proposal/counter/finalize
//! exchange of communication parameters between two agents.

pub mod analytics;
pub mod engine;
pub mod optimize;
pub mod params;
pub mod session;

pub use analytics::NegotiationAnalytics;
pub use engine::{NegotiationConfig, NegotiationEngine};
pub use optimize::OptimizationPriority;
pub use params::{CompatibilityClass, NegotiableParams};
pub use session::{NegotiationRound, NegotiationSession, SessionState, TimeoutPolicy};
