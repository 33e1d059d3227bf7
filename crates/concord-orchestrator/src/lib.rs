//! Orchestrator: composes the Alignment Scorer, Negotiation State Machine,
//! and Emergence Engine into one `CollaborationSession` lifecycle, and owns
//! the agent registry and session-event hooks.

pub mod hooks;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use hooks::{AlignmentHook, EvolutionHook, Hooks, NegotiationHook, SessionReadyHook};
pub use orchestrator::{NegotiationResponse, Orchestrator, OrchestratorConfig};
pub use registry::AgentRegistry;
pub use session::{CollaborationSession, CollaborationState, SessionMetrics};
