//! Shared data model, error types, and event vocabulary for the Concord
//! coordination engine.
//!
//! Every other `concord-*` crate depends on this one and nothing in this
//! crate depends on them, keeping the dependency graph a simple star.

pub mod agent;
pub mod error;
pub mod event;

pub use agent::{AgentDescriptor, Goal};
pub use error::{ConcordError, ConcordResult};
pub use event::{FlowType, Severity};
