//! Workflow Runner: deterministic named multi-step procedures built on
//! top of the Orchestrator's alignment/negotiation/emergence engines.

pub mod execution;
pub mod runner;

pub use execution::{WorkflowExecution, WorkflowStatus, WorkflowStep};
pub use runner::{WorkflowRunner, WORKFLOW_TYPES};
