//! Error kinds shared across every coordination subsystem.
//!
//! Every engine (alignment, negotiation, emergence, orchestrator, workflows)
//! returns `ConcordResult<T>`. The tool-RPC boundary (outside this crate)
//! converts a `ConcordError` into a `{"error": "..."}` result document rather
//! than a transport-level fault.

use thiserror::Error;

/// Errors surfaced by the coordination engines.
///
/// Variants map onto the behavioral categories in the error-handling design:
/// unknown identifiers, authorization failures, illegal state transitions,
/// schema/value validation, and timeouts. `AutoRollback` is intentionally
/// absent here — an automatic rollback during `track_performance` is not an
/// error, it is a successful call whose returned variant carries
/// `status = rolled_back`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConcordError {
    /// An agent_id / session_id / variant_id / experiment_id / execution_id
    /// was not found in the owning registry or engine.
    #[error("not found: {0}")]
    NotFound(String),

    /// A negotiation operation was invoked by an agent that is neither the
    /// initiator nor the responder of the session.
    #[error("not a participant in this session: {0}")]
    NotParticipant(String),

    /// The state machine (negotiation session or protocol variant) cannot
    /// perform the requested transition from its current state.
    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    /// A value fell outside a fixed allowed-value list, or a weight vector
    /// failed to sum to 1.0.
    #[error("validation failed: {0}")]
    Validation(String),

    /// `initiate_collaboration` failed the configured alignment gate.
    /// The owning CollaborationSession is moved to `failed` with this
    /// reason recorded in its metadata; the same message is also returned
    /// to the caller.
    #[error("insufficient alignment: {0}")]
    InsufficientAlignment(String),

    /// A negotiation session expired past its deadline under
    /// `TimeoutPolicy::Fail`.
    #[error("session timed out: {0}")]
    Timeout(String),

    /// Caller-supplied identifier or argument does not match the agent the
    /// request is scoped to (e.g. registering under a duplicate domain that
    /// conflicts with a declared invariant).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Wraps an I/O failure from the optional observation persistence sink.
    #[error("io error: {0}")]
    Io(String),
}

impl ConcordError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn not_participant(agent_id: impl Into<String>) -> Self {
        Self::NotParticipant(agent_id.into())
    }

    pub fn illegal_transition(msg: impl Into<String>) -> Self {
        Self::IllegalTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_alignment(msg: impl Into<String>) -> Self {
        Self::InsufficientAlignment(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Render as the `{"error": "..."}` document the tool-RPC boundary hands
    /// back to callers instead of a transport fault.
    pub fn to_result_document(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<std::io::Error> for ConcordError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type ConcordResult<T> = Result<T, ConcordError>;
