//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. Infrastructure
/// concerns (store conflicts, lock timeouts) belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing required input. The caller must fix the input;
    /// retrying unchanged will fail again.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity is not in the required state for this operation.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// A state-machine guard rejected the transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Idempotency guard tripped: the record this operation would create is
    /// already linked. Safe for callers to treat as a no-op success.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A scan/checkpoint did not match its expected target. Recoverable; the
    /// caller may retry the same checkpoint.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Completion attempted while lines remain neither confirmed nor short.
    #[error("incomplete pick: {0}")]
    IncompletePick(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested entity was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    pub fn incomplete_pick(msg: impl Into<String>) -> Self {
        Self::IncompletePick(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
