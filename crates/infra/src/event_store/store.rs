use thiserror::Error;

use stockflow_core::{AggregateId, ExpectedVersion, TenantId};

pub use stockflow_events::{StoredEvent, UncommittedEvent};

/// Event store failure (infrastructure-level, not domain).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: the stream moved under the
    /// writer. Callers reload and re-evaluate.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

/// Append-only event store, the persistence surface of the core.
///
/// Implementations must enforce tenant isolation on read and write, check
/// the expected version before appending, assign gap-free sequence numbers,
/// and persist a batch atomically.
pub trait EventStore: Send + Sync {
    /// Append a batch of events to one aggregate stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError>;

    /// Load the full stream for a tenant + aggregate, in sequence order.
    /// A missing stream is an empty vector, not an error.
    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, StoreError>;
}

impl<S> EventStore for std::sync::Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).load_stream(tenant_id, aggregate_id)
    }
}
