//! Application services: one per pipeline stage.
//!
//! A service wires side effects (collaborator calls, stock signals) around
//! the pure aggregate decision, under the entity's writer lock:
//!
//! ```text
//! acquire lock → load stream → rehydrate → handle (pure)
//!     → side effects → append (compare-and-set) → release lock
//! ```
//!
//! Side effects happen before the single append that commits the
//! transition, so a failed side effect leaves the entity untouched. When an
//! append still conflicts (an out-of-band writer), creation services reload
//! and translate the conflict into `AlreadyExists` where the link is
//! already present.

mod fulfillment;
mod picking;
mod receiving;
mod routing;
mod shipping;

pub use fulfillment::FulfillmentService;
pub use picking::PickingService;
pub use receiving::ReceivingService;
pub use routing::RoutingService;
pub use shipping::ShippingService;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use stockflow_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, TenantId};

use crate::event_store::{EventStore, StoreError, StoredEvent, UncommittedEvent};
use crate::locks::LockError;
use crate::ports::PortError;

/// Service-level failure: a domain rejection or an infrastructure problem
/// around it.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Port(#[from] PortError),

    /// A stored payload no longer matches the aggregate's event type.
    #[error("stored event could not be decoded: {0}")]
    Codec(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Rebuild an aggregate from its stream.
fn rehydrate<A, S>(
    store: &S,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    make: impl FnOnce() -> A,
) -> ServiceResult<A>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
    S: EventStore,
{
    let mut history = store.load_stream(tenant_id, aggregate_id)?;
    history.sort_by_key(|e| e.sequence_number);

    let mut aggregate = make();
    for stored in history {
        let event: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| ServiceError::Codec(e.to_string()))?;
        aggregate.apply(&event);
    }
    Ok(aggregate)
}

/// Append decided events to the aggregate's stream at the expected version.
fn append_events<A, S>(
    store: &S,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    events: &[A::Event],
    expected: ExpectedVersion,
) -> Result<Vec<StoredEvent>, StoreError>
where
    A: Aggregate,
    A::Event: stockflow_events::Event + Serialize,
    S: EventStore,
{
    let uncommitted = events
        .iter()
        .map(|event| {
            UncommittedEvent::from_typed(tenant_id, aggregate_id, A::KIND, event).map_err(|e| {
                StoreError::InvalidAppend(format!("payload serialization failed: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    store.append(uncommitted, expected)
}

/// Load, decide, append, evolve: the whole pipeline for a command with no
/// side effects between decision and append. Callers hold the entity lock.
fn run_command<A, S>(
    store: &S,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    command: &A::Command,
    make: impl FnOnce() -> A,
) -> ServiceResult<A>
where
    A: Aggregate<Error = DomainError>,
    A::Event: stockflow_events::Event + Serialize + DeserializeOwned,
    S: EventStore,
{
    let mut aggregate = rehydrate(store, tenant_id, aggregate_id, make)?;
    let expected = ExpectedVersion::Exact(aggregate.version());

    let events = aggregate.handle(command).map_err(ServiceError::Domain)?;
    if events.is_empty() {
        return Ok(aggregate);
    }

    append_events::<A, S>(store, tenant_id, aggregate_id, &events, expected)?;
    for event in &events {
        aggregate.apply(event);
    }
    Ok(aggregate)
}
