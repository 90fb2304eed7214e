//! Append-only, tenant-scoped event streams.
//!
//! One stream per aggregate instance, keyed by `(tenant_id, aggregate_id)`.
//! Appends carry an [`ExpectedVersion`]; the exact-version check is the
//! compare-and-set that makes at-most-once creation hold under racing
//! writers.

mod in_memory;
mod store;

pub use in_memory::InMemoryEventStore;
pub use store::{EventStore, StoreError, StoredEvent, UncommittedEvent};

pub use stockflow_core::ExpectedVersion;
