//! `stockflow-infra` — infrastructure around the warehouse domain crates.
//!
//! Provides the append-only event store (with the expected-version
//! compare-and-set backing at-most-once creation), the per-entity writer
//! locks, the collaborator ports of the core, and the application services
//! that wire side effects around pure aggregate decisions.

pub mod event_store;
pub mod locks;
pub mod ports;
pub mod services;


pub use event_store::{
    EventStore, ExpectedVersion, InMemoryEventStore, StoreError, StoredEvent, UncommittedEvent,
};
pub use locks::{EntityGuard, EntityLocks, LockError};
pub use ports::{
    CommitmentSource, DeliveryInfoSource, InMemoryCommitments, InMemoryDeliveryInfo, InMemoryFleet,
    OrderDeliveryInfo, PortError, RecordingStockLedger, StockLedger, VehicleDirectory,
    VehicleProfile,
};
pub use services::{
    FulfillmentService, PickingService, ReceivingService, RoutingService, ServiceError,
    ServiceResult, ShippingService,
};
