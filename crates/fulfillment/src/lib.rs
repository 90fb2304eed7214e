//! Fulfillment domain module (demand orders, event-sourced).
//!
//! A demand order records what a destination needs, the bin-level allocation
//! that covers it, and the one pick list cut from that allocation. At most one
//! pick list is ever created per order.

pub mod order;

pub use order::{
    Allocate, CreateOrder, CreatePickList, DemandLine, DemandOrder, DemandOrderCommand,
    DemandOrderEvent, DemandOrderId, DemandOrderStatus, FulfillmentResult, InventoryAllocated,
    LineAllocation, OrderCreated, PickLine, PickListCreated, PickListId, PickResultRecorded,
    RecordPickResult,
};
