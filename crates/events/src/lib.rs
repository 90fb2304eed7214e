//! Domain events emitted from warehouse operations.
//!
//! Each domain crate defines its own event enum and implements [`Event`];
//! the envelope types carry the tenant/stream metadata the store needs to
//! persist and replay them.

pub mod envelope;
pub mod event;

pub use envelope::{StoredEvent, UncommittedEvent};
pub use event::Event;
