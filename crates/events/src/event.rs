use chrono::{DateTime, Utc};

/// A fact recorded by a warehouse aggregate.
///
/// Implemented by each module's event enum (notice, order, pick list,
/// shipment, packing list, route). The store persists events as JSON
/// payloads under envelope metadata, so the contract stays narrow: a stable
/// name, a schema version and business time.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted event name (e.g. "picking.pick_list.assigned").
    /// The name is what gets stored; renaming one is a schema change.
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type, bumped on incompatible payload
    /// changes.
    fn version(&self) -> u32;

    /// Business time: when the operation happened as supplied by the
    /// command, not when the event was stored.
    fn occurred_at(&self) -> DateTime<Utc>;
}
