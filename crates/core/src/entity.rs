//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Child records of an aggregate (route stops, notice lines) implement this
/// when they have identity of their own; plain value rows do not.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
