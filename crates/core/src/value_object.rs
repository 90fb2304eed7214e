//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// with the same values are the same thing. Coordinates, capacities and
/// derived route totals are value objects; a pick list is not.
///
/// To "modify" a value object, build a new one. The trait only requires what
/// value semantics need: cheap cloning, value equality, debuggability.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
