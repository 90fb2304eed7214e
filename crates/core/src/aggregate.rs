//! Aggregate root traits for the event-sourced warehouse domain.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Kept deliberately small so each warehouse module decides how it models
/// state transitions without pulling in infrastructure concerns.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Stable stream-type name (e.g. "picking.pick_list"). Used by the store
    /// to reject cross-type appends to the same stream.
    const KIND: &'static str;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state; corresponds
    /// to the number of events applied.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (idempotent commands, migrations).
    Any,
    /// Require the stream to be at an exact version. This is the compare-and-
    /// set that makes at-most-once creation hold under racing writers.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::precondition(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision**: `handle(&self, cmd)` returns events or a domain error.
/// - **Evolution**: `apply(&mut self, event)` folds one event into state.
///
/// Aggregates must not perform IO. Stock commits, notifications and
/// persistence happen in the service layer, keyed off the returned events.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event. Implementations stay
    /// deterministic and bump `version()` by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given current state and a command.
    /// Must not mutate state; evolution goes through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
