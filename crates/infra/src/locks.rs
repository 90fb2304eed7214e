//! Per-entity single-writer locks.
//!
//! Every mutating service operation holds the lock for its entity while it
//! loads, decides, performs side effects and appends. Operations on
//! different entities proceed in parallel; two operations on the same
//! entity are serialized. Acquisition takes a caller-supplied timeout so a
//! stuck writer cannot wedge its entity forever.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

use stockflow_core::{AggregateId, TenantId};

#[derive(Debug, Error)]
pub enum LockError {
    /// The lock could not be acquired within the caller's timeout. Nothing
    /// was mutated; the caller may retry.
    #[error("timed out after {waited:?} waiting for entity {entity}")]
    Timeout {
        entity: AggregateId,
        waited: Duration,
    },

    #[error("lock registry poisoned")]
    Poisoned,
}

/// Registry of held entity locks, keyed by `(tenant_id, aggregate_id)`.
#[derive(Debug, Default)]
pub struct EntityLocks {
    held: Mutex<HashSet<(TenantId, AggregateId)>>,
    released: Condvar,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one entity, waiting up to `timeout`.
    ///
    /// The returned guard releases the lock on drop, including on panic and
    /// on the error paths of the critical section.
    pub fn acquire(
        &self,
        tenant_id: TenantId,
        entity: AggregateId,
        timeout: Duration,
    ) -> Result<EntityGuard<'_>, LockError> {
        let key = (tenant_id, entity);
        let deadline = Instant::now() + timeout;

        let mut held = self.held.lock().map_err(|_| LockError::Poisoned)?;
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    entity,
                    waited: timeout,
                });
            }
            let (guard, wait) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| LockError::Poisoned)?;
            held = guard;
            if wait.timed_out() && held.contains(&key) {
                return Err(LockError::Timeout {
                    entity,
                    waited: timeout,
                });
            }
        }
        held.insert(key);

        Ok(EntityGuard {
            registry: self,
            key,
        })
    }
}

/// Holds one entity lock; releases it on drop.
#[derive(Debug)]
pub struct EntityGuard<'a> {
    registry: &'a EntityLocks,
    key: (TenantId, AggregateId),
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.registry.held.lock() {
            held.remove(&self.key);
            self.registry.released.notify_all();
        }
    }
}
