use std::collections::HashMap;
use std::sync::RwLock;

use stockflow_core::{AggregateId, ExpectedVersion, TenantId};

use super::store::{EventStore, StoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store for tests and dev hosting.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        // A batch targets exactly one stream.
        let tenant_id = events[0].tenant_id;
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(StoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(StoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(StoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| StoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        // The compare-and-set: version must match while the write lock is held.
        if !expected_version.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(StoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| StoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn uncommitted(tenant_id: TenantId, aggregate_id: AggregateId) -> UncommittedEvent {
        UncommittedEvent {
            event_id: uuid::Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: "test.stream".to_string(),
            event_type: "test.event".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({"n": 1}),
        }
    }

    #[test]
    fn appends_assign_sequence_numbers_from_one() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        let first = store
            .append(vec![uncommitted(tenant_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(first[0].sequence_number, 1);

        let second = store
            .append(vec![uncommitted(tenant_id, aggregate_id)], ExpectedVersion::Exact(1))
            .unwrap();
        assert_eq!(second[0].sequence_number, 2);
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        store
            .append(vec![uncommitted(tenant_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![uncommitted(tenant_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // The losing append left nothing behind.
        assert_eq!(store.load_stream(tenant_id, aggregate_id).unwrap().len(), 1);
    }

    #[test]
    fn missing_stream_loads_empty() {
        let store = InMemoryEventStore::new();
        let stream = store.load_stream(TenantId::new(), AggregateId::new()).unwrap();
        assert!(stream.is_empty());
    }

    #[test]
    fn mixed_tenant_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let batch = vec![
            uncommitted(TenantId::new(), aggregate_id),
            uncommitted(TenantId::new(), aggregate_id),
        ];
        let err = store.append(batch, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, StoreError::TenantIsolation(_)));
    }

    #[test]
    fn cross_type_append_to_an_existing_stream_is_rejected() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        store
            .append(vec![uncommitted(tenant_id, aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();

        let mut other = uncommitted(tenant_id, aggregate_id);
        other.aggregate_type = "other.stream".to_string();
        let err = store.append(vec![other], ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, StoreError::AggregateTypeMismatch(_)));
    }
}
