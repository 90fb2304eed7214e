use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockflow_core::{AggregateId, TenantId};

use crate::Event;

/// An event ready to be appended to a stream, before a sequence number is
/// assigned. Build one from a typed domain event with
/// [`UncommittedEvent::from_typed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Wrap a typed domain event with its stream metadata, serializing the
    /// payload to JSON.
    pub fn from_typed<E>(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event: &E,
    ) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        Ok(Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
        })
    }
}

/// A persisted event with its assigned position in the stream.
///
/// Sequence numbers start at 1 and are stream-scoped; the stream version is
/// the sequence number of its last event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub tenant_id: TenantId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Pinged {
        occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    enum TestEvent {
        Pinged(Pinged),
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            3
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TestEvent::Pinged(e) => e.occurred_at,
            }
        }
    }

    #[test]
    fn from_typed_captures_the_event_metadata() {
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();
        let at = Utc::now();

        let uncommitted = UncommittedEvent::from_typed(
            tenant_id,
            aggregate_id,
            "test.stream",
            &TestEvent::Pinged(Pinged { occurred_at: at }),
        )
        .unwrap();

        assert_eq!(uncommitted.tenant_id, tenant_id);
        assert_eq!(uncommitted.aggregate_type, "test.stream");
        assert_eq!(uncommitted.event_type, "test.pinged");
        assert_eq!(uncommitted.event_version, 3);
        assert_eq!(uncommitted.occurred_at, at);
    }
}
