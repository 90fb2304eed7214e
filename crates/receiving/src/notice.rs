use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, TenantId};
use stockflow_events::Event;

/// Shipment notice identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeId(pub AggregateId);

impl NoticeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for NoticeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase commitment reference (external record, read through a port).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentId(pub AggregateId);

impl CommitmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Supplier reference (external master data).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(pub AggregateId);

impl SupplierId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One line of a purchase commitment, as read from the commitment source.
///
/// `received_qty` is maintained externally and is not bounded by
/// `ordered_qty`: over-receipt is representable and pending simply computes
/// non-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentLine {
    pub item_code: ItemCode,
    pub item_name: String,
    pub description: String,
    pub rate: f64,
    pub uom: String,
    pub ordered_qty: f64,
    pub received_qty: f64,
}

/// One materialized notice line: a snapshot of the outstanding quantity of a
/// commitment line at reconcile time. Immutable once the notice is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeLine {
    pub item_code: ItemCode,
    pub item_name: String,
    pub description: String,
    pub rate: f64,
    pub pending_qty: f64,
    pub expected_qty: f64,
    pub uom: String,
}

/// Compute the notice body for a commitment: `pending = ordered - received`,
/// keeping only lines still outstanding, in the commitment's own order.
///
/// Pure and idempotent; running it twice over the same commitment yields the
/// same lines. An exhausted commitment yields an empty body, not an error.
pub fn reconcile(commitment: &[CommitmentLine]) -> Vec<NoticeLine> {
    commitment
        .iter()
        .filter_map(|line| {
            let pending = line.ordered_qty - line.received_qty;
            (pending > 0.0).then(|| NoticeLine {
                item_code: line.item_code.clone(),
                item_name: line.item_name.clone(),
                description: line.description.clone(),
                rate: line.rate,
                pending_qty: pending,
                expected_qty: pending,
                uom: line.uom.clone(),
            })
        })
        .collect()
}

/// Submission status of the notice document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Draft,
    Submitted,
}

/// Aggregate root: ShipmentNotice (advance shipment notice).
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentNotice {
    id: NoticeId,
    tenant_id: Option<TenantId>,
    supplier_id: Option<SupplierId>,
    commitment_id: Option<CommitmentId>,
    lines: Vec<NoticeLine>,
    docstatus: DocStatus,
    version: u64,
    created: bool,
}

impl ShipmentNotice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: NoticeId) -> Self {
        Self {
            id,
            tenant_id: None,
            supplier_id: None,
            commitment_id: None,
            lines: Vec::new(),
            docstatus: DocStatus::Draft,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> NoticeId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn commitment_id(&self) -> Option<CommitmentId> {
        self.commitment_id
    }

    pub fn lines(&self) -> &[NoticeLine] {
        &self.lines
    }

    pub fn docstatus(&self) -> DocStatus {
        self.docstatus
    }
}

impl AggregateRoot for ShipmentNotice {
    type Id = NoticeId;

    const KIND: &'static str = "receiving.shipment_notice";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateNotice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNotice {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeSupplier. Clearing or switching the supplier also drops the
/// selected commitment and its materialized lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSupplier {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SelectCommitment. Carries the commitment snapshot read through
/// the commitment source; reconciliation fully replaces any previously
/// materialized lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectCommitment {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub commitment_id: CommitmentId,
    pub commitment_lines: Vec<CommitmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitNotice. Freezes the notice body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitNotice {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShipmentNoticeCommand {
    CreateNotice(CreateNotice),
    ChangeSupplier(ChangeSupplier),
    SelectCommitment(SelectCommitment),
    SubmitNotice(SubmitNotice),
}

/// Event: NoticeCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeCreated {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SupplierChanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierChanged {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CommitmentSelected. Carries the reconciled notice body; applying it
/// replaces the lines wholesale (no merge with earlier reconciliations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentSelected {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub commitment_id: CommitmentId,
    pub lines: Vec<NoticeLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: NoticeSubmitted.
///
/// Carries the frozen notice body so a downstream handler can cut the goods
/// receipt without re-reading the commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeSubmitted {
    pub tenant_id: TenantId,
    pub notice_id: NoticeId,
    pub supplier_id: SupplierId,
    pub commitment_id: Option<CommitmentId>,
    pub lines: Vec<NoticeLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShipmentNoticeEvent {
    NoticeCreated(NoticeCreated),
    SupplierChanged(SupplierChanged),
    CommitmentSelected(CommitmentSelected),
    NoticeSubmitted(NoticeSubmitted),
}

impl Event for ShipmentNoticeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentNoticeEvent::NoticeCreated(_) => "receiving.notice.created",
            ShipmentNoticeEvent::SupplierChanged(_) => "receiving.notice.supplier_changed",
            ShipmentNoticeEvent::CommitmentSelected(_) => "receiving.notice.commitment_selected",
            ShipmentNoticeEvent::NoticeSubmitted(_) => "receiving.notice.submitted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentNoticeEvent::NoticeCreated(e) => e.occurred_at,
            ShipmentNoticeEvent::SupplierChanged(e) => e.occurred_at,
            ShipmentNoticeEvent::CommitmentSelected(e) => e.occurred_at,
            ShipmentNoticeEvent::NoticeSubmitted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ShipmentNotice {
    type Command = ShipmentNoticeCommand;
    type Event = ShipmentNoticeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentNoticeEvent::NoticeCreated(e) => {
                self.id = e.notice_id;
                self.tenant_id = Some(e.tenant_id);
                self.supplier_id = e.supplier_id;
                self.commitment_id = None;
                self.lines.clear();
                self.docstatus = DocStatus::Draft;
                self.created = true;
            }
            ShipmentNoticeEvent::SupplierChanged(e) => {
                self.supplier_id = e.supplier_id;
                // A different supplier invalidates the selected commitment.
                self.commitment_id = None;
                self.lines.clear();
            }
            ShipmentNoticeEvent::CommitmentSelected(e) => {
                self.commitment_id = Some(e.commitment_id);
                self.lines = e.lines.clone();
            }
            ShipmentNoticeEvent::NoticeSubmitted(_) => {
                self.docstatus = DocStatus::Submitted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentNoticeCommand::CreateNotice(cmd) => self.handle_create(cmd),
            ShipmentNoticeCommand::ChangeSupplier(cmd) => self.handle_change_supplier(cmd),
            ShipmentNoticeCommand::SelectCommitment(cmd) => self.handle_select_commitment(cmd),
            ShipmentNoticeCommand::SubmitNotice(cmd) => self.handle_submit(cmd),
        }
    }
}

impl ShipmentNotice {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_notice_id(&self, notice_id: NoticeId) -> Result<(), DomainError> {
        if self.id != notice_id {
            return Err(DomainError::precondition("notice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.docstatus != DocStatus::Draft {
            return Err(DomainError::precondition(
                "submitted notices are immutable",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateNotice) -> Result<Vec<ShipmentNoticeEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("shipment notice already exists"));
        }

        Ok(vec![ShipmentNoticeEvent::NoticeCreated(NoticeCreated {
            tenant_id: cmd.tenant_id,
            notice_id: cmd.notice_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_supplier(
        &self,
        cmd: &ChangeSupplier,
    ) -> Result<Vec<ShipmentNoticeEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_notice_id(cmd.notice_id)?;
        self.ensure_draft()?;

        Ok(vec![ShipmentNoticeEvent::SupplierChanged(SupplierChanged {
            tenant_id: cmd.tenant_id,
            notice_id: cmd.notice_id,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_select_commitment(
        &self,
        cmd: &SelectCommitment,
    ) -> Result<Vec<ShipmentNoticeEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_notice_id(cmd.notice_id)?;
        self.ensure_draft()?;

        if self.supplier_id.is_none() {
            return Err(DomainError::precondition(
                "supplier must be selected before a commitment",
            ));
        }

        Ok(vec![ShipmentNoticeEvent::CommitmentSelected(
            CommitmentSelected {
                tenant_id: cmd.tenant_id,
                notice_id: cmd.notice_id,
                commitment_id: cmd.commitment_id,
                lines: reconcile(&cmd.commitment_lines),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_submit(&self, cmd: &SubmitNotice) -> Result<Vec<ShipmentNoticeEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_notice_id(cmd.notice_id)?;

        if self.docstatus == DocStatus::Submitted {
            return Err(DomainError::invalid_transition("notice already submitted"));
        }

        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::validation("supplier is required to submit a notice"))?;

        Ok(vec![ShipmentNoticeEvent::NoticeSubmitted(NoticeSubmitted {
            tenant_id: cmd.tenant_id,
            notice_id: cmd.notice_id,
            supplier_id,
            commitment_id: self.commitment_id,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_notice_id() -> NoticeId {
        NoticeId::new(AggregateId::new())
    }

    fn test_supplier_id() -> SupplierId {
        SupplierId::new(AggregateId::new())
    }

    fn test_commitment_id() -> CommitmentId {
        CommitmentId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn commitment_line(code: &str, ordered: f64, received: f64) -> CommitmentLine {
        CommitmentLine {
            item_code: ItemCode::new(code).unwrap(),
            item_name: code.to_string(),
            description: format!("{code} description"),
            rate: 10.0,
            uom: "Nos".to_string(),
            ordered_qty: ordered,
            received_qty: received,
        }
    }

    fn notice_with_supplier(
        tenant_id: TenantId,
        notice_id: NoticeId,
        supplier_id: SupplierId,
    ) -> ShipmentNotice {
        let mut notice = ShipmentNotice::empty(notice_id);
        let events = notice
            .handle(&ShipmentNoticeCommand::CreateNotice(CreateNotice {
                tenant_id,
                notice_id,
                supplier_id: Some(supplier_id),
                occurred_at: test_time(),
            }))
            .unwrap();
        notice.apply(&events[0]);
        notice
    }

    fn select(
        notice: &mut ShipmentNotice,
        tenant_id: TenantId,
        commitment_id: CommitmentId,
        lines: Vec<CommitmentLine>,
    ) {
        let events = notice
            .handle(&ShipmentNoticeCommand::SelectCommitment(SelectCommitment {
                tenant_id,
                notice_id: notice.id_typed(),
                commitment_id,
                commitment_lines: lines,
                occurred_at: test_time(),
            }))
            .unwrap();
        notice.apply(&events[0]);
    }

    #[test]
    fn reconcile_keeps_only_outstanding_lines_in_order() {
        let lines = reconcile(&[
            commitment_line("A", 10.0, 4.0),
            commitment_line("B", 5.0, 5.0),
            commitment_line("C", 3.0, 0.0),
        ]);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].item_code.as_str(), "A");
        assert_eq!(lines[0].pending_qty, 6.0);
        assert_eq!(lines[1].item_code.as_str(), "C");
        assert_eq!(lines[1].pending_qty, 3.0);
    }

    #[test]
    fn reconcile_drops_over_received_lines() {
        // Over-receipt computes negative pending; no clamping, the line is
        // simply not materialized.
        let lines = reconcile(&[commitment_line("A", 10.0, 12.0)]);
        assert!(lines.is_empty());
    }

    #[test]
    fn reconcile_of_exhausted_commitment_is_empty_not_an_error() {
        let tenant_id = test_tenant_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), test_supplier_id());

        select(
            &mut notice,
            tenant_id,
            test_commitment_id(),
            vec![commitment_line("A", 5.0, 5.0)],
        );
        assert!(notice.lines().is_empty());
        assert!(notice.commitment_id().is_some());
    }

    #[test]
    fn reselecting_same_commitment_replaces_lines_without_duplication() {
        let tenant_id = test_tenant_id();
        let commitment_id = test_commitment_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), test_supplier_id());

        let snapshot = vec![commitment_line("A", 10.0, 4.0), commitment_line("C", 3.0, 0.0)];
        select(&mut notice, tenant_id, commitment_id, snapshot.clone());
        let first = notice.lines().to_vec();

        select(&mut notice, tenant_id, commitment_id, snapshot);
        assert_eq!(notice.lines(), first.as_slice());
    }

    #[test]
    fn switching_commitment_discards_previous_lines() {
        let tenant_id = test_tenant_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), test_supplier_id());

        select(
            &mut notice,
            tenant_id,
            test_commitment_id(),
            vec![commitment_line("A", 10.0, 0.0)],
        );

        let second = test_commitment_id();
        select(&mut notice, tenant_id, second, vec![commitment_line("B", 2.0, 0.0)]);

        assert_eq!(notice.commitment_id(), Some(second));
        assert_eq!(notice.lines().len(), 1);
        assert_eq!(notice.lines()[0].item_code.as_str(), "B");
    }

    #[test]
    fn changing_supplier_clears_commitment_and_lines() {
        let tenant_id = test_tenant_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), test_supplier_id());

        select(
            &mut notice,
            tenant_id,
            test_commitment_id(),
            vec![commitment_line("A", 10.0, 0.0)],
        );

        let events = notice
            .handle(&ShipmentNoticeCommand::ChangeSupplier(ChangeSupplier {
                tenant_id,
                notice_id: notice.id_typed(),
                supplier_id: Some(test_supplier_id()),
                occurred_at: test_time(),
            }))
            .unwrap();
        notice.apply(&events[0]);

        assert!(notice.commitment_id().is_none());
        assert!(notice.lines().is_empty());
    }

    #[test]
    fn selecting_commitment_without_supplier_is_rejected() {
        let tenant_id = test_tenant_id();
        let notice_id = test_notice_id();
        let mut notice = ShipmentNotice::empty(notice_id);
        let events = notice
            .handle(&ShipmentNoticeCommand::CreateNotice(CreateNotice {
                tenant_id,
                notice_id,
                supplier_id: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        notice.apply(&events[0]);

        let err = notice
            .handle(&ShipmentNoticeCommand::SelectCommitment(SelectCommitment {
                tenant_id,
                notice_id,
                commitment_id: test_commitment_id(),
                commitment_lines: vec![commitment_line("A", 1.0, 0.0)],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)));
    }

    #[test]
    fn submitted_notice_rejects_further_reconciliation() {
        let tenant_id = test_tenant_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), test_supplier_id());

        select(
            &mut notice,
            tenant_id,
            test_commitment_id(),
            vec![commitment_line("A", 10.0, 4.0)],
        );

        let events = notice
            .handle(&ShipmentNoticeCommand::SubmitNotice(SubmitNotice {
                tenant_id,
                notice_id: notice.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        notice.apply(&events[0]);
        assert_eq!(notice.docstatus(), DocStatus::Submitted);

        let err = notice
            .handle(&ShipmentNoticeCommand::SelectCommitment(SelectCommitment {
                tenant_id,
                notice_id: notice.id_typed(),
                commitment_id: test_commitment_id(),
                commitment_lines: vec![commitment_line("B", 1.0, 0.0)],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)));
    }

    #[test]
    fn submit_carries_frozen_lines_for_downstream_receipt() {
        let tenant_id = test_tenant_id();
        let supplier_id = test_supplier_id();
        let mut notice = notice_with_supplier(tenant_id, test_notice_id(), supplier_id);

        select(
            &mut notice,
            tenant_id,
            test_commitment_id(),
            vec![commitment_line("A", 10.0, 4.0)],
        );

        let events = notice
            .handle(&ShipmentNoticeCommand::SubmitNotice(SubmitNotice {
                tenant_id,
                notice_id: notice.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();

        match &events[0] {
            ShipmentNoticeEvent::NoticeSubmitted(e) => {
                assert_eq!(e.supplier_id, supplier_id);
                assert_eq!(e.lines.len(), 1);
                assert_eq!(e.lines[0].pending_qty, 6.0);
                assert_eq!(e.lines[0].expected_qty, 6.0);
            }
            _ => panic!("Expected NoticeSubmitted event"),
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_commitment() -> impl Strategy<Value = Vec<CommitmentLine>> {
            prop::collection::vec(
                (1u32..999u32, 0.0f64..1000.0, 0.0f64..1200.0).prop_map(|(n, ordered, received)| {
                    CommitmentLine {
                        item_code: ItemCode::new(format!("SKU-{n:03}")).unwrap(),
                        item_name: format!("Item {n}"),
                        description: String::new(),
                        rate: 1.0,
                        uom: "Nos".to_string(),
                        ordered_qty: ordered,
                        received_qty: received,
                    }
                }),
                0..12,
            )
        }

        proptest! {
            /// Output contains exactly the lines with positive pending, in
            /// input order.
            #[test]
            fn reconcile_filters_and_preserves_order(commitment in arb_commitment()) {
                let lines = reconcile(&commitment);

                let expected: Vec<_> = commitment
                    .iter()
                    .filter(|l| l.ordered_qty - l.received_qty > 0.0)
                    .map(|l| (l.item_code.clone(), l.ordered_qty - l.received_qty))
                    .collect();
                let actual: Vec<_> = lines
                    .iter()
                    .map(|l| (l.item_code.clone(), l.pending_qty))
                    .collect();

                prop_assert_eq!(actual, expected);
                prop_assert!(lines.iter().all(|l| l.pending_qty > 0.0));
            }

            /// Running reconciliation twice yields identical output.
            #[test]
            fn reconcile_is_idempotent(commitment in arb_commitment()) {
                prop_assert_eq!(reconcile(&commitment), reconcile(&commitment));
            }
        }
    }
}
