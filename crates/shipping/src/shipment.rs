use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, TenantId};
use stockflow_events::Event;
use stockflow_fulfillment::PickListId;

/// Outbound shipment identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboundShipmentId(pub AggregateId);

impl OutboundShipmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OutboundShipmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Packing list identifier. Minted by the shipment; the packing list
/// aggregate reuses this type for its own id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackingListId(pub AggregateId);

impl PackingListId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PackingListId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Shipment processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Draft,
    Packing,
    Packed,
}

/// Submission status of the shipment document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Draft,
    Submitted,
}

/// One consolidated shipment line (picked stock only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub item_code: ItemCode,
    pub qty_picked: f64,
    pub warehouse: String,
    pub uom: String,
    pub batch_no: Option<String>,
}

/// Aggregate root: OutboundShipment.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundShipment {
    id: OutboundShipmentId,
    tenant_id: Option<TenantId>,
    from_warehouse: String,
    pick_list: Option<PickListId>,
    status: ShipmentStatus,
    docstatus: DocStatus,
    packing_list: Option<PackingListId>,
    lines: Vec<ShipmentLine>,
    total_weight_kg: f64,
    total_volume_cbm: f64,
    version: u64,
    created: bool,
}

impl OutboundShipment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OutboundShipmentId) -> Self {
        Self {
            id,
            tenant_id: None,
            from_warehouse: String::new(),
            pick_list: None,
            status: ShipmentStatus::Draft,
            docstatus: DocStatus::Draft,
            packing_list: None,
            lines: Vec::new(),
            total_weight_kg: 0.0,
            total_volume_cbm: 0.0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OutboundShipmentId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn from_warehouse(&self) -> &str {
        &self.from_warehouse
    }

    pub fn docstatus(&self) -> DocStatus {
        self.docstatus
    }

    pub fn packing_list(&self) -> Option<PackingListId> {
        self.packing_list
    }

    pub fn pick_list(&self) -> Option<PickListId> {
        self.pick_list
    }

    pub fn lines(&self) -> &[ShipmentLine] {
        &self.lines
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.total_weight_kg
    }

    pub fn total_volume_cbm(&self) -> f64 {
        self.total_volume_cbm
    }
}

impl AggregateRoot for OutboundShipment {
    type Id = OutboundShipmentId;

    const KIND: &'static str = "shipping.outbound_shipment";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenShipment. Consolidates picked stock from a completed pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenShipment {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub from_warehouse: String,
    pub pick_list: Option<PickListId>,
    pub lines: Vec<ShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitShipment. Submission forces the shipment into Packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitShipment {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreatePackingList. At most one packing list per shipment, ever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePackingList {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub packing_list_id: PackingListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPackingTotals. Write-back from packing finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPackingTotals {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub total_weight_kg: f64,
    pub total_volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundShipmentCommand {
    OpenShipment(OpenShipment),
    SubmitShipment(SubmitShipment),
    CreatePackingList(CreatePackingList),
    RecordPackingTotals(RecordPackingTotals),
}

/// Event: ShipmentOpened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentOpened {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub from_warehouse: String,
    pub pick_list: Option<PickListId>,
    pub lines: Vec<ShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentSubmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentSubmitted {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PackingListCreated.
///
/// Carries the packable rows (picked quantity only) so the packing module
/// can open its aggregate without re-reading the shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingListCreated {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub packing_list_id: PackingListId,
    pub rows: Vec<ShipmentLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PackingTotalsRecorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingTotalsRecorded {
    pub tenant_id: TenantId,
    pub shipment_id: OutboundShipmentId,
    pub total_weight_kg: f64,
    pub total_volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundShipmentEvent {
    ShipmentOpened(ShipmentOpened),
    ShipmentSubmitted(ShipmentSubmitted),
    PackingListCreated(PackingListCreated),
    PackingTotalsRecorded(PackingTotalsRecorded),
}

impl Event for OutboundShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OutboundShipmentEvent::ShipmentOpened(_) => "shipping.shipment.opened",
            OutboundShipmentEvent::ShipmentSubmitted(_) => "shipping.shipment.submitted",
            OutboundShipmentEvent::PackingListCreated(_) => "shipping.shipment.packing_list_created",
            OutboundShipmentEvent::PackingTotalsRecorded(_) => {
                "shipping.shipment.packing_totals_recorded"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OutboundShipmentEvent::ShipmentOpened(e) => e.occurred_at,
            OutboundShipmentEvent::ShipmentSubmitted(e) => e.occurred_at,
            OutboundShipmentEvent::PackingListCreated(e) => e.occurred_at,
            OutboundShipmentEvent::PackingTotalsRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for OutboundShipment {
    type Command = OutboundShipmentCommand;
    type Event = OutboundShipmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OutboundShipmentEvent::ShipmentOpened(e) => {
                self.id = e.shipment_id;
                self.tenant_id = Some(e.tenant_id);
                self.from_warehouse = e.from_warehouse.clone();
                self.pick_list = e.pick_list;
                self.status = ShipmentStatus::Draft;
                self.docstatus = DocStatus::Draft;
                self.lines = e.lines.clone();
                self.created = true;
            }
            OutboundShipmentEvent::ShipmentSubmitted(_) => {
                self.docstatus = DocStatus::Submitted;
                self.status = ShipmentStatus::Packing;
            }
            OutboundShipmentEvent::PackingListCreated(e) => {
                self.packing_list = Some(e.packing_list_id);
            }
            OutboundShipmentEvent::PackingTotalsRecorded(e) => {
                self.total_weight_kg = e.total_weight_kg;
                self.total_volume_cbm = e.total_volume_cbm;
                self.status = ShipmentStatus::Packed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OutboundShipmentCommand::OpenShipment(cmd) => self.handle_open(cmd),
            OutboundShipmentCommand::SubmitShipment(cmd) => self.handle_submit(cmd),
            OutboundShipmentCommand::CreatePackingList(cmd) => self.handle_create_packing_list(cmd),
            OutboundShipmentCommand::RecordPackingTotals(cmd) => self.handle_record_totals(cmd),
        }
    }
}

impl OutboundShipment {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_shipment_id(&self, shipment_id: OutboundShipmentId) -> Result<(), DomainError> {
        if self.id != shipment_id {
            return Err(DomainError::precondition("shipment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(
        &self,
        tenant_id: TenantId,
        shipment_id: OutboundShipmentId,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_shipment_id(shipment_id)
    }

    fn handle_open(&self, cmd: &OpenShipment) -> Result<Vec<OutboundShipmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("shipment already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("shipment must have at least one item"));
        }
        if cmd.from_warehouse.trim().is_empty() {
            return Err(DomainError::validation("from warehouse is required"));
        }

        Ok(vec![OutboundShipmentEvent::ShipmentOpened(ShipmentOpened {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            from_warehouse: cmd.from_warehouse.clone(),
            pick_list: cmd.pick_list,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(
        &self,
        cmd: &SubmitShipment,
    ) -> Result<Vec<OutboundShipmentEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.shipment_id)?;

        if self.docstatus == DocStatus::Submitted {
            return Err(DomainError::invalid_transition("shipment already submitted"));
        }

        Ok(vec![OutboundShipmentEvent::ShipmentSubmitted(
            ShipmentSubmitted {
                tenant_id: cmd.tenant_id,
                shipment_id: cmd.shipment_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_create_packing_list(
        &self,
        cmd: &CreatePackingList,
    ) -> Result<Vec<OutboundShipmentEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.shipment_id)?;

        if let Some(existing) = self.packing_list {
            return Err(DomainError::already_exists(format!(
                "packing list {existing} already created for this shipment"
            )));
        }
        if self.docstatus != DocStatus::Submitted {
            return Err(DomainError::precondition("shipment must be submitted"));
        }
        if self.status != ShipmentStatus::Packing {
            return Err(DomainError::precondition(
                "packing list can be created only in packing stage",
            ));
        }

        let rows: Vec<ShipmentLine> = self
            .lines
            .iter()
            .filter(|l| l.qty_picked > 0.0)
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(DomainError::validation(
                "no picked quantity available to pack",
            ));
        }

        Ok(vec![OutboundShipmentEvent::PackingListCreated(
            PackingListCreated {
                tenant_id: cmd.tenant_id,
                shipment_id: cmd.shipment_id,
                packing_list_id: cmd.packing_list_id,
                rows,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_record_totals(
        &self,
        cmd: &RecordPackingTotals,
    ) -> Result<Vec<OutboundShipmentEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.shipment_id)?;

        if self.packing_list.is_none() {
            return Err(DomainError::precondition(
                "no packing list linked to this shipment",
            ));
        }
        if self.status != ShipmentStatus::Packing {
            return Err(DomainError::precondition("shipment is not in packing stage"));
        }

        Ok(vec![OutboundShipmentEvent::PackingTotalsRecorded(
            PackingTotalsRecorded {
                tenant_id: cmd.tenant_id,
                shipment_id: cmd.shipment_id,
                total_weight_kg: cmd.total_weight_kg,
                total_volume_cbm: cmd.total_volume_cbm,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_shipment_id() -> OutboundShipmentId {
        OutboundShipmentId::new(AggregateId::new())
    }

    fn test_packing_list_id() -> PackingListId {
        PackingListId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn shipment_line(code: &str, picked: f64) -> ShipmentLine {
        ShipmentLine {
            item_code: ItemCode::new(code).unwrap(),
            qty_picked: picked,
            warehouse: "WH-Main".to_string(),
            uom: "Nos".to_string(),
            batch_no: None,
        }
    }

    fn run(shipment: &mut OutboundShipment, cmd: OutboundShipmentCommand) {
        let events = shipment.handle(&cmd).unwrap();
        for event in &events {
            shipment.apply(event);
        }
    }

    fn draft_shipment(tenant_id: TenantId, id: OutboundShipmentId) -> OutboundShipment {
        let mut shipment = OutboundShipment::empty(id);
        run(
            &mut shipment,
            OutboundShipmentCommand::OpenShipment(OpenShipment {
                tenant_id,
                shipment_id: id,
                from_warehouse: "WH-Main".to_string(),
                pick_list: None,
                lines: vec![shipment_line("SKU-A", 6.0), shipment_line("SKU-B", 0.0)],
                occurred_at: test_time(),
            }),
        );
        shipment
    }

    fn packing_shipment(tenant_id: TenantId, id: OutboundShipmentId) -> OutboundShipment {
        let mut shipment = draft_shipment(tenant_id, id);
        run(
            &mut shipment,
            OutboundShipmentCommand::SubmitShipment(SubmitShipment {
                tenant_id,
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );
        shipment
    }

    #[test]
    fn submission_forces_shipment_into_packing() {
        let tenant_id = test_tenant_id();
        let shipment = packing_shipment(tenant_id, test_shipment_id());
        assert_eq!(shipment.docstatus(), DocStatus::Submitted);
        assert_eq!(shipment.status(), ShipmentStatus::Packing);
    }

    #[test]
    fn open_requires_lines_and_warehouse() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let shipment = OutboundShipment::empty(id);

        let err = shipment
            .handle(&OutboundShipmentCommand::OpenShipment(OpenShipment {
                tenant_id,
                shipment_id: id,
                from_warehouse: "WH-Main".to_string(),
                pick_list: None,
                lines: vec![],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = shipment
            .handle(&OutboundShipmentCommand::OpenShipment(OpenShipment {
                tenant_id,
                shipment_id: id,
                from_warehouse: "  ".to_string(),
                pick_list: None,
                lines: vec![shipment_line("SKU-A", 1.0)],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_packing_list_before_submission_is_a_precondition_error() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let shipment = draft_shipment(tenant_id, id);

        let err = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Precondition(_)));
    }

    #[test]
    fn create_packing_list_outside_packing_stage_is_a_precondition_error() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let mut shipment = packing_shipment(tenant_id, id);
        run(
            &mut shipment,
            OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }),
        );
        run(
            &mut shipment,
            OutboundShipmentCommand::RecordPackingTotals(RecordPackingTotals {
                tenant_id,
                shipment_id: id,
                total_weight_kg: 12.5,
                total_volume_cbm: 0.03,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(shipment.status(), ShipmentStatus::Packed);

        // Packed stage: the idempotency guard fires first, which is the
        // correct signal for a caller that lost the race.
        let err = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[test]
    fn second_packing_list_is_already_exists() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let mut shipment = packing_shipment(tenant_id, id);
        let first = test_packing_list_id();
        run(
            &mut shipment,
            OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: first,
                occurred_at: test_time(),
            }),
        );

        let err = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
        assert_eq!(shipment.packing_list(), Some(first));
    }

    #[test]
    fn packing_rows_carry_only_picked_lines() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let shipment = packing_shipment(tenant_id, id);

        let events = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }))
            .unwrap();

        match &events[0] {
            OutboundShipmentEvent::PackingListCreated(e) => {
                assert_eq!(e.rows.len(), 1);
                assert_eq!(e.rows[0].item_code.as_str(), "SKU-A");
            }
            _ => panic!("Expected PackingListCreated event"),
        }
    }

    #[test]
    fn nothing_picked_means_nothing_to_pack() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let mut shipment = OutboundShipment::empty(id);
        run(
            &mut shipment,
            OutboundShipmentCommand::OpenShipment(OpenShipment {
                tenant_id,
                shipment_id: id,
                from_warehouse: "WH-Main".to_string(),
                pick_list: None,
                lines: vec![shipment_line("SKU-A", 0.0)],
                occurred_at: test_time(),
            }),
        );
        run(
            &mut shipment,
            OutboundShipmentCommand::SubmitShipment(SubmitShipment {
                tenant_id,
                shipment_id: id,
                occurred_at: test_time(),
            }),
        );

        let err = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("no picked quantity")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn recording_totals_moves_shipment_to_packed() {
        let tenant_id = test_tenant_id();
        let id = test_shipment_id();
        let mut shipment = packing_shipment(tenant_id, id);
        run(
            &mut shipment,
            OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id: id,
                packing_list_id: test_packing_list_id(),
                occurred_at: test_time(),
            }),
        );
        run(
            &mut shipment,
            OutboundShipmentCommand::RecordPackingTotals(RecordPackingTotals {
                tenant_id,
                shipment_id: id,
                total_weight_kg: 12.5,
                total_volume_cbm: 0.03,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(shipment.status(), ShipmentStatus::Packed);
        assert_eq!(shipment.total_weight_kg(), 12.5);
        assert_eq!(shipment.total_volume_cbm(), 0.03);
    }
}
