use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{
    Aggregate, AggregateId, AggregateRoot, BinCode, DomainError, ItemCode, TenantId,
};
use stockflow_events::Event;

/// Demand order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandOrderId(pub AggregateId);

impl DemandOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DemandOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Pick list identifier. Defined here because the demand order is what mints
/// pick lists; the picking crate reuses this type for its aggregate id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickListId(pub AggregateId);

impl PickListId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PickListId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Demand order status lifecycle.
///
/// `Open` is allocation-pending. `PickListCreated` is terminal for pick-list
/// generation; `Packed` is set from completion feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandOrderStatus {
    Open,
    Allocated,
    PickListCreated,
    Packed,
}

/// Outcome of the pick run against this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentResult {
    FullyFulfilled,
    PartiallyFulfilled,
}

/// One demanded item with its allocation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandLine {
    pub item_code: ItemCode,
    pub item_name: String,
    pub qty_required: f64,
    pub qty_allocated: f64,
    pub uom: String,
    pub batch_no: Option<String>,
    pub bin_location: Option<BinCode>,
}

/// One bin-level allocation row from the external allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAllocation {
    pub item_code: ItemCode,
    pub bin_location: BinCode,
    pub batch_no: Option<String>,
    pub qty: f64,
}

/// Seed line for the pick list cut from this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickLine {
    pub item_code: ItemCode,
    pub bin_location: BinCode,
    pub qty_to_pick: f64,
    pub uom: String,
    pub batch_no: Option<String>,
}

/// Aggregate root: DemandOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandOrder {
    id: DemandOrderId,
    tenant_id: Option<TenantId>,
    source_warehouse: String,
    status: DemandOrderStatus,
    allocation_complete: bool,
    pick_list: Option<PickListId>,
    lines: Vec<DemandLine>,
    total_qty_picked: f64,
    total_qty_short: f64,
    fulfillment_result: Option<FulfillmentResult>,
    version: u64,
    created: bool,
}

impl DemandOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: DemandOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            source_warehouse: String::new(),
            status: DemandOrderStatus::Open,
            allocation_complete: false,
            pick_list: None,
            lines: Vec::new(),
            total_qty_picked: 0.0,
            total_qty_short: 0.0,
            fulfillment_result: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DemandOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> DemandOrderStatus {
        self.status
    }

    pub fn source_warehouse(&self) -> &str {
        &self.source_warehouse
    }

    pub fn allocation_complete(&self) -> bool {
        self.allocation_complete
    }

    pub fn pick_list(&self) -> Option<PickListId> {
        self.pick_list
    }

    pub fn lines(&self) -> &[DemandLine] {
        &self.lines
    }

    pub fn total_qty_required(&self) -> f64 {
        self.lines.iter().map(|l| l.qty_required).sum()
    }

    pub fn fulfillment_result(&self) -> Option<FulfillmentResult> {
        self.fulfillment_result
    }
}

impl AggregateRoot for DemandOrder {
    type Id = DemandOrderId;

    const KIND: &'static str = "fulfillment.demand_order";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub source_warehouse: String,
    pub lines: Vec<DemandLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Allocate. Records the bin-level allocation computed by the
/// external allocation run and flips `allocation_complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocate {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub allocations: Vec<LineAllocation>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreatePickList. At most one pick list per order, ever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePickList {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub pick_list_id: PickListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPickResult. Completion feedback from the pick list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPickResult {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub total_picked: f64,
    pub total_short: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DemandOrderCommand {
    CreateOrder(CreateOrder),
    Allocate(Allocate),
    CreatePickList(CreatePickList),
    RecordPickResult(RecordPickResult),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub source_warehouse: String,
    pub lines: Vec<DemandLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InventoryAllocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAllocated {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub allocations: Vec<LineAllocation>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickListCreated.
///
/// Carries the seed lines so the picking module can open its aggregate and
/// the service layer can commit the reserved stock, without re-reading this
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickListCreated {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub pick_list_id: PickListId,
    pub lines: Vec<PickLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickResultRecorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickResultRecorded {
    pub tenant_id: TenantId,
    pub order_id: DemandOrderId,
    pub total_picked: f64,
    pub total_short: f64,
    pub result: FulfillmentResult,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DemandOrderEvent {
    OrderCreated(OrderCreated),
    InventoryAllocated(InventoryAllocated),
    PickListCreated(PickListCreated),
    PickResultRecorded(PickResultRecorded),
}

impl Event for DemandOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DemandOrderEvent::OrderCreated(_) => "fulfillment.order.created",
            DemandOrderEvent::InventoryAllocated(_) => "fulfillment.order.inventory_allocated",
            DemandOrderEvent::PickListCreated(_) => "fulfillment.order.pick_list_created",
            DemandOrderEvent::PickResultRecorded(_) => "fulfillment.order.pick_result_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DemandOrderEvent::OrderCreated(e) => e.occurred_at,
            DemandOrderEvent::InventoryAllocated(e) => e.occurred_at,
            DemandOrderEvent::PickListCreated(e) => e.occurred_at,
            DemandOrderEvent::PickResultRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DemandOrder {
    type Command = DemandOrderCommand;
    type Event = DemandOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DemandOrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.source_warehouse = e.source_warehouse.clone();
                self.status = DemandOrderStatus::Open;
                self.lines = e.lines.clone();
                self.created = true;
            }
            DemandOrderEvent::InventoryAllocated(e) => {
                for alloc in &e.allocations {
                    if let Some(line) =
                        self.lines.iter_mut().find(|l| l.item_code == alloc.item_code)
                    {
                        line.qty_allocated += alloc.qty;
                        line.bin_location = Some(alloc.bin_location.clone());
                        line.batch_no = alloc.batch_no.clone();
                    }
                }
                self.allocation_complete = true;
                self.status = DemandOrderStatus::Allocated;
            }
            DemandOrderEvent::PickListCreated(e) => {
                self.pick_list = Some(e.pick_list_id);
                self.status = DemandOrderStatus::PickListCreated;
            }
            DemandOrderEvent::PickResultRecorded(e) => {
                self.total_qty_picked = e.total_picked;
                self.total_qty_short = e.total_short;
                self.fulfillment_result = Some(e.result);
                self.status = DemandOrderStatus::Packed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DemandOrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            DemandOrderCommand::Allocate(cmd) => self.handle_allocate(cmd),
            DemandOrderCommand::CreatePickList(cmd) => self.handle_create_pick_list(cmd),
            DemandOrderCommand::RecordPickResult(cmd) => self.handle_record_pick_result(cmd),
        }
    }
}

impl DemandOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: DemandOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::precondition("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<DemandOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("demand order already exists"));
        }
        if cmd.source_warehouse.trim().is_empty() {
            return Err(DomainError::validation("source warehouse is required"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("demand order needs at least one line"));
        }
        for line in &cmd.lines {
            if line.qty_required <= 0.0 {
                return Err(DomainError::validation(format!(
                    "required quantity must be positive for item {}",
                    line.item_code
                )));
            }
        }

        Ok(vec![DemandOrderEvent::OrderCreated(OrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            source_warehouse: cmd.source_warehouse.clone(),
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_allocate(&self, cmd: &Allocate) -> Result<Vec<DemandOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.allocation_complete {
            return Err(DomainError::precondition("inventory already allocated"));
        }

        let mut per_item: HashMap<&ItemCode, f64> = HashMap::new();
        for alloc in &cmd.allocations {
            if alloc.qty <= 0.0 {
                return Err(DomainError::validation(format!(
                    "allocation quantity must be positive for item {}",
                    alloc.item_code
                )));
            }
            if !self.lines.iter().any(|l| l.item_code == alloc.item_code) {
                return Err(DomainError::validation(format!(
                    "allocation references item {} not on this order",
                    alloc.item_code
                )));
            }
            *per_item.entry(&alloc.item_code).or_insert(0.0) += alloc.qty;
        }

        for line in &self.lines {
            let allocated = per_item.get(&line.item_code).copied().unwrap_or(0.0);
            if allocated < line.qty_required {
                return Err(DomainError::validation(format!(
                    "insufficient stock for {}. required: {}, allocated: {}",
                    line.item_code, line.qty_required, allocated
                )));
            }
        }

        Ok(vec![DemandOrderEvent::InventoryAllocated(InventoryAllocated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            allocations: cmd.allocations.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_create_pick_list(
        &self,
        cmd: &CreatePickList,
    ) -> Result<Vec<DemandOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if let Some(existing) = self.pick_list {
            return Err(DomainError::already_exists(format!(
                "pick list {existing} already created for this order"
            )));
        }
        if !self.allocation_complete {
            return Err(DomainError::precondition("inventory allocation is not complete"));
        }
        if self.status != DemandOrderStatus::Allocated {
            return Err(DomainError::precondition(
                "order is not open for pick list generation",
            ));
        }

        let mut pick_lines = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let bin_location = line.bin_location.clone().ok_or_else(|| {
                DomainError::validation(format!(
                    "no bin location allocated for item {}",
                    line.item_code
                ))
            })?;
            pick_lines.push(PickLine {
                item_code: line.item_code.clone(),
                bin_location,
                qty_to_pick: line.qty_allocated,
                uom: line.uom.clone(),
                batch_no: line.batch_no.clone(),
            });
        }

        Ok(vec![DemandOrderEvent::PickListCreated(PickListCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            pick_list_id: cmd.pick_list_id,
            lines: pick_lines,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_pick_result(
        &self,
        cmd: &RecordPickResult,
    ) -> Result<Vec<DemandOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != DemandOrderStatus::PickListCreated {
            return Err(DomainError::precondition(
                "no pick list outstanding for this order",
            ));
        }

        let result = if cmd.total_short > 0.0 {
            FulfillmentResult::PartiallyFulfilled
        } else {
            FulfillmentResult::FullyFulfilled
        };

        Ok(vec![DemandOrderEvent::PickResultRecorded(PickResultRecorded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            total_picked: cmd.total_picked,
            total_short: cmd.total_short,
            result,
            occurred_at: cmd.occurred_at,
        })])
    }
}
