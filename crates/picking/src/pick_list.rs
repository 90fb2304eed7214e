use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{Aggregate, AggregateRoot, BinCode, DomainError, ItemCode, TenantId};
use stockflow_events::Event;
use stockflow_fulfillment::{DemandOrderId, PickListId};

/// Pick list status lifecycle.
///
/// Transitions are strictly forward along
/// `Draft → Released → Assigned → Picking → Completed`; `Cancelled` is the
/// only sideways move and is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickListStatus {
    Draft,
    Released,
    Assigned,
    Picking,
    Completed,
    Cancelled,
}

impl PickListStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PickListStatus::Completed | PickListStatus::Cancelled)
    }
}

/// Barcode checkpoint kinds scanned during picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    PickListBarcode,
    BinBarcode,
    ItemBarcode,
}

/// A verified checkpoint, kept as a durable fact on the pick list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub kind: CheckpointKind,
    pub scanned: String,
    pub at: DateTime<Utc>,
}

/// One line of work: pick `qty_to_pick` of an item from a bin.
///
/// `qty_picked` is only ever set while the list is in Picking. A line that
/// could not be (fully) picked must be explicitly marked short before the
/// list can complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickListLine {
    pub line_no: u32,
    pub item_code: ItemCode,
    pub bin_location: BinCode,
    pub qty_to_pick: f64,
    pub qty_picked: Option<f64>,
    pub short: bool,
    pub uom: String,
    pub batch_no: Option<String>,
}

/// Stock deduction row emitted on completion for the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub item_code: ItemCode,
    pub bin_location: BinCode,
    pub qty: f64,
    pub uom: String,
    pub batch_no: Option<String>,
}

/// Aggregate root: PickList.
#[derive(Debug, Clone, PartialEq)]
pub struct PickList {
    id: PickListId,
    tenant_id: Option<TenantId>,
    demand_order: Option<DemandOrderId>,
    warehouse: String,
    status: PickListStatus,
    assigned_picker: Option<String>,
    lines: Vec<PickListLine>,
    checkpoints: Vec<CheckpointRecord>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    total_qty_picked: f64,
    total_short_qty: f64,
    version: u64,
    created: bool,
}

impl PickList {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PickListId) -> Self {
        Self {
            id,
            tenant_id: None,
            demand_order: None,
            warehouse: String::new(),
            status: PickListStatus::Draft,
            assigned_picker: None,
            lines: Vec::new(),
            checkpoints: Vec::new(),
            started_at: None,
            completed_at: None,
            total_qty_picked: 0.0,
            total_short_qty: 0.0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PickListId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn demand_order(&self) -> Option<DemandOrderId> {
        self.demand_order
    }

    pub fn status(&self) -> PickListStatus {
        self.status
    }

    pub fn assigned_picker(&self) -> Option<&str> {
        self.assigned_picker.as_deref()
    }

    pub fn lines(&self) -> &[PickListLine] {
        &self.lines
    }

    pub fn checkpoints(&self) -> &[CheckpointRecord] {
        &self.checkpoints
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn total_qty_picked(&self) -> f64 {
        self.total_qty_picked
    }

    pub fn total_short_qty(&self) -> f64 {
        self.total_short_qty
    }

    /// Share of demanded quantity actually picked, in percent. 100 when the
    /// list carried no quantity at all.
    pub fn completion_pct(&self) -> f64 {
        completion_pct(self.total_qty_picked, self.total_short_qty)
    }
}

fn completion_pct(picked: f64, short: f64) -> f64 {
    let total = picked + short;
    if total > 0.0 { picked / total * 100.0 } else { 100.0 }
}

impl AggregateRoot for PickList {
    type Id = PickListId;

    const KIND: &'static str = "picking.pick_list";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenPickList. Genesis from the allocator's seed lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPickList {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub demand_order: Option<DemandOrderId>,
    pub warehouse: String,
    pub lines: Vec<PickListLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Release. External trigger making the list available for pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Assign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub picker: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartPicking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPicking {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Scan. Verifies one barcode checkpoint against its expected
/// target; never changes the pick list status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub kind: CheckpointKind,
    pub scanned: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPick. Confirms the picked quantity of one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPick {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub line_no: u32,
    pub qty_picked: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkShort. Explicitly acknowledges a line that cannot be
/// (fully) picked; required before completing with zero confirmed quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkShort {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompletePicking. `acknowledged` is the operator's explicit
/// confirmation that all items are picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePicking {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub acknowledged: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Cancel. Collaborator-triggered; valid from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PickListCommand {
    OpenPickList(OpenPickList),
    Release(Release),
    Assign(Assign),
    StartPicking(StartPicking),
    Scan(Scan),
    RecordPick(RecordPick),
    MarkShort(MarkShort),
    CompletePicking(CompletePicking),
    Cancel(Cancel),
}

/// Event: PickListOpened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickListOpened {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub demand_order: Option<DemandOrderId>,
    pub warehouse: String,
    pub lines: Vec<PickListLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickListReleased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickListReleased {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickerAssigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerAssigned {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub picker: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickingStarted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingStarted {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CheckpointVerified. Recorded only for scans that matched; a failed
/// scan returns an error and leaves no trace in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointVerified {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub kind: CheckpointKind,
    pub scanned: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LinePicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePicked {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub line_no: u32,
    pub qty_picked: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineMarkedShort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMarkedShort {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickingCompleted.
///
/// Terminal. Carries the finalized totals and the stock deductions (positive
/// picked quantities only) for the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingCompleted {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub demand_order: Option<DemandOrderId>,
    pub total_picked: f64,
    pub total_short: f64,
    pub completion_pct: f64,
    pub deductions: Vec<StockMovement>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickCancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickCancelled {
    pub tenant_id: TenantId,
    pub pick_list_id: PickListId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PickListEvent {
    PickListOpened(PickListOpened),
    PickListReleased(PickListReleased),
    PickerAssigned(PickerAssigned),
    PickingStarted(PickingStarted),
    CheckpointVerified(CheckpointVerified),
    LinePicked(LinePicked),
    LineMarkedShort(LineMarkedShort),
    PickingCompleted(PickingCompleted),
    PickCancelled(PickCancelled),
}

impl Event for PickListEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PickListEvent::PickListOpened(_) => "picking.pick_list.opened",
            PickListEvent::PickListReleased(_) => "picking.pick_list.released",
            PickListEvent::PickerAssigned(_) => "picking.pick_list.picker_assigned",
            PickListEvent::PickingStarted(_) => "picking.pick_list.picking_started",
            PickListEvent::CheckpointVerified(_) => "picking.pick_list.checkpoint_verified",
            PickListEvent::LinePicked(_) => "picking.pick_list.line_picked",
            PickListEvent::LineMarkedShort(_) => "picking.pick_list.line_marked_short",
            PickListEvent::PickingCompleted(_) => "picking.pick_list.completed",
            PickListEvent::PickCancelled(_) => "picking.pick_list.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PickListEvent::PickListOpened(e) => e.occurred_at,
            PickListEvent::PickListReleased(e) => e.occurred_at,
            PickListEvent::PickerAssigned(e) => e.occurred_at,
            PickListEvent::PickingStarted(e) => e.occurred_at,
            PickListEvent::CheckpointVerified(e) => e.occurred_at,
            PickListEvent::LinePicked(e) => e.occurred_at,
            PickListEvent::LineMarkedShort(e) => e.occurred_at,
            PickListEvent::PickingCompleted(e) => e.occurred_at,
            PickListEvent::PickCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PickList {
    type Command = PickListCommand;
    type Event = PickListEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PickListEvent::PickListOpened(e) => {
                self.id = e.pick_list_id;
                self.tenant_id = Some(e.tenant_id);
                self.demand_order = e.demand_order;
                self.warehouse = e.warehouse.clone();
                self.status = PickListStatus::Draft;
                self.lines = e.lines.clone();
                self.created = true;
            }
            PickListEvent::PickListReleased(_) => {
                self.status = PickListStatus::Released;
            }
            PickListEvent::PickerAssigned(e) => {
                self.assigned_picker = Some(e.picker.clone());
                self.status = PickListStatus::Assigned;
            }
            PickListEvent::PickingStarted(e) => {
                self.status = PickListStatus::Picking;
                self.started_at = Some(e.occurred_at);
            }
            PickListEvent::CheckpointVerified(e) => {
                self.checkpoints.push(CheckpointRecord {
                    kind: e.kind,
                    scanned: e.scanned.clone(),
                    at: e.occurred_at,
                });
            }
            PickListEvent::LinePicked(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.qty_picked = Some(e.qty_picked);
                    line.short = false;
                }
            }
            PickListEvent::LineMarkedShort(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.short = true;
                }
            }
            PickListEvent::PickingCompleted(e) => {
                self.total_qty_picked = e.total_picked;
                self.total_short_qty = e.total_short;
                self.status = PickListStatus::Completed;
                self.completed_at = Some(e.occurred_at);
            }
            PickListEvent::PickCancelled(_) => {
                self.status = PickListStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PickListCommand::OpenPickList(cmd) => self.handle_open(cmd),
            PickListCommand::Release(cmd) => self.handle_release(cmd),
            PickListCommand::Assign(cmd) => self.handle_assign(cmd),
            PickListCommand::StartPicking(cmd) => self.handle_start_picking(cmd),
            PickListCommand::Scan(cmd) => self.handle_scan(cmd),
            PickListCommand::RecordPick(cmd) => self.handle_record_pick(cmd),
            PickListCommand::MarkShort(cmd) => self.handle_mark_short(cmd),
            PickListCommand::CompletePicking(cmd) => self.handle_complete(cmd),
            PickListCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PickList {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_pick_list_id(&self, pick_list_id: PickListId) -> Result<(), DomainError> {
        if self.id != pick_list_id {
            return Err(DomainError::precondition("pick_list_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self, tenant_id: TenantId, id: PickListId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_pick_list_id(id)
    }

    fn ensure_picking(&self) -> Result<(), DomainError> {
        if self.status != PickListStatus::Picking {
            return Err(DomainError::invalid_transition(format!(
                "pick list is not in picking state (currently {:?})",
                self.status
            )));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenPickList) -> Result<Vec<PickListEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("pick list already exists"));
        }
        for (idx, line) in cmd.lines.iter().enumerate() {
            let expected_no = (idx as u32) + 1;
            if line.line_no != expected_no {
                return Err(DomainError::validation(format!(
                    "line numbers must be contiguous from 1 (line {idx} has {})",
                    line.line_no
                )));
            }
            if line.qty_to_pick <= 0.0 {
                return Err(DomainError::validation(format!(
                    "quantity to pick must be positive for item {}",
                    line.item_code
                )));
            }
        }

        Ok(vec![PickListEvent::PickListOpened(PickListOpened {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            demand_order: cmd.demand_order,
            warehouse: cmd.warehouse.clone(),
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &Release) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;

        if self.status != PickListStatus::Draft {
            return Err(DomainError::invalid_transition(
                "only draft pick lists can be released",
            ));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot release a pick list without lines",
            ));
        }

        Ok(vec![PickListEvent::PickListReleased(PickListReleased {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &Assign) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;

        if cmd.picker.trim().is_empty() {
            return Err(DomainError::validation("picker is required"));
        }
        if self.status == PickListStatus::Assigned {
            return Err(DomainError::invalid_transition("pick list already assigned"));
        }
        if self.status != PickListStatus::Released {
            return Err(DomainError::invalid_transition(
                "pick list cannot be assigned in current status",
            ));
        }

        Ok(vec![PickListEvent::PickerAssigned(PickerAssigned {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            picker: cmd.picker.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start_picking(&self, cmd: &StartPicking) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;

        if self.status != PickListStatus::Assigned {
            return Err(DomainError::invalid_transition(
                "pick list must be assigned to start picking",
            ));
        }

        Ok(vec![PickListEvent::PickingStarted(PickingStarted {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_scan(&self, cmd: &Scan) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;
        self.ensure_picking()?;

        let matched = match cmd.kind {
            CheckpointKind::PickListBarcode => cmd.scanned == self.id.to_string(),
            CheckpointKind::BinBarcode => self
                .lines
                .iter()
                .any(|l| l.bin_location.as_str() == cmd.scanned),
            CheckpointKind::ItemBarcode => self
                .lines
                .iter()
                .any(|l| l.item_code.as_str() == cmd.scanned),
        };
        if !matched {
            return Err(DomainError::verification(format!(
                "scanned {:?} barcode '{}' does not match any expected target",
                cmd.kind, cmd.scanned
            )));
        }

        Ok(vec![PickListEvent::CheckpointVerified(CheckpointVerified {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            kind: cmd.kind,
            scanned: cmd.scanned.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_pick(&self, cmd: &RecordPick) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;
        self.ensure_picking()?;

        let line = self
            .lines
            .iter()
            .find(|l| l.line_no == cmd.line_no)
            .ok_or_else(|| {
                DomainError::validation(format!("no pick list line {}", cmd.line_no))
            })?;

        if cmd.qty_picked < 0.0 {
            return Err(DomainError::validation("picked qty cannot be negative"));
        }
        if cmd.qty_picked > line.qty_to_pick {
            return Err(DomainError::validation(format!(
                "picked qty cannot exceed ordered qty for item {}",
                line.item_code
            )));
        }

        Ok(vec![PickListEvent::LinePicked(LinePicked {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            line_no: cmd.line_no,
            qty_picked: cmd.qty_picked,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_short(&self, cmd: &MarkShort) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;
        self.ensure_picking()?;

        if !self.lines.iter().any(|l| l.line_no == cmd.line_no) {
            return Err(DomainError::validation(format!(
                "no pick list line {}",
                cmd.line_no
            )));
        }

        Ok(vec![PickListEvent::LineMarkedShort(LineMarkedShort {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompletePicking) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;
        self.ensure_picking()?;

        if !cmd.acknowledged {
            return Err(DomainError::validation(
                "completion requires explicit acknowledgment",
            ));
        }

        let mut total_picked = 0.0;
        let mut total_short = 0.0;
        let mut deductions = Vec::new();

        for line in &self.lines {
            let picked = line.qty_picked.unwrap_or(0.0);
            if picked == 0.0 && !line.short {
                return Err(DomainError::incomplete_pick(format!(
                    "line {} ({}) has no confirmed quantity and is not marked short",
                    line.line_no, line.item_code
                )));
            }

            total_picked += picked;
            total_short += line.qty_to_pick - picked;

            if picked > 0.0 {
                deductions.push(StockMovement {
                    item_code: line.item_code.clone(),
                    bin_location: line.bin_location.clone(),
                    qty: picked,
                    uom: line.uom.clone(),
                    batch_no: line.batch_no.clone(),
                });
            }
        }

        Ok(vec![PickListEvent::PickingCompleted(PickingCompleted {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            demand_order: self.demand_order,
            total_picked,
            total_short,
            completion_pct: completion_pct(total_picked, total_short),
            deductions,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &Cancel) -> Result<Vec<PickListEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.pick_list_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                "pick list is already in a terminal state",
            ));
        }

        Ok(vec![PickListEvent::PickCancelled(PickCancelled {
            tenant_id: cmd.tenant_id,
            pick_list_id: cmd.pick_list_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
