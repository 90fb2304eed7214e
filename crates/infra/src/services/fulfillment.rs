use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use stockflow_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use stockflow_fulfillment::{
    Allocate, CreateOrder, CreatePickList, DemandLine, DemandOrder, DemandOrderCommand,
    DemandOrderEvent, DemandOrderId, LineAllocation, PickListId, RecordPickResult,
};
use stockflow_picking::{OpenPickList, PickList, PickListCommand, PickListLine, StockMovement};

use crate::event_store::{EventStore, StoreError};
use crate::locks::EntityLocks;
use crate::ports::StockLedger;

use super::{ServiceError, ServiceResult, append_events, rehydrate, run_command};

/// Drives demand orders: allocation bookkeeping and pick-list creation with
/// its stock reservation side effect.
pub struct FulfillmentService<S> {
    store: S,
    locks: Arc<EntityLocks>,
    ledger: Arc<dyn StockLedger>,
}

impl<S: EventStore> FulfillmentService<S> {
    pub fn new(store: S, locks: Arc<EntityLocks>, ledger: Arc<dyn StockLedger>) -> Self {
        Self {
            store,
            locks,
            ledger,
        }
    }

    pub fn create_order(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
        source_warehouse: String,
        lines: Vec<DemandLine>,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DemandOrder> {
        let _guard = self.locks.acquire(tenant_id, order_id.0, timeout)?;
        let order = run_command(
            &self.store,
            tenant_id,
            order_id.0,
            &DemandOrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                source_warehouse,
                lines,
                occurred_at,
            }),
            || DemandOrder::empty(order_id),
        )?;
        info!(%order_id, "demand order created");
        Ok(order)
    }

    /// Record the bin-level allocations of the external allocation run.
    pub fn allocate(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
        allocations: Vec<LineAllocation>,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DemandOrder> {
        let _guard = self.locks.acquire(tenant_id, order_id.0, timeout)?;
        let order = run_command(
            &self.store,
            tenant_id,
            order_id.0,
            &DemandOrderCommand::Allocate(Allocate {
                tenant_id,
                order_id,
                allocations,
                occurred_at,
            }),
            || DemandOrder::empty(order_id),
        )?;
        info!(%order_id, "inventory allocated");
        Ok(order)
    }

    /// Cut the pick list for an allocated order.
    ///
    /// At most one pick list is ever created per order. The allocated stock
    /// is committed to the inventory collaborator before the order mutation
    /// is appended; if the append loses a race anyway, the reservation is
    /// released again and the existing link is reported as `AlreadyExists`.
    pub fn create_pick_list(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
        pick_list_id: PickListId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let _guard = self.locks.acquire(tenant_id, order_id.0, timeout)?;

        let order = rehydrate(&self.store, tenant_id, order_id.0, || {
            DemandOrder::empty(order_id)
        })?;
        let expected = ExpectedVersion::Exact(order.version());

        let events = order
            .handle(&DemandOrderCommand::CreatePickList(CreatePickList {
                tenant_id,
                order_id,
                pick_list_id,
                occurred_at,
            }))
            .map_err(ServiceError::Domain)?;

        let created = events
            .iter()
            .find_map(|e| match e {
                DemandOrderEvent::PickListCreated(created) => Some(created.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                ServiceError::Codec("CreatePickList decided no PickListCreated event".to_string())
            })?;

        // Reserve before committing the order mutation: a failed reservation
        // leaves the order untouched.
        let movements: Vec<StockMovement> = created
            .lines
            .iter()
            .map(|line| StockMovement {
                item_code: line.item_code.clone(),
                bin_location: line.bin_location.clone(),
                qty: line.qty_to_pick,
                uom: line.uom.clone(),
                batch_no: line.batch_no.clone(),
            })
            .collect();
        self.ledger.commit_stock(tenant_id, &movements)?;

        match append_events::<DemandOrder, _>(&self.store, tenant_id, order_id.0, &events, expected)
        {
            Ok(_) => {}
            Err(StoreError::Conflict(msg)) => {
                // An out-of-band writer won the compare-and-set. Undo the
                // reservation, then report what the stream now says.
                self.ledger.release_stock(tenant_id, &movements)?;
                let current = rehydrate(&self.store, tenant_id, order_id.0, || {
                    DemandOrder::empty(order_id)
                })?;
                return Err(match current.pick_list() {
                    Some(existing) => {
                        warn!(%order_id, %existing, "lost pick list creation race");
                        ServiceError::Domain(DomainError::already_exists(format!(
                            "pick list {existing} already created for this order"
                        )))
                    }
                    None => ServiceError::Store(StoreError::Conflict(msg)),
                });
            }
            Err(other) => {
                self.ledger.release_stock(tenant_id, &movements)?;
                return Err(ServiceError::Store(other));
            }
        }

        // Open the pick list stream from the seed lines.
        let pick_lines: Vec<PickListLine> = created
            .lines
            .iter()
            .enumerate()
            .map(|(idx, line)| PickListLine {
                line_no: idx as u32 + 1,
                item_code: line.item_code.clone(),
                bin_location: line.bin_location.clone(),
                qty_to_pick: line.qty_to_pick,
                qty_picked: None,
                short: false,
                uom: line.uom.clone(),
                batch_no: line.batch_no.clone(),
            })
            .collect();

        let pick_list = run_command(
            &self.store,
            tenant_id,
            pick_list_id.0,
            &PickListCommand::OpenPickList(OpenPickList {
                tenant_id,
                pick_list_id,
                demand_order: Some(order_id),
                warehouse: order.source_warehouse().to_string(),
                lines: pick_lines,
                occurred_at,
            }),
            || PickList::empty(pick_list_id),
        )?;

        info!(%order_id, %pick_list_id, lines = pick_list.lines().len(), "pick list created");
        Ok(pick_list)
    }

    /// Apply completion feedback from the pick run to the order.
    pub fn record_pick_result(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
        total_picked: f64,
        total_short: f64,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DemandOrder> {
        let _guard = self.locks.acquire(tenant_id, order_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            order_id.0,
            &DemandOrderCommand::RecordPickResult(RecordPickResult {
                tenant_id,
                order_id,
                total_picked,
                total_short,
                occurred_at,
            }),
            || DemandOrder::empty(order_id),
        )
    }

    pub fn load_order(
        &self,
        tenant_id: TenantId,
        order_id: DemandOrderId,
    ) -> ServiceResult<DemandOrder> {
        rehydrate(&self.store, tenant_id, order_id.0, || {
            DemandOrder::empty(order_id)
        })
    }
}
