use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use stockflow_core::{Aggregate, AggregateRoot, ExpectedVersion, TenantId};
use stockflow_fulfillment::{DemandOrder, DemandOrderCommand, PickListId, RecordPickResult};
use stockflow_picking::{
    Assign, Cancel, CheckpointKind, CompletePicking, MarkShort, PickList, PickListCommand,
    PickListEvent, RecordPick, Release, Scan, StartPicking,
};

use crate::event_store::EventStore;
use crate::locks::EntityLocks;
use crate::ports::StockLedger;

use super::{ServiceError, ServiceResult, append_events, rehydrate, run_command};

/// Drives the pick list lifecycle and its inventory deduction on completion.
pub struct PickingService<S> {
    store: S,
    locks: Arc<EntityLocks>,
    ledger: Arc<dyn StockLedger>,
}

impl<S: EventStore> PickingService<S> {
    pub fn new(store: S, locks: Arc<EntityLocks>, ledger: Arc<dyn StockLedger>) -> Self {
        Self {
            store,
            locks,
            ledger,
        }
    }

    fn transition(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        command: PickListCommand,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let _guard = self.locks.acquire(tenant_id, pick_list_id.0, timeout)?;
        run_command(&self.store, tenant_id, pick_list_id.0, &command, || {
            PickList::empty(pick_list_id)
        })
    }

    pub fn release(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let list = self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::Release(Release {
                tenant_id,
                pick_list_id,
                occurred_at,
            }),
            timeout,
        )?;
        info!(%pick_list_id, "pick list released");
        Ok(list)
    }

    pub fn assign(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        picker: String,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let list = self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::Assign(Assign {
                tenant_id,
                pick_list_id,
                picker,
                occurred_at,
            }),
            timeout,
        )?;
        info!(%pick_list_id, picker = list.assigned_picker().unwrap_or(""), "picker assigned");
        Ok(list)
    }

    pub fn start_picking(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::StartPicking(StartPicking {
                tenant_id,
                pick_list_id,
                occurred_at,
            }),
            timeout,
        )
    }

    /// Verify one barcode checkpoint. A mismatch surfaces as
    /// `DomainError::Verification` and leaves no trace in the stream.
    pub fn scan(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        kind: CheckpointKind,
        scanned: String,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        debug!(%pick_list_id, ?kind, "verifying scan checkpoint");
        self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::Scan(Scan {
                tenant_id,
                pick_list_id,
                kind,
                scanned,
                occurred_at,
            }),
            timeout,
        )
    }

    pub fn record_pick(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        line_no: u32,
        qty_picked: f64,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::RecordPick(RecordPick {
                tenant_id,
                pick_list_id,
                line_no,
                qty_picked,
                occurred_at,
            }),
            timeout,
        )
    }

    pub fn mark_short(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        line_no: u32,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::MarkShort(MarkShort {
                tenant_id,
                pick_list_id,
                line_no,
                occurred_at,
            }),
            timeout,
        )
    }

    /// Complete the pick run.
    ///
    /// Signals the inventory deduction before the completing append; the
    /// terminal transition and the deduction stand or fall together. On
    /// success the outcome is also fed back to the owning demand order.
    pub fn complete_picking(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        acknowledged: bool,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let completed = {
            let _guard = self.locks.acquire(tenant_id, pick_list_id.0, timeout)?;

            let mut list = rehydrate(&self.store, tenant_id, pick_list_id.0, || {
                PickList::empty(pick_list_id)
            })?;
            let expected = ExpectedVersion::Exact(list.version());

            let events = list
                .handle(&PickListCommand::CompletePicking(CompletePicking {
                    tenant_id,
                    pick_list_id,
                    acknowledged,
                    occurred_at,
                }))
                .map_err(ServiceError::Domain)?;

            let completed = events
                .iter()
                .find_map(|e| match e {
                    PickListEvent::PickingCompleted(done) => Some(done.clone()),
                    _ => None,
                })
                .ok_or_else(|| {
                    ServiceError::Codec(
                        "CompletePicking decided no PickingCompleted event".to_string(),
                    )
                })?;

            if !completed.deductions.is_empty() {
                self.ledger.deduct_stock(tenant_id, &completed.deductions)?;
            }

            append_events::<PickList, _>(&self.store, tenant_id, pick_list_id.0, &events, expected)?;
            for event in &events {
                list.apply(event);
            }
            info!(
                %pick_list_id,
                total_picked = completed.total_picked,
                total_short = completed.total_short,
                "picking completed"
            );
            (list, completed)
        };
        let (list, done) = completed;

        // Feed the outcome back to the owning order, under its own lock.
        if let Some(order_id) = done.demand_order {
            let _guard = self.locks.acquire(tenant_id, order_id.0, timeout)?;
            run_command(
                &self.store,
                tenant_id,
                order_id.0,
                &DemandOrderCommand::RecordPickResult(RecordPickResult {
                    tenant_id,
                    order_id,
                    total_picked: done.total_picked,
                    total_short: done.total_short,
                    occurred_at,
                }),
                || DemandOrder::empty(order_id),
            )?;
        }

        Ok(list)
    }

    pub fn cancel(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
        reason: String,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PickList> {
        let list = self.transition(
            tenant_id,
            pick_list_id,
            PickListCommand::Cancel(Cancel {
                tenant_id,
                pick_list_id,
                reason,
                occurred_at,
            }),
            timeout,
        )?;
        info!(%pick_list_id, "pick list cancelled");
        Ok(list)
    }

    pub fn load_pick_list(
        &self,
        tenant_id: TenantId,
        pick_list_id: PickListId,
    ) -> ServiceResult<PickList> {
        rehydrate(&self.store, tenant_id, pick_list_id.0, || {
            PickList::empty(pick_list_id)
        })
    }
}
