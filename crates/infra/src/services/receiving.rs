use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use stockflow_core::TenantId;
use stockflow_receiving::{
    ChangeSupplier, CommitmentId, CreateNotice, NoticeId, SelectCommitment, ShipmentNotice,
    ShipmentNoticeCommand, SubmitNotice, SupplierId,
};

use crate::event_store::EventStore;
use crate::locks::EntityLocks;
use crate::ports::CommitmentSource;

use super::{ServiceResult, rehydrate, run_command};

/// Drives shipment notices: reconciliation against purchase commitments and
/// submission.
pub struct ReceivingService<S> {
    store: S,
    locks: Arc<EntityLocks>,
    commitments: Arc<dyn CommitmentSource>,
}

impl<S: EventStore> ReceivingService<S> {
    pub fn new(store: S, locks: Arc<EntityLocks>, commitments: Arc<dyn CommitmentSource>) -> Self {
        Self {
            store,
            locks,
            commitments,
        }
    }

    pub fn create_notice(
        &self,
        tenant_id: TenantId,
        notice_id: NoticeId,
        supplier_id: Option<SupplierId>,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<ShipmentNotice> {
        let _guard = self.locks.acquire(tenant_id, notice_id.0, timeout)?;
        let notice = run_command(
            &self.store,
            tenant_id,
            notice_id.0,
            &ShipmentNoticeCommand::CreateNotice(CreateNotice {
                tenant_id,
                notice_id,
                supplier_id,
                occurred_at,
            }),
            || ShipmentNotice::empty(notice_id),
        )?;
        info!(%notice_id, "shipment notice created");
        Ok(notice)
    }

    pub fn change_supplier(
        &self,
        tenant_id: TenantId,
        notice_id: NoticeId,
        supplier_id: Option<SupplierId>,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<ShipmentNotice> {
        let _guard = self.locks.acquire(tenant_id, notice_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            notice_id.0,
            &ShipmentNoticeCommand::ChangeSupplier(ChangeSupplier {
                tenant_id,
                notice_id,
                supplier_id,
                occurred_at,
            }),
            || ShipmentNotice::empty(notice_id),
        )
    }

    /// Reconcile the notice against a purchase commitment.
    ///
    /// Reads the commitment through the collaborator port and materializes
    /// the outstanding lines, fully replacing whatever was on the notice.
    pub fn select_commitment(
        &self,
        tenant_id: TenantId,
        notice_id: NoticeId,
        commitment_id: CommitmentId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<ShipmentNotice> {
        let commitment_lines = self.commitments.get_commitment(tenant_id, commitment_id)?;

        let _guard = self.locks.acquire(tenant_id, notice_id.0, timeout)?;
        let notice = run_command(
            &self.store,
            tenant_id,
            notice_id.0,
            &ShipmentNoticeCommand::SelectCommitment(SelectCommitment {
                tenant_id,
                notice_id,
                commitment_id,
                commitment_lines,
                occurred_at,
            }),
            || ShipmentNotice::empty(notice_id),
        )?;
        info!(
            %notice_id,
            %commitment_id,
            lines = notice.lines().len(),
            "notice reconciled against commitment"
        );
        Ok(notice)
    }

    pub fn submit_notice(
        &self,
        tenant_id: TenantId,
        notice_id: NoticeId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<ShipmentNotice> {
        let _guard = self.locks.acquire(tenant_id, notice_id.0, timeout)?;
        let notice = run_command(
            &self.store,
            tenant_id,
            notice_id.0,
            &ShipmentNoticeCommand::SubmitNotice(SubmitNotice {
                tenant_id,
                notice_id,
                occurred_at,
            }),
            || ShipmentNotice::empty(notice_id),
        )?;
        info!(%notice_id, "shipment notice submitted");
        Ok(notice)
    }

    pub fn load_notice(
        &self,
        tenant_id: TenantId,
        notice_id: NoticeId,
    ) -> ServiceResult<ShipmentNotice> {
        rehydrate(&self.store, tenant_id, notice_id.0, || {
            ShipmentNotice::empty(notice_id)
        })
    }
}
