use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use stockflow_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use stockflow_fulfillment::PickListId;
use stockflow_shipping::{
    AddPackage, CreatePackingList, FinalizePacking, OpenPackingList, OpenShipment,
    OutboundShipment, OutboundShipmentCommand, OutboundShipmentEvent, OutboundShipmentId,
    PackingList, PackingListCommand, PackingListEvent, PackingListId, RecordPackingTotals,
    ShipmentLine, SubmitShipment,
};

use crate::event_store::{EventStore, StoreError};
use crate::locks::EntityLocks;

use super::{ServiceError, ServiceResult, append_events, rehydrate, run_command};

/// Drives outbound shipments and their packing lists.
pub struct ShippingService<S> {
    store: S,
    locks: Arc<EntityLocks>,
}

impl<S: EventStore> ShippingService<S> {
    pub fn new(store: S, locks: Arc<EntityLocks>) -> Self {
        Self { store, locks }
    }

    pub fn open_shipment(
        &self,
        tenant_id: TenantId,
        shipment_id: OutboundShipmentId,
        from_warehouse: String,
        pick_list: Option<PickListId>,
        lines: Vec<ShipmentLine>,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<OutboundShipment> {
        let _guard = self.locks.acquire(tenant_id, shipment_id.0, timeout)?;
        let shipment = run_command(
            &self.store,
            tenant_id,
            shipment_id.0,
            &OutboundShipmentCommand::OpenShipment(OpenShipment {
                tenant_id,
                shipment_id,
                from_warehouse,
                pick_list,
                lines,
                occurred_at,
            }),
            || OutboundShipment::empty(shipment_id),
        )?;
        info!(%shipment_id, "outbound shipment opened");
        Ok(shipment)
    }

    pub fn submit_shipment(
        &self,
        tenant_id: TenantId,
        shipment_id: OutboundShipmentId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<OutboundShipment> {
        let _guard = self.locks.acquire(tenant_id, shipment_id.0, timeout)?;
        let shipment = run_command(
            &self.store,
            tenant_id,
            shipment_id.0,
            &OutboundShipmentCommand::SubmitShipment(SubmitShipment {
                tenant_id,
                shipment_id,
                occurred_at,
            }),
            || OutboundShipment::empty(shipment_id),
        )?;
        info!(%shipment_id, "shipment submitted for packing");
        Ok(shipment)
    }

    /// Cut the packing list for a submitted shipment in Packing.
    ///
    /// At most one packing list is ever created per shipment; a lost append
    /// race is reported as `AlreadyExists` once the link is visible.
    pub fn create_packing_list(
        &self,
        tenant_id: TenantId,
        shipment_id: OutboundShipmentId,
        packing_list_id: PackingListId,
        packing_station: String,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PackingList> {
        let _guard = self.locks.acquire(tenant_id, shipment_id.0, timeout)?;

        let shipment = rehydrate(&self.store, tenant_id, shipment_id.0, || {
            OutboundShipment::empty(shipment_id)
        })?;
        let expected = ExpectedVersion::Exact(shipment.version());

        let events = shipment
            .handle(&OutboundShipmentCommand::CreatePackingList(CreatePackingList {
                tenant_id,
                shipment_id,
                packing_list_id,
                occurred_at,
            }))
            .map_err(ServiceError::Domain)?;

        let created = events
            .iter()
            .find_map(|e| match e {
                OutboundShipmentEvent::PackingListCreated(created) => Some(created.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                ServiceError::Codec(
                    "CreatePackingList decided no PackingListCreated event".to_string(),
                )
            })?;

        match append_events::<OutboundShipment, _>(
            &self.store,
            tenant_id,
            shipment_id.0,
            &events,
            expected,
        ) {
            Ok(_) => {}
            Err(StoreError::Conflict(msg)) => {
                let current = rehydrate(&self.store, tenant_id, shipment_id.0, || {
                    OutboundShipment::empty(shipment_id)
                })?;
                return Err(match current.packing_list() {
                    Some(existing) => {
                        warn!(%shipment_id, %existing, "lost packing list creation race");
                        ServiceError::Domain(DomainError::already_exists(format!(
                            "packing list {existing} already created for this shipment"
                        )))
                    }
                    None => ServiceError::Store(StoreError::Conflict(msg)),
                });
            }
            Err(other) => return Err(ServiceError::Store(other)),
        }

        let packing_list = run_command(
            &self.store,
            tenant_id,
            packing_list_id.0,
            &PackingListCommand::OpenPackingList(OpenPackingList {
                tenant_id,
                packing_list_id,
                shipment_id,
                warehouse: shipment.from_warehouse().to_string(),
                packing_station,
                rows: created.rows,
                occurred_at,
            }),
            || PackingList::empty(packing_list_id),
        )?;

        info!(%shipment_id, %packing_list_id, "packing list created");
        Ok(packing_list)
    }

    pub fn add_package(
        &self,
        tenant_id: TenantId,
        packing_list_id: PackingListId,
        package_type: String,
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
        gross_weight_kg: f64,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PackingList> {
        let _guard = self.locks.acquire(tenant_id, packing_list_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            packing_list_id.0,
            &PackingListCommand::AddPackage(AddPackage {
                tenant_id,
                packing_list_id,
                package_type,
                length_cm,
                width_cm,
                height_cm,
                gross_weight_kg,
                occurred_at,
            }),
            || PackingList::empty(packing_list_id),
        )
    }

    /// Finalize the packing list and write its totals back to the shipment.
    pub fn finalize_packing(
        &self,
        tenant_id: TenantId,
        packing_list_id: PackingListId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<PackingList> {
        let (packing_list, finalized) = {
            let _guard = self.locks.acquire(tenant_id, packing_list_id.0, timeout)?;

            let mut list = rehydrate(&self.store, tenant_id, packing_list_id.0, || {
                PackingList::empty(packing_list_id)
            })?;
            let expected = ExpectedVersion::Exact(list.version());

            let events = list
                .handle(&PackingListCommand::FinalizePacking(FinalizePacking {
                    tenant_id,
                    packing_list_id,
                    occurred_at,
                }))
                .map_err(ServiceError::Domain)?;

            let finalized = events
                .iter()
                .find_map(|e| match e {
                    PackingListEvent::PackingFinalized(done) => Some(done.clone()),
                    _ => None,
                })
                .ok_or_else(|| {
                    ServiceError::Codec(
                        "FinalizePacking decided no PackingFinalized event".to_string(),
                    )
                })?;

            append_events::<PackingList, _>(
                &self.store,
                tenant_id,
                packing_list_id.0,
                &events,
                expected,
            )?;
            for event in &events {
                list.apply(event);
            }
            (list, finalized)
        };

        let shipment_id = finalized.shipment_id;
        let _guard = self.locks.acquire(tenant_id, shipment_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            shipment_id.0,
            &OutboundShipmentCommand::RecordPackingTotals(RecordPackingTotals {
                tenant_id,
                shipment_id,
                total_weight_kg: finalized.total_weight_kg,
                total_volume_cbm: finalized.total_volume_cbm,
                occurred_at,
            }),
            || OutboundShipment::empty(shipment_id),
        )?;

        info!(
            %packing_list_id,
            %shipment_id,
            total_weight_kg = finalized.total_weight_kg,
            total_volume_cbm = finalized.total_volume_cbm,
            "packing finalized"
        );
        Ok(packing_list)
    }

    pub fn load_shipment(
        &self,
        tenant_id: TenantId,
        shipment_id: OutboundShipmentId,
    ) -> ServiceResult<OutboundShipment> {
        rehydrate(&self.store, tenant_id, shipment_id.0, || {
            OutboundShipment::empty(shipment_id)
        })
    }

    pub fn load_packing_list(
        &self,
        tenant_id: TenantId,
        packing_list_id: PackingListId,
    ) -> ServiceResult<PackingList> {
        rehydrate(&self.store, tenant_id, packing_list_id.0, || {
            PackingList::empty(packing_list_id)
        })
    }
}
