use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use stockflow_core::TenantId;
use stockflow_fulfillment::DemandOrderId;
use stockflow_routing::{
    AddStop, CreateRoute, DeliveryRoute, DeliveryRouteCommand, DeliveryRouteId, GeoPoint,
    OptimizeRoute, RemoveStop, SetVehicle, UpdateStopLoad, VehicleCapacity, VehicleId,
};

use crate::event_store::EventStore;
use crate::locks::EntityLocks;
use crate::ports::{DeliveryInfoSource, VehicleDirectory};

use super::{ServiceResult, rehydrate, run_command};

/// Drives delivery routes: vehicle assignment, stop edits and sequence
/// optimization. Load totals are maintained by the aggregate itself, inside
/// the same critical section as the triggering mutation.
pub struct RoutingService<S> {
    store: S,
    locks: Arc<EntityLocks>,
    fleet: Arc<dyn VehicleDirectory>,
    delivery_info: Arc<dyn DeliveryInfoSource>,
}

impl<S: EventStore> RoutingService<S> {
    pub fn new(
        store: S,
        locks: Arc<EntityLocks>,
        fleet: Arc<dyn VehicleDirectory>,
        delivery_info: Arc<dyn DeliveryInfoSource>,
    ) -> Self {
        Self {
            store,
            locks,
            fleet,
            delivery_info,
        }
    }

    pub fn create_route(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        let route = run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::CreateRoute(CreateRoute {
                tenant_id,
                route_id,
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )?;
        info!(%route_id, "delivery route created");
        Ok(route)
    }

    /// Assign a vehicle, snapshotting its profile from the fleet directory.
    /// The driver always rides along with the vehicle.
    pub fn set_vehicle(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        vehicle_id: VehicleId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let profile = self.fleet.get_vehicle_profile(tenant_id, vehicle_id)?;

        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        let route = run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::SetVehicle(SetVehicle {
                tenant_id,
                route_id,
                vehicle_id,
                driver: profile.driver,
                capacity: VehicleCapacity {
                    max_weight_kg: profile.max_weight_kg,
                    max_volume_cbm: profile.max_volume_cbm,
                },
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )?;
        info!(
            %route_id,
            %vehicle_id,
            load_weight_pct = route.totals().load_weight_pct,
            "vehicle assigned"
        );
        Ok(route)
    }

    /// Add a delivery stop, pulling the order's address, coordinates and
    /// load from the order-store collaborator.
    pub fn add_stop(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        order_id: DemandOrderId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let delivery = self
            .delivery_info
            .get_order_delivery_info(tenant_id, order_id)?;

        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::AddStop(AddStop {
                tenant_id,
                route_id,
                demand_order: order_id,
                delivery_address: delivery.address,
                coords: delivery.coords,
                weight_kg: delivery.weight_kg,
                volume_cbm: delivery.volume_cbm,
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )
    }

    pub fn remove_stop(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        order_id: DemandOrderId,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::RemoveStop(RemoveStop {
                tenant_id,
                route_id,
                demand_order: order_id,
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )
    }

    pub fn update_stop_load(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        order_id: DemandOrderId,
        weight_kg: f64,
        volume_cbm: f64,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::UpdateStopLoad(UpdateStopLoad {
                tenant_id,
                route_id,
                demand_order: order_id,
                weight_kg,
                volume_cbm,
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )
    }

    /// Resequence the route's stops by nearest-neighbor from `origin`.
    pub fn optimize_route(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        origin: GeoPoint,
        occurred_at: DateTime<Utc>,
        timeout: Duration,
    ) -> ServiceResult<DeliveryRoute> {
        let _guard = self.locks.acquire(tenant_id, route_id.0, timeout)?;
        let route = run_command(
            &self.store,
            tenant_id,
            route_id.0,
            &DeliveryRouteCommand::OptimizeRoute(OptimizeRoute {
                tenant_id,
                route_id,
                origin,
                occurred_at,
            }),
            || DeliveryRoute::empty(route_id),
        )?;
        info!(%route_id, stops = route.stops().len(), "route optimized");
        Ok(route)
    }

    /// Dispatch-readiness gate: a vehicle with a driver, within capacity.
    pub fn check_dispatch_ready(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
    ) -> ServiceResult<()> {
        let route = self.load_route(tenant_id, route_id)?;
        route.check_dispatch_ready().map_err(Into::into)
    }

    pub fn load_route(
        &self,
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
    ) -> ServiceResult<DeliveryRoute> {
        rehydrate(&self.store, tenant_id, route_id.0, || {
            DeliveryRoute::empty(route_id)
        })
    }
}
