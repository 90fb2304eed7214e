use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use stockflow_events::Event;
use stockflow_fulfillment::DemandOrderId;

use crate::plan::{GeoPoint, RouteTotals, VehicleCapacity, compute_totals, optimize_sequence};

/// Delivery route identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryRouteId(pub AggregateId);

impl DeliveryRouteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DeliveryRouteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Vehicle identifier (master data lives with the fleet collaborator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub AggregateId);

impl VehicleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The vehicle currently assigned to a route, with a snapshot of its profile.
///
/// The driver is always derived from the vehicle profile; it is never set
/// independently of the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAssignment {
    pub vehicle_id: VehicleId,
    pub driver: Option<String>,
    pub capacity: VehicleCapacity,
}

/// One delivery drop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    /// 1-based position in the driving order. Renumbered on remove/optimize.
    pub sequence: u32,
    pub demand_order: DemandOrderId,
    pub delivery_address: String,
    pub coords: Option<GeoPoint>,
    pub weight_kg: f64,
    pub volume_cbm: f64,
}

/// Aggregate root: DeliveryRoute.
///
/// `totals` is a cache over `stops` and the assigned vehicle's capacity.
/// It is recomputed inside `apply` on every mutation of either, so readers
/// always observe totals consistent with the stops in the same version.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRoute {
    id: DeliveryRouteId,
    tenant_id: Option<TenantId>,
    vehicle: Option<VehicleAssignment>,
    stops: Vec<RouteStop>,
    totals: RouteTotals,
    version: u64,
    created: bool,
}

impl DeliveryRoute {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: DeliveryRouteId) -> Self {
        Self {
            id,
            tenant_id: None,
            vehicle: None,
            stops: Vec::new(),
            totals: RouteTotals::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DeliveryRouteId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn vehicle(&self) -> Option<&VehicleAssignment> {
        self.vehicle.as_ref()
    }

    pub fn driver(&self) -> Option<&str> {
        self.vehicle.as_ref().and_then(|v| v.driver.as_deref())
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn totals(&self) -> RouteTotals {
        self.totals
    }

    /// Whether the route can be handed to dispatch: a vehicle with a driver
    /// must be assigned and neither load percentage may exceed 100.
    pub fn check_dispatch_ready(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        let vehicle = self
            .vehicle
            .as_ref()
            .ok_or_else(|| DomainError::validation("no vehicle assigned to this route"))?;
        if vehicle.driver.is_none() {
            return Err(DomainError::validation("assigned vehicle has no driver"));
        }
        if self.totals.load_weight_pct > 100.0 {
            return Err(DomainError::validation(format!(
                "vehicle overloaded by weight: {:.1}% of capacity",
                self.totals.load_weight_pct
            )));
        }
        if self.totals.load_volume_pct > 100.0 {
            return Err(DomainError::validation(format!(
                "vehicle overloaded by volume: {:.1}% of capacity",
                self.totals.load_volume_pct
            )));
        }
        Ok(())
    }

    fn recompute_totals(&mut self) {
        self.totals = compute_totals(&self.stops, self.vehicle.as_ref().map(|v| v.capacity));
    }
}

impl AggregateRoot for DeliveryRoute {
    type Id = DeliveryRouteId;

    const KIND: &'static str = "routing.delivery_route";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRoute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoute {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetVehicle. Carries the profile snapshot the service fetched from
/// the fleet collaborator; the driver rides along with the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVehicle {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub vehicle_id: VehicleId,
    pub driver: Option<String>,
    pub capacity: VehicleCapacity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddStop. Weight/volume/coordinates come from the order's delivery
/// info, fetched by the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddStop {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub demand_order: DemandOrderId,
    pub delivery_address: String,
    pub coords: Option<GeoPoint>,
    pub weight_kg: f64,
    pub volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveStop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveStop {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub demand_order: DemandOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateStopLoad. Edits one stop's shipment weight/volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStopLoad {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub demand_order: DemandOrderId,
    pub weight_kg: f64,
    pub volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: OptimizeRoute. Resequences stops by nearest-neighbor from `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRoute {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub origin: GeoPoint,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryRouteCommand {
    CreateRoute(CreateRoute),
    SetVehicle(SetVehicle),
    AddStop(AddStop),
    RemoveStop(RemoveStop),
    UpdateStopLoad(UpdateStopLoad),
    OptimizeRoute(OptimizeRoute),
}

/// Event: RouteCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCreated {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VehicleAssigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAssigned {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub vehicle_id: VehicleId,
    pub driver: Option<String>,
    pub capacity: VehicleCapacity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StopAdded. Carries the stop with its assigned sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopAdded {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub stop: RouteStop,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StopRemoved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRemoved {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub demand_order: DemandOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StopLoadUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLoadUpdated {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub demand_order: DemandOrderId,
    pub weight_kg: f64,
    pub volume_cbm: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RouteOptimized. Carries the full new visiting order; weight and
/// volume of each stop are untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimized {
    pub tenant_id: TenantId,
    pub route_id: DeliveryRouteId,
    pub ordered: Vec<DemandOrderId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeliveryRouteEvent {
    RouteCreated(RouteCreated),
    VehicleAssigned(VehicleAssigned),
    StopAdded(StopAdded),
    StopRemoved(StopRemoved),
    StopLoadUpdated(StopLoadUpdated),
    RouteOptimized(RouteOptimized),
}

impl Event for DeliveryRouteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryRouteEvent::RouteCreated(_) => "routing.route.created",
            DeliveryRouteEvent::VehicleAssigned(_) => "routing.route.vehicle_assigned",
            DeliveryRouteEvent::StopAdded(_) => "routing.route.stop_added",
            DeliveryRouteEvent::StopRemoved(_) => "routing.route.stop_removed",
            DeliveryRouteEvent::StopLoadUpdated(_) => "routing.route.stop_load_updated",
            DeliveryRouteEvent::RouteOptimized(_) => "routing.route.optimized",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryRouteEvent::RouteCreated(e) => e.occurred_at,
            DeliveryRouteEvent::VehicleAssigned(e) => e.occurred_at,
            DeliveryRouteEvent::StopAdded(e) => e.occurred_at,
            DeliveryRouteEvent::StopRemoved(e) => e.occurred_at,
            DeliveryRouteEvent::StopLoadUpdated(e) => e.occurred_at,
            DeliveryRouteEvent::RouteOptimized(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DeliveryRoute {
    type Command = DeliveryRouteCommand;
    type Event = DeliveryRouteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryRouteEvent::RouteCreated(e) => {
                self.id = e.route_id;
                self.tenant_id = Some(e.tenant_id);
                self.created = true;
            }
            DeliveryRouteEvent::VehicleAssigned(e) => {
                self.vehicle = Some(VehicleAssignment {
                    vehicle_id: e.vehicle_id,
                    driver: e.driver.clone(),
                    capacity: e.capacity,
                });
            }
            DeliveryRouteEvent::StopAdded(e) => {
                self.stops.push(e.stop.clone());
            }
            DeliveryRouteEvent::StopRemoved(e) => {
                self.stops.retain(|s| s.demand_order != e.demand_order);
                for (idx, stop) in self.stops.iter_mut().enumerate() {
                    stop.sequence = idx as u32 + 1;
                }
            }
            DeliveryRouteEvent::StopLoadUpdated(e) => {
                if let Some(stop) = self
                    .stops
                    .iter_mut()
                    .find(|s| s.demand_order == e.demand_order)
                {
                    stop.weight_kg = e.weight_kg;
                    stop.volume_cbm = e.volume_cbm;
                }
            }
            DeliveryRouteEvent::RouteOptimized(e) => {
                let position = |id: DemandOrderId| {
                    e.ordered
                        .iter()
                        .position(|o| *o == id)
                        .unwrap_or(e.ordered.len())
                };
                self.stops.sort_by_key(|s| position(s.demand_order));
                for (idx, stop) in self.stops.iter_mut().enumerate() {
                    stop.sequence = idx as u32 + 1;
                }
            }
        }

        // Totals stay consistent with the stops at every version.
        self.recompute_totals();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryRouteCommand::CreateRoute(cmd) => self.handle_create(cmd),
            DeliveryRouteCommand::SetVehicle(cmd) => self.handle_set_vehicle(cmd),
            DeliveryRouteCommand::AddStop(cmd) => self.handle_add_stop(cmd),
            DeliveryRouteCommand::RemoveStop(cmd) => self.handle_remove_stop(cmd),
            DeliveryRouteCommand::UpdateStopLoad(cmd) => self.handle_update_stop_load(cmd),
            DeliveryRouteCommand::OptimizeRoute(cmd) => self.handle_optimize(cmd),
        }
    }
}

impl DeliveryRoute {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::precondition("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_route_id(&self, route_id: DeliveryRouteId) -> Result<(), DomainError> {
        if self.id != route_id {
            return Err(DomainError::precondition("route_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self, tenant_id: TenantId, route_id: DeliveryRouteId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_route_id(route_id)
    }

    fn handle_create(&self, cmd: &CreateRoute) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists("delivery route already exists"));
        }

        Ok(vec![DeliveryRouteEvent::RouteCreated(RouteCreated {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_vehicle(&self, cmd: &SetVehicle) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.route_id)?;

        Ok(vec![DeliveryRouteEvent::VehicleAssigned(VehicleAssigned {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            vehicle_id: cmd.vehicle_id,
            driver: cmd.driver.clone(),
            capacity: cmd.capacity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_stop(&self, cmd: &AddStop) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.route_id)?;

        if self.stops.iter().any(|s| s.demand_order == cmd.demand_order) {
            return Err(DomainError::already_exists(format!(
                "order {} is already a stop on this route",
                cmd.demand_order
            )));
        }
        if cmd.delivery_address.trim().is_empty() {
            return Err(DomainError::validation("delivery address is required"));
        }

        let stop = RouteStop {
            sequence: self.stops.len() as u32 + 1,
            demand_order: cmd.demand_order,
            delivery_address: cmd.delivery_address.clone(),
            coords: cmd.coords,
            weight_kg: cmd.weight_kg,
            volume_cbm: cmd.volume_cbm,
        };

        Ok(vec![DeliveryRouteEvent::StopAdded(StopAdded {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            stop,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_stop(&self, cmd: &RemoveStop) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.route_id)?;

        if !self.stops.iter().any(|s| s.demand_order == cmd.demand_order) {
            return Err(DomainError::validation(format!(
                "order {} is not a stop on this route",
                cmd.demand_order
            )));
        }

        Ok(vec![DeliveryRouteEvent::StopRemoved(StopRemoved {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            demand_order: cmd.demand_order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_stop_load(
        &self,
        cmd: &UpdateStopLoad,
    ) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.route_id)?;

        if !self.stops.iter().any(|s| s.demand_order == cmd.demand_order) {
            return Err(DomainError::validation(format!(
                "order {} is not a stop on this route",
                cmd.demand_order
            )));
        }

        Ok(vec![DeliveryRouteEvent::StopLoadUpdated(StopLoadUpdated {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            demand_order: cmd.demand_order,
            weight_kg: cmd.weight_kg,
            volume_cbm: cmd.volume_cbm,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_optimize(&self, cmd: &OptimizeRoute) -> Result<Vec<DeliveryRouteEvent>, DomainError> {
        self.ensure_exists(cmd.tenant_id, cmd.route_id)?;

        if self.stops.is_empty() {
            return Err(DomainError::precondition("route has no stops to sequence"));
        }

        let ordered = optimize_sequence(&self.stops, cmd.origin)?;

        Ok(vec![DeliveryRouteEvent::RouteOptimized(RouteOptimized {
            tenant_id: cmd.tenant_id,
            route_id: cmd.route_id,
            ordered,
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

    fn test_route_id() -> DeliveryRouteId {
        DeliveryRouteId::new(AggregateId::new())
    }

    fn test_vehicle_id() -> VehicleId {
        VehicleId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_route(tenant_id: TenantId, route_id: DeliveryRouteId) -> DeliveryRoute {
        let mut route = DeliveryRoute::empty(route_id);
        let events = route
            .handle(&DeliveryRouteCommand::CreateRoute(CreateRoute {
                tenant_id,
                route_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        route.apply(&events[0]);
        route
    }

    fn run(route: &mut DeliveryRoute, cmd: DeliveryRouteCommand) {
        let events = route.handle(&cmd).unwrap();
        for event in &events {
            route.apply(event);
        }
    }

    fn add_stop_cmd(
        tenant_id: TenantId,
        route_id: DeliveryRouteId,
        order: DemandOrderId,
        lat: f64,
        lon: f64,
        weight: f64,
        volume: f64,
    ) -> DeliveryRouteCommand {
        DeliveryRouteCommand::AddStop(AddStop {
            tenant_id,
            route_id,
            demand_order: order,
            delivery_address: "12 Dock Road".to_string(),
            coords: Some(GeoPoint { latitude: lat, longitude: lon }),
            weight_kg: weight,
            volume_cbm: volume,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn add_stop_assigns_the_next_sequence_and_updates_totals() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let a = DemandOrderId::new(AggregateId::new());
        let b = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, a, 0.1, 0.0, 100.0, 1.0));
        run(&mut route, add_stop_cmd(tenant_id, route_id, b, 0.2, 0.0, 150.0, 2.0));

        assert_eq!(route.stops()[0].sequence, 1);
        assert_eq!(route.stops()[1].sequence, 2);
        assert_eq!(route.totals().total_stops, 2);
        assert_eq!(route.totals().total_weight_kg, 250.0);
        assert_eq!(route.totals().total_volume_cbm, 3.0);
    }

    #[test]
    fn duplicate_stop_for_the_same_order_is_rejected() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let order = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, order, 0.1, 0.0, 10.0, 0.1));

        let err = route
            .handle(&add_stop_cmd(tenant_id, route_id, order, 0.2, 0.0, 10.0, 0.1))
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[test]
    fn assigning_a_vehicle_recomputes_load_percentages() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let order = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, order, 0.1, 0.0, 250.0, 5.0));
        assert_eq!(route.totals().load_weight_pct, 0.0);

        run(
            &mut route,
            DeliveryRouteCommand::SetVehicle(SetVehicle {
                tenant_id,
                route_id,
                vehicle_id: test_vehicle_id(),
                driver: Some("J. Mokoena".to_string()),
                capacity: VehicleCapacity { max_weight_kg: 500.0, max_volume_cbm: 10.0 },
                occurred_at: test_time(),
            }),
        );

        assert_eq!(route.totals().load_weight_pct, 50.0);
        assert_eq!(route.totals().load_volume_pct, 50.0);
    }

    #[test]
    fn removing_a_stop_renumbers_the_remainder() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let a = DemandOrderId::new(AggregateId::new());
        let b = DemandOrderId::new(AggregateId::new());
        let c = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, a, 0.1, 0.0, 10.0, 0.1));
        run(&mut route, add_stop_cmd(tenant_id, route_id, b, 0.2, 0.0, 10.0, 0.1));
        run(&mut route, add_stop_cmd(tenant_id, route_id, c, 0.3, 0.0, 10.0, 0.1));

        run(
            &mut route,
            DeliveryRouteCommand::RemoveStop(RemoveStop {
                tenant_id,
                route_id,
                demand_order: b,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(route.stops().len(), 2);
        assert_eq!(route.stops()[0].demand_order, a);
        assert_eq!(route.stops()[1].demand_order, c);
        assert_eq!(route.stops()[1].sequence, 2);
        assert_eq!(route.totals().total_stops, 2);
    }

    #[test]
    fn updating_stop_load_refreshes_totals_in_the_same_version() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let order = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, order, 0.1, 0.0, 10.0, 0.1));
        run(
            &mut route,
            DeliveryRouteCommand::UpdateStopLoad(UpdateStopLoad {
                tenant_id,
                route_id,
                demand_order: order,
                weight_kg: 40.0,
                volume_cbm: 0.4,
                occurred_at: test_time(),
            }),
        );

        assert_eq!(route.stops()[0].weight_kg, 40.0);
        assert_eq!(route.totals().total_weight_kg, 40.0);
    }

    #[test]
    fn optimize_resequences_stops_nearest_first() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let far = DemandOrderId::new(AggregateId::new());
        let near = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, far, 2.0, 0.0, 10.0, 0.1));
        run(&mut route, add_stop_cmd(tenant_id, route_id, near, 0.1, 0.0, 10.0, 0.1));

        run(
            &mut route,
            DeliveryRouteCommand::OptimizeRoute(OptimizeRoute {
                tenant_id,
                route_id,
                origin: GeoPoint { latitude: 0.0, longitude: 0.0 },
                occurred_at: test_time(),
            }),
        );

        assert_eq!(route.stops()[0].demand_order, near);
        assert_eq!(route.stops()[0].sequence, 1);
        assert_eq!(route.stops()[1].demand_order, far);
        assert_eq!(route.stops()[1].sequence, 2);
    }

    #[test]
    fn optimize_rejects_a_stop_without_coordinates() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let order = DemandOrderId::new(AggregateId::new());
        run(
            &mut route,
            DeliveryRouteCommand::AddStop(AddStop {
                tenant_id,
                route_id,
                demand_order: order,
                delivery_address: "12 Dock Road".to_string(),
                coords: None,
                weight_kg: 10.0,
                volume_cbm: 0.1,
                occurred_at: test_time(),
            }),
        );

        let err = route
            .handle(&DeliveryRouteCommand::OptimizeRoute(OptimizeRoute {
                tenant_id,
                route_id,
                origin: GeoPoint { latitude: 0.0, longitude: 0.0 },
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        // A failed optimization leaves the sequence untouched.
        assert_eq!(route.stops()[0].sequence, 1);
    }

    #[test]
    fn optimize_preserves_stop_loads() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        let a = DemandOrderId::new(AggregateId::new());
        let b = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, a, 2.0, 0.0, 11.0, 0.2));
        run(&mut route, add_stop_cmd(tenant_id, route_id, b, 0.1, 0.0, 22.0, 0.4));

        let before = route.totals();
        run(
            &mut route,
            DeliveryRouteCommand::OptimizeRoute(OptimizeRoute {
                tenant_id,
                route_id,
                origin: GeoPoint { latitude: 0.0, longitude: 0.0 },
                occurred_at: test_time(),
            }),
        );

        assert_eq!(route.totals(), before);
        let weights: Vec<f64> = route.stops().iter().map(|s| s.weight_kg).collect();
        assert_eq!(weights, vec![22.0, 11.0]);
    }

    #[test]
    fn dispatch_readiness_requires_a_driver() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        assert!(route.check_dispatch_ready().is_err());

        run(
            &mut route,
            DeliveryRouteCommand::SetVehicle(SetVehicle {
                tenant_id,
                route_id,
                vehicle_id: test_vehicle_id(),
                driver: None,
                capacity: VehicleCapacity { max_weight_kg: 500.0, max_volume_cbm: 10.0 },
                occurred_at: test_time(),
            }),
        );
        let err = route.check_dispatch_ready().unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("driver")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_readiness_trips_on_overload() {
        let tenant_id = test_tenant_id();
        let route_id = test_route_id();
        let mut route = created_route(tenant_id, route_id);

        run(
            &mut route,
            DeliveryRouteCommand::SetVehicle(SetVehicle {
                tenant_id,
                route_id,
                vehicle_id: test_vehicle_id(),
                driver: Some("J. Mokoena".to_string()),
                capacity: VehicleCapacity { max_weight_kg: 100.0, max_volume_cbm: 10.0 },
                occurred_at: test_time(),
            }),
        );

        let order = DemandOrderId::new(AggregateId::new());
        run(&mut route, add_stop_cmd(tenant_id, route_id, order, 0.1, 0.0, 100.0, 1.0));
        assert!(route.check_dispatch_ready().is_ok());

        run(
            &mut route,
            DeliveryRouteCommand::UpdateStopLoad(UpdateStopLoad {
                tenant_id,
                route_id,
                demand_order: order,
                weight_kg: 100.5,
                volume_cbm: 1.0,
                occurred_at: test_time(),
            }),
        );
        let err = route.check_dispatch_ready().unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("overloaded")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }
}
