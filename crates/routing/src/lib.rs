//! Routing domain module (delivery routes, event-sourced).
//!
//! A delivery route sequences shipment drops onto one vehicle. Derived load
//! totals are a cache over the stops and the vehicle's capacity, recomputed
//! on every mutation; stop optimization is a deterministic nearest-neighbor
//! pass over stop coordinates.

pub mod plan;
pub mod route;

pub use plan::{
    GeoPoint, RouteTotals, VehicleCapacity, compute_totals, haversine_km, optimize_sequence,
    route_distance_km,
};
pub use route::{
    AddStop, CreateRoute, DeliveryRoute, DeliveryRouteCommand, DeliveryRouteEvent,
    DeliveryRouteId, OptimizeRoute, RemoveStop, RouteCreated, RouteOptimized, RouteStop,
    SetVehicle, StopAdded, StopLoadUpdated, StopRemoved, UpdateStopLoad, VehicleAssigned,
    VehicleAssignment, VehicleId,
};
