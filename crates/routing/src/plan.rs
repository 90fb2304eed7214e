//! Pure route-planning functions: load totals and stop-sequence optimization.

use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, ValueObject};
use stockflow_fulfillment::DemandOrderId;

use crate::route::RouteStop;

/// WGS84 coordinates of a stop or depot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl ValueObject for GeoPoint {}

/// Capacity limits of the assigned vehicle (read-only master data).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleCapacity {
    pub max_weight_kg: f64,
    pub max_volume_cbm: f64,
}

impl ValueObject for VehicleCapacity {}

/// Derived load metrics of a route.
///
/// Always recomputable from the stops and the vehicle capacity; a cache,
/// never the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteTotals {
    pub total_stops: usize,
    pub total_weight_kg: f64,
    pub total_volume_cbm: f64,
    pub load_weight_pct: f64,
    pub load_volume_pct: f64,
}

impl ValueObject for RouteTotals {}

impl Default for RouteTotals {
    fn default() -> Self {
        Self {
            total_stops: 0,
            total_weight_kg: 0.0,
            total_volume_cbm: 0.0,
            load_weight_pct: 0.0,
            load_volume_pct: 0.0,
        }
    }
}

/// Compute route load totals.
///
/// Load percentages are zero without a vehicle or with a zero capacity; a
/// negative stop weight/volume is summed as-is (input validation is the
/// collaborator's concern, the arithmetic must not fail on it).
pub fn compute_totals(stops: &[RouteStop], capacity: Option<VehicleCapacity>) -> RouteTotals {
    let total_weight_kg: f64 = stops.iter().map(|s| s.weight_kg).sum();
    let total_volume_cbm: f64 = stops.iter().map(|s| s.volume_cbm).sum();

    let (load_weight_pct, load_volume_pct) = match capacity {
        Some(v) => (
            if v.max_weight_kg > 0.0 {
                total_weight_kg / v.max_weight_kg * 100.0
            } else {
                0.0
            },
            if v.max_volume_cbm > 0.0 {
                total_volume_cbm / v.max_volume_cbm * 100.0
            } else {
                0.0
            },
        ),
        None => (0.0, 0.0),
    };

    RouteTotals {
        total_stops: stops.len(),
        total_weight_kg,
        total_volume_cbm,
        load_weight_pct,
        load_volume_pct,
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Order stops by repeatedly visiting the nearest unvisited one, starting
/// from `origin`.
///
/// Deterministic: distance ties keep the stop that comes first in the
/// current sequence. Every stop appears in the result exactly once. Fails if
/// any stop has no coordinates.
pub fn optimize_sequence(
    stops: &[RouteStop],
    origin: GeoPoint,
) -> DomainResult<Vec<DemandOrderId>> {
    let mut remaining: Vec<(DemandOrderId, GeoPoint)> = Vec::with_capacity(stops.len());
    for stop in stops {
        let coords = stop.coords.ok_or_else(|| {
            DomainError::validation(format!(
                "stop for order {} has no coordinates",
                stop.demand_order
            ))
        })?;
        remaining.push((stop.demand_order, coords));
    }

    let mut current = origin;
    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (idx, (_, coords)) in remaining.iter().enumerate() {
            let distance = haversine_km(current, *coords);
            // Strict less-than keeps the earlier stop on ties.
            if distance < best_distance {
                best_distance = distance;
                best = idx;
            }
        }
        let (chosen, coords) = remaining.remove(best);
        order.push(chosen);
        current = coords;
    }

    Ok(order)
}

/// Total travel distance of visiting the stops in their current order from
/// `origin`. Fails if any stop has no coordinates.
pub fn route_distance_km(stops: &[RouteStop], origin: GeoPoint) -> DomainResult<f64> {
    let mut current = origin;
    let mut total = 0.0;
    for stop in stops {
        let coords = stop.coords.ok_or_else(|| {
            DomainError::validation(format!(
                "stop for order {} has no coordinates",
                stop.demand_order
            ))
        })?;
        total += haversine_km(current, coords);
        current = coords;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::AggregateId;

    fn stop(lat: f64, lon: f64, weight: f64, volume: f64) -> RouteStop {
        RouteStop {
            sequence: 0,
            demand_order: DemandOrderId::new(AggregateId::new()),
            delivery_address: String::new(),
            coords: Some(GeoPoint { latitude: lat, longitude: lon }),
            weight_kg: weight,
            volume_cbm: volume,
        }
    }

    fn origin() -> GeoPoint {
        GeoPoint { latitude: 0.0, longitude: 0.0 }
    }

    #[test]
    fn load_pct_follows_capacity() {
        let stops = vec![stop(0.0, 0.0, 100.0, 1.0), stop(0.0, 0.0, 150.0, 2.0)];
        let totals = compute_totals(
            &stops,
            Some(VehicleCapacity { max_weight_kg: 500.0, max_volume_cbm: 10.0 }),
        );

        assert_eq!(totals.total_stops, 2);
        assert_eq!(totals.total_weight_kg, 250.0);
        assert_eq!(totals.load_weight_pct, 50.0);
        assert_eq!(totals.load_volume_pct, 30.0);
    }

    #[test]
    fn load_pct_is_zero_without_a_vehicle() {
        let stops = vec![stop(0.0, 0.0, 100.0, 1.0)];
        let totals = compute_totals(&stops, None);
        assert_eq!(totals.load_weight_pct, 0.0);
        assert_eq!(totals.load_volume_pct, 0.0);
        assert_eq!(totals.total_weight_kg, 100.0);
    }

    #[test]
    fn zero_capacity_degrades_to_zero_pct() {
        let stops = vec![stop(0.0, 0.0, 100.0, 1.0)];
        let totals = compute_totals(
            &stops,
            Some(VehicleCapacity { max_weight_kg: 0.0, max_volume_cbm: 0.0 }),
        );
        assert_eq!(totals.load_weight_pct, 0.0);
        assert_eq!(totals.load_volume_pct, 0.0);
    }

    #[test]
    fn negative_contributions_sum_through() {
        let stops = vec![stop(0.0, 0.0, -10.0, -0.5), stop(0.0, 0.0, 30.0, 1.5)];
        let totals = compute_totals(
            &stops,
            Some(VehicleCapacity { max_weight_kg: 100.0, max_volume_cbm: 10.0 }),
        );
        assert_eq!(totals.total_weight_kg, 20.0);
        assert_eq!(totals.total_volume_cbm, 1.0);
        assert_eq!(totals.load_weight_pct, 20.0);
    }

    #[test]
    fn nearest_neighbor_visits_closest_first() {
        let near = stop(0.1, 0.0, 0.0, 0.0);
        let mid = stop(0.5, 0.0, 0.0, 0.0);
        let far = stop(2.0, 0.0, 0.0, 0.0);
        let stops = vec![far.clone(), near.clone(), mid.clone()];

        let order = optimize_sequence(&stops, origin()).unwrap();
        assert_eq!(order, vec![near.demand_order, mid.demand_order, far.demand_order]);
    }

    #[test]
    fn distance_ties_keep_current_sequence_order() {
        // Two stops equidistant from the origin.
        let east = stop(0.0, 1.0, 0.0, 0.0);
        let west = stop(0.0, -1.0, 0.0, 0.0);
        let stops = vec![east.clone(), west.clone()];

        let order = optimize_sequence(&stops, origin()).unwrap();
        assert_eq!(order[0], east.demand_order);
    }

    #[test]
    fn missing_coordinates_fail_optimization() {
        let mut blind = stop(0.0, 0.0, 0.0, 0.0);
        blind.coords = None;
        let err = optimize_sequence(&[blind], origin()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn route_distance_accumulates_leg_by_leg() {
        let a = stop(0.0, 1.0, 0.0, 0.0);
        let b = stop(0.0, 2.0, 0.0, 0.0);
        let direct = haversine_km(origin(), a.coords.unwrap())
            + haversine_km(a.coords.unwrap(), b.coords.unwrap());
        let total = route_distance_km(&[a, b], origin()).unwrap();
        assert!((total - direct).abs() < 1e-9);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_stops() -> impl Strategy<Value = Vec<RouteStop>> {
            prop::collection::vec(
                (-60.0f64..60.0, -170.0f64..170.0, 0.0f64..500.0, 0.0f64..5.0)
                    .prop_map(|(lat, lon, w, v)| stop(lat, lon, w, v)),
                0..10,
            )
        }

        proptest! {
            /// Optimization permutes the stop set: nothing dropped, nothing
            /// duplicated.
            #[test]
            fn optimization_preserves_the_stop_set(stops in arb_stops()) {
                let order = optimize_sequence(&stops, origin()).unwrap();
                prop_assert_eq!(order.len(), stops.len());

                let mut expected: Vec<_> = stops.iter().map(|s| s.demand_order).collect();
                let mut actual = order.clone();
                expected.sort_by_key(|id| id.to_string());
                actual.sort_by_key(|id| id.to_string());
                prop_assert_eq!(actual, expected);
            }

            /// Optimization is deterministic for a given input.
            #[test]
            fn optimization_is_deterministic(stops in arb_stops()) {
                let first = optimize_sequence(&stops, origin()).unwrap();
                let second = optimize_sequence(&stops, origin()).unwrap();
                prop_assert_eq!(first, second);
            }

            /// Totals are plain sums over the stops.
            #[test]
            fn totals_are_sums(stops in arb_stops()) {
                let totals = compute_totals(&stops, None);
                let weight: f64 = stops.iter().map(|s| s.weight_kg).sum();
                let volume: f64 = stops.iter().map(|s| s.volume_cbm).sum();
                prop_assert_eq!(totals.total_stops, stops.len());
                prop_assert!((totals.total_weight_kg - weight).abs() < 1e-9);
                prop_assert!((totals.total_volume_cbm - volume).abs() < 1e-9);
            }
        }
    }
}
