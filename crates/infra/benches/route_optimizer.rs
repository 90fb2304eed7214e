use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stockflow_core::AggregateId;
use stockflow_fulfillment::DemandOrderId;
use stockflow_routing::{GeoPoint, RouteStop, VehicleCapacity, compute_totals, optimize_sequence};

/// Deterministic stop generator (LCG) so runs are comparable.
fn make_stops(count: usize) -> Vec<RouteStop> {
    let mut state: u64 = 0x5DEECE66D;
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    (0..count)
        .map(|idx| RouteStop {
            sequence: idx as u32 + 1,
            demand_order: DemandOrderId::new(AggregateId::new()),
            delivery_address: format!("{idx} Depot Lane"),
            coords: Some(GeoPoint {
                latitude: -35.0 + next() * 70.0,
                longitude: -170.0 + next() * 340.0,
            }),
            weight_kg: next() * 400.0,
            volume_cbm: next() * 4.0,
        })
        .collect()
}

fn bench_optimize_sequence(c: &mut Criterion) {
    let origin = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    let mut group = c.benchmark_group("optimize_sequence");
    for size in [10usize, 50, 200] {
        let stops = make_stops(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stops, |b, stops| {
            b.iter(|| optimize_sequence(black_box(stops), black_box(origin)).unwrap());
        });
    }
    group.finish();
}

fn bench_compute_totals(c: &mut Criterion) {
    let stops = make_stops(200);
    let capacity = Some(VehicleCapacity {
        max_weight_kg: 50_000.0,
        max_volume_cbm: 500.0,
    });

    c.bench_function("compute_totals/200", |b| {
        b.iter(|| compute_totals(black_box(&stops), black_box(capacity)));
    });
}

criterion_group!(benches, bench_optimize_sequence, bench_compute_totals);
criterion_main!(benches);
