use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shapefit_core::{
    offsets_by_dist_traveled, offsets_by_stops, read_shapes, LatLng, MatchingStrategy,
    NoOpProgressHandler,
};

fn zigzag_shape(points: usize) -> Vec<LatLng> {
    (0..points)
        .map(|i| {
            let lat = i as f64 * 0.001;
            let lon = if i % 2 == 0 { 0.0 } else { 0.001 };
            LatLng::new(lat, lon)
        })
        .collect()
}

fn stops_along(shape: &[LatLng], every: usize) -> Vec<LatLng> {
    let mut stops: Vec<LatLng> = shape
        .iter()
        .step_by(every)
        .map(|p| LatLng::new(p.lat + 0.0001, p.lon))
        .collect();
    if let (Some(first), Some(last)) = (shape.first(), shape.last()) {
        stops[0] = *first;
        *stops.last_mut().unwrap() = *last;
    }
    stops
}

fn shapes_csv(num_shapes: usize, points_per_shape: usize) -> Vec<u8> {
    let mut data =
        b"shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence,shape_dist_traveled\n".to_vec();
    for shape in 0..num_shapes {
        for i in 0..points_per_shape {
            let lat = i as f64 * 0.001;
            let lon = if i % 2 == 0 { 0.0 } else { 0.001 };
            data.extend_from_slice(
                format!("S{shape},{lat},{lon},{i},{}\n", i as f64 * 100.0).as_bytes(),
            );
        }
    }
    data
}

fn benchmark_matching(c: &mut Criterion) {
    let shape = zigzag_shape(2000);
    let stops = stops_along(&shape, 50);

    c.bench_function("offsets_by_stops/linear_2000pts_40stops", |b| {
        b.iter(|| {
            offsets_by_stops(
                black_box(&shape),
                black_box(&stops),
                MatchingStrategy::LinearBestFit,
            )
        })
    });

    c.bench_function("offsets_by_stops/global_2000pts_40stops", |b| {
        b.iter(|| {
            offsets_by_stops(
                black_box(&shape),
                black_box(&stops),
                MatchingStrategy::MinimalDistanceGlobal,
            )
        })
    });

    let shape_dists: Vec<f64> = (0..2000).map(|i| i as f64 * 100.0).collect();
    let stop_dists: Vec<f64> = (0..40).map(|i| i as f64 * 5000.0).collect();
    c.bench_function("offsets_by_dist_traveled/2000pts_40stops", |b| {
        b.iter(|| offsets_by_dist_traveled(black_box(&stop_dists), black_box(&shape_dists)))
    });
}

fn benchmark_loading(c: &mut Criterion) {
    let data = shapes_csv(100, 200);
    c.bench_function("read_shapes/100shapes_200pts", |b| {
        b.iter(|| read_shapes(black_box(&data), &NoOpProgressHandler).unwrap())
    });
}

criterion_group!(benches, benchmark_matching, benchmark_loading);
criterion_main!(benches);
