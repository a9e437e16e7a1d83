//! CFAR throughput over a full-size Range-Doppler map.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use radar_ew_signal::{CaCfar, CfarConfig, MapGeometry, OsCfar, RangeDopplerMap};

fn bench_map() -> RangeDopplerMap {
    let mut magnitude = Array2::<f64>::from_elem((128, 256), 1.0);
    // A handful of strong cells so the detectors do real work.
    for (r, c) in [(10, 40), (64, 128), (100, 200)] {
        magnitude[(r, c)] = 80.0;
    }
    RangeDopplerMap {
        magnitude,
        geometry: MapGeometry {
            range_resolution_m: 50.0,
            velocity_resolution_mps: 2.0,
        },
    }
}

fn cfar_benchmarks(c: &mut Criterion) {
    let map = bench_map();
    let config = CfarConfig::default();

    let ca = CaCfar::new(config).unwrap();
    c.bench_function("ca_cfar_128x256", |b| {
        b.iter(|| black_box(ca.detect(black_box(&map))))
    });

    let os = OsCfar::new(config).unwrap();
    c.bench_function("os_cfar_128x256", |b| {
        b.iter(|| black_box(os.detect(black_box(&map))))
    });
}

criterion_group!(benches, cfar_benchmarks);
criterion_main!(benches);
