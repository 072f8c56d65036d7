//! Scan benchmark: edge detection cost per scan for the plant's sensor set.
//!
//! The scan thread runs every 50 ms by default; detection has to stay far
//! below that so handlers get the rest of the period.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use plant::io::SensorMap;
use plant_control::edge::{EdgeDetector, InhibitFlag};
use plant_control::events::{Signal, register_signals};

const SNAPSHOT_LEN: usize = 120;

/// Quiet plant: emergency released, infeeds resting high.
fn idle_snapshot() -> Vec<bool> {
    let mut s = vec![false; SNAPSHOT_LEN];
    for addr in [9, 77, 80, 83] {
        s[addr] = true;
    }
    s
}

fn detector() -> EdgeDetector<Signal> {
    let mut detector = EdgeDetector::new();
    register_signals(&mut detector, &SensorMap::default(), InhibitFlag::new());
    detector.handle_scan(&idle_snapshot());
    detector
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_scan");
    group.sample_size(500);

    let idle = idle_snapshot();
    let mut quiet = detector();
    group.bench_function("idle", |b| {
        b.iter(|| black_box(quiet.handle_scan(black_box(&idle))));
    });

    // Flip `n` registered inputs every other scan.
    for &n in &[1usize, 4, 8] {
        let mut busy = idle_snapshot();
        for addr in [78, 81, 84, 90, 24, 28, 13, 14].iter().take(n) {
            busy[*addr] = true;
        }
        let mut det = detector();
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("changing_inputs", n), &n, |b, _| {
            b.iter(|| {
                flip = !flip;
                let snapshot = if flip { &busy } else { &idle };
                black_box(det.handle_scan(black_box(snapshot)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
