use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

use kardio_dsp::detector::Detector;

const TICK: u64 = 5;

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    // One minute of a 75 BPM pulse with some noise on top.
    let trace: Vec<u16> = (0..12_000_u64)
        .map(|i| {
            let t = i * TICK;
            let base = if t % 800 < 100 { 700 } else { 300 };
            base + rng.gen_range(0..20)
        })
        .collect();

    c.bench_function("Detector", |b| {
        b.iter(|| {
            let mut detector = Detector::default();
            for (i, sample) in trace.iter().enumerate() {
                detector.process(black_box(*sample), i as u64 * TICK);
            }
            detector.bpm()
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
