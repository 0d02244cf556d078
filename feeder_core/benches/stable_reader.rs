use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use feeder_core::robust_mean;

// Load-cell-like burst: constant level, small jitter, occasional spikes
fn synth_burst(n: usize, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let jitter = (next() * 2.0 - 1.0) * 40.0;
            let spike = if i % 7 == 3 { 250_000.0 } else { 0.0 };
            84_000.0 + jitter + spike
        })
        .collect()
}

pub fn bench_robust_mean(c: &mut Criterion) {
    let mut g = c.benchmark_group("robust_mean");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    }
    for desired in [5usize, 20] {
        let burst = synth_burst(desired * 2, 0xC0FFEE);
        g.bench_function(format!("desired_{desired}"), |b| {
            b.iter_batched(
                || burst.clone(),
                |v| black_box(robust_mean(&v, desired)),
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(benches, bench_robust_mean);
criterion_main!(benches);
