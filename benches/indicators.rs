use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use rust_decimal::Decimal;
use std::{hint::black_box, time::Duration};
use tideflow_ta::{Ema, Highest, Indicator, Sma, Tma};

/// Deterministic pseudo-random walk in cents; no RNG dependency so
/// every run benchmarks the same series.
fn synthetic_prices(count: usize) -> Vec<Decimal> {
    let mut prices = Vec::with_capacity(count);
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut cents: i64 = 1_000_000;
    for _ in 0..count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        cents += i64::try_from(state % 201).expect("bounded") - 100;
        prices.push(Decimal::new(cents, 2));
    }
    prices
}

fn stream_benchmarks(c: &mut Criterion) {
    let prices = synthetic_prices(10_000);
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Elements(prices.len() as u64));
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(8));

    macro_rules! stream_bench {
        ($name:expr, $make:expr) => {
            group.bench_function($name, |b| {
                b.iter_batched(
                    || $make,
                    |mut ind| {
                        for (i, price) in prices.iter().enumerate() {
                            let time = u64::try_from(i).expect("bounded") + 1;
                            black_box(ind.process_scalar(*price, time, true));
                        }
                    },
                    BatchSize::SmallInput,
                );
            });
        };
    }

    stream_bench!("sma20", Sma::new(20));
    stream_bench!("sma200", Sma::new(200));
    stream_bench!("ema20", Ema::new(20));
    stream_bench!("ema200", Ema::new(200));
    stream_bench!("highest20", Highest::new(20));
    stream_bench!("highest200", Highest::new(200));
    stream_bench!("tma20", Tma::new(20));
    stream_bench!("tma200", Tma::new(200));

    group.finish();
}

fn preview_benchmarks(c: &mut Criterion) {
    let prices = synthetic_prices(10_000);
    let candidate = *prices.last().unwrap();
    let mut group = c.benchmark_group("preview");
    group.sample_size(200);
    group.noise_threshold(0.03);
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(8));

    // Pre-feed the whole series, then benchmark a single preview call.
    macro_rules! preview_bench {
        ($name:expr, $make:expr) => {
            group.bench_function($name, |b| {
                b.iter_batched(
                    || {
                        let mut ind = $make;
                        for (i, price) in prices.iter().enumerate() {
                            let time = u64::try_from(i).expect("bounded") + 1;
                            ind.process_scalar(*price, time, true);
                        }
                        ind
                    },
                    |mut ind| {
                        black_box(ind.process_scalar(candidate, 10_001, false));
                    },
                    BatchSize::SmallInput,
                );
            });
        };
    }

    preview_bench!("sma20", Sma::new(20));
    preview_bench!("sma200", Sma::new(200));
    preview_bench!("ema20", Ema::new(20));
    preview_bench!("ema200", Ema::new(200));
    preview_bench!("highest20", Highest::new(20));
    preview_bench!("highest200", Highest::new(200));
    preview_bench!("tma20", Tma::new(20));
    preview_bench!("tma200", Tma::new(200));

    group.finish();
}

fn live_stream_benchmarks(c: &mut Criterion) {
    let prices = synthetic_prices(2_500);
    let mut group = c.benchmark_group("live_stream");
    group.throughput(Throughput::Elements(prices.len() as u64 * 4));
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(8));

    // Three previews per bar before it closes, the live-data shape.
    macro_rules! live_bench {
        ($name:expr, $make:expr) => {
            group.bench_function($name, |b| {
                b.iter_batched(
                    || $make,
                    |mut ind| {
                        for (i, price) in prices.iter().enumerate() {
                            let time = u64::try_from(i).expect("bounded") + 1;
                            for tick in 1..=3u32 {
                                let nudged = *price + Decimal::new(i64::from(tick), 2);
                                black_box(ind.process_scalar(nudged, time, false));
                            }
                            black_box(ind.process_scalar(*price, time, true));
                        }
                    },
                    BatchSize::SmallInput,
                );
            });
        };
    }

    live_bench!("sma20", Sma::new(20));
    live_bench!("sma200", Sma::new(200));
    live_bench!("ema20", Ema::new(20));
    live_bench!("ema200", Ema::new(200));
    live_bench!("highest20", Highest::new(20));
    live_bench!("highest200", Highest::new(200));
    live_bench!("tma20", Tma::new(20));
    live_bench!("tma200", Tma::new(200));

    group.finish();
}

criterion_group!(
    benches,
    stream_benchmarks,
    preview_benchmarks,
    live_stream_benchmarks
);
criterion_main!(benches);
