//! Benchmarks for the two dispatch strategies
//!
//! Runs the same item list through the streaming queue and the static
//! partition, with uniform and skewed lookup costs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scout_fetch::{FetchConfig, FetchEngine, Item, MetadataProvider, Result, Strategy};
use std::sync::Arc;
use std::time::Duration;

/// Lookup whose cost is fixed per item; items ending in '0' are slow.
struct Simulated {
    fast: Duration,
    slow: Duration,
}

impl MetadataProvider for Simulated {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn fetch_provides(&self, item: &Item) -> Result<Vec<String>> {
        let cost = if item.as_str().ends_with('0') {
            self.slow
        } else {
            self.fast
        };
        std::thread::sleep(cost);
        Ok(vec![format!("cmd:{item}")])
    }
}

fn items(n: usize) -> Vec<Item> {
    (0..n).map(|i| Item::new(format!("pkg-{i}"))).collect()
}

fn run_once(engine: &FetchEngine, items: &[Item], strategy: Strategy) -> usize {
    let run = engine
        .start_run(items.iter().cloned(), strategy)
        .expect("run starts");
    run.await_completion();
    run.results().len()
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetch_strategies");
    group.sample_size(10);

    let config = FetchConfig {
        workers: Some(4),
        ..FetchConfig::default()
    };
    let workloads = [
        ("uniform", Duration::from_micros(200), Duration::from_micros(200)),
        ("skewed", Duration::from_micros(50), Duration::from_millis(2)),
    ];
    let items = items(200);

    for (name, fast, slow) in workloads {
        let engine = FetchEngine::new(Arc::new(Simulated { fast, slow }), config.clone());

        for strategy in [Strategy::StreamingQueue, Strategy::StaticPartition] {
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), name),
                &strategy,
                |b, &strategy| b.iter(|| run_once(&engine, black_box(&items), strategy)),
            );
        }
    }

    group.finish();
}

fn bench_bounded_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_capacity");
    group.sample_size(10);

    let items = items(500);
    for capacity in [1usize, 16, 500] {
        let config = FetchConfig {
            workers: Some(4),
            queue_capacity: Some(capacity),
            ..FetchConfig::default()
        };
        let engine = FetchEngine::new(
            Arc::new(Simulated {
                fast: Duration::ZERO,
                slow: Duration::ZERO,
            }),
            config,
        );

        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| run_once(&engine, black_box(&items), Strategy::StreamingQueue))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_bounded_queue);
criterion_main!(benches);
