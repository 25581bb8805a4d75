// benches/storefront_benchmarks.rs
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront::tournament::{rounds, RoundOrder};
use storefront::{
  merge_carts, paths, CartMap, ChangeEvent, DocumentStore, MemoryStore, Saga, SagaContext, ShopError,
  WriteBatch,
};
use tokio::runtime::Runtime;

fn cart_of(size: usize, offset: usize) -> CartMap {
  (0..size).map(|i| (format!("P{}", i + offset), (i % 5 + 1) as u32)).collect()
}

fn bracket(round_count: usize) -> Value {
  let mut root = serde_json::Map::new();
  for r in 1..=round_count {
    let matches = 1usize << (round_count - r);
    let records: Vec<Value> = (0..matches)
      .map(|m| json!({ "playerA": format!("a{}", m), "playerB": format!("b{}", m), "result": "p1_wins" }))
      .collect();
    root.insert(format!("Round{}", r), Value::Array(records));
  }
  root.insert("WINNERS".to_string(), json!({ "FIRSTPLACE": "a0" }));
  Value::Object(root)
}

fn bench_merge_carts(c: &mut Criterion) {
  let mut group = c.benchmark_group("MergeCarts");
  for size in [4usize, 32, 256].iter() {
    // Half the lines overlap.
    let remote = cart_of(*size, 0);
    let local = cart_of(*size, size / 2);
    group.throughput(Throughput::Elements(*size as u64 * 2));
    group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
      b.iter(|| merge_carts(&remote, &local));
    });
  }
  group.finish();
}

fn bench_round_ordering(c: &mut Criterion) {
  let mut group = c.benchmark_group("RoundsPanel");
  for round_count in [3usize, 6, 9].iter() {
    let root = bracket(*round_count);
    group.throughput(Throughput::Elements(*round_count as u64));
    group.bench_with_input(BenchmarkId::from_parameter(round_count), round_count, |b, _| {
      b.iter(|| rounds(&root, RoundOrder::Panel).len());
    });
  }
  group.finish();
}

fn bench_store_fan_out(c: &mut Criterion) {
  let mut group = c.benchmark_group("StoreFanOut");
  let rt = Runtime::new().unwrap();

  for listeners in [0usize, 8, 64].iter() {
    let store = MemoryStore::new();
    let subscriptions: Vec<_> = (0..*listeners)
      .map(|i| store.subscribe(&paths::cart(&format!("uid-{}", i % 4)), Arc::new(|_: &ChangeEvent| {})))
      .collect();
    group.throughput(Throughput::Elements(1));
    group.bench_with_input(BenchmarkId::from_parameter(listeners), listeners, |b, _| {
      b.to_async(&rt).iter(|| {
        let store = store.clone();
        async move {
          store
            .commit(WriteBatch::new().set(paths::cart("uid-0").child("P1"), json!(1)))
            .await
            .unwrap()
        }
      });
    });
    drop(subscriptions);
  }
  group.finish();
}

#[derive(Default)]
struct Counter {
  steps: u64,
}

fn bench_saga_run(c: &mut Criterion) {
  let mut group = c.benchmark_group("SagaRun");
  let rt = Runtime::new().unwrap();

  let mut saga: Saga<Counter> = Saga::new(
    "bench",
    &[("a", false, None), ("b", false, None), ("c", true, None), ("d", false, None)],
  );
  for name in ["a", "b", "c", "d"] {
    saga.on_step(name, |ctx: SagaContext<Counter>| async move {
      ctx.write().steps += 1;
      Ok::<_, ShopError>(())
    });
  }
  let saga = Arc::new(saga);

  group.throughput(Throughput::Elements(4));
  group.bench_function("four_steps", |b| {
    b.to_async(&rt).iter_batched(
      || SagaContext::new(Counter::default()),
      |ctx| {
        let saga = saga.clone();
        async move { saga.run(ctx).await.unwrap() }
      },
      criterion::BatchSize::SmallInput,
    );
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_merge_carts,
  bench_round_ordering,
  bench_store_fan_out,
  bench_saga_run
);
criterion_main!(benches);
