//! Benchmark: Pool lookup performance (hit vs miss) and key derivation

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use smartpool_core::{AsyncPool, CallArgs, Fingerprint, Pool};
use std::convert::Infallible;

// Benchmark fixture: resource with a non-trivial construction cost
#[allow(dead_code)]
struct HeavyResource {
	computed_value: u64,
}

fn build_heavy(seed: &u64) -> Result<HeavyResource, Infallible> {
	let computed_value = (0..1000).fold(*seed, |acc, x| acc.wrapping_add(x));
	Ok(HeavyResource { computed_value })
}

fn benchmark_pool_hit(c: &mut Criterion) {
	let pool = Pool::new(build_heavy);
	pool.get(&1).unwrap();

	c.bench_function("pool_hit", |b| {
		b.iter(|| black_box(pool.get(black_box(&1)).unwrap()));
	});
}

fn benchmark_pool_miss(c: &mut Criterion) {
	c.bench_function("pool_miss", |b| {
		b.iter(|| {
			// Fresh pool per iteration, so every lookup constructs
			let pool = Pool::new(build_heavy);
			black_box(pool.get(black_box(&1)).unwrap())
		});
	});
}

fn benchmark_key_derivation(c: &mut Criterion) {
	let args = CallArgs::new()
		.arg("resnet50")
		.arg(0.25f64)
		.named("device", "cuda:0")
		.named("batch", 64);

	c.bench_function("fingerprint_hashed", |b| {
		b.iter(|| black_box(Fingerprint::of(black_box(("resnet50", 64u32)))));
	});
	c.bench_function("fingerprint_call_args", |b| {
		b.iter(|| black_box(args.fingerprint().unwrap()));
	});
	c.bench_function("fingerprint_serialized", |b| {
		b.iter(|| black_box(Fingerprint::serialized(&("resnet50", 0.25f64, 64u32)).unwrap()));
	});
}

fn benchmark_async_pool_hit(c: &mut Criterion) {
	let rt = tokio::runtime::Runtime::new().unwrap();
	let pool = AsyncPool::new(|seed: u64| async move { build_heavy(&seed) });
	rt.block_on(pool.get(1)).unwrap();

	c.bench_function("async_pool_hit", |b| {
		b.iter(|| black_box(rt.block_on(pool.get(black_box(1))).unwrap()));
	});
}

criterion_group!(
	benches,
	benchmark_pool_hit,
	benchmark_pool_miss,
	benchmark_key_derivation,
	benchmark_async_pool_hit
);
criterion_main!(benches);
