//! Basic pool tests
//! Covers identity, miss-then-hit, failures, invalidation, flushing and capacity

use rstest::*;
use smartpool_core::{CallArgs, Fingerprint, Pool, PoolConfig, PoolError};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Handle {
	id: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("connection refused: {0}")]
struct Refused(u32);

fn counting_pool() -> (Pool<u32, Handle>, Arc<AtomicUsize>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let pool = Pool::new(move |id: &u32| {
		counter.fetch_add(1, Ordering::SeqCst);
		Ok::<_, Infallible>(Handle { id: *id })
	});
	(pool, calls)
}

#[rstest]
fn test_identity_stability() {
	// Arrange
	let (pool, calls) = counting_pool();

	// Act
	let a = pool.get(&5).unwrap();
	let b = pool.get(&5).unwrap();

	// Assert
	assert!(Arc::ptr_eq(&a, &b));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_miss_then_hit() {
	let (pool, calls) = counting_pool();

	pool.get(&1).unwrap();
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	for _ in 0..10 {
		pool.get(&1).unwrap();
	}
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	let stats = pool.statistics();
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.hits, 10);
	assert_eq!(stats.constructions, 1);
	assert_eq!(stats.entry_count, 1);
}

#[rstest]
fn test_distinct_keys_distinct_instances() {
	let (pool, calls) = counting_pool();

	let five = pool.get(&5).unwrap();
	let six = pool.get(&6).unwrap();

	assert!(!Arc::ptr_eq(&five, &six));
	assert_eq!(five.id, 5);
	assert_eq!(six.id, 6);
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	assert_eq!(pool.len(), 2);
}

#[rstest]
fn test_equal_by_value_results_are_still_separate_constructions() {
	// Factory ignores its argument, so both instances compare equal by value
	let pool = Pool::new(|_: &u8| Ok::<_, Infallible>(String::from("same")));

	let a = pool.get(&1).unwrap();
	let b = pool.get(&2).unwrap();

	assert_eq!(a, b);
	assert!(!Arc::ptr_eq(&a, &b));
}

#[rstest]
fn test_failure_leaves_no_entry_and_retries() {
	// Arrange - fail on the first attempt only
	let attempts = Arc::new(AtomicUsize::new(0));
	let counter = attempts.clone();
	let pool = Pool::new(move |port: &u32| {
		if counter.fetch_add(1, Ordering::SeqCst) == 0 {
			Err(Refused(*port))
		} else {
			Ok(Handle { id: *port })
		}
	});

	// Act
	let first = pool.get(&8080);

	// Assert
	let err = first.unwrap_err();
	assert!(err.is_factory());
	assert_eq!(err.factory_error::<Refused>().map(|r| r.0), Some(8080));
	assert!(!pool.contains(&8080).unwrap());
	assert!(pool.is_empty());

	let second = pool.get(&8080).unwrap();
	assert_eq!(second.id, 8080);
	assert_eq!(attempts.load(Ordering::SeqCst), 2);

	let stats = pool.statistics();
	assert_eq!(stats.failures, 1);
	assert_eq!(stats.constructions, 1);
}

#[rstest]
fn test_invalidate_forces_reconstruction() {
	let discarded = Arc::new(Mutex::new(Vec::new()));
	let sink = discarded.clone();
	let pool = Pool::builder(|id: &u32| Ok::<_, Infallible>(Handle { id: *id }))
		.on_discard(move |handle: &Handle| sink.lock().unwrap().push(handle.id))
		.build()
		.unwrap();

	let before = pool.get(&3).unwrap();
	assert!(pool.invalidate(&3).unwrap());
	assert!(!pool.invalidate(&3).unwrap());
	let after = pool.get(&3).unwrap();

	assert!(!Arc::ptr_eq(&before, &after));
	assert_eq!(*discarded.lock().unwrap(), vec![3]);
	// Holders of the old instance keep it alive
	assert_eq!(before.id, 3);
}

#[rstest]
fn test_flush_runs_discard_hook_on_every_entry() {
	let discarded = Arc::new(AtomicUsize::new(0));
	let sink = discarded.clone();
	let pool = Pool::builder(|id: &u32| Ok::<_, Infallible>(Handle { id: *id }))
		.on_discard(move |_: &Handle| {
			sink.fetch_add(1, Ordering::SeqCst);
		})
		.build()
		.unwrap();

	for id in 0..4 {
		pool.get(&id).unwrap();
	}
	pool.flush();

	assert_eq!(discarded.load(Ordering::SeqCst), 4);
	assert!(pool.is_empty());
}

#[rstest]
fn test_drop_runs_discard_hook() {
	let discarded = Arc::new(AtomicUsize::new(0));
	let sink = discarded.clone();
	{
		let pool = Pool::builder(|id: &u32| Ok::<_, Infallible>(Handle { id: *id }))
			.on_discard(move |_: &Handle| {
				sink.fetch_add(1, Ordering::SeqCst);
			})
			.build()
			.unwrap();
		pool.get(&1).unwrap();
		pool.get(&2).unwrap();
	}

	assert_eq!(discarded.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_max_size_rejects_new_fingerprints() {
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = calls.clone();
	let pool = Pool::builder(move |id: &u32| {
		seen.fetch_add(1, Ordering::SeqCst);
		Ok::<_, Infallible>(Handle { id: *id })
	})
	.max_size(2)
	.build()
	.unwrap();

	pool.get(&1).unwrap();
	pool.get(&2).unwrap();

	let err = pool.get(&3).unwrap_err();
	assert!(matches!(err, PoolError::PoolFull { max_size: 2 }));
	// Factory is not invoked for a rejected fingerprint
	assert_eq!(calls.load(Ordering::SeqCst), 2);
	// Existing fingerprints still hit
	assert!(pool.get(&1).is_ok());

	pool.invalidate(&2).unwrap();
	assert!(pool.get(&3).is_ok());
}

#[rstest]
fn test_panicking_factory_frees_its_slot() {
	// Arrange - a single-entry pool whose factory panics for one fingerprint
	let pool = Pool::builder(|id: &u32| {
		if *id == 1 {
			panic!("corrupt shard {id}");
		}
		Ok::<_, Infallible>(Handle { id: *id })
	})
	.max_size(1)
	.build()
	.unwrap();

	// Act
	let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.get(&1)));

	// Assert - the abandoned slot no longer counts toward max_size
	assert!(outcome.is_err());
	assert!(pool.is_empty());
	assert_eq!(pool.get(&2).unwrap().id, 2);
	assert_eq!(pool.len(), 1);
}

#[rstest]
fn test_zero_max_size_is_rejected() {
	let result = Pool::builder(|id: &u32| Ok::<_, Infallible>(*id))
		.config(PoolConfig::new().with_max_size(0))
		.build();

	assert!(matches!(result, Err(PoolError::Config(_))));
}

#[rstest]
fn test_name_defaults_to_factory_path_and_can_be_configured() {
	fn open_socket(port: &u16) -> Result<u16, Infallible> {
		Ok(*port)
	}

	let unnamed = Pool::new(open_socket);
	assert!(unnamed.name().ends_with("open_socket"));

	let named = Pool::builder(open_socket).name("sockets").build().unwrap();
	assert_eq!(named.name(), "sockets");
	assert_eq!(named.config().name.as_deref(), Some("sockets"));
}

#[rstest]
fn test_serialized_keys_accept_float_arguments() {
	#[derive(serde::Serialize)]
	struct ModelSpec {
		name: &'static str,
		temperature: f64,
	}

	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let pool = Pool::keyed_builder(
		move |spec: &ModelSpec| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok::<_, Infallible>(format!("{}@{}", spec.name, spec.temperature))
		},
		Fingerprint::serialized,
	)
	.build()
	.unwrap();

	let spec = ModelSpec {
		name: "summarizer",
		temperature: 0.2,
	};
	let a = pool.get(&spec).unwrap();
	let b = pool
		.get(&ModelSpec {
			name: "summarizer",
			temperature: 0.2,
		})
		.unwrap();

	assert!(Arc::ptr_eq(&a, &b));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_unhashable_arguments_skip_cache_and_factory() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let pool = Pool::keyed_builder(
		move |_: &HashMap<(u8, u8), u8>| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok::<_, Infallible>(())
		},
		|args: &HashMap<(u8, u8), u8>| Fingerprint::serialized(args),
	)
	.build()
	.unwrap();

	let mut args = HashMap::new();
	args.insert((0, 0), 1);

	let err = pool.get(&args).unwrap_err();
	assert!(matches!(err, PoolError::UnhashableArgument(_)));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
	assert!(pool.is_empty());
	assert_eq!(pool.statistics().total_requests(), 0);
}

#[rstest]
fn test_call_args_pool() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let pool = Pool::keyed_builder(
		move |args: &CallArgs| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok::<_, Infallible>(args.positional().len())
		},
		CallArgs::fingerprint,
	)
	.build()
	.unwrap();

	let a = pool
		.get(&CallArgs::new().arg("gpu").named("batch", 32).named("fp16", true))
		.unwrap();
	let b = pool
		.get(&CallArgs::new().arg("gpu").named("fp16", true).named("batch", 32))
		.unwrap();
	assert!(Arc::ptr_eq(&a, &b));

	let nan = pool.get(&CallArgs::new().arg(f64::NAN));
	assert!(matches!(nan, Err(PoolError::UnhashableArgument(_))));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_same_arguments_share_and_different_arguments_do_not() {
	let pool = Pool::new(|_: &i32| Ok::<_, Infallible>(Box::new(0u8)));

	let a = pool.get(&5).unwrap();
	let b = pool.get(&5).unwrap();
	assert!(Arc::ptr_eq(&a, &b));

	let c = pool.get(&6).unwrap();
	assert!(!Arc::ptr_eq(&c, &a));
}

#[rstest]
fn test_serialized_keys_on_hashable_arguments() {
	let pool = Pool::builder(|tag: &String| Ok::<_, Infallible>(tag.len()))
		.serialized_keys()
		.build()
		.unwrap();

	let a = pool.get(&"blue".to_string()).unwrap();
	let b = pool.get(&"blue".to_string()).unwrap();

	assert!(Arc::ptr_eq(&a, &b));
	assert_eq!(*a, 4);
}

#[rstest]
fn test_lease_fail_discards_only_matching_errors() {
	// Arrange
	let pool = Pool::builder(|addr: &String| Ok::<_, Infallible>(addr.clone()))
		.discard_on(|err| err.is::<Refused>())
		.build()
		.unwrap();
	let addr = "10.1.0.4:6379".to_string();

	// Act - an unrelated error keeps the instance
	let lease = pool.lease(&addr).unwrap();
	let _ = lease.fail(std::fmt::Error);
	drop(lease);

	// Assert
	assert!(pool.contains(&addr).unwrap());

	// Act - a matching error discards it
	let lease = pool.lease(&addr).unwrap();
	let err = lease.fail(Refused(6379));

	// Assert
	assert_eq!(err.0, 6379);
	assert!(!pool.contains(&addr).unwrap());
}

#[rstest]
fn test_stale_lease_does_not_discard_replacement() {
	let pool = Pool::builder(|id: &u32| Ok::<_, Infallible>(Handle { id: *id }))
		.discard_on(|_| true)
		.build()
		.unwrap();

	let stale = pool.lease(&9).unwrap();
	pool.invalidate(&9).unwrap();
	let fresh = pool.get(&9).unwrap();

	let _ = stale.fail(Refused(9));
	assert!(pool.contains(&9).unwrap());
	assert!(Arc::ptr_eq(&fresh, &pool.get(&9).unwrap()));
}

#[rstest]
fn test_lease_discard_ignores_filter() {
	let pool = Pool::new(|id: &u32| Ok::<_, Infallible>(Handle { id: *id }));

	let lease = pool.lease(&1).unwrap();
	assert_eq!(lease.id, 1);
	assert!(lease.discard());
	assert!(pool.is_empty());
}
