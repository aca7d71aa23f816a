//! Keyed resource pool for async factories

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::fingerprint::Fingerprint;
use crate::pool::{DiscardHook, KeyFn, hashed_key};
use crate::slots::SlotTable;
use crate::statistics::{Counters, PoolStatistics};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

type AsyncFactory<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// Async counterpart of [`Pool`](crate::Pool).
///
/// Callers await construction instead of blocking a thread. Concurrent tasks
/// requesting the same uncached fingerprint share a single factory
/// invocation. When a deadline elapses the waiting call fails with
/// [`PoolError::Timeout`] and no partially built entry is left behind.
///
/// # Examples
///
/// ```
/// use smartpool_core::AsyncPool;
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let pool = AsyncPool::new(|shard: u32| async move {
///     Ok::<_, Infallible>(format!("shard-{shard}"))
/// });
///
/// let a = pool.get(3).await.unwrap();
/// let b = pool.get(3).await.unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.as_str(), "shard-3");
/// # });
/// ```
pub struct AsyncPool<A, R> {
	name: String,
	factory: AsyncFactory<A, R>,
	key_fn: KeyFn<A>,
	slots: SlotTable<OnceCell<Arc<R>>>,
	counters: Counters,
	config: PoolConfig,
	on_discard: Option<DiscardHook<R>>,
}

impl<A, R> AsyncPool<A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	/// Creates an unbounded pool keyed by the argument value itself.
	pub fn new<F, Fut, E>(factory: F) -> Self
	where
		A: Hash + Eq + Clone + fmt::Debug,
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
		E: Into<anyhow::Error> + 'static,
	{
		Self::assemble::<F, Fut, E>(factory, hashed_key(), PoolConfig::default())
	}

	/// Creates a pool with the given configuration.
	pub fn with_config<F, Fut, E>(config: PoolConfig, factory: F) -> PoolResult<Self>
	where
		A: Hash + Eq + Clone + fmt::Debug,
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
		E: Into<anyhow::Error> + 'static,
	{
		config.validate()?;
		Ok(Self::assemble::<F, Fut, E>(factory, hashed_key(), config))
	}

	/// Creates a pool with a custom fingerprint function.
	pub fn keyed<F, Fut, E, K>(config: PoolConfig, key_fn: K, factory: F) -> PoolResult<Self>
	where
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
		E: Into<anyhow::Error> + 'static,
		K: Fn(&A) -> PoolResult<Fingerprint> + Send + Sync + 'static,
	{
		config.validate()?;
		Ok(Self::assemble::<F, Fut, E>(factory, Arc::new(key_fn), config))
	}

	fn assemble<F, Fut, E>(factory: F, key_fn: KeyFn<A>, config: PoolConfig) -> Self
	where
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
		E: Into<anyhow::Error> + 'static,
	{
		let name = config
			.name
			.clone()
			.unwrap_or_else(|| std::any::type_name::<F>().to_string());
		let factory: AsyncFactory<A, R> =
			Arc::new(move |args: A| factory(args).map(|r| r.map_err(Into::into)).boxed());
		Self {
			name,
			factory,
			key_fn,
			slots: SlotTable::new(config.max_size),
			counters: Counters::default(),
			config,
			on_discard: None,
		}
	}

	/// Runs `hook` on every instance that leaves the pool.
	pub fn with_discard_hook<H>(mut self, hook: H) -> Self
	where
		H: Fn(&R) + Send + Sync + 'static,
	{
		self.on_discard = Some(Arc::new(hook));
		self
	}

	/// Returns the pooled resource for `args`, constructing it on first use.
	///
	/// Applies the configured `construct_timeout_ms`, if any.
	pub async fn get(&self, args: A) -> PoolResult<Arc<R>> {
		self.resolve(args, self.config.construct_timeout()).await
	}

	/// Like [`get`](Self::get), failing with [`PoolError::Timeout`] once
	/// `timeout` elapses.
	pub async fn get_timeout(&self, args: A, timeout: Duration) -> PoolResult<Arc<R>> {
		self.resolve(args, Some(timeout)).await
	}

	async fn resolve(&self, args: A, timeout: Option<Duration>) -> PoolResult<Arc<R>> {
		let key = (self.key_fn)(&args)?;
		let slot = self.slots.claim(&key)?;
		if let Some(value) = slot.get() {
			self.counters.hit();
			return Ok(value.clone());
		}

		let built = AtomicBool::new(false);
		let init = slot.get_or_try_init(|| {
			built.store(true, Ordering::Relaxed);
			self.construct(&key, args)
		});
		let result = match timeout {
			Some(limit) => match tokio::time::timeout(limit, init).await {
				Ok(result) => result.cloned(),
				Err(_) => {
					tracing::warn!(pool = %self.name, fingerprint = ?key, ?limit, "Construction timed out");
					if built.load(Ordering::Relaxed) {
						self.counters.failed();
					}
					Err(PoolError::Timeout(limit))
				}
			},
			None => init.await.cloned(),
		};
		if result.is_ok() && !built.load(Ordering::Relaxed) {
			self.counters.hit();
		}
		result
	}

	async fn construct(&self, key: &Fingerprint, args: A) -> PoolResult<Arc<R>> {
		tracing::debug!(pool = %self.name, fingerprint = ?key, "Constructing pooled resource");
		self.counters.miss();
		match (self.factory)(args).await {
			Ok(value) => {
				self.counters.constructed();
				Ok(Arc::new(value))
			}
			Err(source) => {
				self.counters.failed();
				tracing::warn!(
					pool = %self.name,
					fingerprint = ?key,
					error = %source,
					"Factory failed; fingerprint left uncached"
				);
				Err(PoolError::factory(self.name.clone(), source))
			}
		}
	}

	/// Removes the entry for `args`, forcing reconstruction on the next `get`.
	///
	/// Entries still under construction are left in place.
	pub fn invalidate(&self, args: &A) -> PoolResult<bool> {
		let key = (self.key_fn)(args)?;
		match self.slots.remove_constructed(&key).as_ref().and_then(|slot| slot.get()) {
			Some(value) => {
				if let Some(hook) = &self.on_discard {
					hook(value);
				}
				Ok(true)
			}
			None => Ok(false),
		}
	}

	pub fn contains(&self, args: &A) -> PoolResult<bool> {
		let key = (self.key_fn)(args)?;
		Ok(self.slots.contains(&key))
	}

	/// Drops every cached instance, running the discard hook on each.
	pub fn flush(&self) {
		for slot in self.slots.drain() {
			if let (Some(value), Some(hook)) = (slot.get(), &self.on_discard) {
				hook(value);
			}
		}
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	pub fn statistics(&self) -> PoolStatistics {
		self.counters.snapshot(self.len())
	}
}

impl<A, R> Drop for AsyncPool<A, R> {
	fn drop(&mut self) {
		if let Some(hook) = &self.on_discard {
			for slot in self.slots.drain() {
				if let Some(value) = slot.get() {
					hook(value);
				}
			}
		}
	}
}

impl<A, R> fmt::Debug for AsyncPool<A, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AsyncPool")
			.field("name", &self.name)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
