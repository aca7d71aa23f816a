//! Keyed resource pool

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::fingerprint::Fingerprint;
use crate::lease::Lease;
use crate::slots::SlotTable;
use crate::statistics::{Counters, PoolStatistics};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

pub(crate) type Factory<A, R> = Arc<dyn Fn(&A) -> anyhow::Result<R> + Send + Sync>;
pub(crate) type KeyFn<A> = Arc<dyn Fn(&A) -> PoolResult<Fingerprint> + Send + Sync>;
pub(crate) type DiscardHook<R> = Arc<dyn Fn(&R) + Send + Sync>;
pub(crate) type DiscardFilter = Arc<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

pub(crate) fn erase_factory<A, R, E, F>(factory: F) -> Factory<A, R>
where
	F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
	E: Into<anyhow::Error>,
{
	Arc::new(move |args: &A| factory(args).map_err(Into::into))
}

pub(crate) fn hashed_key<A>() -> KeyFn<A>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
{
	Arc::new(|args: &A| Ok(Fingerprint::of(args.clone())))
}

/// A keyed cache of resources built by a single factory.
///
/// The first `get` for a fingerprint invokes the factory; later calls with
/// equal arguments return the same `Arc`. Construction is serialized per
/// fingerprint, so concurrent callers asking for the same uncached key wait
/// for one construction instead of racing. Different fingerprints construct
/// in parallel.
///
/// A factory must not call back into its own pool with the same arguments;
/// that call would wait on itself.
///
/// # Examples
///
/// ```
/// use smartpool_core::Pool;
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// let pool = Pool::new(|capacity: &usize| Ok::<_, Infallible>(Vec::<u8>::with_capacity(*capacity)));
///
/// let a = pool.get(&5).unwrap();
/// let b = pool.get(&5).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let c = pool.get(&6).unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
pub struct Pool<A, R> {
	name: String,
	factory: Factory<A, R>,
	key_fn: KeyFn<A>,
	slots: SlotTable<OnceCell<Arc<R>>>,
	counters: Counters,
	config: PoolConfig,
	on_discard: Option<DiscardHook<R>>,
	discard_on: Option<DiscardFilter>,
}

impl<A, R> Pool<A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	/// Creates an unbounded pool keyed by the argument value itself.
	pub fn new<F, E>(factory: F) -> Self
	where
		A: Hash + Eq + Clone + fmt::Debug,
		F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
		E: Into<anyhow::Error>,
	{
		Self::assemble(
			std::any::type_name::<F>().to_string(),
			erase_factory(factory),
			hashed_key(),
			PoolConfig::default(),
			None,
			None,
		)
	}

	/// Starts a builder keyed by the argument value itself.
	pub fn builder<F, E>(factory: F) -> PoolBuilder<A, R>
	where
		A: Hash + Eq + Clone + fmt::Debug,
		F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
		E: Into<anyhow::Error>,
	{
		PoolBuilder::new(std::any::type_name::<F>(), erase_factory(factory), hashed_key())
	}

	/// Starts a builder for argument types that are not `Hash + Eq`.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::{CallArgs, Pool};
	/// use std::convert::Infallible;
	///
	/// let pool = Pool::keyed_builder(
	///     |args: &CallArgs| Ok::<_, Infallible>(format!("{:?}", args.get(0))),
	///     CallArgs::fingerprint,
	/// )
	/// .build()
	/// .unwrap();
	///
	/// let args = CallArgs::new().arg(0.5f64).named("device", "cuda:0");
	/// assert_eq!(pool.get(&args).unwrap().as_str(), "Some(Float(0.5))");
	/// ```
	pub fn keyed_builder<F, E, K>(factory: F, key_fn: K) -> PoolBuilder<A, R>
	where
		F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
		E: Into<anyhow::Error>,
		K: Fn(&A) -> PoolResult<Fingerprint> + Send + Sync + 'static,
	{
		PoolBuilder::new(
			std::any::type_name::<F>(),
			erase_factory(factory),
			Arc::new(key_fn),
		)
	}

	fn assemble(
		name: String,
		factory: Factory<A, R>,
		key_fn: KeyFn<A>,
		config: PoolConfig,
		on_discard: Option<DiscardHook<R>>,
		discard_on: Option<DiscardFilter>,
	) -> Self {
		Self {
			name: config.name.clone().unwrap_or(name),
			factory,
			key_fn,
			slots: SlotTable::new(config.max_size),
			counters: Counters::default(),
			config,
			on_discard,
			discard_on,
		}
	}

	/// Renames the pool for logs and errors.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Returns the pooled resource for `args`, constructing it on first use.
	///
	/// A factory failure is returned as [`PoolError::Factory`] and leaves the
	/// fingerprint uncached, so the next call retries construction.
	pub fn get(&self, args: &A) -> PoolResult<Arc<R>> {
		let key = (self.key_fn)(args)?;
		self.resolve(&key, args)
	}

	fn resolve(&self, key: &Fingerprint, args: &A) -> PoolResult<Arc<R>> {
		let slot = self.slots.claim(key)?;
		if let Some(value) = slot.get() {
			self.counters.hit();
			return Ok(value.clone());
		}

		// Callers that waited on another caller's construction count as hits.
		let mut built = false;
		let value = slot
			.get_or_try_init(|| {
				built = true;
				self.construct(key, args)
			})?
			.clone();
		if !built {
			self.counters.hit();
		}
		Ok(value)
	}

	/// Returns a lease on the pooled resource for `args`.
	///
	/// See [`Lease::fail`] for discarding the instance after an error.
	pub fn lease(&self, args: &A) -> PoolResult<Lease<'_, A, R>> {
		let key = (self.key_fn)(args)?;
		let value = self.resolve(&key, args)?;
		Ok(Lease::new(self, key, value))
	}

	fn construct(&self, key: &Fingerprint, args: &A) -> PoolResult<Arc<R>> {
		tracing::debug!(pool = %self.name, fingerprint = ?key, "Constructing pooled resource");
		self.counters.miss();
		match (self.factory)(args) {
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
	/// Returns `true` if a constructed instance was removed. The discard hook
	/// runs on that instance; callers that already hold it keep their `Arc`.
	/// An entry still under construction is not touched and yields `false`.
	pub fn invalidate(&self, args: &A) -> PoolResult<bool> {
		let key = (self.key_fn)(args)?;
		let removed = self.slots.remove_constructed(&key);
		match removed.as_ref().and_then(|slot| slot.get()) {
			Some(value) => {
				tracing::debug!(pool = %self.name, fingerprint = ?key, "Invalidated pooled resource");
				self.run_discard_hook(value);
				Ok(true)
			}
			None => Ok(false),
		}
	}

	/// Returns `true` if an instance for `args` is constructed and cached.
	pub fn contains(&self, args: &A) -> PoolResult<bool> {
		let key = (self.key_fn)(args)?;
		Ok(self.slots.contains(&key))
	}

	/// Drops every cached instance, running the discard hook on each.
	pub fn flush(&self) {
		let drained = self.slots.drain();
		let mut discarded = 0usize;
		for slot in &drained {
			if let Some(value) = slot.get() {
				self.run_discard_hook(value);
				discarded += 1;
			}
		}
		if discarded > 0 {
			tracing::debug!(pool = %self.name, discarded, "Flushed pool");
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

	pub(crate) fn should_discard(&self, err: &(dyn StdError + 'static)) -> bool {
		self.discard_on.as_ref().is_some_and(|filter| filter(err))
	}

	/// Removes `instance` if it is still the cached value for `key`.
	pub(crate) fn discard_instance(&self, key: &Fingerprint, instance: &Arc<R>) -> bool {
		let removed = self.slots.remove_instance(key, instance);
		if removed {
			tracing::debug!(pool = %self.name, fingerprint = ?key, "Discarded leased resource");
			self.run_discard_hook(instance);
		}
		removed
	}

	fn run_discard_hook(&self, value: &Arc<R>) {
		if let Some(hook) = &self.on_discard {
			hook(value);
		}
	}
}

impl<A, R> Drop for Pool<A, R> {
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

impl<A, R> fmt::Debug for Pool<A, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pool")
			.field("name", &self.name)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Pool`].
pub struct PoolBuilder<A, R> {
	name: String,
	factory: Factory<A, R>,
	key_fn: KeyFn<A>,
	config: PoolConfig,
	on_discard: Option<DiscardHook<R>>,
	discard_on: Option<DiscardFilter>,
}

impl<A, R> PoolBuilder<A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	pub(crate) fn new(name: &str, factory: Factory<A, R>, key_fn: KeyFn<A>) -> Self {
		Self {
			name: name.to_string(),
			factory,
			key_fn,
			config: PoolConfig::default(),
			on_discard: None,
			discard_on: None,
		}
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: PoolConfig) -> Self {
		self.config = config;
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.config.name = Some(name.into());
		self
	}

	pub fn max_size(mut self, max_size: usize) -> Self {
		self.config.max_size = Some(max_size);
		self
	}

	/// Uses a custom fingerprint function.
	pub fn key_fn<K>(mut self, key_fn: K) -> Self
	where
		K: Fn(&A) -> PoolResult<Fingerprint> + Send + Sync + 'static,
	{
		self.key_fn = Arc::new(key_fn);
		self
	}

	/// Fingerprints arguments through their canonical serialized form.
	pub fn serialized_keys(self) -> Self
	where
		A: Serialize,
	{
		self.key_fn(|args: &A| Fingerprint::serialized(args))
	}

	/// Runs `hook` on every instance that leaves the pool.
	///
	/// This covers `invalidate`, `flush`, discarded leases and dropping the pool.
	pub fn on_discard<H>(mut self, hook: H) -> Self
	where
		H: Fn(&R) + Send + Sync + 'static,
	{
		self.on_discard = Some(Arc::new(hook));
		self
	}

	/// Selects the errors that make [`Lease::fail`] discard the leased instance.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::Pool;
	/// use std::convert::Infallible;
	/// use std::io;
	///
	/// let pool = Pool::builder(|addr: &String| Ok::<_, Infallible>(addr.clone()))
	///     .discard_on(|err| err.is::<io::Error>())
	///     .build()
	///     .unwrap();
	///
	/// let addr = "10.0.0.7:5672".to_string();
	/// let lease = pool.lease(&addr).unwrap();
	/// let _ = lease.fail(io::Error::new(io::ErrorKind::BrokenPipe, "reset"));
	/// assert!(!pool.contains(&addr).unwrap());
	/// ```
	pub fn discard_on<P>(mut self, predicate: P) -> Self
	where
		P: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
	{
		self.discard_on = Some(Arc::new(predicate));
		self
	}

	pub fn build(self) -> PoolResult<Pool<A, R>> {
		self.config.validate()?;
		Ok(Pool::assemble(
			self.name,
			self.factory,
			self.key_fn,
			self.config,
			self.on_discard,
			self.discard_on,
		))
	}
}
