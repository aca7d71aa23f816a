//! Registry of force-pooled factories

use crate::handle::{BindingState, FactoryId};
use crate::pooled::PooledFn;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smartpool_core::{PoolConfig, PoolError, PoolResult};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static GLOBAL: Lazy<Arc<FactoryRegistry>> = Lazy::new(|| Arc::new(FactoryRegistry::new()));

/// Outcome of a successful force pooling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceOutcome {
	/// A pool was created and bound to the factory.
	Installed,
	/// The factory was already pooled with an equal configuration; nothing changed.
	AlreadyPooled,
}

struct Binding {
	name: &'static str,
	config: PoolConfig,
	pooled: Arc<dyn Any + Send + Sync>,
}

/// Maps factories to the pooled wrappers that replace them.
///
/// [`FactoryHandle`](crate::FactoryHandle)s resolve through a registry on
/// every call, so installing a binding changes behavior for every holder of a
/// handle on the same registry.
pub struct FactoryRegistry {
	bindings: RwLock<HashMap<FactoryId, Binding>>,
}

impl FactoryRegistry {
	/// Creates an empty registry.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_binder::FactoryRegistry;
	///
	/// let registry = FactoryRegistry::new();
	/// assert!(registry.is_empty());
	/// ```
	pub fn new() -> Self {
		Self {
			bindings: RwLock::new(HashMap::new()),
		}
	}

	/// The process-wide registry used by [`FactoryHandle::new`](crate::FactoryHandle::new).
	pub fn global() -> Arc<FactoryRegistry> {
		GLOBAL.clone()
	}

	pub fn state(&self, id: FactoryId) -> BindingState {
		if self.bindings.read().contains_key(&id) {
			BindingState::Pooled
		} else {
			BindingState::Unpooled
		}
	}

	pub fn is_pooled(&self, id: FactoryId) -> bool {
		self.state(id) == BindingState::Pooled
	}

	/// Returns the configuration a factory was pooled with.
	pub fn config(&self, id: FactoryId) -> Option<PoolConfig> {
		self.bindings.read().get(&id).map(|b| b.config.clone())
	}

	pub fn len(&self) -> usize {
		self.bindings.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.bindings.read().is_empty()
	}

	/// Removes every binding, returning all factories to `Unpooled`.
	///
	/// Intended for test isolation. Pools held by earlier [`PooledFn`] clones
	/// stay alive until those clones are dropped.
	pub fn clear(&self) {
		self.bindings.write().clear();
	}

	pub(crate) fn resolve<A, R>(&self, id: FactoryId) -> Option<PooledFn<A, R>>
	where
		A: Send + Sync + 'static,
		R: Send + Sync + 'static,
	{
		let bindings = self.bindings.read();
		bindings
			.get(&id)
			.and_then(|binding| binding.pooled.downcast_ref::<PooledFn<A, R>>())
			.cloned()
	}

	/// Installs the wrapper produced by `make` unless `id` is already bound.
	///
	/// `make` only runs when a new binding is installed.
	pub(crate) fn bind<A, R, M>(
		&self,
		id: FactoryId,
		name: &'static str,
		config: PoolConfig,
		make: M,
	) -> PoolResult<ForceOutcome>
	where
		A: Send + Sync + 'static,
		R: Send + Sync + 'static,
		M: FnOnce(&PoolConfig) -> PoolResult<PooledFn<A, R>>,
	{
		let mut bindings = self.bindings.write();
		if let Some(existing) = bindings.get(&id) {
			if existing.config != config {
				return Err(PoolError::ConflictingPooling {
					factory: existing.name.to_string(),
					existing: Box::new(existing.config.clone()),
					requested: Box::new(config),
				});
			}
			tracing::warn!(factory = existing.name, "Factory is already pooled; ignoring");
			return Ok(ForceOutcome::AlreadyPooled);
		}

		let pooled = make(&config)?;
		tracing::debug!(factory = name, pool = pooled.name(), "Installed pooled binding");
		bindings.insert(
			id,
			Binding {
				name,
				config,
				pooled: Arc::new(pooled),
			},
		);
		Ok(ForceOutcome::Installed)
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FactoryRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let bindings = self.bindings.read();
		let names: Vec<&str> = bindings.values().map(|b| b.name).collect();
		f.debug_struct("FactoryRegistry")
			.field("bindings", &names)
			.finish()
	}
}
