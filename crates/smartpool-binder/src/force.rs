//! Force pooling: retrofitting a pool onto a factory handle

use crate::handle::FactoryHandle;
use crate::pooled::pooled_with;
use crate::registry::ForceOutcome;
use smartpool_core::{PoolConfig, PoolResult, PoolSettings};
use std::fmt;
use std::hash::Hash;

/// Pools the handle's factory with the default configuration.
///
/// This is a global mutation: afterwards every [`FactoryHandle`] for the same
/// factory on the same registry returns pooled instances, not only the handle
/// passed here. Call it from application setup. Library code should not
/// force-pool factories it depends on, since the change is visible to every
/// other consumer of those factories.
///
/// Repeated calls are no-ops returning [`ForceOutcome::AlreadyPooled`].
///
/// # Examples
///
/// ```
/// use smartpool_binder::{FactoryHandle, FactoryRegistry, ForceOutcome, force_pooling};
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// fn load_model(path: &String) -> Result<Vec<f32>, Infallible> {
///     Ok(vec![0.0; path.len()])
/// }
///
/// let registry = Arc::new(FactoryRegistry::new());
/// let early = FactoryHandle::with_registry(&registry, load_model);
/// let late = FactoryHandle::with_registry(&registry, load_model);
///
/// assert_eq!(force_pooling(&late).unwrap(), ForceOutcome::Installed);
/// assert_eq!(force_pooling(&late).unwrap(), ForceOutcome::AlreadyPooled);
///
/// let path = "weights.bin".to_string();
/// assert!(Arc::ptr_eq(&early.call(&path).unwrap(), &late.call(&path).unwrap()));
/// ```
pub fn force_pooling<A, R>(handle: &FactoryHandle<A, R>) -> PoolResult<ForceOutcome>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	force_pooling_with(handle, PoolConfig::default())
}

/// Pools the handle's factory with `config`.
///
/// Fails with [`PoolError::ConflictingPooling`](smartpool_core::PoolError::ConflictingPooling)
/// if the factory is already pooled with a different configuration; the
/// existing binding is left in place.
pub fn force_pooling_with<A, R>(
	handle: &FactoryHandle<A, R>,
	config: PoolConfig,
) -> PoolResult<ForceOutcome>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	config.validate()?;
	handle
		.registry()
		.bind(handle.id(), handle.name(), config, |config| {
			let factory = handle.raw_factory();
			let config = match config.name {
				Some(_) => config.clone(),
				None => config.clone().with_name(handle.name()),
			};
			pooled_with(config, move |args: &A| factory(args))
		})
}

/// Pools the handle's factory with the configuration `settings` holds for it.
///
/// The lookup uses the factory's type path, so a `[pools.<fn name>]` table
/// applies to the factory of that name.
pub fn force_pooling_from_settings<A, R>(
	handle: &FactoryHandle<A, R>,
	settings: &PoolSettings,
) -> PoolResult<ForceOutcome>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	force_pooling_with(handle, settings.config_for(handle.name()))
}
