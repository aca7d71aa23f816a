//! Factory handles resolved through a registry

use crate::registry::FactoryRegistry;
use smartpool_core::{PoolError, PoolResult};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Factory<A, R> = Arc<dyn Fn(&A) -> anyhow::Result<R> + Send + Sync>;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Identity of a factory function.
///
/// Function items and non-capturing closures are zero-sized and each has its
/// own type, so for them the `TypeId` identifies the function itself and every
/// handle created from the same function shares a binding. Any other factory
/// (a fn pointer, a boxed `dyn Fn`, a closure with captures) may share its type
/// with unrelated factories; such a handle gets a fresh id that only its clones
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(Identity);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
	Type(TypeId),
	Instance(u64),
}

impl FactoryId {
	/// Returns the id of the factory type `F`.
	///
	/// Only meaningful for zero-sized factories such as function items.
	pub fn of<F: 'static>() -> Self {
		Self(Identity::Type(TypeId::of::<F>()))
	}

	/// Returns the id of `factory`, inferring its type.
	pub fn of_val<F: 'static>(_factory: &F) -> Self {
		Self::of::<F>()
	}

	fn for_factory<F: 'static>() -> Self {
		if std::mem::size_of::<F>() == 0 {
			Self::of::<F>()
		} else {
			Self(Identity::Instance(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)))
		}
	}
}

/// Pooling status of a factory within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
	Unpooled,
	Pooled,
}

/// The indirection callers hold instead of calling a factory directly.
///
/// [`call`](Self::call) looks the factory up in its registry: once the factory
/// has been force-pooled, every handle on that registry, including handles
/// created before pooling, receives pooled instances. Until then each call
/// invokes the factory and returns a fresh instance.
///
/// # Examples
///
/// ```
/// use smartpool_binder::{FactoryHandle, FactoryRegistry, force_pooling};
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// fn open_session(user: &String) -> Result<String, Infallible> {
///     Ok(format!("session:{user}"))
/// }
///
/// let registry = Arc::new(FactoryRegistry::new());
/// let session = FactoryHandle::with_registry(&registry, open_session);
/// let user = "ada".to_string();
///
/// // Unpooled: distinct instances
/// assert!(!Arc::ptr_eq(&session.call(&user).unwrap(), &session.call(&user).unwrap()));
///
/// force_pooling(&session).unwrap();
/// assert!(Arc::ptr_eq(&session.call(&user).unwrap(), &session.call(&user).unwrap()));
/// ```
pub struct FactoryHandle<A, R> {
	id: FactoryId,
	name: &'static str,
	factory: Factory<A, R>,
	registry: Arc<FactoryRegistry>,
}

impl<A, R> FactoryHandle<A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	/// Creates a handle on the process-wide registry.
	pub fn new<F, E>(factory: F) -> Self
	where
		F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
		E: Into<anyhow::Error>,
	{
		Self::with_registry(&FactoryRegistry::global(), factory)
	}

	/// Creates a handle resolving through `registry`.
	///
	/// See [`FactoryId`] for when two handles share a binding.
	pub fn with_registry<F, E>(registry: &Arc<FactoryRegistry>, factory: F) -> Self
	where
		F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
		E: Into<anyhow::Error>,
	{
		Self {
			id: FactoryId::for_factory::<F>(),
			name: std::any::type_name::<F>(),
			factory: Arc::new(move |args: &A| factory(args).map_err(Into::into)),
			registry: registry.clone(),
		}
	}

	/// Calls the factory, through its pool if one is bound.
	pub fn call(&self, args: &A) -> PoolResult<Arc<R>> {
		match self.registry.resolve::<A, R>(self.id) {
			Some(pooled) => pooled.call(args),
			None => (self.factory)(args)
				.map(Arc::new)
				.map_err(|source| PoolError::factory(self.name, source)),
		}
	}

	pub fn id(&self) -> FactoryId {
		self.id
	}

	/// Type path of the factory.
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn registry(&self) -> &Arc<FactoryRegistry> {
		&self.registry
	}

	pub fn state(&self) -> BindingState {
		self.registry.state(self.id)
	}

	pub fn is_pooled(&self) -> bool {
		self.state() == BindingState::Pooled
	}

	pub(crate) fn raw_factory(&self) -> Factory<A, R> {
		self.factory.clone()
	}
}

impl<A, R> Clone for FactoryHandle<A, R> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			name: self.name,
			factory: self.factory.clone(),
			registry: self.registry.clone(),
		}
	}
}

impl<A, R> fmt::Debug for FactoryHandle<A, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactoryHandle")
			.field("id", &self.id)
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::convert::Infallible;

	fn make_label(n: &u32) -> Result<String, Infallible> {
		Ok(n.to_string())
	}

	fn make_other(n: &u32) -> Result<String, Infallible> {
		Ok(format!("other-{n}"))
	}

	#[rstest]
	fn test_factory_id_is_per_function() {
		assert_eq!(FactoryId::of_val(&make_label), FactoryId::of_val(&make_label));
		assert_ne!(FactoryId::of_val(&make_label), FactoryId::of_val(&make_other));
	}

	fn labeler(prefix: &'static str) -> impl Fn(&u32) -> Result<String, Infallible> {
		move |n| Ok(format!("{prefix}-{n}"))
	}

	#[rstest]
	fn test_handles_of_one_function_share_id() {
		let registry = Arc::new(FactoryRegistry::new());
		let a = FactoryHandle::with_registry(&registry, make_label);
		let b = FactoryHandle::with_registry(&registry, make_label);

		assert_eq!(a.id(), b.id());
		assert_eq!(a.id(), FactoryId::of_val(&make_label));
	}

	#[rstest]
	fn test_capturing_closures_of_one_type_get_distinct_ids() {
		let registry = Arc::new(FactoryRegistry::new());
		let rack = FactoryHandle::with_registry(&registry, labeler("rack"));
		let row = FactoryHandle::with_registry(&registry, labeler("row"));

		assert_ne!(rack.id(), row.id());
		assert_eq!(rack.clone().id(), rack.id());
		assert_eq!(row.call(&2).unwrap().as_str(), "row-2");
	}

	#[rstest]
	fn test_unpooled_handle_calls_factory_each_time() {
		let registry = Arc::new(FactoryRegistry::new());
		let handle = FactoryHandle::with_registry(&registry, make_label);

		let a = handle.call(&1).unwrap();
		let b = handle.call(&1).unwrap();

		assert_eq!(a, b);
		assert!(!Arc::ptr_eq(&a, &b));
		assert_eq!(handle.state(), BindingState::Unpooled);
		assert!(handle.name().ends_with("make_label"));
	}

	#[rstest]
	fn test_unpooled_factory_error_is_wrapped() {
		fn refuse(_: &u32) -> Result<String, std::io::Error> {
			Err(std::io::Error::other("no capacity"))
		}
		let registry = Arc::new(FactoryRegistry::new());
		let handle = FactoryHandle::with_registry(&registry, refuse);

		let err = handle.call(&1).unwrap_err();

		assert!(err.factory_error::<std::io::Error>().is_some());
	}
}
