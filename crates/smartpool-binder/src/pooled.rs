//! Decorator-style pooled wrappers

use smartpool_core::{Pool, PoolConfig, PoolResult};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A callable value that forwards every call to a private [`Pool`].
///
/// Produced by [`pooled`] and [`pooled_with`]. The pool is created once, when
/// the factory is wrapped, and is shared by every clone of the wrapper.
pub struct PooledFn<A, R> {
	pool: Arc<Pool<A, R>>,
}

impl<A, R> PooledFn<A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	/// Wraps an already configured pool.
	pub fn from_pool(pool: Pool<A, R>) -> Self {
		Self {
			pool: Arc::new(pool),
		}
	}

	/// Calls the wrapped factory through the pool.
	///
	/// Returns what the factory would return on the first call for `args`,
	/// and the cached instance afterwards.
	pub fn call(&self, args: &A) -> PoolResult<Arc<R>> {
		self.pool.get(args)
	}

	pub fn pool(&self) -> &Pool<A, R> {
		&self.pool
	}

	/// Name of the wrapped factory, or the configured pool name.
	pub fn name(&self) -> &str {
		self.pool.name()
	}

	/// One-line description naming the wrapped factory.
	pub fn describe(&self) -> String {
		format!("Returns a pooled resource loaded from {}.", self.name())
	}

	/// Converts the wrapper into a plain closure with the same call shape.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_binder::pooled;
	/// use std::convert::Infallible;
	///
	/// fn load_table(name: &String) -> Result<Vec<String>, Infallible> {
	///     Ok(vec![name.clone()])
	/// }
	///
	/// let load = pooled(load_table).into_fn();
	/// let rows = load(&"users".to_string()).unwrap();
	/// assert_eq!(rows.as_slice(), ["users"]);
	/// ```
	pub fn into_fn(self) -> impl Fn(&A) -> PoolResult<Arc<R>> + Clone + Send + Sync + 'static {
		move |args: &A| self.pool.get(args)
	}
}

impl<A, R> Clone for PooledFn<A, R> {
	fn clone(&self) -> Self {
		Self {
			pool: self.pool.clone(),
		}
	}
}

impl<A, R> fmt::Debug for PooledFn<A, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PooledFn")
			.field("pool", &self.pool)
			.finish()
	}
}

/// Wraps `factory` in a pool with the default configuration.
///
/// # Examples
///
/// ```
/// use smartpool_binder::pooled;
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// fn open_buffer(len: &usize) -> Result<Vec<u8>, Infallible> {
///     Ok(vec![0; *len])
/// }
///
/// let open_buffer = pooled(open_buffer);
/// let a = open_buffer.call(&4096).unwrap();
/// let b = open_buffer.call(&4096).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(open_buffer.name().ends_with("open_buffer"));
/// ```
pub fn pooled<A, R, F, E>(factory: F) -> PooledFn<A, R>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
	R: Send + Sync + 'static,
	F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
	E: Into<anyhow::Error>,
{
	PooledFn::from_pool(Pool::new(factory))
}

/// Wraps `factory` in a pool built from `config`.
///
/// Fails with [`PoolError::Config`](smartpool_core::PoolError::Config) when the
/// configuration is invalid.
pub fn pooled_with<A, R, F, E>(config: PoolConfig, factory: F) -> PoolResult<PooledFn<A, R>>
where
	A: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
	R: Send + Sync + 'static,
	F: Fn(&A) -> Result<R, E> + Send + Sync + 'static,
	E: Into<anyhow::Error>,
{
	Pool::builder(factory)
		.config(config)
		.build()
		.map(PooledFn::from_pool)
}
