//! Leased access to a pooled resource

use crate::fingerprint::Fingerprint;
use crate::pool::Pool;
use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A borrowed handle on a pooled resource.
///
/// Dropping a lease leaves the resource in the pool. When work on the resource
/// fails in a way that means the instance is broken, hand the error to
/// [`Lease::fail`]: if the pool's `discard_on` filter matches, the instance is
/// removed and the next request constructs a fresh one.
pub struct Lease<'a, A, R> {
	pool: &'a Pool<A, R>,
	key: Fingerprint,
	value: Arc<R>,
}

impl<'a, A, R> Lease<'a, A, R>
where
	A: Send + Sync + 'static,
	R: Send + Sync + 'static,
{
	pub(crate) fn new(pool: &'a Pool<A, R>, key: Fingerprint, value: Arc<R>) -> Self {
		Self { pool, key, value }
	}

	/// Reports a failure and returns the error unchanged.
	///
	/// The instance is discarded only if the error matches the pool's filter and
	/// the pool still maps this fingerprint to this very instance.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::Pool;
	/// use std::convert::Infallible;
	/// use std::io;
	///
	/// fn send(pool: &Pool<String, String>, addr: &String) -> Result<(), io::Error> {
	///     let conn = pool.lease(addr).map_err(io::Error::other)?;
	///     Err(conn.fail(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")))
	/// }
	///
	/// let pool = Pool::builder(|addr: &String| Ok::<_, Infallible>(addr.clone()))
	///     .discard_on(|err| err.is::<io::Error>())
	///     .build()
	///     .unwrap();
	/// let addr = "cache:11211".to_string();
	///
	/// assert!(send(&pool, &addr).is_err());
	/// assert!(pool.is_empty());
	/// ```
	pub fn fail<E>(&self, err: E) -> E
	where
		E: StdError + 'static,
	{
		if self.pool.should_discard(&err) {
			self.pool.discard_instance(&self.key, &self.value);
		}
		err
	}

	/// Removes the leased instance from the pool regardless of any filter.
	///
	/// Returns `false` if the pool had already replaced or dropped it.
	pub fn discard(self) -> bool {
		self.pool.discard_instance(&self.key, &self.value)
	}

	/// Releases the lease, keeping the shared instance.
	pub fn into_inner(self) -> Arc<R> {
		self.value
	}

	pub fn fingerprint(&self) -> &Fingerprint {
		&self.key
	}
}

impl<A, R> Deref for Lease<'_, A, R> {
	type Target = R;

	fn deref(&self) -> &R {
		&self.value
	}
}

impl<A, R: fmt::Debug> fmt::Debug for Lease<'_, A, R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lease")
			.field("key", &self.key)
			.field("value", &self.value)
			.finish()
	}
}
