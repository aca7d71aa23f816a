//! Argument fingerprints
//!
//! A [`Fingerprint`] is the cache key a pool derives from the arguments of a
//! call. It is type-erased so that one pool type can be keyed by plain values,
//! serialized arguments or dynamic [`CallArgs`](crate::CallArgs), while equality
//! stays exact: keys built from different Rust types never compare equal.

use crate::error::{PoolError, PoolResult};
use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

trait DynKey: Any + Send + Sync {
	fn as_any(&self) -> &dyn Any;
	fn dyn_eq(&self, other: &dyn DynKey) -> bool;
	fn dyn_hash(&self, state: &mut dyn Hasher);
	fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> DynKey for T
where
	T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
	fn as_any(&self) -> &dyn Any {
		self
	}

	fn dyn_eq(&self, other: &dyn DynKey) -> bool {
		other
			.as_any()
			.downcast_ref::<T>()
			.is_some_and(|other| self == other)
	}

	fn dyn_hash(&self, mut state: &mut dyn Hasher) {
		TypeId::of::<T>().hash(&mut state);
		self.hash(&mut state);
	}

	fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// Canonical JSON text of a serialized argument set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SerializedKey(String);

/// Cache key derived from the arguments of a pooled call.
#[derive(Clone)]
pub struct Fingerprint(Arc<dyn DynKey>);

impl Fingerprint {
	/// Fingerprints a hashable value.
	///
	/// Equal values give equal fingerprints.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::Fingerprint;
	///
	/// let a = Fingerprint::of(("db.internal", 5432u16));
	/// let b = Fingerprint::of(("db.internal", 5432u16));
	/// assert_eq!(a, b);
	/// assert_ne!(a, Fingerprint::of(("db.internal", 5433u16)));
	/// ```
	pub fn of<T>(value: T) -> Self
	where
		T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
	{
		Self(Arc::new(value))
	}

	/// Fingerprints any serializable value through its canonical JSON form.
	///
	/// Object keys are emitted in sorted order, so maps with equal contents
	/// produce equal fingerprints regardless of insertion order. Values that
	/// cannot be represented (for example maps keyed by tuples) fail with
	/// [`PoolError::UnhashableArgument`]. Non-finite floats serialize as `null`.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::Fingerprint;
	/// use std::collections::HashMap;
	///
	/// let key = Fingerprint::serialized(&(1.5f64, "gpu")).unwrap();
	/// assert_eq!(key, Fingerprint::serialized(&(1.5f64, "gpu")).unwrap());
	///
	/// let mut bad = HashMap::new();
	/// bad.insert((1, 2), "tuple keys are not representable");
	/// assert!(Fingerprint::serialized(&bad).is_err());
	/// ```
	pub fn serialized<T>(value: &T) -> PoolResult<Self>
	where
		T: Serialize + ?Sized,
	{
		let canonical = serde_json::to_value(value)
			.map_err(|e| PoolError::UnhashableArgument(e.to_string()))?;
		Ok(Self::of(SerializedKey(canonical.to_string())))
	}

	/// Returns the underlying key if it was built from a value of type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.as_any().downcast_ref::<T>()
	}
}

impl PartialEq for Fingerprint {
	fn eq(&self, other: &Self) -> bool {
		self.0.dyn_eq(other.0.as_ref())
	}
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.dyn_hash(state);
	}
}

impl fmt::Debug for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Fingerprint(")?;
		self.0.dyn_fmt(f)?;
		f.write_str(")")
	}
}
