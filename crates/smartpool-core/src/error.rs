//! Error types for pooling operations.

use crate::config::PoolConfig;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving or binding pooled resources.
#[derive(Debug, Error)]
pub enum PoolError {
	/// The factory failed while constructing a resource.
	///
	/// The fingerprint is left uncached, so a later call retries construction.
	#[error("Factory error in {factory}: {source}")]
	Factory {
		/// Name of the factory that failed.
		factory: String,
		/// The error returned by the factory, unchanged.
		#[source]
		source: anyhow::Error,
	},

	/// The arguments could not be turned into a stable fingerprint.
	#[error("Unhashable argument: {0}")]
	UnhashableArgument(String),

	/// A bounded pool has no room for another fingerprint.
	#[error("Pool is full (max_size = {max_size})")]
	PoolFull {
		/// Configured capacity of the pool.
		max_size: usize,
	},

	/// Construction did not finish within the allotted time.
	#[error("Construction timed out after {0:?}")]
	Timeout(Duration),

	/// A factory was force-pooled again with a different configuration.
	#[error(
		"Previous pooling of {factory}() used {existing:?}, which differs from requested {requested:?}"
	)]
	ConflictingPooling {
		/// Name of the factory.
		factory: String,
		/// Configuration of the installed binding.
		existing: Box<PoolConfig>,
		/// Configuration passed to the rejected call.
		requested: Box<PoolConfig>,
	},

	/// Invalid pool configuration or settings.
	#[error("Configuration error: {0}")]
	Config(String),
}

impl PoolError {
	/// Wraps a factory failure.
	pub fn factory(factory: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
		Self::Factory {
			factory: factory.into(),
			source: source.into(),
		}
	}

	/// Returns `true` when the error came from the factory.
	pub fn is_factory(&self) -> bool {
		matches!(self, Self::Factory { .. })
	}

	/// Returns the factory's original error if it is of type `E`.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::PoolError;
	/// use std::io;
	///
	/// let err = PoolError::factory("open", io::Error::new(io::ErrorKind::Other, "refused"));
	/// assert_eq!(
	///     err.factory_error::<io::Error>().map(|e| e.kind()),
	///     Some(io::ErrorKind::Other)
	/// );
	/// ```
	pub fn factory_error<E>(&self) -> Option<&E>
	where
		E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
	{
		match self {
			Self::Factory { source, .. } => source.downcast_ref::<E>(),
			_ => None,
		}
	}
}

/// Result type alias for pooling operations.
pub type PoolResult<T> = Result<T, PoolError>;
