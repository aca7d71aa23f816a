//! # smartpool
//!
//! Keyed resource pooling for expensive constructors.
//!
//! Given a factory that builds a resource from its arguments (a connection, a
//! loaded model, a large buffer), smartpool returns one shared instance per
//! distinct argument set instead of rebuilding it on every call.
//!
//! ## Core Principles
//!
//! - **Lazy**: resources are built on first request
//! - **At most once**: one construction per fingerprint, even under concurrency
//! - **Pass-through**: factory errors reach the caller and are never cached
//! - **Explicit globals**: force pooling goes through a registry that callers
//!   opt into by holding handles
//!
//! ## Feature Flags
//!
//! - `binder` (default) - `pooled`, `pooled_fn!`, factory handles and force pooling
//! - `async` (default) - tokio-backed `AsyncPool` with construction deadlines
//!
//! ## Quick Example
//!
//! ```rust
//! use smartpool::prelude::*;
//! use std::sync::Arc;
//!
//! fn open_connection(dsn: &String) -> Result<String, std::io::Error> {
//!     Ok(format!("connected to {dsn}"))
//! }
//!
//! // Explicit pool
//! let pool = Pool::new(open_connection);
//! let dsn = "postgres://db/app".to_string();
//! assert!(Arc::ptr_eq(&pool.get(&dsn).unwrap(), &pool.get(&dsn).unwrap()));
//!
//! // Decorator style
//! let open_connection = pooled(open_connection);
//! assert!(Arc::ptr_eq(
//!     &open_connection.call(&dsn).unwrap(),
//!     &open_connection.call(&dsn).unwrap(),
//! ));
//! ```

pub use smartpool_core::{
	ArgValue, CallArgs, Fingerprint, Lease, Pool, PoolBuilder, PoolConfig, PoolError,
	PoolResult, PoolSettings, PoolStatistics,
};

#[cfg(feature = "async")]
pub use smartpool_core::AsyncPool;

#[cfg(feature = "binder")]
pub use smartpool_binder::{
	BindingState, FactoryHandle, FactoryId, FactoryRegistry, ForceOutcome, PooledFn,
	force_pooling, force_pooling_from_settings, force_pooling_with, pooled, pooled_fn,
	pooled_with,
};

/// Commonly used items.
pub mod prelude {
	pub use crate::{CallArgs, Fingerprint, Pool, PoolConfig, PoolError, PoolResult};

	#[cfg(feature = "async")]
	pub use crate::AsyncPool;

	#[cfg(feature = "binder")]
	pub use crate::{FactoryHandle, force_pooling, pooled, pooled_fn};
}
