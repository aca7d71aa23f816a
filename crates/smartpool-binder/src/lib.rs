//! # smartpool-binder
//!
//! Binds pools to callables.
//!
//! - [`pooled`] / [`pooled_with`] wrap a factory in a [`PooledFn`], a callable
//!   value closing over a private pool
//! - [`pooled_fn!`] pools a function at its definition
//! - [`FactoryHandle`] and [`force_pooling`] retrofit pooling onto factories
//!   the caller does not own: callers hold handles, and force pooling updates
//!   the [`FactoryRegistry`] entry the handles resolve through
//!
//! A factory is either `Unpooled` or `Pooled` within a registry. Force pooling
//! moves it to `Pooled` and is idempotent; there is no way back other than
//! [`FactoryRegistry::clear`].
//!
//! ## Example
//!
//! ```rust
//! use smartpool_binder::{FactoryHandle, FactoryRegistry, force_pooling};
//! use std::sync::Arc;
//!
//! fn connect(dsn: &String) -> Result<String, std::io::Error> {
//!     Ok(format!("conn({dsn})"))
//! }
//!
//! let registry = Arc::new(FactoryRegistry::new());
//! let connect = FactoryHandle::with_registry(&registry, connect);
//! force_pooling(&connect).unwrap();
//!
//! let dsn = "postgres://localhost/app".to_string();
//! assert!(Arc::ptr_eq(&connect.call(&dsn).unwrap(), &connect.call(&dsn).unwrap()));
//! ```

pub mod force;
pub mod handle;
mod macros;
pub mod pooled;
pub mod registry;

pub use force::{force_pooling, force_pooling_from_settings, force_pooling_with};
pub use handle::{BindingState, FactoryHandle, FactoryId};
pub use pooled::{PooledFn, pooled, pooled_with};
pub use registry::{FactoryRegistry, ForceOutcome};
pub use smartpool_core::{Pool, PoolConfig, PoolError, PoolResult, PoolSettings};

#[doc(hidden)]
pub mod __private {
	pub use once_cell::sync::Lazy;
}
