//! # smartpool-core
//!
//! Keyed resource pooling: given a factory that builds an expensive resource
//! from its arguments, a [`Pool`] hands back one shared instance per distinct
//! argument set instead of rebuilding it on every call.
//!
//! ## Features
//!
//! - **Lazy**: a resource is built on the first request for its fingerprint
//! - **Single construction**: concurrent requests for the same uncached
//!   fingerprint wait for one factory call
//! - **Pass-through errors**: factory failures reach the caller and are never cached
//! - **Flexible keys**: hashable values, serialized values, [`CallArgs`] or a
//!   custom key function
//! - **Async**: [`AsyncPool`] with construction deadlines (`async` feature)
//!
//! There is no eviction or expiry. A pool grows until `max_size` (if set) and
//! releases everything when flushed or dropped.
//!
//! ## Example
//!
//! ```rust
//! use smartpool_core::{Pool, PoolConfig};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Connection {
//!     addr: String,
//! }
//!
//! fn connect(addr: &String) -> Result<Connection, std::io::Error> {
//!     Ok(Connection { addr: addr.clone() })
//! }
//!
//! let pool = Pool::builder(connect)
//!     .config(PoolConfig::new().with_max_size(16))
//!     .build()
//!     .unwrap();
//!
//! let primary = "db-1:5432".to_string();
//! let a = pool.get(&primary).unwrap();
//! let b = pool.get(&primary).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(pool.statistics().constructions, 1);
//! ```

pub mod args;
#[cfg(feature = "async")]
pub mod async_pool;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod lease;
pub mod pool;
pub mod statistics;

mod slots;

pub use args::{ArgValue, CallArgs};
#[cfg(feature = "async")]
pub use async_pool::AsyncPool;
pub use config::{PoolConfig, PoolSettings};
pub use error::{PoolError, PoolResult};
pub use fingerprint::Fingerprint;
pub use lease::Lease;
pub use pool::{Pool, PoolBuilder};
pub use statistics::PoolStatistics;
