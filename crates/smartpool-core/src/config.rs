//! Pool configuration

use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Options for a single pool.
///
/// Configurations are compared by value: force pooling a factory twice is a
/// no-op only when both calls pass equal configurations.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
	/// Display name used in logs and errors. Defaults to the factory's type path.
	pub name: Option<String>,
	/// Maximum number of cached fingerprints. `None` means unbounded.
	pub max_size: Option<usize>,
	/// Deadline for a single asynchronous construction, in milliseconds.
	pub construct_timeout_ms: Option<u64>,
}

impl PoolConfig {
	/// Create a new, unbounded configuration
	///
	/// # Examples
	///
	/// ```rust
	/// use smartpool_core::PoolConfig;
	///
	/// let config = PoolConfig::new();
	/// assert_eq!(config.max_size, None);
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_max_size(mut self, max_size: usize) -> Self {
		self.max_size = Some(max_size);
		self
	}

	pub fn with_construct_timeout(mut self, timeout: Duration) -> Self {
		self.construct_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
		self
	}

	pub fn construct_timeout(&self) -> Option<Duration> {
		self.construct_timeout_ms.map(Duration::from_millis)
	}

	pub fn validate(&self) -> PoolResult<()> {
		if self.max_size == Some(0) {
			return Err(PoolError::Config("max_size must be at least 1".to_string()));
		}
		if self.construct_timeout_ms == Some(0) {
			return Err(PoolError::Config(
				"construct_timeout_ms must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	/// Returns `self` with unset fields taken from `base`.
	pub fn merged_over(&self, base: &PoolConfig) -> PoolConfig {
		PoolConfig {
			name: self.name.clone().or_else(|| base.name.clone()),
			max_size: self.max_size.or(base.max_size),
			construct_timeout_ms: self.construct_timeout_ms.or(base.construct_timeout_ms),
		}
	}
}

/// Application-level pool settings, usually loaded from a TOML file.
///
/// ```toml
/// [default]
/// max_size = 64
///
/// [pools.open_connection]
/// max_size = 8
/// construct_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
	pub default: PoolConfig,
	pub pools: HashMap<String, PoolConfig>,
}

impl PoolSettings {
	/// Parses settings from TOML text and validates every entry.
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::PoolSettings;
	///
	/// let settings = PoolSettings::from_toml_str(r#"
	///     [default]
	///     max_size = 64
	///
	///     [pools.open_connection]
	///     max_size = 8
	/// "#).unwrap();
	///
	/// assert_eq!(settings.config_for("open_connection").max_size, Some(8));
	/// assert_eq!(settings.config_for("load_model").max_size, Some(64));
	/// ```
	pub fn from_toml_str(text: &str) -> PoolResult<Self> {
		let settings: PoolSettings =
			toml::from_str(text).map_err(|e| PoolError::Config(e.to_string()))?;
		settings.default.validate()?;
		for (name, config) in &settings.pools {
			config
				.validate()
				.map_err(|e| PoolError::Config(format!("pools.{}: {}", name, e)))?;
		}
		Ok(settings)
	}

	/// Resolves the configuration for a factory.
	///
	/// Looks up `name` exactly, then its last `::` segment, so both
	/// `[pools."app::db::open_connection"]` and `[pools.open_connection]` match
	/// a factory whose path is `app::db::open_connection`.
	pub fn config_for(&self, name: &str) -> PoolConfig {
		let short = name.rsplit("::").next().unwrap_or(name);
		let specific = self.pools.get(name).or_else(|| self.pools.get(short));
		match specific {
			Some(config) => config.merged_over(&self.default),
			None => self.default.clone(),
		}
	}
}
