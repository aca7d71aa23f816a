//! Pool statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time counters of a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStatistics {
	/// Lookups answered from the cache, including callers that waited on
	/// another caller's construction
	pub hits: u64,
	/// Lookups that ran the factory
	pub misses: u64,
	/// Successful factory invocations
	pub constructions: u64,
	/// Factory invocations that failed or ran past an async deadline
	pub failures: u64,
	/// Instances currently cached
	pub entry_count: u64,
}

impl PoolStatistics {
	pub fn total_requests(&self) -> u64 {
		self.hits + self.misses
	}

	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use smartpool_core::PoolStatistics;
	///
	/// let mut stats = PoolStatistics::default();
	/// stats.hits = 75;
	/// stats.misses = 25;
	///
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		match self.total_requests() {
			0 => 0.0,
			total => self.hits as f64 / total as f64,
		}
	}

	pub fn miss_rate(&self) -> f64 {
		match self.total_requests() {
			0 => 0.0,
			total => self.misses as f64 / total as f64,
		}
	}
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
	hits: AtomicU64,
	misses: AtomicU64,
	constructions: AtomicU64,
	failures: AtomicU64,
}

impl Counters {
	pub(crate) fn hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn constructed(&self) {
		self.constructions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn failed(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self, entry_count: usize) -> PoolStatistics {
		PoolStatistics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			constructions: self.constructions.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
			entry_count: entry_count as u64,
		}
	}
}
