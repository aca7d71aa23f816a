//! Fingerprint to slot table shared by the sync and async pools.
//!
//! The table lock only guards finding or creating a slot. Each slot is a
//! once-cell, which serializes construction for its own fingerprint.

use crate::error::{PoolError, PoolResult};
use crate::fingerprint::Fingerprint;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

pub(crate) trait SlotCell: Default {
	type Value;

	fn value(&self) -> Option<&Arc<Self::Value>>;
}

impl<R> SlotCell for once_cell::sync::OnceCell<Arc<R>> {
	type Value = R;

	fn value(&self) -> Option<&Arc<R>> {
		self.get()
	}
}

#[cfg(feature = "async")]
impl<R> SlotCell for tokio::sync::OnceCell<Arc<R>> {
	type Value = R;

	fn value(&self) -> Option<&Arc<R>> {
		self.get()
	}
}

pub(crate) struct SlotTable<C> {
	slots: Mutex<HashMap<Fingerprint, Arc<C>>>,
	max_size: Option<usize>,
}

impl<C: SlotCell> SlotTable<C> {
	pub(crate) fn new(max_size: Option<usize>) -> Self {
		Self {
			slots: Mutex::new(HashMap::new()),
			max_size,
		}
	}

	/// Returns the slot for `key`, creating an empty one if needed.
	///
	/// Slots still under construction count toward `max_size`.
	pub(crate) fn acquire(&self, key: &Fingerprint) -> PoolResult<Arc<C>> {
		let mut slots = self.slots.lock();
		if let Some(slot) = slots.get(key) {
			return Ok(slot.clone());
		}
		if let Some(max_size) = self.max_size {
			if slots.len() >= max_size {
				return Err(PoolError::PoolFull { max_size });
			}
		}
		let slot = Arc::new(C::default());
		slots.insert(key.clone(), slot.clone());
		Ok(slot)
	}

	/// Like [`acquire`](Self::acquire), returning a guard that releases the
	/// slot on drop if it is still empty.
	pub(crate) fn claim(&self, key: &Fingerprint) -> PoolResult<ClaimedSlot<'_, C>> {
		let slot = self.acquire(key)?;
		Ok(ClaimedSlot {
			table: self,
			key: key.clone(),
			slot,
		})
	}

	/// Drops a slot whose construction failed so the fingerprint stays uncached.
	///
	/// The slot is only removed when no other caller still holds it; a
	/// concurrent waiter will retry construction on the same slot instead.
	pub(crate) fn release_if_vacant(&self, key: &Fingerprint, slot: Arc<C>) {
		let mut slots = self.slots.lock();
		let removable = slots.get(key).is_some_and(|current| {
			Arc::ptr_eq(current, &slot)
				&& current.value().is_none()
				&& Arc::strong_count(&slot) == 2
		});
		if removable {
			slots.remove(key);
		}
		// Release our handle while the lock is held so the last failing caller
		// observes a count of two.
		drop(slot);
		drop(slots);
	}

	pub(crate) fn contains(&self, key: &Fingerprint) -> bool {
		self.slots
			.lock()
			.get(key)
			.is_some_and(|slot| slot.value().is_some())
	}

	/// Removes the entry for `key` if its instance is constructed.
	///
	/// A slot still under construction is left alone so its value lands in the
	/// table once the factory returns.
	pub(crate) fn remove_constructed(&self, key: &Fingerprint) -> Option<Arc<C>> {
		let mut slots = self.slots.lock();
		if slots.get(key)?.value().is_none() {
			return None;
		}
		slots.remove(key)
	}

	/// Removes the entry for `key` only if it still holds `instance`.
	pub(crate) fn remove_instance(&self, key: &Fingerprint, instance: &Arc<C::Value>) -> bool {
		let mut slots = self.slots.lock();
		let same = slots
			.get(key)
			.and_then(|slot| slot.value())
			.is_some_and(|current| Arc::ptr_eq(current, instance));
		if same {
			slots.remove(key);
		}
		same
	}

	/// Number of constructed entries.
	pub(crate) fn len(&self) -> usize {
		self.slots
			.lock()
			.values()
			.filter(|slot| slot.value().is_some())
			.count()
	}

	pub(crate) fn drain(&self) -> Vec<Arc<C>> {
		self.slots.lock().drain().map(|(_, slot)| slot).collect()
	}
}

/// A slot held by one resolving caller.
///
/// Dropping it while the slot is empty gives the slot back, whether the
/// factory returned an error, panicked, or the lookup was cancelled.
pub(crate) struct ClaimedSlot<'a, C: SlotCell> {
	table: &'a SlotTable<C>,
	key: Fingerprint,
	slot: Arc<C>,
}

impl<C: SlotCell> Deref for ClaimedSlot<'_, C> {
	type Target = C;

	fn deref(&self) -> &C {
		&self.slot
	}
}

impl<C: SlotCell> Drop for ClaimedSlot<'_, C> {
	fn drop(&mut self) {
		if self.slot.value().is_none() {
			let slot = std::mem::take(&mut self.slot);
			self.table.release_if_vacant(&self.key, slot);
		}
	}
}
