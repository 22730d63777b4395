//! Copy-on-write map container with atomic publication.
//!
//! # Purpose
//!
//! Provide wait-free reads and linearizable writes on top of immutable table
//! snapshots, for registries that are read on every call and written rarely.
//!
//! # Mental model
//!
//! * A lookup pins whichever table is current and answers from it alone.
//! * A write copies that table, edits the copy, and tries to swap it in
//!   against the table it started from.
//! * If another write landed in between, the swap is rejected and the write
//!   starts over from the newer table.
//!
//! # Invariants
//!
//! * A published table is never mutated again.
//! * Concurrent writes must not be lost (see `invariants::concurrent_inserts_are_not_lost`).
//! * Value identity is `Arc::ptr_eq`; re-inserting the same `Arc` publishes nothing.
//!
//! # Concurrency & ordering
//!
//! * Lookups never block or retry; they cost one pointer load plus a hash probe.
//! * Writes always make global progress but an individual writer can keep
//!   losing the swap while others keep writing.
//! * [`CowMap::get_or_insert_with`] may run its producer more than once under
//!   contention. Only the value from the winning attempt is ever published.

use std::borrow::Borrow;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;

mod snapshot;

pub use snapshot::Snapshot;

#[cfg(test)]
mod invariants;

pub(crate) type Table<K, V> = FxHashMap<K, Arc<V>>;

/// Concurrent map that publishes whole immutable tables on every write.
pub struct CowMap<K, V: ?Sized> {
	table: ArcSwap<Table<K, V>>,
}

impl<K, V: ?Sized> Default for CowMap<K, V> {
	fn default() -> Self {
		Self {
			table: ArcSwap::from_pointee(Table::<K, V>::default()),
		}
	}
}

impl<K, V: ?Sized> CowMap<K, V>
where
	K: Eq + Hash + Clone,
{
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value for `key` in the current table.
	#[inline]
	pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.table.load().get(key).cloned()
	}

	/// Returns true if the current table contains `key`.
	#[inline]
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.table.load().contains_key(key)
	}

	/// Returns the number of entries in the current table.
	pub fn len(&self) -> usize {
		self.table.load().len()
	}

	/// Returns true if the current table is empty.
	pub fn is_empty(&self) -> bool {
		self.table.load().is_empty()
	}

	/// Pins the current table.
	pub fn snapshot(&self) -> Snapshot<K, V> {
		Snapshot::new(self.table.load_full())
	}

	/// Installs `value` for `key`, returning the previous value.
	///
	/// When `key` already maps to this exact `Arc`, nothing is published and
	/// the value is returned as-is.
	pub fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
		loop {
			let old = self.table.load_full();
			let previous = old.get(&key).cloned();
			if previous.as_ref().is_some_and(|current| Arc::ptr_eq(current, &value)) {
				return previous;
			}

			let mut next: Table<K, V> = (*old).clone();
			next.insert(key.clone(), Arc::clone(&value));
			if self.publish(&old, next) {
				return previous;
			}
			tracing::trace!(op = "insert", "cowmap.cas_retry");
		}
	}

	/// Removes `key`, returning the removed value.
	///
	/// Absent keys return immediately without copying or publishing.
	pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		loop {
			let old = self.table.load_full();
			let removed = old.get(key).cloned()?;

			let mut next: Table<K, V> = (*old).clone();
			next.remove(key);
			if self.publish(&old, next) {
				return Some(removed);
			}
			tracing::trace!(op = "remove", "cowmap.cas_retry");
		}
	}

	/// Returns the value for `key`, producing and publishing one if absent.
	///
	/// Present keys never invoke `producer`. Under contention the producer can
	/// run once per lost CAS round; values from lost rounds are dropped.
	pub fn get_or_insert_with<R>(&self, key: K, mut producer: impl FnMut(&K) -> R) -> Arc<V>
	where
		R: Into<Arc<V>>,
	{
		match self.try_get_or_insert_with(key, |k| Ok::<_, Infallible>(producer(k))) {
			Ok(value) => value,
			Err(never) => match never {},
		}
	}

	/// Fallible [`Self::get_or_insert_with`].
	///
	/// A producer error abandons the operation without publishing anything.
	pub fn try_get_or_insert_with<R, E>(&self, key: K, mut producer: impl FnMut(&K) -> Result<R, E>) -> Result<Arc<V>, E>
	where
		R: Into<Arc<V>>,
	{
		loop {
			let old = self.table.load_full();
			if let Some(existing) = old.get(&key) {
				return Ok(Arc::clone(existing));
			}

			let value: Arc<V> = producer(&key)?.into();
			let mut next: Table<K, V> = (*old).clone();
			next.insert(key.clone(), Arc::clone(&value));
			if self.publish(&old, next) {
				return Ok(value);
			}
			tracing::trace!(op = "get_or_insert_with", "cowmap.cas_retry");
		}
	}

	/// Publishes an empty table.
	pub fn clear(&self) {
		if self.table.load().is_empty() {
			return;
		}
		self.table.store(Arc::new(Table::<K, V>::default()));
	}

	/// CAS-publishes `next` if the current table is still `old`.
	fn publish(&self, old: &Arc<Table<K, V>>, next: Table<K, V>) -> bool {
		let prev = self.table.compare_and_swap(old, Arc::new(next));
		Arc::ptr_eq(&prev, old)
	}
}

impl<K, V> FromIterator<(K, V)> for CowMap<K, V>
where
	K: Eq + Hash,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let table: Table<K, V> = iter.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
		Self {
			table: ArcSwap::from_pointee(table),
		}
	}
}

impl<K, V> fmt::Debug for CowMap<K, V>
where
	K: fmt::Debug,
	V: fmt::Debug + ?Sized,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.table.load().iter()).finish()
	}
}
