use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::Table;

/// Pinned immutable view of one published [`super::CowMap`] table.
///
/// Later writes to the map publish new tables and never touch this one.
pub struct Snapshot<K, V: ?Sized> {
	table: Arc<Table<K, V>>,
}

impl<K, V: ?Sized> Clone for Snapshot<K, V> {
	fn clone(&self) -> Self {
		Self {
			table: Arc::clone(&self.table),
		}
	}
}

impl<K, V: ?Sized> Snapshot<K, V>
where
	K: Eq + Hash,
{
	pub(super) fn new(table: Arc<Table<K, V>>) -> Self {
		Self { table }
	}

	/// Returns the value for `key` in this snapshot.
	#[inline]
	pub fn get<Q>(&self, key: &Q) -> Option<&Arc<V>>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.table.get(key)
	}

	/// Returns true if this snapshot contains `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.table.contains_key(key)
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.table.len()
	}

	/// Returns true if the snapshot has no entries.
	pub fn is_empty(&self) -> bool {
		self.table.is_empty()
	}

	/// Iterates entries in unspecified order.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<V>)> {
		self.table.iter()
	}

	/// Iterates keys in unspecified order.
	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.table.keys()
	}

	/// Returns true if both snapshots pin the same published table.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.table, &other.table)
	}
}

impl<K, V> fmt::Debug for Snapshot<K, V>
where
	K: fmt::Debug,
	V: fmt::Debug + ?Sized,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.table.iter()).finish()
	}
}
