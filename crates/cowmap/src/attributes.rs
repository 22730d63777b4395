//! Typed attribute store backed by [`CowMap`].

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::CowMap;

type AnyValue = dyn Any + Send + Sync;

/// Named, typed key into an [`Attributes`] store.
///
/// Two keys address the same slot only if both the name and the value type
/// match.
pub struct AttributeKey<T> {
	name: &'static str,
	_marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
	/// Creates a key with the given diagnostic name.
	pub const fn new(name: &'static str) -> Self {
		Self {
			name,
			_marker: PhantomData,
		}
	}

	/// Returns the key name.
	pub const fn name(&self) -> &'static str {
		self.name
	}
}

impl<T> Clone for AttributeKey<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AttributeKey").field(&self.name).finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Slot {
	name: &'static str,
	type_id: TypeId,
}

impl Slot {
	fn of<T: 'static>(key: &AttributeKey<T>) -> Self {
		Self {
			name: key.name,
			type_id: TypeId::of::<T>(),
		}
	}
}

/// Concurrent typed attribute store.
#[derive(Default)]
pub struct Attributes {
	slots: CowMap<Slot, AnyValue>,
}

impl Attributes {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value stored under `key`.
	pub fn get<T>(&self, key: &AttributeKey<T>) -> Option<Arc<T>>
	where
		T: Send + Sync + 'static,
	{
		self.slots.get(&Slot::of(key)).and_then(downcast)
	}

	/// Returns true if `key` has a value.
	pub fn contains<T: 'static>(&self, key: &AttributeKey<T>) -> bool {
		self.slots.contains_key(&Slot::of(key))
	}

	/// Stores `value` under `key`, returning the previous value.
	pub fn put<T>(&self, key: &AttributeKey<T>, value: Arc<T>) -> Option<Arc<T>>
	where
		T: Send + Sync + 'static,
	{
		self.slots.insert(Slot::of(key), value).and_then(downcast)
	}

	/// Removes the value stored under `key`.
	pub fn remove<T>(&self, key: &AttributeKey<T>) -> Option<Arc<T>>
	where
		T: Send + Sync + 'static,
	{
		self.slots.remove(&Slot::of(key)).and_then(downcast)
	}

	/// Returns the value under `key`, storing `producer()` first if absent.
	///
	/// `producer` may run more than once when writers race on the same key.
	pub fn compute_if_absent<T>(&self, key: &AttributeKey<T>, mut producer: impl FnMut() -> T) -> Arc<T>
	where
		T: Send + Sync + 'static,
	{
		let value = self.slots.get_or_insert_with(Slot::of(key), |_| Arc::new(producer()) as Arc<AnyValue>);
		match downcast(value) {
			Some(value) => value,
			None => unreachable!("attribute slot `{}` is keyed by its value type", key.name),
		}
	}

	/// Returns the number of stored attributes.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Returns true if no attributes are stored.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Returns stored attribute names, sorted.
	pub fn names(&self) -> Vec<&'static str> {
		let mut names: Vec<_> = self.slots.snapshot().keys().map(|slot| slot.name).collect();
		names.sort_unstable();
		names
	}
}

impl fmt::Debug for Attributes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Attributes").field("names", &self.names()).finish()
	}
}

fn downcast<T: Send + Sync + 'static>(value: Arc<AnyValue>) -> Option<Arc<T>> {
	value.downcast::<T>().ok()
}
