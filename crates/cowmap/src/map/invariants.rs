//! Concurrency invariants for [`CowMap`] publication.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;

use super::CowMap;

const THREADS: usize = 8;
const PER_THREAD: usize = 200;

/// Invariant: racing writers on disjoint keys never lose an update.
#[test]
fn concurrent_inserts_are_not_lost() {
	let map = CowMap::<usize, usize>::new();
	let barrier = Barrier::new(THREADS);

	thread::scope(|s| {
		for t in 0..THREADS {
			let map = &map;
			let barrier = &barrier;
			s.spawn(move || {
				barrier.wait();
				for i in 0..PER_THREAD {
					let key = t * PER_THREAD + i;
					map.insert(key, Arc::new(key));
				}
			});
		}
	});

	assert_eq!(map.len(), THREADS * PER_THREAD);
	for key in 0..THREADS * PER_THREAD {
		assert_eq!(map.get(&key).as_deref(), Some(&key), "lost update for key {key}");
	}
}

/// Invariant: racing `get_or_insert_with` callers observe exactly one value.
#[test]
fn concurrent_get_or_insert_with_agrees_on_one_value() {
	let map = CowMap::<&str, usize>::new();
	let produced = AtomicUsize::new(0);
	let barrier = Barrier::new(THREADS);

	let results: Vec<Arc<usize>> = thread::scope(|s| {
		let handles: Vec<_> = (0..THREADS)
			.map(|t| {
				let (map, produced, barrier) = (&map, &produced, &barrier);
				s.spawn(move || {
					barrier.wait();
					map.get_or_insert_with("shared", |_| {
						produced.fetch_add(1, Ordering::SeqCst);
						t
					})
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().expect("worker panicked")).collect()
	});

	let installed = map.get("shared").expect("value installed");
	assert!(produced.load(Ordering::SeqCst) >= 1);
	for result in &results {
		assert!(Arc::ptr_eq(result, &installed), "caller observed a losing value");
	}
}

/// Invariant: a remove racing other writers never resurrects or drops keys.
///
/// Every thread churns its own keys through insert and remove on the shared
/// table, then leaves one survivor behind.
#[test]
fn concurrent_insert_remove_keeps_only_survivors() {
	let map = CowMap::<usize, usize>::new();
	let barrier = Barrier::new(THREADS);

	thread::scope(|s| {
		for t in 0..THREADS {
			let (map, barrier) = (&map, &barrier);
			s.spawn(move || {
				barrier.wait();
				for i in 0..PER_THREAD {
					let key = t * PER_THREAD + i;
					map.insert(key, Arc::new(i));
					assert_eq!(map.get(&key).as_deref(), Some(&i));
					assert_eq!(map.remove(&key).as_deref(), Some(&i));
					assert!(map.get(&key).is_none(), "removed key {key} still visible");
				}
				let survivor = THREADS * PER_THREAD + t;
				map.insert(survivor, Arc::new(t));
			});
		}
	});

	assert_eq!(map.len(), THREADS);
	for t in 0..THREADS {
		assert_eq!(map.get(&(THREADS * PER_THREAD + t)).as_deref(), Some(&t));
	}
}

/// Invariant: readers only ever see whole published tables.
///
/// One writer bumps `a` then `b` to the same generation, so every published
/// table holds `a == b` or `a == b + 1`.
#[test]
fn readers_never_observe_partial_tables() {
	let map = CowMap::<&str, usize>::new();
	map.insert("a", Arc::new(0));
	map.insert("b", Arc::new(0));

	thread::scope(|s| {
		s.spawn(|| {
			for generation in 1..=500 {
				map.insert("a", Arc::new(generation));
				map.insert("b", Arc::new(generation));
			}
		});
		for _ in 0..4 {
			s.spawn(|| {
				for _ in 0..500 {
					let snap = map.snapshot();
					let a = **snap.get("a").expect("a present");
					let b = **snap.get("b").expect("b present");
					assert!(a == b || a == b + 1, "snapshot mixed generations: a={a} b={b}");
				}
			});
		}
	});
}

#[derive(Debug, Clone)]
enum Op {
	Insert(u8, u16),
	Remove(u8),
	GetOrInsert(u8, u16),
	Get(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
	prop_oneof![
		(0u8..8, any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
		(0u8..8).prop_map(Op::Remove),
		(0u8..8, any::<u16>()).prop_map(|(k, v)| Op::GetOrInsert(k, v)),
		(0u8..8).prop_map(Op::Get),
	]
}

proptest! {
	/// Sequential histories agree with a plain `HashMap` model.
	#[test]
	fn prop_matches_hashmap_model(ops in proptest::collection::vec(arb_op(), 0..64)) {
		let map = CowMap::<u8, u16>::new();
		let mut model = HashMap::<u8, u16>::new();

		for op in ops {
			match op {
				Op::Insert(k, v) => {
					let got = map.insert(k, Arc::new(v)).map(|v| *v);
					prop_assert_eq!(got, model.insert(k, v));
				}
				Op::Remove(k) => {
					prop_assert_eq!(map.remove(&k).map(|v| *v), model.remove(&k));
				}
				Op::GetOrInsert(k, v) => {
					let got = *map.get_or_insert_with(k, |_| v);
					prop_assert_eq!(got, *model.entry(k).or_insert(v));
				}
				Op::Get(k) => {
					prop_assert_eq!(map.get(&k).map(|v| *v), model.get(&k).copied());
				}
			}
			prop_assert_eq!(map.len(), model.len());
		}
	}
}
