use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded map shared between threads.
///
/// When full, inserting evicts the least recently used entry.
pub struct FixedSizeCache<K, V> {
	entries: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> FixedSizeCache<K, V> {
	/// Creates a cache holding at most `capacity` entries, and at least one.
	pub fn new(capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			entries: Mutex::new(LruCache::new(capacity)),
		}
	}

	/// Returns a copy of the value and marks the entry as recently used.
	pub fn get(&self, key: &K) -> Option<V> {
		self.entries.lock().get(key).cloned()
	}

	pub fn contains(&self, key: &K) -> bool {
		self.entries.lock().contains(key)
	}

	pub fn insert(&self, key: K, value: V) {
		self.entries.lock().put(key, value);
	}

	pub fn remove(&self, key: &K) -> Option<V> {
		self.entries.lock().pop(key)
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.entries.lock().cap().get()
	}
}
