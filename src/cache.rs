//! Generic TTL cache with lazy expiry and an optional capacity bound.
//!
//! [`TtlCache`] is a bounded-append cache, not an LRU: when a capacity bound is
//! configured, an insert that would exceed it is rejected with
//! [`CacheError::Full`] instead of evicting an existing entry. Expiry is enforced
//! lazily on every read and eagerly by [`TtlCache::purge_expired`], so an entry
//! that outlived its TTL is never observable even before a sweep has run.

// std
use std::{borrow::Borrow, hash::Hash};
// self
use crate::{_prelude::*, error::CacheError};

/// Generic in-memory mapping with per-entry expiry.
///
/// The value map and the insertion-timestamp map are kept in lock-step behind one
/// lock; every mutation goes through the operations below, so callers never take
/// their own locks and never see a key without a timestamp. Reads hand out clones,
/// never references into the shard.
pub struct TtlCache<K, V> {
	ttl: Duration,
	max_size: Option<usize>,
	shard: Mutex<Shard<K, V>>,
}

struct Shard<K, V> {
	values: HashMap<K, V>,
	inserted: HashMap<K, OffsetDateTime>,
}
impl<K, V> Shard<K, V>
where
	K: Clone + Eq + Hash,
{
	fn purge(&mut self, ttl: Duration, now: OffsetDateTime) -> usize {
		let stale: Vec<K> = self
			.inserted
			.iter()
			.filter(|(_, at)| **at + ttl <= now)
			.map(|(key, _)| key.clone())
			.collect();

		for key in &stale {
			self.values.remove(key);
			self.inserted.remove(key);
		}

		stale.len()
	}
}

impl<K, V> TtlCache<K, V>
where
	K: Clone + Eq + Hash,
	V: Clone,
{
	/// Creates an unbounded cache whose entries expire after `ttl`.
	///
	/// A zero or negative `ttl` is valid and means every entry is born expired.
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			max_size: None,
			shard: Mutex::new(Shard { values: HashMap::new(), inserted: HashMap::new() }),
		}
	}

	/// Creates a cache that rejects inserts of new keys beyond `max_size` entries.
	pub fn bounded(ttl: Duration, max_size: usize) -> Self {
		Self { max_size: Some(max_size), ..Self::new(ttl) }
	}

	/// Fixed time-to-live applied to every entry.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Configured capacity bound, if any.
	pub fn max_size(&self) -> Option<usize> {
		self.max_size
	}

	/// Inserts or overwrites an entry, stamping it with the current instant.
	///
	/// Overwriting an existing key refreshes its timestamp and never counts against
	/// the capacity bound. Inserting a new key into a full cache fails with
	/// [`CacheError::Full`]; expired entries are swept before the bound is checked
	/// so dead weight never blocks a live insert.
	pub fn insert(&self, key: K, value: V) -> Result<(), CacheError> {
		self.insert_at(key, value, OffsetDateTime::now_utc())
	}

	/// Inserts an entry with an explicit insertion instant.
	///
	/// Useful for replaying persisted state and for tests that need to backdate
	/// entries; [`TtlCache::insert`] is the common path.
	pub fn insert_at(&self, key: K, value: V, at: OffsetDateTime) -> Result<(), CacheError> {
		let mut shard = self.shard.lock();

		if let Some(max_size) = self.max_size
			&& !shard.values.contains_key(&key)
		{
			shard.purge(self.ttl, OffsetDateTime::now_utc());

			if shard.values.len() >= max_size {
				return Err(CacheError::Full { max_size });
			}
		}

		shard.values.insert(key.clone(), value);
		shard.inserted.insert(key, at);

		Ok(())
	}

	/// Returns a clone of the value if the key is present and unexpired.
	///
	/// An expired entry is treated as absent and removed on the way out, so reads
	/// double as piecemeal eviction and no timer thread is required.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.take_if(key, false)
	}

	/// Returns the value or the exact reason it is unavailable.
	///
	/// Unlike [`TtlCache::get`], which folds both conditions into `None`, this
	/// distinguishes [`CacheError::KeyExpired`] from [`CacheError::KeyAbsent`] for
	/// callers that must signal clearly instead of substituting a default.
	pub fn fetch<Q>(&self, key: &Q) -> Result<V, CacheError>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let mut shard = self.shard.lock();

		if !shard.values.contains_key(key) {
			return Err(CacheError::KeyAbsent);
		}
		if self.expired_in(&shard, key, OffsetDateTime::now_utc()) {
			shard.values.remove(key);
			shard.inserted.remove(key);

			return Err(CacheError::KeyExpired);
		}

		shard.values.get(key).cloned().ok_or(CacheError::KeyAbsent)
	}

	/// Removes and returns the value if it is present and unexpired.
	///
	/// Presence check and removal happen under one lock, so a value handed out here
	/// can never be observed by a second `take` of the same key.
	pub fn take<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.take_if(key, true)
	}

	fn take_if<Q>(&self, key: &Q, remove_live: bool) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let mut shard = self.shard.lock();

		if self.expired_in(&shard, key, OffsetDateTime::now_utc()) {
			shard.values.remove(key);
			shard.inserted.remove(key);

			return None;
		}
		if remove_live {
			shard.inserted.remove(key);

			return shard.values.remove(key);
		}

		shard.values.get(key).cloned()
	}

	/// Removes an entry; a no-op when the key is absent.
	pub fn remove<Q>(&self, key: &Q)
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let mut shard = self.shard.lock();

		shard.values.remove(key);
		shard.inserted.remove(key);
	}

	/// Returns `true` only if the key is present and unexpired.
	pub fn contains<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.take_if(key, false).is_some()
	}

	/// Number of live entries, after sweeping out everything expired.
	pub fn len(&self) -> usize {
		let mut shard = self.shard.lock();

		shard.purge(self.ttl, OffsetDateTime::now_utc());
		shard.values.len()
	}

	/// Returns `true` when no live entries remain.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Immutable snapshot of every unexpired `(key, value)` pair.
	///
	/// The sweep runs first, then the pairs are cloned out; the snapshot stays
	/// valid while concurrent mutations continue on the cache itself.
	pub fn entries(&self) -> Vec<(K, V)> {
		let mut shard = self.shard.lock();

		shard.purge(self.ttl, OffsetDateTime::now_utc());
		shard.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	/// Removes every entry whose TTL has elapsed, returning how many were dropped.
	pub fn purge_expired(&self) -> usize {
		self.shard.lock().purge(self.ttl, OffsetDateTime::now_utc())
	}

	fn expired_in<Q>(&self, shard: &Shard<K, V>, key: &Q, now: OffsetDateTime) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		shard.inserted.get(key).is_some_and(|at| *at + self.ttl <= now)
	}
}
impl<K, V> Debug for TtlCache<K, V> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TtlCache")
			.field("ttl", &self.ttl)
			.field("max_size", &self.max_size)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn backdated(ttl_secs: i64) -> OffsetDateTime {
		OffsetDateTime::now_utc() - Duration::seconds(ttl_secs)
	}

	#[test]
	fn insert_then_get_returns_value() {
		let cache = TtlCache::new(Duration::seconds(600));

		cache.insert("a".to_string(), 1).expect("Insert into unbounded cache should succeed.");

		assert_eq!(cache.get("a"), Some(1));
		assert!(cache.contains("a"));
	}

	#[test]
	fn expired_entries_are_invisible_before_any_sweep() {
		let cache = TtlCache::new(Duration::seconds(300));

		cache
			.insert_at("stale".to_string(), 1, backdated(301))
			.expect("Backdated insert should succeed.");
		cache.insert("fresh".to_string(), 2).expect("Fresh insert should succeed.");

		assert_eq!(cache.get("stale"), None);
		assert!(!cache.contains("stale"));
		assert_eq!(cache.entries(), vec![("fresh".to_string(), 2)]);
	}

	#[test]
	fn len_reflects_swept_state() {
		let cache = TtlCache::new(Duration::seconds(60));

		for key in ["a", "b", "c"] {
			cache
				.insert_at(key.to_string(), (), backdated(61))
				.expect("Backdated insert should succeed.");
		}

		assert_eq!(cache.len(), 0);
		assert!(cache.is_empty());
	}

	#[test]
	fn bounded_cache_rejects_new_keys_but_allows_overwrites() {
		let cache = TtlCache::bounded(Duration::seconds(600), 2);

		cache.insert("a".to_string(), 1).expect("First insert should fit the bound.");
		cache.insert("b".to_string(), 2).expect("Second insert should fit the bound.");

		assert_eq!(cache.insert("c".to_string(), 3), Err(CacheError::Full { max_size: 2 }));

		cache.insert("a".to_string(), 9).expect("Overwrites never count against the bound.");

		assert_eq!(cache.get("a"), Some(9));
	}

	#[test]
	fn bound_check_sweeps_dead_weight_first() {
		let cache = TtlCache::bounded(Duration::seconds(60), 1);

		cache
			.insert_at("dead".to_string(), 1, backdated(61))
			.expect("Backdated insert should succeed.");
		cache.insert("live".to_string(), 2).expect("Expired entries must not block inserts.");

		assert_eq!(cache.get("live"), Some(2));
	}

	#[test]
	fn zero_ttl_means_born_expired() {
		let cache = TtlCache::new(Duration::ZERO);

		cache.insert("a".to_string(), 1).expect("Insert with zero TTL is valid.");

		assert_eq!(cache.get("a"), None);
		assert_eq!(cache.len(), 0);
	}

	#[test]
	fn fetch_distinguishes_absent_from_expired() {
		let cache = TtlCache::new(Duration::seconds(60));

		cache
			.insert_at("old".to_string(), 1, backdated(61))
			.expect("Backdated insert should succeed.");

		assert_eq!(cache.fetch("old"), Err(CacheError::KeyExpired));
		// The expired read evicted the entry, so the second read reports absence.
		assert_eq!(cache.fetch("old"), Err(CacheError::KeyAbsent));
		assert_eq!(cache.fetch("never"), Err(CacheError::KeyAbsent));
	}

	#[test]
	fn take_consumes_exactly_once() {
		let cache = TtlCache::new(Duration::seconds(60));

		cache.insert("once".to_string(), 7).expect("Insert should succeed.");

		assert_eq!(cache.take("once"), Some(7));
		assert_eq!(cache.take("once"), None);
	}

	#[test]
	fn take_rejects_expired_entries() {
		let cache = TtlCache::new(Duration::seconds(60));

		cache
			.insert_at("old".to_string(), 7, backdated(61))
			.expect("Backdated insert should succeed.");

		assert_eq!(cache.take("old"), None);
	}

	#[test]
	fn purge_expired_reports_removals() {
		let cache = TtlCache::new(Duration::seconds(60));

		cache
			.insert_at("a".to_string(), 1, backdated(61))
			.expect("Backdated insert should succeed.");
		cache.insert("b".to_string(), 2).expect("Fresh insert should succeed.");

		assert_eq!(cache.purge_expired(), 1);
		assert_eq!(cache.purge_expired(), 0);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn overwrite_refreshes_the_timestamp() {
		let cache = TtlCache::new(Duration::seconds(60));

		cache
			.insert_at("key".to_string(), 1, backdated(59))
			.expect("Backdated insert should succeed.");
		cache.insert("key".to_string(), 2).expect("Overwrite should succeed.");

		assert_eq!(cache.get("key"), Some(2));
		assert_eq!(cache.len(), 1);
	}
}
