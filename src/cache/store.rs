//! Fragment cache storage.
//!
//! [`FragmentCache`] is the port the feed services talk to. Every operation
//! reports failures through [`CacheError`]; callers treat an error as a miss
//! and keep serving from the store.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::warn;

use super::config::CacheConfig;
use super::keys::FragmentKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Key-value store for rendered fragments with per-entry expiry.
pub trait FragmentCache: Send + Sync {
    /// The stored fragment, or `None` when absent or expired.
    fn get(&self, key: &FragmentKey) -> Result<Option<String>, CacheError>;

    fn set(&self, key: FragmentKey, fragment: String, ttl: Duration) -> Result<(), CacheError>;

    /// Number of clears so far. Read it before loading the data a fragment
    /// is rendered from and hand it back to [`FragmentCache::fill`].
    fn generation(&self) -> Result<u64, CacheError>;

    /// Store `fragment` unless the store was cleared after `generation` was
    /// read. Returns whether the fragment was stored.
    fn fill(
        &self,
        key: FragmentKey,
        fragment: String,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError>;

    /// Reset the expiry of a live entry. Returns whether the entry existed.
    fn touch(&self, key: &FragmentKey, ttl: Duration) -> Result<bool, CacheError>;

    fn invalidate(&self, key: &FragmentKey) -> Result<(), CacheError>;

    /// Drop every stored fragment.
    fn clear(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    fragment: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct Slots {
    entries: LruCache<FragmentKey, Entry>,
    /// Bumped under the write lock by every clear.
    generation: u64,
}

impl Slots {
    fn insert(&mut self, key: FragmentKey, fragment: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::unavailable("fragment ttl overflows the clock"))?;
        let evicted = self.entries.push(
            key.clone(),
            Entry {
                fragment,
                expires_at,
            },
        );
        if matches!(evicted, Some((evicted_key, _)) if evicted_key != key) {
            counter!("yatube_fragment_cache_evict_total").increment(1);
        }
        Ok(())
    }
}

/// In-process LRU fragment store.
pub struct MemoryFragmentCache {
    slots: RwLock<Slots>,
}

impl MemoryFragmentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: LruCache::new(config.capacity_non_zero()),
                generation: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.read_slots("len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves at worst a stale fragment, so
    // poisoning is logged and the guard reused.
    fn read_slots(&self, op: &'static str) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "fragment store lock was poisoned; reusing it");
            poisoned.into_inner()
        })
    }

    fn write_slots(&self, op: &'static str) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|poisoned| {
            warn!(target = "yatube::cache", op, "fragment store lock was poisoned; reusing it");
            poisoned.into_inner()
        })
    }
}

impl FragmentCache for MemoryFragmentCache {
    fn get(&self, key: &FragmentKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut slots = self.write_slots("get");

        let fragment = match slots.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.fragment.clone()),
            Some(_) => {
                slots.entries.pop(key);
                None
            }
            None => None,
        };

        if fragment.is_some() {
            counter!("yatube_fragment_cache_hit_total", "fragment" => key.name()).increment(1);
        } else {
            counter!("yatube_fragment_cache_miss_total", "fragment" => key.name()).increment(1);
        }
        Ok(fragment)
    }

    fn set(&self, key: FragmentKey, fragment: String, ttl: Duration) -> Result<(), CacheError> {
        self.write_slots("set").insert(key, fragment, ttl)
    }

    fn generation(&self) -> Result<u64, CacheError> {
        Ok(self.read_slots("generation").generation)
    }

    fn fill(
        &self,
        key: FragmentKey,
        fragment: String,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut slots = self.write_slots("fill");
        if slots.generation != generation {
            return Ok(false);
        }
        slots.insert(key, fragment, ttl)?;
        Ok(true)
    }

    fn touch(&self, key: &FragmentKey, ttl: Duration) -> Result<bool, CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::unavailable("fragment ttl overflows the clock"))?;
        let mut slots = self.write_slots("touch");
        match slots.entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = expires_at;
                Ok(true)
            }
            Some(_) => {
                slots.entries.pop(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn invalidate(&self, key: &FragmentKey) -> Result<(), CacheError> {
        self.write_slots("invalidate").entries.pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut slots = self.write_slots("clear");
        slots.entries.clear();
        slots.generation = slots.generation.wrapping_add(1);
        counter!("yatube_fragment_cache_clear_total").increment(1);
        Ok(())
    }
}

/// Store used when fragment caching is disabled: never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFragmentCache;

impl FragmentCache for NullFragmentCache {
    fn get(&self, _key: &FragmentKey) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: FragmentKey, _fragment: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn generation(&self) -> Result<u64, CacheError> {
        Ok(0)
    }

    fn fill(
        &self,
        _key: FragmentKey,
        _fragment: String,
        _ttl: Duration,
        _generation: u64,
    ) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn touch(&self, _key: &FragmentKey, _ttl: Duration) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn invalidate(&self, _key: &FragmentKey) -> Result<(), CacheError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    const TTL: Duration = Duration::from_secs(20);

    fn store() -> MemoryFragmentCache {
        MemoryFragmentCache::new(&CacheConfig::default())
    }

    #[test]
    fn stores_and_returns_fragment_until_cleared() {
        let cache = store();
        let key = FragmentKey::index_page(1);

        assert_eq!(cache.get(&key).expect("get"), None);
        cache.set(key.clone(), "<li>a</li>".into(), TTL).expect("set");
        assert_eq!(cache.get(&key).expect("get").as_deref(), Some("<li>a</li>"));

        cache.clear().expect("clear");
        assert_eq!(cache.get(&key).expect("get"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_touch_expires_entry() {
        let cache = store();
        let key = FragmentKey::index_page(1);
        cache.set(key.clone(), "fragment".into(), TTL).expect("set");

        assert!(cache.touch(&key, Duration::ZERO).expect("touch"));
        assert_eq!(cache.get(&key).expect("get"), None);
        assert!(!cache.touch(&key, TTL).expect("touch"));
    }

    #[test]
    fn pages_are_stored_independently() {
        let cache = store();
        cache
            .set(FragmentKey::index_page(1), "one".into(), TTL)
            .expect("set");
        cache
            .set(FragmentKey::index_page(2), "two".into(), TTL)
            .expect("set");

        cache.invalidate(&FragmentKey::index_page(1)).expect("invalidate");

        assert_eq!(cache.get(&FragmentKey::index_page(1)).expect("get"), None);
        assert_eq!(
            cache.get(&FragmentKey::index_page(2)).expect("get").as_deref(),
            Some("two")
        );
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let cache = MemoryFragmentCache::new(&CacheConfig {
            capacity: 1,
            ..Default::default()
        });
        cache
            .set(FragmentKey::index_page(1), "one".into(), TTL)
            .expect("set");
        cache
            .set(FragmentKey::index_page(2), "two".into(), TTL)
            .expect("set");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&FragmentKey::index_page(1)).expect("get"), None);
    }

    #[test]
    fn fill_is_dropped_when_a_clear_happened_since_the_read() {
        let cache = store();
        let key = FragmentKey::index_page(1);

        let before = cache.generation().expect("generation");
        cache.clear().expect("clear");

        assert!(!cache.fill(key.clone(), "old".into(), TTL, before).expect("fill"));
        assert_eq!(cache.get(&key).expect("get"), None);

        let current = cache.generation().expect("generation");
        assert!(cache.fill(key.clone(), "new".into(), TTL, current).expect("fill"));
        assert_eq!(cache.get(&key).expect("get").as_deref(), Some("new"));
    }

    #[test]
    fn null_cache_never_hits() {
        let cache = NullFragmentCache;
        let key = FragmentKey::index_page(1);
        cache.set(key.clone(), "x".into(), TTL).expect("set");
        assert_eq!(cache.get(&key).expect("get"), None);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = store();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.slots.write().expect("slots lock should be acquired");
            panic!("poison slots lock");
        }));

        let key = FragmentKey::index_page(1);
        cache.set(key.clone(), "after".into(), TTL).expect("set");
        assert!(cache.get(&key).expect("get").is_some());
    }
}
