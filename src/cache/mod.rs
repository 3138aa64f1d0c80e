//! Single-slot TTL cache
//!
//! Holds exactly one (query, value, timestamp) tuple. Used twice in the
//! engine with independent TTLs: once for the last real query's result and
//! once for the predictive prefetcher's output. Readers get a cloned
//! snapshot, so a concurrent replacement can never corrupt an in-flight
//! read.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct SlotEntry<T> {
    query: String,
    value: T,
    created_at: Instant,
}

/// TTL-bounded cache with a single slot
pub struct SlotCache<T: Clone> {
    slot: Mutex<Option<SlotEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> SlotCache<T> {
    /// Create an empty cache with the given entry lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Return the stored value if `query` matches exactly and the entry
    /// is still fresh; any other query is a miss even while an entry for
    /// a different query sits in the slot
    pub fn get(&self, query: &str) -> Option<T> {
        let slot = self.slot.lock().unwrap();
        match slot.as_ref() {
            Some(entry)
                if entry.query == query && entry.created_at.elapsed() < self.ttl =>
            {
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    /// Unconditionally overwrite the slot
    pub fn put(&self, query: &str, value: T) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(SlotEntry {
            query: query.to_string(),
            value,
            created_at: Instant::now(),
        });
    }

    /// Drop the stored entry, if any
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap();
        *slot = None;
    }

    /// Configured entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_hit_requires_exact_query_match() {
        let cache = SlotCache::new(Duration::from_secs(60));
        cache.put("dragon", vec![1, 2, 3]);

        assert_eq!(cache.get("dragon"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("dragons"), None);
        assert_eq!(cache.get(""), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = SlotCache::new(Duration::from_millis(20));
        cache.put("dragon", 42u32);

        assert_eq!(cache.get("dragon"), Some(42));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("dragon"), None);
    }

    #[test]
    fn test_put_overwrites_previous_entry() {
        let cache = SlotCache::new(Duration::from_secs(60));
        cache.put("first", 1u32);
        cache.put("second", 2u32);

        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some(2));
    }

    #[test]
    fn test_clear_empties_slot() {
        let cache = SlotCache::new(Duration::from_secs(60));
        cache.put("dragon", 1u32);
        cache.clear();
        assert_eq!(cache.get("dragon"), None);
    }

    #[test]
    fn test_get_returns_snapshot() {
        let cache = SlotCache::new(Duration::from_secs(60));
        cache.put("dragon", vec!["a".to_string()]);

        let mut snapshot = cache.get("dragon").unwrap();
        snapshot.push("mutated".to_string());

        // The stored value is untouched by mutations of the snapshot
        assert_eq!(cache.get("dragon"), Some(vec!["a".to_string()]));
    }
}
