use indexmap::IndexSet;
use std::hash::Hash;

/// Default capacity for a bounded insertion-order cache. The relay's
/// processed-id cache and the validator's signed-attestation-id cache are
/// both a bounded set of 10,000 ids, evicting 10% oldest on overflow.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Fraction of the cache evicted, oldest-first, once it overflows.
pub const EVICTION_FRACTION: f64 = 0.10;

/// A bounded, insertion-order LRU-ish set.
///
/// Used identically by the relay (already-submitted on-chain ids) and the
/// validator (already-signed attestation ids): membership is checked before
/// doing expensive work, and a successful completion inserts. Eviction is by
/// insertion order, not access order — a plain LRU would need cache reads to
/// mutate order, which would turn a read-only membership check into a
/// write, complicating concurrent access for no behavioral benefit here.
#[derive(Debug, Clone)]
pub struct ProcessedIdCache<T: Hash + Eq> {
    capacity: usize,
    eviction_fraction: f64,
    entries: IndexSet<T>,
}

impl<T: Hash + Eq + Clone> ProcessedIdCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_eviction_fraction(capacity, EVICTION_FRACTION)
    }

    pub fn with_eviction_fraction(capacity: usize, eviction_fraction: f64) -> Self {
        Self {
            capacity,
            eviction_fraction,
            entries: IndexSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, id: &T) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `id`, evicting the oldest entries first if this insertion
    /// would exceed capacity. Returns `true` if `id` was newly inserted.
    pub fn insert(&mut self, id: T) -> bool {
        if self.entries.contains(&id) {
            return false;
        }
        if self.entries.len() >= self.capacity {
            let evict_count = ((self.capacity as f64) * self.eviction_fraction).ceil() as usize;
            let evict_count = evict_count.max(1).min(self.entries.len());
            for _ in 0..evict_count {
                self.entries.shift_remove_index(0);
            }
        }
        self.entries.insert(id)
    }

    /// Removes `id` if present, for the validator's "un-sign on retryable
    /// failure" path.
    pub fn remove(&mut self, id: &T) -> bool {
        self.entries.shift_remove(id)
    }
}

impl<T: Hash + Eq + Clone> Default for ProcessedIdCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_ten_percent_on_overflow() {
        let mut cache: ProcessedIdCache<u32> = ProcessedIdCache::new(10);
        for i in 0..10 {
            cache.insert(i);
        }
        assert_eq!(cache.len(), 10);
        cache.insert(10);
        // one eviction (10% of 10 = 1) then insert brings us back to 10
        assert_eq!(cache.len(), 10);
        assert!(!cache.contains(&0));
        assert!(cache.contains(&1));
        assert!(cache.contains(&10));
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut cache: ProcessedIdCache<&str> = ProcessedIdCache::new(5);
        assert!(cache.insert("a"));
        assert!(!cache.insert("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_allows_retry() {
        let mut cache: ProcessedIdCache<&str> = ProcessedIdCache::new(5);
        cache.insert("a");
        assert!(cache.remove(&"a"));
        assert!(!cache.contains(&"a"));
    }
}
