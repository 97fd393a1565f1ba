use crate::core::models::conformation::{Conformation, ConformationError};
use crate::core::models::ids::{Position, RotamerClass};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

/// Identifies a unit's local assignment independent of the rest of the conformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    positions: Vec<Position>,
    rcs: Vec<RotamerClass>,
}

impl CacheKey {
    /// Key of `conformation` restricted to `positions`; positions are sorted first.
    pub fn for_positions(
        conformation: &Conformation,
        positions: &[Position],
    ) -> Result<Self, ConformationError> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        let rcs = conformation.rcs_for(&positions)?;
        Ok(Self { positions, rcs })
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn rcs(&self) -> &[RotamerClass] {
        &self.rcs
    }
}

/// Minimized local DOF sub-vector of one unit, in the unit's position order.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub local_dofs: Vec<f64>,
    /// Full-objective energy reported when the unit was minimized, with every DOF outside the
    /// unit frozen at that call's starting values. Not a unit-local energy. `None` for entries
    /// stored without a minimization of their own (partial-fix L-sets).
    pub energy: Option<f64>,
}

pub type SharedEntry = Arc<CachedEntry>;

struct LruInner<K, V> {
    entries: HashMap<K, (V, u64)>,
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> LruInner<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Capacity-bounded map with synchronous least-recently-used eviction.
///
/// Reads and writes are serialized by one mutex. Concurrent inserts of the same key are
/// last-write-wins.
pub struct LruStore<K, V> {
    inner: Mutex<LruInner<K, V>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> LruStore<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let (value, old_tick) = {
            let (value, stamp) = inner.entries.get_mut(key)?;
            let old = *stamp;
            *stamp = tick;
            (value.clone(), old)
        };
        inner.recency.remove(&old_tick);
        inner.recency.insert(tick, key.clone());
        Some(value)
    }

    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().entries.get(key).map(|(value, _)| value.clone())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Inserts or overwrites `key`, returning the number of entries evicted to make room.
    pub fn insert(&self, key: K, value: V) -> usize {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        if let Some((_, old_tick)) = inner.entries.insert(key.clone(), (value, tick)) {
            inner.recency.remove(&old_tick);
        }
        inner.recency.insert(tick, key);

        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            let Some((_, oldest)) = inner.recency.pop_first() else {
                break;
            };
            inner.entries.remove(&oldest);
            evicted += 1;
        }
        if evicted > 0 {
            trace!(evicted, "Evicted least-recently-used cache entries.");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }
}

pub type EntryStore = LruStore<CacheKey, SharedEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_sorts_positions_and_reads_rcs() {
        let conf = Conformation::full([2, 5, 1, 3, 0]);
        let key = CacheKey::for_positions(&conf, &[1, 0]).unwrap();
        assert_eq!(key.positions(), &[0, 1]);
        assert_eq!(key.rcs(), &[2, 5]);
    }

    #[test]
    fn keys_ignore_positions_outside_the_unit() {
        let a = Conformation::full([2, 5, 1, 3, 0]);
        let b = Conformation::full([2, 5, 1, 7, 9]);
        assert_eq!(
            CacheKey::for_positions(&a, &[0, 1]).unwrap(),
            CacheKey::for_positions(&b, &[0, 1]).unwrap()
        );
        assert_ne!(
            CacheKey::for_positions(&a, &[2, 3, 4]).unwrap(),
            CacheKey::for_positions(&b, &[2, 3, 4]).unwrap()
        );
    }

    #[test]
    fn key_for_absent_position_fails() {
        let conf = Conformation::full([2, 5]);
        assert!(matches!(
            CacheKey::for_positions(&conf, &[1, 2]),
            Err(ConformationError::MissingPosition { position: 2, .. })
        ));
    }

    #[test]
    fn store_evicts_least_recently_used() {
        let store = LruStore::new(2);
        assert_eq!(store.insert("a", 1), 0);
        assert_eq!(store.insert("b", 2), 0);
        assert_eq!(store.get(&"a"), Some(1));
        assert_eq!(store.insert("c", 3), 1);

        assert!(store.contains(&"a"));
        assert!(!store.contains(&"b"));
        assert!(store.contains(&"c"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn peek_does_not_refresh_recency() {
        let store = LruStore::new(2);
        store.insert("a", 1);
        store.insert("b", 2);
        assert_eq!(store.peek(&"a"), Some(1));
        store.insert("c", 3);
        assert!(!store.contains(&"a"));
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let store = LruStore::new(2);
        store.insert("a", 1);
        store.insert("a", 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek(&"a"), Some(2));
        store.insert("b", 3);
        store.insert("c", 4);
        assert!(!store.contains(&"a"));
    }

    #[test]
    fn clear_empties_store() {
        let store = LruStore::new(4);
        store.insert(1, "x");
        store.insert(2, "y");
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get(&1), None);
    }

    #[test]
    fn concurrent_inserts_respect_capacity() {
        let store = LruStore::new(8);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..50 {
                        store.insert(t * 100 + i, i);
                        let _ = store.get(&(t * 100 + i / 2));
                    }
                });
            }
        });
        assert_eq!(store.len(), 8);
    }
}
