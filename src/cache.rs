//! Bounded memoization cache with time-based expiry.
//!
//! Entries expire `ttl` after insertion. When the cache is full, expired entries
//! are purged first and then the least recently used entry is evicted.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    // None when `now + ttl` is not representable; such entries never expire.
    expires_at: Option<Instant>,
    last_used: u64,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    // Logical clock for access order; wall time can repeat under a paused clock.
    tick: u64,
}

impl<K, V> CacheState<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

pub struct TtlCache<K, V> {
    state: Mutex<CacheState<K, V>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tick: 0,
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a live entry and marks it as most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let tick = state.next_tick();

        let expired = match state.entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.last_used = tick;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut state = self.state.lock();
        let tick = state.next_tick();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            state.entries.retain(|_, entry| entry.is_live(now));

            if state.entries.len() >= self.capacity {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    state.entries.remove(&oldest);
                }
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.checked_add(self.ttl),
                last_used: tick,
            },
        );
    }

    /// Number of stored entries, including ones that expired but were not yet purged.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }
}
