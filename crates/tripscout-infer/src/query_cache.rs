//! LRU cache for query embeddings.
//!
//! Repeated searches for the same text skip model inference entirely.
//! Default: 500 entries, 1-hour TTL.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

struct Entry {
    vector: Array1<f32>,
    inserted_at: Instant,
}

/// Thread-safe LRU + TTL cache keyed by query text.
pub struct QueryCache {
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                capacity,
                ttl,
            }),
        }
    }

    /// Default settings: 500 entries, 1-hour TTL.
    pub fn default_cache() -> Self {
        Self::new(500, Duration::from_secs(3600))
    }

    /// Look up a query embedding. Expired entries count as misses and are
    /// dropped on the way out.
    pub fn get(&self, query: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();

        let fresh = match inner.entries.get(query) {
            Some(e) => e.inserted_at.elapsed() < inner.ttl,
            None => return None,
        };

        if !fresh {
            inner.entries.remove(query);
            inner.order.retain(|k| k != query);
            return None;
        }

        // Touch: move to the back of the eviction order.
        if let Some(pos) = inner.order.iter().position(|k| k == query) {
            let key = inner.order.remove(pos).unwrap();
            inner.order.push_back(key);
        }
        inner.entries.get(query).map(|e| e.vector.clone())
    }

    pub fn put(&self, query: String, vector: Array1<f32>) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&query) {
            inner.order.retain(|k| k != &query);
        } else {
            while inner.entries.len() >= inner.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        inner.order.push_back(query.clone());
        inner.entries.insert(
            query,
            Entry {
                vector,
                inserted_at: Instant::now(),
            },
        );
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
        inner.order.clear();
    }
}
