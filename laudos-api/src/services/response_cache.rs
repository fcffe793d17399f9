//! Cache for generated text
//!
//! The report service receives a [`ResponseCache`] at construction. The
//! in-memory implementation evicts expired entries lazily on lookup and
//! insert.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Key/value store with per-entry TTL
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn insert(&self, key: String, value: String, ttl: Duration);
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        match self.entries.lock() {
            Ok(entries) => entries.values().filter(|e| e.expires_at > now).count(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        // A poisoned lock only means a panic elsewhere; treat as a miss
        let mut entries = self.entries.lock().ok()?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: String, value: String, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

/// Cache that stores nothing
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn insert(&self, _key: String, _value: String, _ttl: Duration) {}
}
