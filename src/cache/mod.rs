//! Bounded TTL cache for classification verdicts.
//!
//! Keyed by content fingerprint. Entries expire lazily on read after a
//! fixed TTL; when the cache is at capacity, the single oldest-inserted
//! entry is evicted on write. Eviction is FIFO by insertion order, not LRU:
//! a deliberately simple policy that keeps `put` O(1) and independent of
//! access recency.
//!
//! All state sits behind one `Mutex`. Accesses are short map operations, so
//! a single lock is cheaper and simpler than per-entry locking; no caller
//! holds the lock across an await point.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Verdict;

/// Cache sizing and lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Entry time-to-live in seconds.
    pub ttl_seconds: u64,
    /// Maximum number of entries.
    pub max_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600, // 1 hour
            max_size: 100,
        }
    }
}

/// Snapshot of cache state and lookup accounting.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub count: usize,
    pub capacity: usize,
    /// Sum of per-entry hit counts over the live entries. Every entry
    /// starts at 1 on insert, so this counts inserts plus served hits and
    /// drops with eviction/expiry.
    pub total_hits: u64,
    /// Lookup hits served since creation (or the last `clear`).
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Age of the oldest live entry.
    pub oldest: Option<Duration>,
    /// Age of the newest live entry.
    pub newest: Option<Duration>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: Verdict,
    created_at: Instant,
    hit_count: u64,
}

impl CacheEntry {
    fn new(verdict: Verdict, now: Instant) -> Self {
        Self {
            verdict,
            created_at: now,
            hit_count: 1,
        }
    }

    // A read at exactly created_at + ttl is already a miss.
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.created_at) >= ttl
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order, front = oldest. Drives FIFO eviction.
    insertion_order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

/// Fingerprint-keyed verdict store with lazy TTL expiry and FIFO eviction.
///
/// Owns its entries exclusively; callers only ever receive copies.
#[derive(Debug)]
pub struct VerdictCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl VerdictCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            ttl: Duration::from_secs(settings.ttl_seconds),
            capacity: settings.max_size.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&CacheSettings::default())
    }

    /// Look up a verdict. An entry past its TTL is removed and counted as a
    /// miss. A hit increments the entry's hit count before the copy is
    /// returned.
    pub fn get(&self, fingerprint: &str) -> Option<Verdict> {
        self.get_at(fingerprint, Instant::now())
    }

    /// Store a validated verdict. Evicts the oldest-inserted entry first
    /// when at capacity.
    pub fn put(&self, fingerprint: &str, verdict: Verdict) {
        self.put_at(fingerprint, verdict, Instant::now());
    }

    pub(crate) fn get_at(&self, fingerprint: &str, now: Instant) -> Option<Verdict> {
        let mut guard = self.inner.lock().expect("verdict cache lock poisoned");
        let inner = &mut *guard;

        let expired = match inner.entries.get(fingerprint) {
            Some(entry) => entry.is_expired(self.ttl, now),
            None => {
                inner.misses += 1;
                debug!(fingerprint, "cache miss");
                return None;
            }
        };

        if expired {
            inner.entries.remove(fingerprint);
            if let Some(pos) = inner.insertion_order.iter().position(|k| k == fingerprint) {
                inner.insertion_order.remove(pos);
            }
            inner.misses += 1;
            debug!(fingerprint, "cache entry expired");
            return None;
        }

        inner.hits += 1;
        let entry = inner
            .entries
            .get_mut(fingerprint)
            .expect("entry checked above");
        entry.hit_count += 1;
        debug!(fingerprint, hit_count = entry.hit_count, "cache hit");
        Some(entry.verdict.clone())
    }

    pub(crate) fn put_at(&self, fingerprint: &str, verdict: Verdict, now: Instant) {
        let mut inner = self.inner.lock().expect("verdict cache lock poisoned");

        if inner.entries.contains_key(fingerprint) {
            // Refresh in place; insertion position is kept.
            inner
                .entries
                .insert(fingerprint.to_string(), CacheEntry::new(verdict, now));
            return;
        }

        if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.insertion_order.pop_front() {
                inner.entries.remove(&oldest);
                debug!(evicted = %oldest, "cache at capacity, evicted oldest entry");
            }
        }

        inner
            .entries
            .insert(fingerprint.to_string(), CacheEntry::new(verdict, now));
        inner.insertion_order.push_back(fingerprint.to_string());
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("verdict cache lock poisoned");
        let now = Instant::now();
        let lookups = inner.hits + inner.misses;
        let ages: Vec<Duration> = inner
            .entries
            .values()
            .map(|e| now.duration_since(e.created_at))
            .collect();
        CacheStats {
            count: inner.entries.len(),
            capacity: self.capacity,
            total_hits: inner.entries.values().map(|e| e.hit_count).sum(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups > 0 {
                inner.hits as f64 / lookups as f64
            } else {
                0.0
            },
            oldest: ages.iter().max().copied(),
            newest: ages.iter().min().copied(),
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("verdict cache lock poisoned");
        inner.entries.clear();
        inner.insertion_order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }
}
