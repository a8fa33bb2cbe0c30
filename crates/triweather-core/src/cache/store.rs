//! In-memory TTL cache store.
//!
//! Entries expire lazily on read, and a background sweep task periodically
//! removes expired entries that nothing reads, so memory stays bounded between
//! accesses. Pattern invalidation compiles the caller's pattern as a regex;
//! a malformed pattern is a recoverable `WeatherError::Cache`, never a panic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::error::{Result, WeatherError};

/// Configuration for the cache store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: SyncConfig::CACHE_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Set a custom sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// One cached value with its expiry bookkeeping.
///
/// Replaced wholesale on re-`set`, never mutated in place.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// Key/value store with per-entry TTL and regex-pattern invalidation.
pub struct CacheStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    sweep_interval: Duration,
    sweep_cancel: CancellationToken,
}

impl CacheStore {
    /// Create a new store. Call [`CacheStore::start_sweep`] to begin the
    /// background expiry sweep.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            sweep_interval: config.sweep_interval,
            sweep_cancel: CancellationToken::new(),
        }
    }

    /// Store a value under `key` with the given TTL, replacing any existing
    /// entry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.lock().unwrap().insert(key.into(), entry);
    }

    /// Get the value for `key`, or `None` if absent or expired.
    ///
    /// An expired entry is purged on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Delete every key matching `pattern` (a regular expression).
    ///
    /// Returns the number of entries removed. A malformed pattern yields a
    /// recoverable [`WeatherError::Cache`] and leaves the store unmodified.
    pub fn invalidate(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)
            .map_err(|e| WeatherError::cache("invalidate", format!("invalid pattern: {}", e)))?;

        let mut entries = self.entries.lock().unwrap();
        let matched: Vec<String> = entries
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();

        for key in &matched {
            entries.remove(key);
        }

        if !matched.is_empty() {
            debug!("Invalidated {} cache entries matching {}", matched.len(), pattern);
        }

        Ok(matched.len())
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of entries currently held (including not-yet-swept expired ones).
    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Remove every expired entry. Returns the number removed.
    fn sweep(entries: &Mutex<HashMap<String, CacheEntry>>) -> usize {
        let now = Instant::now();
        let mut entries = entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Start the background expiry sweep.
    ///
    /// The spawned task holds only the entry map, not the store, so dropping
    /// the store stops the sweep even if `shutdown` was never called.
    pub fn start_sweep(&self) {
        let entries = Arc::clone(&self.entries);
        let cancel = self.sweep_cancel.clone();
        let interval = self.sweep_interval;

        tokio::spawn(async move {
            debug!("Cache expiry sweep started (every {:?})", interval);
            loop {
                tokio::time::sleep(interval).await;
                if cancel.is_cancelled() {
                    break;
                }
                let removed = Self::sweep(&entries);
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
            debug!("Cache expiry sweep stopped");
        });
    }

    /// Stop the background sweep task.
    pub fn shutdown(&self) {
        self.sweep_cancel.cancel();
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        self.sweep_cancel.cancel();
    }
}
