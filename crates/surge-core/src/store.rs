//! The shared atomic state store behind the admission protocol.
//!
//! The [`AtomicStateStore`] trait abstracts the key-addressable store the
//! admission ledger and the reconciliation sweep share. It exposes only the
//! primitive operations the protocol actually uses; any concrete store
//! satisfying per-operation atomicity is substitutable.
//!
//! ## Design Principles
//!
//! - **Primitive atomicity**: Each operation is individually linearizable.
//!   The admission protocol composes them with compensating rollbacks and
//!   never relies on cross-operation transactions.
//! - **No client-side compare-then-act**: Callers must not emulate an atomic
//!   primitive with a read followed by a write; [`AtomicStateStore::set_bit`]
//!   is a true test-and-set for this reason.
//! - **Testability**: [`MemoryStateStore`] provides a TTL-aware in-process
//!   implementation for tests and local development.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// The shared key-addressable store with atomic primitives.
///
/// ## Atomicity Contract
///
/// Every method must be atomic at the store level: concurrent invocations
/// behave as if executed in some serial order. In particular:
///
/// - [`increment`](Self::increment) / [`decrement`](Self::decrement) return
///   the post-operation value with no lost updates
/// - [`set_bit`](Self::set_bit) atomically tests and sets, returning the
///   *prior* bit value, so exactly one of any number of concurrent setters
///   observes `false`
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support unbounded concurrent callers.
#[async_trait]
pub trait AtomicStateStore: Send + Sync {
    /// Atomically increments the counter at `key` by one.
    ///
    /// A missing key is treated as zero, so the first increment returns 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] if the key holds a bitmap.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Atomically decrements the counter at `key` by one.
    ///
    /// A missing key is treated as zero. Used only for compensating
    /// rollbacks, so a negative result indicates a protocol bug upstream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] if the key holds a bitmap.
    async fn decrement(&self, key: &str) -> Result<i64>;

    /// Reads the bit at `offset` in the bitmap at `key`.
    ///
    /// Missing keys and unset offsets both read as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] if the key holds a counter.
    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool>;

    /// Atomically sets the bit at `offset` in the bitmap at `key`,
    /// returning the bit's *prior* value.
    ///
    /// This is the test-and-set primitive: of any number of concurrent
    /// setters for the same `(key, offset)`, exactly one observes `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] if the key holds a counter.
    async fn set_bit(&self, key: &str, offset: u64) -> Result<bool>;

    /// Reads the integer value at `key`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongType`] if the key holds a bitmap.
    async fn get_value(&self, key: &str) -> Result<Option<i64>>;

    /// Writes the integer value at `key`, optionally with an expiry.
    ///
    /// Overwrites any existing value and its TTL.
    async fn set_value(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<()>;

    /// Applies an expiry to an existing key.
    ///
    /// A missing key is a no-op, matching the behavior of stores where the
    /// key may have expired between the write and the expire call.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Lists all live keys starting with `prefix`.
    ///
    /// Returns keys in ascending lexicographic order for deterministic
    /// sweep processing.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deletes the given keys.
    ///
    /// Succeeds even if some keys do not exist (idempotent).
    async fn delete(&self, keys: &[String]) -> Result<()>;
}

/// A stored value: a signed counter or a bitmap.
#[derive(Debug, Clone)]
enum Value {
    Counter(i64),
    Bitmap(HashSet<u64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory state store for testing and local development.
///
/// Thread-safe via `RwLock`; every operation runs under a single guard, so
/// each primitive is linearizable exactly as the trait requires. TTLs are
/// honored lazily: expired entries read as absent and are purged on access.
///
/// ## Limitations
///
/// - **Single-process only**: State is not shared across process boundaries
/// - **Not durable**: All state is lost on drop
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Entry>>,
}

/// Converts a lock poison error to a store error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::store("state store lock poisoned")
}

fn expiry(ttl: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .map(|d| Utc::now() + d)
}

impl MemoryStateStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys, purging expired entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn live_len(&self) -> Result<usize> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        let now = Utc::now();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(entries.len())
    }

    /// Forces a key to expire immediately. Test hook.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn force_expire(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        }
        drop(entries);
        Ok(())
    }

    fn with_counter<F>(&self, key: &str, apply: F) -> Result<i64>
    where
        F: FnOnce(i64) -> i64,
    {
        let mut entries = self.entries.write().map_err(poison_err)?;
        let now = Utc::now();

        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }

        let current = match entries.get(key) {
            Some(Entry {
                value: Value::Counter(n),
                ..
            }) => *n,
            Some(Entry {
                value: Value::Bitmap(_),
                ..
            }) => {
                return Err(Error::wrong_type(key, "expected counter, found bitmap"));
            }
            None => 0,
        };

        let next = apply(current);
        entries
            .entry(key.to_string())
            .and_modify(|e| e.value = Value::Counter(next))
            .or_insert(Entry {
                value: Value::Counter(next),
                expires_at: None,
            });
        drop(entries);
        Ok(next)
    }
}

#[async_trait]
impl AtomicStateStore for MemoryStateStore {
    async fn increment(&self, key: &str) -> Result<i64> {
        self.with_counter(key, |n| n.saturating_add(1))
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.with_counter(key, |n| n.saturating_sub(1))
    }

    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        let entries = self.entries.read().map_err(poison_err)?;
        let now = Utc::now();

        let result = match entries.get(key) {
            None => false,
            Some(entry) if entry.is_expired(now) => false,
            Some(Entry {
                value: Value::Bitmap(bits),
                ..
            }) => bits.contains(&offset),
            Some(Entry {
                value: Value::Counter(_),
                ..
            }) => {
                return Err(Error::wrong_type(key, "expected bitmap, found counter"));
            }
        };
        Ok(result)
    }

    async fn set_bit(&self, key: &str, offset: u64) -> Result<bool> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        let now = Utc::now();

        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Bitmap(HashSet::new()),
            expires_at: None,
        });

        let prior = match &mut entry.value {
            Value::Bitmap(bits) => !bits.insert(offset),
            Value::Counter(_) => {
                return Err(Error::wrong_type(key, "expected bitmap, found counter"));
            }
        };
        drop(entries);
        Ok(prior)
    }

    async fn get_value(&self, key: &str) -> Result<Option<i64>> {
        let entries = self.entries.read().map_err(poison_err)?;
        let now = Utc::now();

        let result = match entries.get(key) {
            None => None,
            Some(entry) if entry.is_expired(now) => None,
            Some(Entry {
                value: Value::Counter(n),
                ..
            }) => Some(*n),
            Some(Entry {
                value: Value::Bitmap(_),
                ..
            }) => {
                return Err(Error::wrong_type(key, "expected counter, found bitmap"));
            }
        };
        Ok(result)
    }

    async fn set_value(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Counter(value),
                expires_at: ttl.and_then(expiry),
            },
        );
        drop(entries);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = expiry(ttl);
        }
        drop(entries);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(poison_err)?;
        let now = Utc::now();

        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        drop(entries);
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut entries = self.entries.write().map_err(poison_err)?;
        for key in keys {
            entries.remove(key);
        }
        drop(entries);
        Ok(())
    }
}
