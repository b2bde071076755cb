//! TTL-aware key/value caches.
//!
//! Every logical store in the gateway (pending authorizations, token indices,
//! clients, users) is a [`Cache`] of one concrete value type. Backends are
//! interchangeable: [`MemoryCache`] for single-process deployments and tests,
//! [`TreeCache`] for a durable `sled` tree shared by all stores of a process.
//!
//! Expiry is an absolute timestamp. Reading an expired entry evicts it and
//! reports [`CacheError::Expired`] once; later reads report
//! [`CacheError::NotFound`].

mod disk;
mod memory;

pub use disk::{open_db, TreeCache};
pub use memory::MemoryCache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source of "now" for expiry checks.
pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("not found")]
    NotFound,
    #[error("expired")]
    Expired,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// True for the two "no usable value" outcomes callers branch on.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound | Self::Expired)
    }
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result of a raw lookup. An expired value has already been evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Live(V),
    Expired(V),
}

pub trait Cache<V>: Send + Sync {
    /// Store `value` without expiry.
    ///
    /// # Errors
    /// Returns an error if the backend fails to persist the entry.
    fn put(&self, key: &str, value: V) -> Result<(), CacheError>;

    /// Store `value` until `expires_at`.
    ///
    /// # Errors
    /// Returns an error if the backend fails to persist the entry.
    fn put_until(&self, expires_at: DateTime<Utc>, key: &str, value: V) -> Result<(), CacheError>;

    /// Fetch an entry, evicting it when expired.
    ///
    /// # Errors
    /// `NotFound` when the key does not exist, backend errors otherwise.
    fn lookup(&self, key: &str) -> Result<Lookup<V>, CacheError>;

    /// Remove an entry. `NotFound` when nothing was removed, so a caller racing
    /// another delete can tell which one won.
    ///
    /// # Errors
    /// `NotFound` when the key does not exist, backend errors otherwise.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically replace the live value under `key` with `f(current)`.
    /// `None` from `f` removes the entry. Updated entries carry no expiry and
    /// `f` may run more than once under contention.
    ///
    /// # Errors
    /// Returns an error if the backend cannot read or write the entry.
    fn update(&self, key: &str, f: &dyn Fn(Option<V>) -> Option<V>) -> Result<(), CacheError>;

    /// All stored keys in ascending order, expired ones included.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be iterated.
    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Fetch a live value.
    ///
    /// # Errors
    /// `NotFound`, `Expired`, or a backend error.
    fn get(&self, key: &str) -> Result<V, CacheError> {
        match self.lookup(key)? {
            Lookup::Live(value) => Ok(value),
            Lookup::Expired(_) => Err(CacheError::Expired),
        }
    }
}

/// Stored form of a cache value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry<V> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) value: V,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { expires_at, value }
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    pub(crate) fn into_lookup(self, now: DateTime<Utc>) -> (bool, Lookup<V>) {
        if self.is_expired(now) {
            (true, Lookup::Expired(self.value))
        } else {
            (false, Lookup::Live(self.value))
        }
    }
}
