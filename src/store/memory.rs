use super::{Cache, CacheError, Clock, Entry, Lookup};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-process cache guarded by a single mutex.
pub struct MemoryCache<V> {
    now: Clock,
    data: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    #[must_use]
    pub fn with_clock(now: Clock) -> Self {
        Self {
            now,
            data: Mutex::new(HashMap::new()),
        }
    }

    fn data(&self) -> Result<MutexGuard<'_, HashMap<String, Entry<V>>>, CacheError> {
        self.data
            .lock()
            .map_err(|_| CacheError::Internal("memory cache lock poisoned".to_string()))
    }
}

impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn put(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.data()?.insert(key.to_string(), Entry::new(value, None));
        Ok(())
    }

    fn put_until(&self, expires_at: DateTime<Utc>, key: &str, value: V) -> Result<(), CacheError> {
        self.data()?
            .insert(key.to_string(), Entry::new(value, Some(expires_at)));
        Ok(())
    }

    fn lookup(&self, key: &str) -> Result<Lookup<V>, CacheError> {
        let mut data = self.data()?;
        let entry = data.get(key).cloned().ok_or(CacheError::NotFound)?;
        let (evict, lookup) = entry.into_lookup((self.now)());
        if evict {
            data.remove(key);
        }
        Ok(lookup)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.data()?
            .remove(key)
            .map(|_| ())
            .ok_or(CacheError::NotFound)
    }

    fn update(&self, key: &str, f: &dyn Fn(Option<V>) -> Option<V>) -> Result<(), CacheError> {
        let now = (self.now)();
        let mut data = self.data()?;
        let current = data
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone());
        match f(current) {
            Some(value) => {
                data.insert(key.to_string(), Entry::new(value, None));
            }
            None => {
                data.remove(key);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self.data()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
