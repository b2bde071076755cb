use super::{Cache, CacheError, Clock, Entry, Lookup};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::{marker::PhantomData, path::Path};
use tracing::debug;

/// Open (or create) the embedded database holding every durable tree.
///
/// # Errors
/// Returns an error if the database cannot be opened.
pub fn open_db(path: &Path) -> Result<sled::Db, CacheError> {
    debug!("opening cache database at {}", path.display());
    Ok(sled::open(path)?)
}

/// Cache backed by one named `sled` tree. Values are stored as JSON entries.
pub struct TreeCache<V> {
    tree: sled::Tree,
    now: Clock,
    _value: PhantomData<fn() -> V>,
}

impl<V> TreeCache<V> {
    /// Open the tree `name` inside `db`.
    ///
    /// # Errors
    /// Returns an error if the tree cannot be opened.
    pub fn open(db: &sled::Db, name: &str) -> Result<Self, CacheError> {
        Ok(Self {
            tree: db.open_tree(name)?,
            now: Utc::now,
            _value: PhantomData,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, now: Clock) -> Self {
        self.now = now;
        self
    }
}

impl<V> TreeCache<V>
where
    V: Serialize,
{
    fn write(&self, key: &str, entry: &Entry<V>) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(entry)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }
}

impl<V> Cache<V> for TreeCache<V>
where
    V: Serialize + DeserializeOwned,
{
    fn put(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.write(key, &Entry::new(value, None))
    }

    fn put_until(&self, expires_at: DateTime<Utc>, key: &str, value: V) -> Result<(), CacheError> {
        self.write(key, &Entry::new(value, Some(expires_at)))
    }

    fn lookup(&self, key: &str) -> Result<Lookup<V>, CacheError> {
        let bytes = self.tree.get(key.as_bytes())?.ok_or(CacheError::NotFound)?;
        let entry: Entry<V> = serde_json::from_slice(&bytes)?;
        let (evict, lookup) = entry.into_lookup((self.now)());
        if evict {
            self.tree.remove(key.as_bytes())?;
        }
        Ok(lookup)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self.tree.remove(key.as_bytes())? {
            Some(_) => {
                self.tree.flush()?;
                Ok(())
            }
            None => Err(CacheError::NotFound),
        }
    }

    fn update(&self, key: &str, f: &dyn Fn(Option<V>) -> Option<V>) -> Result<(), CacheError> {
        loop {
            let current = self.tree.get(key.as_bytes())?;
            let value = match &current {
                Some(bytes) => {
                    let entry: Entry<V> = serde_json::from_slice(bytes)?;
                    (!entry.is_expired((self.now)())).then_some(entry.value)
                }
                None => None,
            };
            let next = match f(value) {
                Some(value) => Some(serde_json::to_vec(&Entry::new(value, None))?),
                None => None,
            };
            if self
                .tree
                .compare_and_swap(key.as_bytes(), current, next)?
                .is_ok()
            {
                self.tree.flush()?;
                return Ok(());
            }
            debug!("retrying contended update of {key}");
        }
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.tree
            .iter()
            .keys()
            .map(|key| {
                let key = key?;
                String::from_utf8(key.to_vec())
                    .map_err(|err| CacheError::Internal(format!("non utf-8 key: {err}")))
            })
            .collect()
    }
}
