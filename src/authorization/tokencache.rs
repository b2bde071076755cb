//! Forward and reverse lookup between bearer tokens and their owners.
//!
//! One owner may hold many tokens. The forward index (`owner -> [tokens]`) is
//! written before the reverse index (`token -> owner`) and removed after it,
//! so a reverse entry whose owner no longer lists the token is dangling and is
//! treated as absent. The forward list is only changed through
//! [`Cache::update`], so concurrent writers for one owner never drop tokens.

use crate::store::{Cache, CacheError, Lookup};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub type TokenCacheError = CacheError;

#[derive(Clone)]
pub struct TokenCache {
    owner_tokens: Arc<dyn Cache<Vec<String>>>,
    token_owners: Arc<dyn Cache<String>>,
}

impl TokenCache {
    #[must_use]
    pub fn new(
        owner_tokens: Arc<dyn Cache<Vec<String>>>,
        token_owners: Arc<dyn Cache<String>>,
    ) -> Self {
        Self {
            owner_tokens,
            token_owners,
        }
    }

    /// Record `token` for `id` without expiry.
    ///
    /// # Errors
    /// Returns an error if either index cannot be written.
    pub fn put(&self, id: &str, token: &str) -> Result<(), TokenCacheError> {
        self.add_token(id, token)?;
        self.token_owners.put(token, id.to_string())
    }

    /// Record `token` for `id` until `expires_at`.
    ///
    /// # Errors
    /// Returns an error if either index cannot be written.
    pub fn put_until(
        &self,
        expires_at: DateTime<Utc>,
        id: &str,
        token: &str,
    ) -> Result<(), TokenCacheError> {
        self.add_token(id, token)?;
        self.token_owners.put_until(expires_at, token, id.to_string())
    }

    /// Resolve a token to its owner.
    ///
    /// # Errors
    /// `NotFound` for unknown or dangling tokens, `Expired` the first time an
    /// expired token is read, backend errors otherwise.
    pub fn get(&self, token: &str) -> Result<String, TokenCacheError> {
        match self.token_owners.lookup(token)? {
            Lookup::Live(id) => {
                if self.tokens(&id)?.iter().any(|t| t == token) {
                    Ok(id)
                } else {
                    debug!("evicting dangling token for {id}");
                    ignore_missing(self.token_owners.delete(token))?;
                    Err(CacheError::NotFound)
                }
            }
            Lookup::Expired(id) => {
                self.remove_token(&id, token)?;
                Err(CacheError::Expired)
            }
        }
    }

    /// Remove a token from both indices. Absent tokens are not an error.
    ///
    /// # Errors
    /// Returns an error on backend faults.
    pub fn delete(&self, token: &str) -> Result<(), TokenCacheError> {
        let id = match self.token_owners.lookup(token) {
            Ok(Lookup::Live(id) | Lookup::Expired(id)) => id,
            Err(err) if err.is_miss() => return Ok(()),
            Err(err) => return Err(err),
        };
        ignore_missing(self.token_owners.delete(token))?;
        self.remove_token(&id, token)
    }

    /// Tokens currently listed for `id`.
    ///
    /// # Errors
    /// Returns an error on backend faults.
    pub fn tokens(&self, id: &str) -> Result<Vec<String>, TokenCacheError> {
        match self.owner_tokens.get(id) {
            Ok(tokens) => Ok(tokens),
            Err(err) if err.is_miss() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn add_token(&self, id: &str, token: &str) -> Result<(), TokenCacheError> {
        self.owner_tokens.update(id, &|tokens| {
            let mut tokens = tokens.unwrap_or_default();
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
            Some(tokens)
        })
    }

    fn remove_token(&self, id: &str, token: &str) -> Result<(), TokenCacheError> {
        self.owner_tokens.update(id, &|tokens| {
            let mut tokens = tokens?;
            tokens.retain(|t| t != token);
            (!tokens.is_empty()).then_some(tokens)
        })
    }
}

fn ignore_missing(result: Result<(), CacheError>) -> Result<(), CacheError> {
    match result {
        Err(CacheError::NotFound) => Ok(()),
        other => other,
    }
}
