//! Registered OAuth client applications.

use crate::store::{Cache, CacheError};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    io::{Read, Write},
    sync::Arc,
};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid registry json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A client application allowed to run the authorization-code flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    /// User friendly name shown on the approval page.
    #[serde(default)]
    pub name: String,
    /// Approved callback URLs, matched exactly.
    #[serde(default)]
    pub endpoints: BTreeSet<String>,
    /// When set, the token endpoint requires a matching `client_secret`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Client {
    #[must_use]
    pub fn new(id: &str, name: &str, endpoints: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            endpoints: endpoints.iter().map(ToString::to_string).collect(),
            secret: None,
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    /// Name for the approval page, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Redirects must match a registered endpoint exactly.
    #[must_use]
    pub fn accepts_redirect(&self, redirect: &str) -> bool {
        self.endpoints.contains(redirect)
    }

    /// Clients without a secret accept any presented secret.
    #[must_use]
    pub fn secret_matches(&self, presented: &str) -> bool {
        match &self.secret {
            Some(secret) => bool::from(secret.as_bytes().ct_eq(presented.as_bytes())),
            None => true,
        }
    }
}

#[derive(Clone)]
pub struct ClientRegistry {
    cache: Arc<dyn Cache<Client>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(cache: Arc<dyn Cache<Client>>) -> Self {
        Self { cache }
    }

    /// Look up a client by id. Returns a copy; unknown or expired ids are `None`.
    ///
    /// # Errors
    /// Returns an error on storage faults.
    pub fn find(&self, id: &str) -> Result<Option<Client>, CacheError> {
        match self.cache.get(id) {
            Ok(client) => Ok(Some(client)),
            Err(err) if err.is_miss() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    /// Returns an error if the client cannot be stored.
    pub fn put(&self, client: Client) -> Result<(), CacheError> {
        let id = client.id.clone();
        self.cache.put(&id, client)
    }

    /// # Errors
    /// `NotFound` when the client does not exist.
    pub fn delete(&self, id: &str) -> Result<(), CacheError> {
        self.cache.delete(id)
    }

    /// Load clients from a JSON array or a single JSON object.
    ///
    /// # Errors
    /// Returns an error on read, decode or storage failures.
    pub fn load_from_json<R: Read>(&self, mut reader: R) -> Result<usize, RegistryError> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        let clients = match serde_json::from_str::<Vec<Client>>(&input) {
            Ok(clients) => clients,
            Err(_) => vec![serde_json::from_str::<Client>(&input)?],
        };
        let count = clients.len();
        for client in clients {
            self.put(client)?;
        }
        Ok(count)
    }

    /// Write every live client as a pretty-printed JSON array.
    ///
    /// # Errors
    /// Returns an error on storage or write failures.
    pub fn save_to_json<W: Write>(&self, writer: W) -> Result<(), RegistryError> {
        let mut clients = Vec::new();
        for id in self.cache.keys()? {
            if let Some(client) = self.find(&id)? {
                clients.push(client);
            }
        }
        serde_json::to_writer_pretty(writer, &clients)?;
        Ok(())
    }
}
