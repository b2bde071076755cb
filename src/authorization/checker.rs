//! Bearer token request checker.

use super::TokenCache;
use crate::{authentication::RequestChecker, user::UserRegistry};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::debug;

/// Resolves `Authorization: Bearer <token>` to an active username.
#[derive(Clone)]
pub struct TokenRequestChecker {
    tokens: TokenCache,
    users: UserRegistry,
}

impl TokenRequestChecker {
    #[must_use]
    pub fn new(tokens: TokenCache, users: UserRegistry) -> Self {
        Self { tokens, users }
    }
}

impl RequestChecker for TokenRequestChecker {
    fn is_authenticated(&self, headers: &HeaderMap) -> Option<String> {
        let token = extract_bearer_token(headers)?;
        let username = match self.tokens.get(&token) {
            Ok(username) => username,
            Err(err) => {
                debug!("bearer token rejected: {err}");
                return None;
            }
        };
        let user = self.users.active_user(&username)?;
        debug!("bearer token accepted for {}", user.username);
        Some(user.username)
    }
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
