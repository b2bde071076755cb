use super::{CookieCodec, RequestChecker};
use crate::user::UserRegistry;
use axum::http::HeaderMap;
use tracing::debug;

/// Authenticates requests carrying a valid session cookie for an active user.
#[derive(Clone)]
pub struct CookieChecker {
    codec: CookieCodec,
    users: UserRegistry,
}

impl CookieChecker {
    #[must_use]
    pub fn new(codec: CookieCodec, users: UserRegistry) -> Self {
        Self { codec, users }
    }
}

impl RequestChecker for CookieChecker {
    fn is_authenticated(&self, headers: &HeaderMap) -> Option<String> {
        let value = self.codec.extract(headers)?;
        let username = match self.codec.decode(&value) {
            Ok(username) => username,
            Err(err) => {
                debug!("session cookie rejected: {err}");
                return None;
            }
        };
        let user = self.users.active_user(&username)?;
        debug!("session cookie accepted for {}", user.username);
        Some(user.username)
    }
}
