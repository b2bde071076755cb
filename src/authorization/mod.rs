//! OAuth2 authorization-code grant.
//!
//! Flow Overview:
//! 1. `GET authorize` validates the client and redirect, stores a
//!    [`PendingAuthorization`] under a random correlation id and renders an
//!    approval form.
//! 2. `GET approve` (as a logged in user) removes the correlation entry. On
//!    approval the record is re-stored under a fresh authorization code with
//!    the approver attached, and the browser is sent back to the client.
//! 3. `POST token` exchanges the code, once, for a bearer token stored in the
//!    [`TokenCache`] under the approving username.

pub mod checker;
pub mod handlers;
pub mod tokencache;

pub use checker::TokenRequestChecker;
pub use tokencache::{TokenCache, TokenCacheError};

use crate::{
    authentication::RequestChecker,
    client::ClientRegistry,
    store::{Cache, CacheError},
    user::UserRegistry,
    utils::{generate_token, RandomError},
};
use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64ct::{Base64, Encoding};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use utoipa::ToSchema;

pub const SCOPE_ALL: &str = "all";
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const RESPONSE_TYPE_CODE: &str = "code";
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Lifetime of pending authorizations and unexchanged codes.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;
/// Lifetime of issued bearer tokens.
pub const DEFAULT_GRANT_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing redirect_uri")]
    MissingRedirect,
    #[error("invalid redirect_uri: {0}")]
    InvalidRedirect(#[from] url::ParseError),
    #[error("response_type unsupported")]
    UnsupportedResponseType,
    #[error("invalid client id")]
    InvalidClientId,
    #[error("invalid client redirect")]
    InvalidClientRedirect,
    #[error("invalid correlation")]
    InvalidCorrelation,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid client")]
    InvalidClient,
    #[error("invalid auth")]
    InvalidAuth,
    #[error("unsupported grant type")]
    UnsupportedGrantType,
    #[error("mismatching client ids")]
    MismatchingClientIds,
    #[error("not authorized")]
    NotAuthorized,
    #[error(transparent)]
    Storage(#[from] CacheError),
    #[error(transparent)]
    Random(#[from] RandomError),
}

impl OAuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthorized => StatusCode::UNAUTHORIZED,
            Self::Storage(_) | Self::Random(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

/// JSON error body shared by the API handlers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("OAuth request failed: {self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OAuthOptions {
    token_ttl: Duration,
    grant_ttl: Duration,
}

impl Default for OAuthOptions {
    fn default() -> Self {
        Self {
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            grant_ttl: Duration::seconds(DEFAULT_GRANT_TTL_SECONDS),
        }
    }
}

impl OAuthOptions {
    /// Lifetime of pending authorizations and unexchanged codes.
    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl = Duration::seconds(seconds);
        self
    }

    /// Lifetime of issued bearer tokens.
    #[must_use]
    pub fn with_grant_ttl_seconds(mut self, seconds: i64) -> Self {
        self.grant_ttl = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub fn grant_ttl(&self) -> Duration {
        self.grant_ttl
    }
}

/// An authorization request waiting for approval, or an issued code once
/// `username` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub id: String,
    pub application_name: String,
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub state: String,
}

impl AuthorizeRequest {
    fn validate(&self) -> Result<(), OAuthError> {
        if self.redirect_uri.is_empty() {
            return Err(OAuthError::MissingRedirect);
        }
        Url::parse(&self.redirect_uri)?;
        if self.response_type != RESPONSE_TYPE_CODE {
            return Err(OAuthError::UnsupportedResponseType);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BearerGrant {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, PartialEq, Eq)]
struct ClientCredentials {
    id: String,
    secret: String,
}

/// Client credentials come from the form or from HTTP Basic, never both.
fn decode_client_credentials(
    request: &TokenRequest,
    headers: &HeaderMap,
) -> Result<ClientCredentials, OAuthError> {
    let mut credentials = ClientCredentials {
        id: request.client_id.clone(),
        secret: request.client_secret.clone(),
    };
    let Some(authorization) = headers.get(AUTHORIZATION) else {
        return Ok(credentials);
    };
    if !credentials.id.is_empty() {
        return Err(OAuthError::InvalidClient);
    }
    let value = authorization.to_str().map_err(|_| OAuthError::InvalidAuth)?;
    if let Some(encoded) = value.strip_prefix("Basic ") {
        let decoded = Base64::decode_vec(encoded.trim()).map_err(|_| OAuthError::InvalidAuth)?;
        let decoded = String::from_utf8(decoded).map_err(|_| OAuthError::InvalidAuth)?;
        let (id, secret) = decoded.split_once(':').ok_or(OAuthError::InvalidAuth)?;
        credentials.id = id.to_string();
        credentials.secret = secret.to_string();
    }
    Ok(credentials)
}

/// Append `params` to `redirect_uri`, replacing same-named query keys.
fn redirect_with(redirect_uri: &str, params: &[(&str, &str)]) -> Result<Url, OAuthError> {
    let mut url = Url::parse(redirect_uri)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(name, _)| name == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(params);
    Ok(url)
}

pub struct OAuthHandler {
    options: OAuthOptions,
    pending: Arc<dyn Cache<PendingAuthorization>>,
    tokens: TokenCache,
    clients: ClientRegistry,
    checker: TokenRequestChecker,
}

impl OAuthHandler {
    #[must_use]
    pub fn new(
        options: OAuthOptions,
        pending: Arc<dyn Cache<PendingAuthorization>>,
        tokens: TokenCache,
        clients: ClientRegistry,
        users: UserRegistry,
    ) -> Self {
        let checker = TokenRequestChecker::new(tokens.clone(), users);
        Self {
            options,
            pending,
            tokens,
            clients,
            checker,
        }
    }

    #[must_use]
    pub fn options(&self) -> &OAuthOptions {
        &self.options
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Scopes granted to a request carrying a valid bearer token.
    ///
    /// # Errors
    /// `NotAuthorized` when the request has no usable bearer token.
    pub fn authorized(&self, headers: &HeaderMap) -> Result<Vec<String>, OAuthError> {
        if self.checker.is_authenticated(headers).is_some() {
            Ok(vec![SCOPE_ALL.to_string()])
        } else {
            Err(OAuthError::NotAuthorized)
        }
    }

    /// Validate an authorization request and park it under a correlation id.
    ///
    /// # Errors
    /// Validation failures (403) or storage faults (500). Nothing is stored on
    /// failure.
    pub fn authorize(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<PendingAuthorization, OAuthError> {
        request.validate()?;
        let client = self
            .clients
            .find(&request.client_id)?
            .ok_or(OAuthError::InvalidClientId)?;
        if !client.accepts_redirect(&request.redirect_uri) {
            return Err(OAuthError::InvalidClientRedirect);
        }

        let pending = PendingAuthorization {
            id: generate_token()?,
            application_name: client.display_name().to_string(),
            response_type: request.response_type.clone(),
            client_id: request.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            state: request.state.clone(),
            username: None,
        };
        self.store(&pending)?;
        Ok(pending)
    }

    /// Resolve an approval decision into the client redirect.
    ///
    /// The correlation id is consumed whatever the decision.
    ///
    /// # Errors
    /// `InvalidCorrelation` for unknown, expired or already used ids.
    pub fn approve(
        &self,
        correlation: &str,
        decision: Option<&str>,
        username: &str,
    ) -> Result<Url, OAuthError> {
        let mut pending = self.fetch(correlation)?.ok_or(OAuthError::InvalidCorrelation)?;
        match self.pending.delete(correlation) {
            Ok(()) => {}
            Err(CacheError::NotFound) => return Err(OAuthError::InvalidCorrelation),
            Err(err) => return Err(err.into()),
        }

        if decision != Some("Approve") {
            info!("authorization for {} denied", pending.client_id);
            return redirect_with(&pending.redirect_uri, &[("error", "access_denied")]);
        }
        if pending.response_type != RESPONSE_TYPE_CODE {
            return redirect_with(
                &pending.redirect_uri,
                &[("error", "unsupported_response_type")],
            );
        }

        pending.id = generate_token()?;
        pending.username = Some(username.to_string());
        self.store(&pending)?;
        redirect_with(
            &pending.redirect_uri,
            &[("code", pending.id.as_str()), ("state", pending.state.as_str())],
        )
    }

    /// Exchange an approved code for a bearer token. A code is usable once.
    ///
    /// # Errors
    /// 403 class errors for every rejected exchange, storage faults otherwise.
    pub fn exchange(
        &self,
        request: &TokenRequest,
        headers: &HeaderMap,
    ) -> Result<BearerGrant, OAuthError> {
        let pending = self.fetch(&request.code)?.ok_or(OAuthError::InvalidToken)?;
        let credentials = decode_client_credentials(request, headers)?;

        let client = self
            .clients
            .find(&credentials.id)?
            .ok_or(OAuthError::InvalidClientId)?;
        if !client.secret_matches(&credentials.secret) {
            return Err(OAuthError::InvalidClient);
        }
        if request.grant_type != GRANT_AUTHORIZATION_CODE {
            return Err(OAuthError::UnsupportedGrantType);
        }
        if pending.client_id != credentials.id {
            return Err(OAuthError::MismatchingClientIds);
        }
        let Some(username) = pending.username else {
            warn!("code exchange attempted before approval");
            return Err(OAuthError::InvalidToken);
        };

        match self.pending.delete(&pending.id) {
            Ok(()) => {}
            Err(CacheError::NotFound) => return Err(OAuthError::InvalidToken),
            Err(err) => return Err(err.into()),
        }

        let access_token = generate_token()?;
        self.tokens.put_until(
            Utc::now() + self.options.grant_ttl,
            &username,
            &access_token,
        )?;
        info!("issued bearer token to {username} for client {}", client.id);

        Ok(BearerGrant {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        })
    }

    fn store(&self, pending: &PendingAuthorization) -> Result<(), OAuthError> {
        self.pending.put_until(
            Utc::now() + self.options.token_ttl,
            &pending.id,
            pending.clone(),
        )?;
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<PendingAuthorization>, OAuthError> {
        if id.is_empty() {
            return Ok(None);
        }
        match self.pending.get(id) {
            Ok(pending) => Ok(Some(pending)),
            Err(err) if err.is_miss() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl RequestChecker for OAuthHandler {
    fn is_authenticated(&self, headers: &HeaderMap) -> Option<String> {
        self.checker.is_authenticated(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::Client,
        store::MemoryCache,
        user::{tests::user, UserState},
    };
    use axum::http::HeaderValue;

    const REDIRECT: &str = "https://chat.example.com/cb";

    struct Fixture {
        handler: OAuthHandler,
        pending: Arc<MemoryCache<PendingAuthorization>>,
    }

    fn fixture() -> Fixture {
        let pending = Arc::new(MemoryCache::new());
        let tokens = TokenCache::new(Arc::new(MemoryCache::new()), Arc::new(MemoryCache::new()));
        let clients = ClientRegistry::new(Arc::new(MemoryCache::new()));
        clients
            .put(Client::new("chat", "Chat", &[REDIRECT, "https://chat.example.com/cb?x=1&state=old"]))
            .unwrap();
        clients
            .put(Client::new("locked", "Locked", &[REDIRECT]).with_secret("s3cret"))
            .unwrap();
        let users = UserRegistry::new(Arc::new(MemoryCache::new()));
        users.put(user("alice", "pw", UserState::Active)).unwrap();
        users.put(user("bob", "pw", UserState::Inactive)).unwrap();

        Fixture {
            handler: OAuthHandler::new(
                OAuthOptions::default(),
                pending.clone(),
                tokens,
                clients,
                users,
            ),
            pending,
        }
    }

    fn authorize_request(client_id: &str, redirect_uri: &str) -> AuthorizeRequest {
        AuthorizeRequest {
            response_type: "code".to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            state: "xyz".to_string(),
        }
    }

    fn token_request(code: &str, client_id: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: code.to_string(),
            client_id: client_id.to_string(),
            client_secret: String::new(),
        }
    }

    fn query(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn approved_code(fixture: &Fixture, client_id: &str, username: &str) -> String {
        let pending = fixture
            .handler
            .authorize(&authorize_request(client_id, REDIRECT))
            .unwrap();
        let url = fixture
            .handler
            .approve(&pending.id, Some("Approve"), username)
            .unwrap();
        query(&url, "code").unwrap()
    }

    #[test]
    fn authorize_validation_order() {
        let fixture = fixture();
        let handler = &fixture.handler;

        let mut request = authorize_request("chat", "");
        assert!(matches!(
            handler.authorize(&request),
            Err(OAuthError::MissingRedirect)
        ));

        request.redirect_uri = "not a url".to_string();
        assert!(matches!(
            handler.authorize(&request),
            Err(OAuthError::InvalidRedirect(_))
        ));

        request.redirect_uri = REDIRECT.to_string();
        request.response_type = "token".to_string();
        assert!(matches!(
            handler.authorize(&request),
            Err(OAuthError::UnsupportedResponseType)
        ));

        let request = authorize_request("nope", REDIRECT);
        assert!(matches!(
            handler.authorize(&request),
            Err(OAuthError::InvalidClientId)
        ));

        let request = authorize_request("chat", "https://evil.example.com/cb");
        let err = handler.authorize(&request).unwrap_err();
        assert!(matches!(err, OAuthError::InvalidClientRedirect));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        assert!(fixture.pending.keys().unwrap().is_empty());
    }

    #[test]
    fn authorize_stores_pending_record() {
        let fixture = fixture();
        let pending = fixture
            .handler
            .authorize(&authorize_request("chat", REDIRECT))
            .unwrap();
        assert_eq!(pending.application_name, "Chat");
        assert_eq!(pending.username, None);
        assert_eq!(fixture.pending.get(&pending.id).unwrap(), pending);
    }

    #[test]
    fn approve_reissues_under_new_code() {
        let fixture = fixture();
        let pending = fixture
            .handler
            .authorize(&authorize_request("chat", REDIRECT))
            .unwrap();
        let url = fixture
            .handler
            .approve(&pending.id, Some("Approve"), "alice")
            .unwrap();

        let code = query(&url, "code").unwrap();
        assert_ne!(code, pending.id);
        assert_eq!(query(&url, "state").as_deref(), Some("xyz"));
        assert!(url.as_str().starts_with(REDIRECT));

        assert!(fixture.pending.get(&pending.id).is_err());
        let issued = fixture.pending.get(&code).unwrap();
        assert_eq!(issued.username.as_deref(), Some("alice"));

        // The correlation id cannot be replayed.
        assert!(matches!(
            fixture.handler.approve(&pending.id, Some("Approve"), "alice"),
            Err(OAuthError::InvalidCorrelation)
        ));
    }

    #[test]
    fn approve_keeps_existing_query() {
        let fixture = fixture();
        let redirect = "https://chat.example.com/cb?x=1&state=old";
        let pending = fixture
            .handler
            .authorize(&authorize_request("chat", redirect))
            .unwrap();
        let url = fixture
            .handler
            .approve(&pending.id, Some("Approve"), "alice")
            .unwrap();
        assert_eq!(query(&url, "x").as_deref(), Some("1"));
        assert_eq!(query(&url, "state").as_deref(), Some("xyz"));
        assert_eq!(url.query_pairs().filter(|(k, _)| k == "state").count(), 1);
    }

    #[test]
    fn deny_redirects_with_access_denied() {
        let fixture = fixture();
        for decision in [Some("Deny"), None, Some("approve")] {
            let pending = fixture
                .handler
                .authorize(&authorize_request("chat", REDIRECT))
                .unwrap();
            let url = fixture
                .handler
                .approve(&pending.id, decision, "alice")
                .unwrap();
            assert_eq!(query(&url, "error").as_deref(), Some("access_denied"));
            assert_eq!(query(&url, "code"), None);
        }
        assert!(fixture.pending.keys().unwrap().is_empty());
    }

    #[test]
    fn approve_unknown_correlation() {
        let fixture = fixture();
        assert!(matches!(
            fixture.handler.approve("missing", Some("Approve"), "alice"),
            Err(OAuthError::InvalidCorrelation)
        ));
        assert!(matches!(
            fixture.handler.approve("", Some("Approve"), "alice"),
            Err(OAuthError::InvalidCorrelation)
        ));
    }

    #[test]
    fn exchange_once() {
        let fixture = fixture();
        let code = approved_code(&fixture, "chat", "alice");

        let grant = fixture
            .handler
            .exchange(&token_request(&code, "chat"), &HeaderMap::new())
            .unwrap();
        assert_eq!(grant.token_type, "Bearer");
        assert_eq!(grant.access_token.len(), 32);
        assert_eq!(
            fixture.handler.tokens().get(&grant.access_token).unwrap(),
            "alice"
        );

        assert!(matches!(
            fixture
                .handler
                .exchange(&token_request(&code, "chat"), &HeaderMap::new()),
            Err(OAuthError::InvalidToken)
        ));
    }

    #[test]
    fn exchange_rejections() {
        let fixture = fixture();
        let code = approved_code(&fixture, "chat", "alice");
        let handler = &fixture.handler;
        let none = HeaderMap::new();

        assert!(matches!(
            handler.exchange(&token_request("bogus", "chat"), &none),
            Err(OAuthError::InvalidToken)
        ));
        assert!(matches!(
            handler.exchange(&token_request(&code, "nope"), &none),
            Err(OAuthError::InvalidClientId)
        ));
        let mut request = token_request(&code, "chat");
        request.grant_type = "password".to_string();
        assert!(matches!(
            handler.exchange(&request, &none),
            Err(OAuthError::UnsupportedGrantType)
        ));
        assert!(matches!(
            handler.exchange(&token_request(&code, "locked"), &none),
            Err(OAuthError::InvalidClient)
        ));
        let mut request = token_request(&code, "locked");
        request.client_secret = "s3cret".to_string();
        assert!(matches!(
            handler.exchange(&request, &none),
            Err(OAuthError::MismatchingClientIds)
        ));

        // None of the failures consumed the code.
        assert!(handler
            .exchange(&token_request(&code, "chat"), &none)
            .is_ok());
    }

    #[test]
    fn unapproved_record_is_not_exchangeable() {
        let fixture = fixture();
        let pending = fixture
            .handler
            .authorize(&authorize_request("chat", REDIRECT))
            .unwrap();
        assert!(matches!(
            fixture
                .handler
                .exchange(&token_request(&pending.id, "chat"), &HeaderMap::new()),
            Err(OAuthError::InvalidToken)
        ));
    }

    #[test]
    fn exchange_with_basic_credentials() {
        let fixture = fixture();
        let code = approved_code(&fixture, "locked", "alice");

        let mut headers = HeaderMap::new();
        let basic = Base64::encode_string(b"locked:s3cret");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {basic}")).unwrap(),
        );

        // Form and Basic credentials together are refused.
        assert!(matches!(
            fixture
                .handler
                .exchange(&token_request(&code, "locked"), &headers),
            Err(OAuthError::InvalidClient)
        ));

        let grant = fixture
            .handler
            .exchange(&token_request(&code, ""), &headers)
            .unwrap();
        assert_eq!(
            fixture.handler.tokens().get(&grant.access_token).unwrap(),
            "alice"
        );
    }

    #[test]
    fn basic_credentials_must_split() {
        let mut headers = HeaderMap::new();
        let basic = Base64::encode_string(b"no-colon");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {basic}")).unwrap(),
        );
        assert!(matches!(
            decode_client_credentials(&token_request("c", ""), &headers),
            Err(OAuthError::InvalidAuth)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic %%%"));
        assert!(matches!(
            decode_client_credentials(&token_request("c", ""), &headers),
            Err(OAuthError::InvalidAuth)
        ));
    }

    #[test]
    fn authorized_requires_active_token_owner() {
        let fixture = fixture();
        let handler = &fixture.handler;
        handler.tokens().put("alice", "alice-token").unwrap();
        handler.tokens().put("bob", "bob-token").unwrap();

        let mut headers = HeaderMap::new();
        assert!(matches!(
            handler.authorized(&headers),
            Err(OAuthError::NotAuthorized)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer alice-token"));
        assert_eq!(handler.authorized(&headers).unwrap(), vec!["all".to_string()]);
        assert_eq!(handler.is_authenticated(&headers).as_deref(), Some("alice"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bob-token"));
        assert!(handler.authorized(&headers).is_err());
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            OAuthError::BadRequest("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(OAuthError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            OAuthError::Storage(CacheError::Internal("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
