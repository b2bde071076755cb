//! Request gate applied to the whole router.

use super::{cookie::extract_cookie, Principal, RequestChecker};
use crate::{state::AppState, utils::escape_html};
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, SET_COOKIE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};
use url::form_urlencoded;

const INVALID_TOKEN_DESCRIPTION: &str = "invalid or expired authentication token";

/// Pass public paths through, attach a [`Principal`] for authenticated
/// callers, and answer everything else with a `401` pointing at the login page.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.config().is_public(&path) {
        return next.run(request).await;
    }

    if let Some(username) = state.checkers().is_authenticated(request.headers()) {
        debug!("authenticated {username} for {path}");
        request.extensions_mut().insert(Principal { username });
        return next.run(request).await;
    }

    let original = request
        .uri()
        .path_and_query()
        .map_or(path, ToString::to_string);
    unauthorized(&state, request.headers(), &original)
}

/// Login URL carrying the original target, form-url-encoded once.
#[must_use]
pub fn login_redirect(login_path: &str, original: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect_uri", original)
        .finish();
    format!("{login_path}?{query}")
}

fn credentials_presented(state: &AppState, headers: &HeaderMap) -> (bool, bool) {
    let cookie = extract_cookie(headers, state.cookies().name()).is_some();
    let authorization = headers.contains_key(AUTHORIZATION);
    (cookie, authorization)
}

fn unauthorized(state: &AppState, headers: &HeaderMap, original: &str) -> Response {
    let config = state.config();
    let location = login_redirect(config.login_path(), original);
    let (cookie, authorization) = credentials_presented(state, headers);

    let mut challenge = format!("Bearer realm=\"{}\"", config.realm());
    if cookie || authorization {
        challenge.push_str(&format!(
            ", error=\"invalid_token\", error_description=\"{INVALID_TOKEN_DESCRIPTION}\", error_uri=\"{}\"",
            config.login_path()
        ));
    }

    let mut response_headers = HeaderMap::new();
    match (
        HeaderValue::from_str(&challenge),
        HeaderValue::from_str(&location),
    ) {
        (Ok(challenge), Ok(location)) => {
            response_headers.insert(WWW_AUTHENTICATE, challenge);
            response_headers.insert(LOCATION, location);
        }
        _ => {
            error!("Failed to build authentication challenge for {original}");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    if cookie {
        // Stale session: drop it so the browser stops presenting it.
        if let Ok(clear) = state.cookies().clear_cookie(config.cookie_secure()) {
            response_headers.insert(SET_COOKIE, clear);
        }
    }
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    let location = escape_html(&location);
    let body = format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="refresh" content="0; url={location}" />
    <title>Login required</title>
  </head>
  <body>
    <a href="{location}">Login required</a>
  </body>
</html>
"#
    );

    (StatusCode::UNAUTHORIZED, response_headers, body).into_response()
}
