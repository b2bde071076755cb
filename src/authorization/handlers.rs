//! HTTP endpoints of the authorization-code flow.

use super::{AuthorizeRequest, BearerGrant, ErrorBody, OAuthError, TokenRequest};
use crate::{authentication::Principal, state::AppState, utils::escape_html};
use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::{header::CACHE_CONTROL, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct ApproveQuery {
    #[serde(default)]
    pub corr: String,
    pub approve: Option<String>,
}

/// Validate the request and render the approval page.
#[instrument(skip(state, principal, query))]
pub async fn authorize(
    state: Extension<Arc<AppState>>,
    principal: Option<Extension<Principal>>,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Result<Html<String>, OAuthError> {
    let Query(request) = query.map_err(|rejection| OAuthError::BadRequest(rejection.body_text()))?;
    let pending = state.oauth().authorize(&request)?;
    debug!(
        "authorization for {} parked as {}",
        pending.client_id, pending.id
    );

    let username = principal.map(|Extension(principal)| principal.username);
    let greeting = username.map_or_else(String::new, |username| {
        format!("<p>Signed in as {}</p>\n", escape_html(&username))
    });

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Authorize {application}</title></head>
<body>
{greeting}<p>{application} wants to access your account.</p>
<form method="get" action="{action}">
  <input type="hidden" name="corr" value="{corr}" />
  <input type="submit" name="approve" value="Approve" />
  <input type="submit" name="approve" value="Deny" />
</form>
</body>
</html>
"#,
        application = escape_html(&pending.application_name),
        action = escape_html(&state.config().oauth_path("approve")),
        corr = escape_html(&pending.id),
    )))
}

/// Turn the user's decision into a redirect back to the client.
#[instrument(skip(state, principal))]
pub async fn approve(
    state: Extension<Arc<AppState>>,
    principal: Option<Extension<Principal>>,
    Query(query): Query<ApproveQuery>,
) -> Result<Redirect, OAuthError> {
    let Some(Extension(principal)) = principal else {
        return Err(OAuthError::NotAuthorized);
    };
    let target = state
        .oauth()
        .approve(&query.corr, query.approve.as_deref(), &principal.username)?;
    Ok(Redirect::to(target.as_str()))
}

#[utoipa::path(
    post,
    path = "/oauth/token",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token issued", body = BearerGrant, content_type = "application/json"),
        (status = 400, description = "Malformed token request", body = ErrorBody),
        (status = 403, description = "Code or client rejected", body = ErrorBody),
    ),
    tag = "oauth"
)]
/// Exchange an authorization code for a bearer token.
#[instrument(skip(state, headers, form))]
pub async fn token(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    form: Option<Form<TokenRequest>>,
) -> Result<impl IntoResponse, OAuthError> {
    let Some(Form(request)) = form else {
        return Err(OAuthError::BadRequest(
            "malformed token request".to_string(),
        ));
    };
    let grant = state.oauth().exchange(&request, &headers)?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((response_headers, Json(grant)))
}
