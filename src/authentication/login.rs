//! Form login and logout.

use crate::{state::AppState, user::PasswordChecker, utils::escape_html};
use axum::{
    extract::{Extension, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const SUBMIT_LOGIN: &str = "Login";
pub const SUBMIT_LOGOUT: &str = "Logout";
const LOGGED_OUT_TARGET: &str = "/?msg=logged+out";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub redirect_uri: String,
}

#[derive(Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub submit: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub redirect_uri: String,
}

/// Only same-site relative targets are followed after login.
#[must_use]
pub fn safe_redirect(target: &str) -> &str {
    if target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\") {
        target
    } else {
        "/"
    }
}

/// Render the login form, or a logout form for an existing session.
#[instrument(skip(state, headers))]
pub async fn login_form(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let config = state.config();
    let cookies = state.cookies();
    let session = cookies
        .extract(&headers)
        .and_then(|value| cookies.decode(&value).ok());

    let body = match session {
        Some(username) => format!(
            r#"<p>Logged in as {username}</p>
<form method="post" action="{action}">
  <input type="submit" name="submit" value="{SUBMIT_LOGOUT}" />
</form>"#,
            username = escape_html(&username),
            action = escape_html(&config.logout_path()),
        ),
        None => format!(
            r#"<form method="post" action="{action}">
  <input type="hidden" name="redirect_uri" value="{redirect_uri}" />
  <label>Username <input type="text" name="username" /></label>
  <label>Password <input type="password" name="password" /></label>
  <input type="submit" name="submit" value="{SUBMIT_LOGIN}" />
</form>"#,
            action = escape_html(config.login_path()),
            redirect_uri = escape_html(&query.redirect_uri),
        ),
    };

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{realm}</title></head>\n<body>\n{body}\n</body>\n</html>\n",
        realm = escape_html(config.realm()),
    ))
}

/// Handle both the login and the logout form posts.
#[instrument(skip(state, form))]
pub async fn submit(
    state: Extension<Arc<AppState>>,
    form: Option<Form<LoginForm>>,
) -> Response {
    let Some(Form(form)) = form else {
        debug!("malformed login form");
        return StatusCode::BAD_REQUEST.into_response();
    };

    match form.submit.as_str() {
        SUBMIT_LOGIN => login(&state, form).await,
        SUBMIT_LOGOUT => logout(&state),
        other => {
            debug!("unknown login form action: {other:?}");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn login(state: &AppState, form: LoginForm) -> Response {
    let LoginForm {
        username,
        password,
        redirect_uri,
        ..
    } = form;
    let passwords = state.passwords();
    let candidate = username.clone();
    let verified =
        tokio::task::spawn_blocking(move || passwords.is_authenticated(&candidate, &password))
            .await;

    match verified {
        Ok(true) => {}
        Ok(false) => {
            warn!("login failed for {username}");
            return StatusCode::BAD_REQUEST.into_response();
        }
        Err(err) => {
            error!("password check task failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let cookie = match state
        .cookies()
        .session_cookie(&username, state.config().cookie_secure())
    {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("failed to encode session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!("login succeeded for {username}");
    see_other(safe_redirect(&redirect_uri), cookie)
}

fn logout(state: &AppState) -> Response {
    match state.cookies().clear_cookie(state.config().cookie_secure()) {
        Ok(cookie) => see_other(LOGGED_OUT_TARGET, cookie),
        Err(err) => {
            error!("failed to build logout cookie: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn see_other(target: &str, cookie: HeaderValue) -> Response {
    let Ok(location) = HeaderValue::from_str(target) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, location);
    headers.insert(SET_COOKIE, cookie);
    (StatusCode::SEE_OTHER, headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authentication::CookieCodec,
        state::{AuthConfig, Stores},
        user::{tests::user, UserState},
    };
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, header::COOKIE, Request},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let state = AppState::new(
            AuthConfig::new().with_insecure(true),
            CookieCodec::generate(7200).unwrap(),
            Stores::memory(),
        );
        let hash = bcrypt::hash("secret", 4).unwrap();
        state
            .users()
            .put(user("alice", &hash, UserState::Active))
            .unwrap();
        state
            .users()
            .put(user("bob", "plain", UserState::Active))
            .unwrap();
        Arc::new(state)
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/auth/login/", get(login_form).post(submit))
            .route("/auth/logout/", axum::routing::post(submit))
            .layer(Extension(state))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn only_relative_redirects() {
        assert_eq!(safe_redirect("/oauth/authorize?a=1"), "/oauth/authorize?a=1");
        assert_eq!(safe_redirect("//evil.example"), "/");
        assert_eq!(safe_redirect("https://evil.example/"), "/");
        assert_eq!(safe_redirect(""), "/");
    }

    #[tokio::test]
    async fn login_sets_cookie_and_redirects() {
        let state = state();
        let response = app(state.clone())
            .oneshot(post(
                "/auth/login/",
                "submit=Login&username=alice&password=secret&redirect_uri=%2Fapi%2Fv4%2Fuser",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/api/v4/user");

        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(!cookie.contains("Secure"));
        let value = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value)
            .unwrap();
        assert_eq!(state.cookies().decode(value).unwrap(), "alice");
    }

    #[tokio::test]
    async fn plain_text_login_falls_back() {
        let response = app(state())
            .oneshot(post(
                "/auth/login/",
                "submit=Login&username=bob&password=plain&redirect_uri=https%3A%2F%2Fevil.example",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let response = app(state())
            .oneshot(post(
                "/auth/login/",
                "submit=Login&username=alice&password=wrong",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn unknown_submit_is_rejected() {
        let response = app(state())
            .oneshot(post("/auth/login/", "submit=Register"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let response = app(state())
            .oneshot(post("/auth/logout/", "submit=Logout"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/?msg=logged+out"
        );
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn form_switches_to_logout_for_session() {
        let state = state();
        let response = app(state.clone())
            .oneshot(
                Request::get("/auth/login/?redirect_uri=%2Fnext")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"value="/next""#));
        assert!(body.contains(r#"value="Login""#));

        let cookie = format!(
            "{}={}",
            state.cookies().name(),
            state.cookies().encode("alice").unwrap()
        );
        let response = app(state)
            .oneshot(
                Request::get("/auth/login/")
                    .header(COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Logged in as alice"));
        assert!(body.contains(r#"action="/auth/logout/""#));
    }
}
