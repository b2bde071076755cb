use authsvc::{
    api::router,
    authentication::CookieCodec,
    authorization::{BearerGrant, ErrorBody},
    client::Client,
    state::{AppState, AuthConfig, Stores},
    user::{User, UserState},
};
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE, WWW_AUTHENTICATE},
        Request, Response, StatusCode,
    },
    Router,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use url::Url;

const CLIENT_ID: &str = "example.com";
const REDIRECT: &str = "https://example.com/done";

fn user(username: &str, password: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
        email: format!("{username}@example.com"),
        name: username.to_string(),
        state: UserState::Active,
    }
}

fn gateway(max_age_seconds: i64) -> (Arc<AppState>, Router) {
    let state = AppState::new(
        AuthConfig::new(),
        CookieCodec::generate(max_age_seconds).unwrap(),
        Stores::memory(),
    );
    state.users().put(user("alice", "secret")).unwrap();
    state.users().put(user("jweldon", "hunter2")).unwrap();
    state
        .clients()
        .put(Client::new(CLIENT_ID, "Example", &[REDIRECT]))
        .unwrap();
    let state = Arc::new(state);
    (state.clone(), router(state))
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form(uri: &str, body: String) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        form(
            "/auth/login/",
            format!("submit=Login&username={username}&password={password}"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn authorize_uri(redirect: &str, state: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", CLIENT_ID)
        .append_pair("redirect_uri", redirect)
        .append_pair("state", state)
        .finish();
    format!("/oauth/authorize?{query}")
}

fn corr_from(body: &str) -> String {
    let marker = r#"name="corr" value=""#;
    let start = body.find(marker).unwrap() + marker.len();
    body[start..].split('"').next().unwrap().to_string()
}

async fn approved_code(app: &Router, cookie: &str) -> String {
    let response = send(app, get(&authorize_uri(REDIRECT, "xyz"), cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let corr = corr_from(&text(response).await);

    let response = send(
        app,
        get(&format!("/oauth/approve?corr={corr}&approve=Approve"), cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = Url::parse(&location(&response)).unwrap();
    assert_eq!(
        format!("{}://{}{}", target.scheme(), target.host_str().unwrap(), target.path()),
        REDIRECT
    );
    let params: Vec<(String, String)> = target.query_pairs().into_owned().collect();
    assert!(params.contains(&("state".to_string(), "xyz".to_string())));
    let code = params
        .iter()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.clone())
        .unwrap();
    assert_ne!(code, corr);
    code
}

fn token_request(code: &str) -> Request<Body> {
    form(
        "/oauth/token",
        format!("grant_type=authorization_code&code={code}&client_id={CLIENT_ID}"),
    )
}

#[tokio::test]
async fn authorization_code_flow() {
    let (state, app) = gateway(7200);
    let cookie = login(&app, "alice", "secret").await;
    let code = approved_code(&app, &cookie).await;

    let response = send(&app, token_request(&code)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let grant: BearerGrant = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(grant.token_type, "Bearer");
    assert_eq!(grant.access_token.len(), 32);
    assert_eq!(state.oauth().tokens().tokens("alice").unwrap(), vec![grant.access_token.clone()]);

    // The bearer token opens protected routes without a cookie.
    let response = send(
        &app,
        Request::get("/api/v4/user")
            .header(AUTHORIZATION, format!("Bearer {}", grant.access_token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn code_is_single_use() {
    let (_, app) = gateway(7200);
    let cookie = login(&app, "alice", "secret").await;
    let code = approved_code(&app, &cookie).await;

    assert_eq!(send(&app, token_request(&code)).await.status(), StatusCode::OK);

    let response = send(&app, token_request(&code)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: ErrorBody = serde_json::from_str(&text(response).await).unwrap();
    assert_eq!(body.error, "invalid token");
}

#[tokio::test]
async fn unregistered_redirect_is_rejected() {
    let (state, app) = gateway(7200);
    let cookie = login(&app, "alice", "secret").await;

    for redirect in ["https://evil.example/done", "not a url"] {
        let response = send(&app, get(&authorize_uri(redirect, "xyz"), &cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{redirect}");
    }
    assert!(state.oauth().tokens().tokens("alice").unwrap().is_empty());
}

#[tokio::test]
async fn denial_redirects_with_error() {
    let (_, app) = gateway(7200);
    let cookie = login(&app, "alice", "secret").await;

    let response = send(&app, get(&authorize_uri(REDIRECT, "s1"), &cookie)).await;
    let corr = corr_from(&text(response).await);

    let response = send(
        &app,
        get(&format!("/oauth/approve?corr={corr}&approve=Deny"), &cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = Url::parse(&location(&response)).unwrap();
    assert!(target
        .query_pairs()
        .any(|(key, value)| key == "error" && value == "access_denied"));
    assert!(!target.query_pairs().any(|(key, _)| key == "code"));

    // The correlation id does not survive a decision.
    let response = send(
        &app,
        get(&format!("/oauth/approve?corr={corr}&approve=Approve"), &cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wrong_password_sets_no_cookie() {
    let (_, app) = gateway(7200);
    let response = send(
        &app,
        form(
            "/auth/login/",
            "submit=Login&username=jweldon&password=wrong".to_string(),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn expired_session_is_challenged() {
    let (_, app) = gateway(0);
    let cookie = login(&app, "alice", "secret").await;
    // Cookie timestamps have one second resolution.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = send(&app, get("/api/v4/user?view=full", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response
        .headers()
        .get(WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(challenge.starts_with("Bearer realm=\"authsvc\""));
    assert!(challenge.contains("error=\"invalid_token\""));

    let target = location(&response);
    assert_eq!(
        target,
        "/auth/login/?redirect_uri=%2Fapi%2Fv4%2Fuser%3Fview%3Dfull"
    );
    let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
    assert!(text(response).await.contains("http-equiv=\"refresh\""));
}

#[tokio::test]
async fn anonymous_authorize_goes_to_login() {
    let (_, app) = gateway(7200);
    let uri = authorize_uri(REDIRECT, "xyz");
    let response = send(
        &app,
        Request::get(uri.as_str()).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let target = Url::parse(&format!("http://gateway{}", location(&response))).unwrap();
    assert_eq!(target.path(), "/auth/login/");
    let redirect_uri = target
        .query_pairs()
        .find(|(key, _)| key == "redirect_uri")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert_eq!(redirect_uri, uri);
}

#[tokio::test]
async fn logout_ends_session() {
    let (_, app) = gateway(7200);
    let cookie = login(&app, "alice", "secret").await;
    assert_eq!(
        send(&app, get("/api/v4/user", &cookie)).await.status(),
        StatusCode::OK
    );

    let response = send(&app, form("/auth/logout/", "submit=Logout".to_string())).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?msg=logged+out");
    let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.starts_with("authsvc-login-cookie=;"));
}
