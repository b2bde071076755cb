use crate::{
    api::handlers::{echo, health, user},
    authentication::{login, middleware::require_auth},
    authorization::handlers as oauth,
    state::AppState,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use std::{net::IpAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

pub mod handlers;
pub mod openapi;

const REQUEST_ID: &str = "x-request-id";

/// Build the full application: login pages, OAuth endpoints, the API and
/// the echo fallback, all behind the authentication gate.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config().clone();

    Router::new()
        .route("/health", get(health::health))
        .route(
            config.login_path(),
            get(login::login_form).post(login::submit),
        )
        .route(&config.logout_path(), post(login::submit))
        .route(&config.oauth_path("authorize"), get(oauth::authorize))
        .route(&config.oauth_path("approve"), get(oauth::approve))
        .route(&config.oauth_path("token"), post(oauth::token))
        .route("/api/v4/user", get(user::user))
        .fallback(echo::echo)
        .layer(from_fn_with_state(state.clone(), require_auth))
        .layer(Extension(state))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Serve the application until Ctrl-C.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(bind: IpAddr, port: u16, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
