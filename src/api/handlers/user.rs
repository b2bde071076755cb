use crate::{
    authentication::Principal, authorization::ErrorBody, state::AppState, user::UserSummary,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    get,
    path= "/api/v4/user",
    responses (
        (status = 200, description = "The authenticated user", body = UserSummary, content_type = "application/json"),
        (status = 400, description = "No active user behind the request", body = ErrorBody),
    ),
    tag = "user",
)]
/// Summary of the authenticated user.
#[instrument(skip(state, principal))]
pub async fn user(
    state: Extension<Arc<AppState>>,
    principal: Option<Extension<Principal>>,
) -> Response {
    let user = principal.and_then(|Extension(principal)| state.users().active_user(&principal.username));
    match user {
        Some(user) => Json(user.summary()).into_response(),
        None => {
            debug!("user summary requested without a session");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "not logged in".to_string(),
                }),
            )
                .into_response()
        }
    }
}
