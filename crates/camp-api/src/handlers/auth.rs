//! Session and token handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use camp_auth::CurrentUser;
use camp_contracts::users::LoginParams;
use camp_core::CampError;
use camp_services::AccountService;

use crate::error::ApiResult;
use crate::extractors::{request_headers, ApiJson, AppState, AuthenticatedUser};

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: CurrentUser,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(params): ApiJson<LoginParams>,
) -> ApiResult<impl IntoResponse> {
    let user = AccountService::new(&state.ctx).login(&params).await?;
    let session = state.auth.start_session(user.id);
    let cookie = state.auth.cookie_config().build_cookie(&session.id);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: CurrentUser::from(&user),
        }),
    ))
}

/// POST /api/auth/logout
///
/// Always clears the cookie, with or without a live session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    state.auth.end_session(&request_headers(&headers));
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.auth.cookie_config().build_clear_cookie())],
    )
}

/// POST /api/auth/token
pub async fn token(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let (token, expires_in) = state.auth.issue_token(&user.0).map_err(CampError::from)?;
    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in,
    }))
}

/// GET /api/auth/me
pub async fn me(user: AuthenticatedUser) -> Json<CurrentUser> {
    Json(user.0)
}
