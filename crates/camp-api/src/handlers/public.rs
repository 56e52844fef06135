//! Unauthenticated, tenant-facing endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_auth::CurrentUser;
use camp_contracts::users::SignupParams;
use camp_services::camps::public_listing;
use camp_services::AccountService;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState};

/// POST /api/public/:slug/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(params): ApiJson<SignupParams>,
) -> ApiResult<impl IntoResponse> {
    let user = AccountService::new(&state.ctx).signup(&slug, params).await?;
    Ok((StatusCode::CREATED, Json(CurrentUser::from(&user))))
}

/// GET /api/public/:slug/camps
pub async fn camps(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(public_listing(&state.ctx, &slug).await?))
}
