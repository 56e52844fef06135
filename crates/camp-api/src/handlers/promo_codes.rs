//! Promo code handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_contracts::promo_codes::PromoCodeParams;
use camp_core::Id;
use camp_services::promo_codes::{PromoCodeListParams, SetActiveParams};
use camp_services::PromoCodeService;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

/// GET /api/promo-codes
pub async fn list_promo_codes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<PromoCodeListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(PromoCodeService::new(&state.ctx, &user.0).list(params).await?))
}

/// POST /api/promo-codes
pub async fn create_promo_code(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<PromoCodeParams>,
) -> ApiResult<impl IntoResponse> {
    let promo = PromoCodeService::new(&state.ctx, &user.0).create(params).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

/// PATCH /api/promo-codes/:id
pub async fn set_promo_code_active(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<SetActiveParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        PromoCodeService::new(&state.ctx, &user.0)
            .set_active(id, params)
            .await?,
    ))
}
