//! Checkout and registration handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_contracts::checkout::CheckoutParams;
use camp_core::Id;
use camp_services::registrations::{CancelParams, PayParams, RefundParams, RegistrationListParams};
use camp_services::{CheckoutService, RegistrationService};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

/// POST /api/checkout/quote
pub async fn quote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<CheckoutParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(CheckoutService::new(&state.ctx, &user.0).quote(params).await?))
}

/// POST /api/checkout
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<CheckoutParams>,
) -> ApiResult<impl IntoResponse> {
    let receipt = CheckoutService::new(&state.ctx, &user.0)
        .checkout(params)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<RegistrationListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(RegistrationService::new(&state.ctx, &user.0).list(params).await?))
}

/// GET /api/camps/:id/registrations
pub async fn camp_registrations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RegistrationService::new(&state.ctx, &user.0)
            .list_for_camp(camp_id)
            .await?,
    ))
}

/// POST /api/camps/:id/waitlist/promote
pub async fn promote_waitlist(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RegistrationService::new(&state.ctx, &user.0)
            .promote_waitlist(camp_id)
            .await?,
    ))
}

/// POST /api/registrations/:id/cancel
///
/// The body is optional; without one nothing is refunded.
pub async fn cancel_registration(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    body: Option<ApiJson<CancelParams>>,
) -> ApiResult<impl IntoResponse> {
    let params = body.map(|ApiJson(p)| p).unwrap_or_default();
    Ok(Json(
        RegistrationService::new(&state.ctx, &user.0)
            .cancel(id, params)
            .await?,
    ))
}

/// POST /api/registrations/:id/refund
pub async fn refund_registration(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<RefundParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RegistrationService::new(&state.ctx, &user.0)
            .refund(id, params)
            .await?,
    ))
}

/// POST /api/registrations/:id/pay
pub async fn pay_registration(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<PayParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RegistrationService::new(&state.ctx, &user.0)
            .pay(id, params)
            .await?,
    ))
}
