//! Royalty, dashboard and analytics handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_core::Id;
use camp_services::dashboard::PeriodParams;
use camp_services::royalties::{InvoiceListParams, InvoiceStatusParams};
use camp_services::{DashboardService, RoyaltyService};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

/// GET /api/royalties/statement?tenant_id=&from=&to=
pub async fn statement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<PeriodParams>,
) -> ApiResult<impl IntoResponse> {
    let period = params.period(state.ctx.today())?;
    Ok(Json(
        RoyaltyService::new(&state.ctx, &user.0)
            .statement(params.tenant_id, period)
            .await?,
    ))
}

/// GET /api/royalties/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<InvoiceListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RoyaltyService::new(&state.ctx, &user.0)
            .list_invoices(params)
            .await?,
    ))
}

/// POST /api/royalties/invoices
///
/// Issues one invoice per active tenant for the period; repeat calls
/// return the existing invoices.
pub async fn issue_invoices(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<PeriodParams>,
) -> ApiResult<impl IntoResponse> {
    let period = params.period(state.ctx.today())?;
    let outcome = RoyaltyService::new(&state.ctx, &user.0)
        .issue_invoices(period)
        .await?;
    let status = if outcome.created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// POST /api/royalties/invoices/:id/status
pub async fn set_invoice_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<InvoiceStatusParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        RoyaltyService::new(&state.ctx, &user.0)
            .set_status(id, params.status)
            .await?,
    ))
}

/// GET /api/dashboard?from=&to=
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<PeriodParams>,
) -> ApiResult<impl IntoResponse> {
    let period = params.period(state.ctx.today())?;
    Ok(Json(DashboardService::new(&state.ctx, &user.0).hq(period).await?))
}

/// GET /api/analytics?tenant_id=&from=&to=
pub async fn analytics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<PeriodParams>,
) -> ApiResult<impl IntoResponse> {
    let period = params.period(state.ctx.today())?;
    Ok(Json(
        DashboardService::new(&state.ctx, &user.0)
            .licensee(params.tenant_id, period)
            .await?,
    ))
}
