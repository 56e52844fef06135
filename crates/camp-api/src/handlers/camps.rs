//! Camp handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use camp_contracts::camps::{
    CampAttributes, CampListParams, CampResultsParams, ChangeCampStatusParams, UpdateCampParams,
};
use camp_core::{Id, PaginationParams};
use camp_models::CampStatus;
use camp_services::{CampService, IncentiveService, OverviewService};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
pub struct CampQuery {
    pub status: Option<CampStatus>,
    pub tenant_id: Option<Id>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CampQuery {
    fn split(self) -> (CampListParams, PaginationParams) {
        let defaults = PaginationParams::default();
        (
            CampListParams {
                status: self.status,
                tenant_id: self.tenant_id,
            },
            PaginationParams::new(
                self.page.unwrap_or(defaults.page),
                self.per_page.unwrap_or(defaults.per_page),
            ),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCampBody {
    /// HQ only; everyone else creates in their own tenant
    pub tenant_id: Option<Id>,
    #[serde(flatten)]
    pub camp: CampAttributes,
}

/// GET /api/camps
pub async fn list_camps(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<CampQuery>,
) -> ApiResult<impl IntoResponse> {
    let (params, page) = query.split();
    Ok(Json(CampService::new(&state.ctx, &user.0).list(params, page).await?))
}

/// POST /api/camps
pub async fn create_camp(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateCampBody>,
) -> ApiResult<impl IntoResponse> {
    let camp = CampService::new(&state.ctx, &user.0)
        .create(body.tenant_id, body.camp)
        .await?;
    Ok((StatusCode::CREATED, Json(camp)))
}

/// GET /api/camps/:id
pub async fn get_camp(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(CampService::new(&state.ctx, &user.0).get(id).await?))
}

/// PATCH /api/camps/:id
pub async fn update_camp(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdateCampParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(CampService::new(&state.ctx, &user.0).update(id, params).await?))
}

/// POST /api/camps/:id/status
pub async fn change_camp_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<ChangeCampStatusParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        CampService::new(&state.ctx, &user.0)
            .change_status(id, params)
            .await?,
    ))
}

/// POST /api/camps/:id/results
pub async fn record_results(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<CampResultsParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        IncentiveService::new(&state.ctx, &user.0)
            .record_results(id, params)
            .await?,
    ))
}

/// GET /api/camps/:id/overview
pub async fn camp_overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        OverviewService::new(&state.ctx, &user.0)
            .camp_overview(id)
            .await?,
    ))
}
