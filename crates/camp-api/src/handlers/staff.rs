//! Camp staffing, grouping and incentive handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use camp_contracts::incentives::{
    AssignStaffParams, GenerateGroupsParams, MoveCamperParams, PlanAttributes, UpdatePlanParams,
};
use camp_core::Id;
use camp_services::{GroupingService, IncentiveService, StaffService};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Option<Id>,
}

/// GET /api/camps/:id/staff
pub async fn list_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(StaffService::new(&state.ctx, &user.0).list(camp_id).await?))
}

/// POST /api/camps/:id/staff
pub async fn assign_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiJson(params): ApiJson<AssignStaffParams>,
) -> ApiResult<impl IntoResponse> {
    let assignment = StaffService::new(&state.ctx, &user.0)
        .assign(camp_id, params)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// DELETE /api/camps/:id/staff/:assignment_id
pub async fn remove_staff(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((camp_id, assignment_id)): ApiPath<(Id, Id)>,
) -> ApiResult<impl IntoResponse> {
    StaffService::new(&state.ctx, &user.0)
        .remove(camp_id, assignment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/camps/:id/groups
pub async fn list_groups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(GroupingService::new(&state.ctx, &user.0).list(camp_id).await?))
}

/// POST /api/camps/:id/groups
///
/// Replaces any existing groups of the camp.
pub async fn generate_groups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiJson(params): ApiJson<GenerateGroupsParams>,
) -> ApiResult<impl IntoResponse> {
    let groups = GroupingService::new(&state.ctx, &user.0)
        .generate(camp_id, params)
        .await?;
    Ok((StatusCode::CREATED, Json(groups)))
}

/// POST /api/camps/:id/groups/move
pub async fn move_camper(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiJson(params): ApiJson<MoveCamperParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        GroupingService::new(&state.ctx, &user.0)
            .move_camper(camp_id, params)
            .await?,
    ))
}

/// GET /api/camps/:id/incentives
pub async fn camp_incentives(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(IncentiveService::new(&state.ctx, &user.0).preview(camp_id).await?))
}

/// POST /api/camps/:id/incentives/finalize
pub async fn finalize_incentives(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(IncentiveService::new(&state.ctx, &user.0).finalize(camp_id).await?))
}

/// GET /api/compensation-plans
pub async fn list_plans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<TenantQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        IncentiveService::new(&state.ctx, &user.0)
            .list_plans(query.tenant_id)
            .await?,
    ))
}

/// POST /api/compensation-plans
pub async fn create_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(attrs): ApiJson<PlanAttributes>,
) -> ApiResult<impl IntoResponse> {
    let plan = IncentiveService::new(&state.ctx, &user.0).create_plan(attrs).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// PATCH /api/compensation-plans/:id
pub async fn update_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdatePlanParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        IncentiveService::new(&state.ctx, &user.0)
            .update_plan(id, params)
            .await?,
    ))
}

/// GET /api/payouts/me
pub async fn my_payouts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(IncentiveService::new(&state.ctx, &user.0).my_payouts().await?))
}
