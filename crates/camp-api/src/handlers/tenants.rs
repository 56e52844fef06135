//! Licensee and user administration handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_auth::CurrentUser;
use camp_contracts::tenants::{ChangeTenantStatusParams, CreateTenantParams, UpdateTenantParams};
use camp_contracts::users::CreateUserParams;
use camp_core::Id;
use camp_services::tenants::TenantListParams;
use camp_services::{AccountService, TenantService};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

/// GET /api/tenants
pub async fn list_tenants(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<TenantListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(TenantService::new(&state.ctx, &user.0).list(params).await?))
}

/// POST /api/tenants
pub async fn create_tenant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<CreateTenantParams>,
) -> ApiResult<impl IntoResponse> {
    let tenant = TenantService::new(&state.ctx, &user.0).create(params).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

/// GET /api/tenants/:id
pub async fn get_tenant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(TenantService::new(&state.ctx, &user.0).get(id).await?))
}

/// PATCH /api/tenants/:id
pub async fn update_tenant(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdateTenantParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(TenantService::new(&state.ctx, &user.0).update(id, params).await?))
}

/// POST /api/tenants/:id/status
pub async fn change_tenant_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<ChangeTenantStatusParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        TenantService::new(&state.ctx, &user.0)
            .change_status(id, params)
            .await?,
    ))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(params): ApiJson<CreateUserParams>,
) -> ApiResult<impl IntoResponse> {
    let created = AccountService::new(&state.ctx)
        .create_user(&user.0, params)
        .await?;
    Ok((StatusCode::CREATED, Json(CurrentUser::from(&created))))
}
