//! Athlete handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use camp_contracts::athletes::{AthleteAttributes, UpdateAthleteParams};
use camp_core::Id;
use camp_services::athletes::AthleteListParams;
use camp_services::AthleteService;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

/// GET /api/athletes
pub async fn list_athletes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<AthleteListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(AthleteService::new(&state.ctx, &user.0).list(params).await?))
}

/// POST /api/athletes
pub async fn create_athlete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(attrs): ApiJson<AthleteAttributes>,
) -> ApiResult<impl IntoResponse> {
    let athlete = AthleteService::new(&state.ctx, &user.0).create(attrs).await?;
    Ok((StatusCode::CREATED, Json(athlete)))
}

/// GET /api/athletes/:id
pub async fn get_athlete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(AthleteService::new(&state.ctx, &user.0).get(id).await?))
}

/// PATCH /api/athletes/:id
pub async fn update_athlete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdateAthleteParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(AthleteService::new(&state.ctx, &user.0).update(id, params).await?))
}
