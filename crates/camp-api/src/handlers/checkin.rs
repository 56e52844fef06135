//! Attendance and kiosk handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use camp_core::Id;
use camp_services::checkin::kiosk::KioskEvent;
use camp_services::checkin::{CheckInParams, CheckOutParams};
use camp_services::CheckInService;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
pub struct RosterQuery {
    pub date: Option<NaiveDate>,
}

/// GET /api/camps/:id/roster?date=
pub async fn roster(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiQuery(query): ApiQuery<RosterQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        CheckInService::new(&state.ctx, &user.0)
            .roster(camp_id, query.date)
            .await?,
    ))
}

/// POST /api/camps/:id/checkins
///
/// 201 for a new check-in, 200 when the camper was already in.
pub async fn check_in(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiJson(params): ApiJson<CheckInParams>,
) -> ApiResult<impl IntoResponse> {
    let outcome = CheckInService::new(&state.ctx, &user.0)
        .check_in(camp_id, params)
        .await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// POST /api/camps/:id/checkouts
pub async fn check_out(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(camp_id): ApiPath<Id>,
    ApiJson(params): ApiJson<CheckOutParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        CheckInService::new(&state.ctx, &user.0)
            .check_out(camp_id, params)
            .await?,
    ))
}

/// POST /api/kiosks
pub async fn open_kiosk(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let session = CheckInService::new(&state.ctx, &user.0).open_kiosk()?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/kiosks/:id
pub async fn get_kiosk(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(CheckInService::new(&state.ctx, &user.0).kiosk(id)?))
}

/// POST /api/kiosks/:id/events
pub async fn kiosk_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(event): ApiJson<KioskEvent>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        CheckInService::new(&state.ctx, &user.0)
            .kiosk_event(id, event)
            .await?,
    ))
}
