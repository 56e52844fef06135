//! Venue and venue contract handlers

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use camp_contracts::venues::{
    ContractAttributes, SignContractParams, UpdateContractParams, UpdateVenueParams,
    VenueAttributes,
};
use camp_core::Id;
use camp_services::venues::{ContractListParams, ExpireParams, VenueRemoval};
use camp_services::{ContractService, VenueService};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};
use crate::handlers::staff::TenantQuery;

/// Multipart field carrying the document
const DOCUMENT_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct CreateContractBody {
    pub tenant_id: Option<Id>,
    #[serde(flatten)]
    pub contract: ContractAttributes,
}

#[derive(Serialize)]
pub struct RemovalResponse {
    pub id: Id,
    pub result: VenueRemoval,
}

/// GET /api/venues
pub async fn list_venues(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<TenantQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(VenueService::new(&state.ctx, &user.0).list(query.tenant_id).await?))
}

/// POST /api/venues
pub async fn create_venue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(attrs): ApiJson<VenueAttributes>,
) -> ApiResult<impl IntoResponse> {
    let venue = VenueService::new(&state.ctx, &user.0).create(attrs).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

/// GET /api/venues/:id
pub async fn get_venue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(VenueService::new(&state.ctx, &user.0).get(id).await?))
}

/// PATCH /api/venues/:id
pub async fn update_venue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdateVenueParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(VenueService::new(&state.ctx, &user.0).update(id, params).await?))
}

/// DELETE /api/venues/:id
pub async fn remove_venue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let result = VenueService::new(&state.ctx, &user.0).remove(id).await?;
    Ok(Json(RemovalResponse { id, result }))
}

/// GET /api/contracts
pub async fn list_contracts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<ContractListParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ContractService::new(&state.ctx, &user.0).list(params).await?))
}

/// POST /api/contracts
pub async fn create_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateContractBody>,
) -> ApiResult<impl IntoResponse> {
    let contract = ContractService::new(&state.ctx, &user.0)
        .create(body.tenant_id, body.contract)
        .await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// GET /api/contracts/:id
pub async fn get_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ContractService::new(&state.ctx, &user.0).get(id).await?))
}

/// PATCH /api/contracts/:id
pub async fn update_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<UpdateContractParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        ContractService::new(&state.ctx, &user.0)
            .update(id, params)
            .await?,
    ))
}

/// POST /api/contracts/:id/send
pub async fn send_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ContractService::new(&state.ctx, &user.0).send(id).await?))
}

/// POST /api/contracts/:id/sign
pub async fn sign_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(params): ApiJson<SignContractParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        ContractService::new(&state.ctx, &user.0)
            .sign(id, params)
            .await?,
    ))
}

/// POST /api/contracts/:id/cancel
pub async fn cancel_contract(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ContractService::new(&state.ctx, &user.0).cancel(id).await?))
}

/// POST /api/contracts/expire
pub async fn expire_contracts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Option<ApiJson<ExpireParams>>,
) -> ApiResult<impl IntoResponse> {
    let params = body.map(|ApiJson(p)| p).unwrap_or_default();
    Ok(Json(
        ContractService::new(&state.ctx, &user.0)
            .expire_overdue(params)
            .await?,
    ))
}

/// POST /api/contracts/:id/document
///
/// Multipart upload; the document travels in the `file` field.
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document").to_string();
        let data = field.bytes().await?;
        let uploaded = ContractService::new(&state.ctx, &user.0)
            .upload_document(id, &file_name, data)
            .await?;
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }
    Err(ApiError::bad_request(format!(
        "multipart field '{DOCUMENT_FIELD}' is required"
    )))
}

/// GET /api/contracts/:id/document
pub async fn download_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let document = ContractService::new(&state.ctx, &user.0)
        .download_document(id)
        .await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.data,
    ))
}
