//! API error handling
//!
//! Every failure leaves the API as `{"error": "..."}`; validation failures
//! add `details` keyed by field. Server-side causes are logged, never
//! echoed to the client.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use camp_core::error::ValidationErrors;
use camp_core::CampError;

const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CampError> for ApiError {
    fn from(err: CampError) -> Self {
        match err {
            CampError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CampError::Unauthorized { message } => ApiError::Unauthorized(message),
            CampError::Forbidden { message } => ApiError::Forbidden(message),
            CampError::Validation(errors) => ApiError::Validation(errors),
            CampError::BadRequest(_)
            | CampError::InvalidTransition { .. }
            | CampError::PaymentDeclined(_) => ApiError::BadRequest(err.to_string()),
            CampError::Database(_)
            | CampError::Internal(_)
            | CampError::Config(_)
            | CampError::ExternalService { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, Vec<String>>>,
}

fn details(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut details = errors.errors.clone();
    if !errors.base_errors.is_empty() {
        details.insert("base".to_string(), errors.base_errors.clone());
    }
    details
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => ErrorBody {
                error: "validation failed".into(),
                details: Some(details(&errors)),
            },
            ApiError::Internal(cause) => {
                error!(error = %cause, "Request failed");
                ErrorBody {
                    error: INTERNAL_MESSAGE.into(),
                    details: None,
                }
            }
            ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg) => ErrorBody {
                error: msg,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_has_details() {
        let mut errors = ValidationErrors::new();
        errors.add("capacity", "must be at least 1");
        errors.add_base("dates overlap");

        let (status, json) = body_json(CampError::Validation(errors).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation failed");
        assert_eq!(json["details"]["capacity"][0], "must be at least 1");
        assert_eq!(json["details"]["base"][0], "dates overlap");
    }

    #[tokio::test]
    async fn test_server_errors_are_generic() {
        let err: ApiError = CampError::Database("relation \"camps\" does not exist".into()).into();
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({ "error": "internal server error" }));
    }

    #[tokio::test]
    async fn test_domain_errors_map_to_status() {
        let cases = [
            (CampError::not_found("Camp", 3), StatusCode::NOT_FOUND, "Camp not found"),
            (CampError::forbidden("not allowed"), StatusCode::FORBIDDEN, "not allowed"),
            (
                CampError::invalid_transition("camp", "completed", "draft"),
                StatusCode::BAD_REQUEST,
                "cannot change camp from completed to draft",
            ),
            (
                CampError::PaymentDeclined("card declined".into()),
                StatusCode::BAD_REQUEST,
                "payment declined: card declined",
            ),
        ];
        for (err, expected_status, message) in cases {
            let (status, json) = body_json(err.into()).await;
            assert_eq!(status, expected_status);
            assert_eq!(json["error"], message);
            assert!(json.get("details").is_none());
        }
    }
}
