//! Axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use camp_auth::{Authenticator, CurrentUser, RequestHeaders, UserLookup};
use camp_core::CampError;
use camp_services::ServiceContext;

use crate::error::ApiError;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub ctx: ServiceContext,
    pub auth: Arc<Authenticator>,
    /// Reloads the caller on every request
    pub users: Arc<dyn UserLookup>,
}

impl AppState {
    pub fn new(ctx: ServiceContext, auth: Arc<Authenticator>) -> Self {
        let users: Arc<dyn UserLookup> = Arc::new(ctx.clone());
        Self { ctx, auth, users }
    }

    pub fn with_user_lookup(mut self, users: Arc<dyn UserLookup>) -> Self {
        self.users = users;
        self
    }
}

/// The credential-bearing headers of a request
pub fn request_headers(headers: &HeaderMap) -> RequestHeaders {
    let pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    RequestHeaders::from_pairs(&pairs)
}

/// Authenticated user extractor; 401 without a valid cookie or bearer token
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let headers = request_headers(&parts.headers);
        let user = app_state
            .auth
            .authenticate(&headers, app_state.users.as_ref())
            .await
            .map_err(CampError::from)?;
        Ok(AuthenticatedUser(user))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// JSON body whose rejections use the API error shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections use the API error shape
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejections use the API error shape
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_headers_picks_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("cookie", HeaderValue::from_static("camp_session=xyz"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let parsed = request_headers(&headers);
        assert_eq!(parsed.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(parsed.cookie.as_deref(), Some("camp_session=xyz"));
    }

    #[test]
    fn test_request_headers_empty() {
        let parsed = request_headers(&HeaderMap::new());
        assert!(parsed.authorization.is_none());
        assert!(parsed.cookie.is_none());
    }
}
