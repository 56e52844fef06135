//! Request authentication
//!
//! Resolves the headers of a request to a `CurrentUser`. A bearer token is
//! tried first, then the session cookie. Either way only the user id is
//! trusted; the user row is reloaded so deactivation takes effect at once.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;

use camp_core::{CampError, Id};
use camp_models::User;

use crate::current_user::CurrentUser;
use crate::jwt::{extract_bearer_token, JwtError, JwtService};
use crate::session::{extract_session_id, CookieConfig, Session, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication required")]
    Required,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session expired")]
    Expired,
    #[error("invalid token")]
    InvalidToken,
    #[error("account is disabled")]
    Inactive,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for CampError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(message) => CampError::Internal(message),
            other => CampError::unauthorized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    Bearer,
    Session,
}

/// Loads users by id for the authenticator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, id: Id) -> Result<Option<User>, CampError>;
}

/// Request headers relevant to authentication
#[derive(Debug, Default, Clone)]
pub struct RequestHeaders {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
}

impl RequestHeaders {
    pub fn from_pairs(pairs: &[(impl AsRef<str>, impl AsRef<str>)]) -> Self {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let value = value.as_ref().to_string();
            match name.as_ref().to_ascii_lowercase().as_str() {
                "authorization" => headers.authorization = Some(value),
                "cookie" => headers.cookie = Some(value),
                _ => {}
            }
        }
        headers
    }
}

pub struct Authenticator {
    jwt: Arc<JwtService>,
    sessions: Arc<dyn SessionStore>,
    cookie: CookieConfig,
    session_ttl: Duration,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(
        config: &camp_core::config::AuthConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            jwt: Arc::new(JwtService::new(config.session_secret.as_bytes())),
            sessions,
            cookie: CookieConfig::from_config(config),
            session_ttl: Duration::minutes(config.session_ttl_minutes),
            token_ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookie
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Which credential the request carries, if any
    pub fn strategy_for(&self, headers: &RequestHeaders) -> Option<AuthStrategy> {
        if headers
            .authorization
            .as_deref()
            .and_then(extract_bearer_token)
            .is_some()
        {
            Some(AuthStrategy::Bearer)
        } else if headers
            .cookie
            .as_deref()
            .and_then(|c| extract_session_id(c, &self.cookie.name))
            .is_some()
        {
            Some(AuthStrategy::Session)
        } else {
            None
        }
    }

    /// Resolve the caller
    pub async fn authenticate(
        &self,
        headers: &RequestHeaders,
        users: &dyn UserLookup,
    ) -> Result<CurrentUser, AuthError> {
        let user_id = match self.strategy_for(headers) {
            Some(AuthStrategy::Bearer) => {
                let token = headers
                    .authorization
                    .as_deref()
                    .and_then(extract_bearer_token)
                    .ok_or(AuthError::Required)?;
                self.jwt.user_id(token).map_err(|e| match e {
                    JwtError::Expired => AuthError::Expired,
                    _ => AuthError::InvalidToken,
                })?
            }
            Some(AuthStrategy::Session) => {
                let session_id = headers
                    .cookie
                    .as_deref()
                    .and_then(|c| extract_session_id(c, &self.cookie.name))
                    .ok_or(AuthError::Required)?;
                self.sessions
                    .get(&session_id)
                    .map(|s| s.user_id)
                    .ok_or(AuthError::Expired)?
            }
            None => return Err(AuthError::Required),
        };

        let user = users
            .find_user(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidToken)?;
        if !user.active {
            return Err(AuthError::Inactive);
        }
        Ok(user.into())
    }

    /// Open a session for a user who just proved their password
    pub fn start_session(&self, user_id: Id) -> Session {
        let session = Session::new(user_id, self.session_ttl);
        self.sessions.insert(session.clone());
        tracing::info!(user_id, "Session started");
        session
    }

    /// End the session named by the request's cookie, if any
    pub fn end_session(&self, headers: &RequestHeaders) {
        if let Some(id) = headers
            .cookie
            .as_deref()
            .and_then(|c| extract_session_id(c, &self.cookie.name))
        {
            self.sessions.delete(&id);
        }
    }

    /// Bearer token for `user`
    pub fn issue_token(&self, user: &CurrentUser) -> Result<(String, i64), AuthError> {
        let ttl = self.token_ttl.num_seconds();
        let token = self
            .jwt
            .create_token(user.id, user.role.as_str(), user.tenant_id, ttl)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok((token, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use camp_models::Role;
    use chrono::Utc;

    fn config() -> camp_core::config::AuthConfig {
        camp_core::config::AuthConfig {
            session_secret: "test-secret-key-at-least-32-bytes-long".into(),
            session_ttl_minutes: 60,
            token_ttl_minutes: 10,
            secure_cookies: false,
            password_min_length: 10,
        }
    }

    fn user(id: Id, active: bool) -> User {
        User {
            id,
            tenant_id: Some(3),
            email: "coach@example.com".into(),
            name: "Casey Coach".into(),
            role: Role::Coach,
            password_hash: String::new(),
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lookup_returning(found: Option<User>) -> MockUserLookup {
        let mut lookup = MockUserLookup::new();
        lookup
            .expect_find_user()
            .returning(move |_| Ok(found.clone()));
        lookup
    }

    #[tokio::test]
    async fn test_session_cookie_authenticates() {
        let auth = Authenticator::new(&config(), Arc::new(MemorySessionStore::new()));
        let session = auth.start_session(9);
        let headers = RequestHeaders {
            cookie: Some(format!("camp_session={}", session.id)),
            ..Default::default()
        };

        let current = auth
            .authenticate(&headers, &lookup_returning(Some(user(9, true))))
            .await
            .unwrap();
        assert_eq!(current.id, 9);
        assert_eq!(current.tenant_id, Some(3));
    }

    #[tokio::test]
    async fn test_bearer_token_authenticates() {
        let auth = Authenticator::new(&config(), Arc::new(MemorySessionStore::new()));
        let current = CurrentUser::from(user(9, true));
        let (token, ttl) = auth.issue_token(&current).unwrap();
        assert_eq!(ttl, 600);

        let headers = RequestHeaders::from_pairs(&[("Authorization", format!("Bearer {}", token))]);
        let resolved = auth
            .authenticate(&headers, &lookup_returning(Some(user(9, true))))
            .await
            .unwrap();
        assert_eq!(resolved.role, Role::Coach);
    }

    #[tokio::test]
    async fn test_missing_unknown_and_inactive() {
        let auth = Authenticator::new(&config(), Arc::new(MemorySessionStore::new()));

        let none = RequestHeaders::default();
        assert!(matches!(
            auth.authenticate(&none, &MockUserLookup::new()).await,
            Err(AuthError::Required)
        ));

        let stale = RequestHeaders {
            cookie: Some("camp_session=does-not-exist".into()),
            ..Default::default()
        };
        assert!(matches!(
            auth.authenticate(&stale, &MockUserLookup::new()).await,
            Err(AuthError::Expired)
        ));

        let session = auth.start_session(9);
        let headers = RequestHeaders {
            cookie: Some(format!("camp_session={}", session.id)),
            ..Default::default()
        };
        assert!(matches!(
            auth.authenticate(&headers, &lookup_returning(Some(user(9, false)))).await,
            Err(AuthError::Inactive)
        ));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let auth = Authenticator::new(&config(), Arc::new(MemorySessionStore::new()));
        let session = auth.start_session(9);
        let headers = RequestHeaders {
            cookie: Some(format!("camp_session={}", session.id)),
            ..Default::default()
        };
        auth.end_session(&headers);
        assert!(auth.sessions().get(&session.id).is_none());
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let err: CampError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.to_string(), "invalid email or password");
    }
}
