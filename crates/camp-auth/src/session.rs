//! Cookie sessions
//!
//! Sessions live in process memory; a restart logs everyone out.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use camp_core::Id;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "camp_session";

const SESSION_ID_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Id, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

fn generate_session_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let mut rng = rand::rng();
    (0..SESSION_ID_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Session backend
pub trait SessionStore: Send + Sync {
    /// A live session; expired ones are treated as absent
    fn get(&self, session_id: &str) -> Option<Session>;

    fn insert(&self, session: Session);

    fn delete(&self, session_id: &str);

    fn cleanup_expired(&self) -> usize;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .get(session_id)
            .filter(|s| s.is_valid())
            .cloned()
    }

    fn insert(&self, session: Session) {
        self.sessions.write().insert(session.id.clone(), session);
    }

    fn delete(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_valid_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Expired sessions cleaned up");
        }
        removed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// How the session cookie is written
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age_seconds: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE.to_string(),
            path: "/".to_string(),
            secure: true,
            same_site: SameSite::Lax,
            max_age_seconds: 7 * 24 * 60 * 60,
        }
    }
}

impl CookieConfig {
    pub fn from_config(config: &camp_core::config::AuthConfig) -> Self {
        Self {
            secure: config.secure_cookies,
            max_age_seconds: config.session_ttl_minutes * 60,
            ..Default::default()
        }
    }

    /// `Set-Cookie` value for a new session; always HttpOnly
    pub fn build_cookie(&self, session_id: &str) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, session_id),
            format!("Path={}", self.path),
            "HttpOnly".to_string(),
        ];
        parts.push(
            match self.same_site {
                SameSite::Strict => "SameSite=Strict",
                SameSite::Lax => "SameSite=Lax",
                SameSite::None => "SameSite=None",
            }
            .to_string(),
        );
        if self.secure {
            parts.push("Secure".to_string());
        }
        parts.push(format!("Max-Age={}", self.max_age_seconds));
        parts.join("; ")
    }

    pub fn build_clear_cookie(&self) -> String {
        format!("{}=; Path={}; HttpOnly; Max-Age=0", self.name, self.path)
    }
}

/// Session id from a `Cookie` header value
pub fn extract_session_id(cookie_header: &str, cookie_name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, value)| name.trim() == cookie_name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        let session = Session::new(1, Duration::hours(1));
        let id = session.id.clone();
        assert_eq!(id.len(), SESSION_ID_LENGTH);

        store.insert(session);
        assert_eq!(store.get(&id).map(|s| s.user_id), Some(1));

        store.delete(&id);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_expired_sessions_are_hidden_and_cleaned() {
        let store = MemorySessionStore::new();
        let expired = Session::new(1, Duration::seconds(-1));
        let id = expired.id.clone();
        store.insert(expired);
        store.insert(Session::new(2, Duration::hours(1)));

        assert!(store.get(&id).is_none());
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cookie_attributes() {
        let config = CookieConfig::default();
        let cookie = config.build_cookie("abc123");
        assert!(cookie.starts_with("camp_session=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=604800"));

        let dev = CookieConfig {
            secure: false,
            ..CookieConfig::default()
        };
        assert!(!dev.build_cookie("x").contains("Secure"));
        assert!(dev.build_clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_session_id() {
        let header = "theme=dark; camp_session=abc123; other=value";
        assert_eq!(extract_session_id(header, SESSION_COOKIE), Some("abc123".to_string()));
        assert_eq!(extract_session_id("camp_session=", SESSION_COOKIE), None);
        assert_eq!(extract_session_id(header, "missing"), None);
    }
}
