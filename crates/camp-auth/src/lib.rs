//! # camp-auth
//!
//! Authentication for CampHQ.
//!
//! - Argon2 password hashing
//! - In-memory sessions carried in the `camp_session` cookie
//! - Short-lived bearer JWTs for kiosk devices
//! - `Authenticator`, which resolves request headers to a `CurrentUser`

pub mod current_user;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;

pub use current_user::CurrentUser;
pub use jwt::{extract_bearer_token, Claims, JwtError, JwtService};
pub use middleware::{AuthError, AuthStrategy, Authenticator, RequestHeaders, UserLookup};
pub use password::{hash_password, verify_password, PasswordError};
pub use session::{
    extract_session_id, CookieConfig, MemorySessionStore, SameSite, Session, SessionStore,
    SESSION_COOKIE,
};
