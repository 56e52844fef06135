//! # camp-api
//!
//! JSON HTTP API for CampHQ, mounted under `/api`.
//!
//! Handlers stay thin: they extract the caller and the request payload,
//! hand both to a service from `camp-services` and serialize the result.
//! Errors of every layer leave through [`error::ApiError`].

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use extractors::AppState;
pub use routes::router;

#[cfg(test)]
mod tests;
