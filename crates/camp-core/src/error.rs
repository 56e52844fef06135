//! Core error types for CampHQ
//!
//! Every failure a request can hit ends up as a `CampError`, which knows the
//! HTTP status it maps to. Field-level problems are collected in
//! `ValidationErrors` first so a client sees all of them at once.

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type for all CampHQ operations
#[derive(Error, Debug)]
pub enum CampError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("validation failed: {}", .0.full_messages().join(", "))]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("cannot change {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("external service error: {service} - {message}")]
    ExternalService { service: String, message: String },
}

impl CampError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CampError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        CampError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CampError::Forbidden {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        CampError::BadRequest(message.into())
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        CampError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        CampError::Validation(errors)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            CampError::NotFound { .. } => 404,
            CampError::Unauthorized { .. } => 401,
            CampError::Forbidden { .. } => 403,
            CampError::Validation(_)
            | CampError::BadRequest(_)
            | CampError::InvalidTransition { .. }
            | CampError::PaymentDeclined(_) => 400,
            CampError::Database(_)
            | CampError::Internal(_)
            | CampError::Config(_)
            | CampError::ExternalService { .. } => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CampError::NotFound { .. } => "not_found",
            CampError::Unauthorized { .. } => "unauthorized",
            CampError::Forbidden { .. } => "forbidden",
            CampError::Validation(_) => "validation_failed",
            CampError::BadRequest(_) => "bad_request",
            CampError::InvalidTransition { .. } => "invalid_transition",
            CampError::PaymentDeclined(_) => "payment_declined",
            CampError::Database(_) => "database_error",
            CampError::Internal(_) => "internal_error",
            CampError::Config(_) => "configuration_error",
            CampError::ExternalService { .. } => "external_service_error",
        }
    }

    /// Server-side failures whose detail must not reach the client
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Validation errors collected per field
///
/// Ordered maps keep `full_messages` stable, which matters for API clients
/// that show the first message inline.
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    pub errors: BTreeMap<String, Vec<String>>,
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(source: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in source.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", error.code));
                errors.add(field, message);
            }
        }
        errors
    }
}

impl From<validator::ValidationErrors> for CampError {
    fn from(source: validator::ValidationErrors) -> Self {
        CampError::Validation(source.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CampError::not_found("Camp", 1).status_code(), 404);
        assert_eq!(CampError::unauthorized("login required").status_code(), 401);
        assert_eq!(CampError::forbidden("nope").status_code(), 403);
        assert_eq!(CampError::invalid("name", "can't be blank").status_code(), 400);
        assert_eq!(
            CampError::invalid_transition("camp", "completed", "draft").status_code(),
            400
        );
        assert_eq!(CampError::Database("boom".into()).status_code(), 500);
        assert!(CampError::Internal("x".into()).is_server_error());
    }

    #[test]
    fn test_full_messages_are_ordered() {
        let mut errors = ValidationErrors::new();
        errors.add("slug", "is reserved");
        errors.add("name", "can't be blank");
        errors.add_base("tenant is suspended");

        assert_eq!(
            errors.full_messages(),
            vec![
                "tenant is suspended".to_string(),
                "name can't be blank".to_string(),
                "slug is reserved".to_string(),
            ]
        );
    }

    #[test]
    fn test_merge_and_into_result() {
        let mut a = ValidationErrors::new();
        assert!(a.clone().into_result().is_ok());

        let mut b = ValidationErrors::new();
        b.add("capacity", "must be positive");
        a.merge(b);

        let err = a.into_result().unwrap_err();
        assert!(err.has_error("capacity"));
    }

    #[test]
    fn test_transition_message() {
        let err = CampError::invalid_transition("registration", "cancelled", "confirmed");
        assert_eq!(
            err.to_string(),
            "cannot change registration from cancelled to confirmed"
        );
    }
}
