//! Result aliases and the service result pattern

use crate::error::{CampError, ValidationErrors};

/// Standard Result type for CampHQ operations
pub type CampResult<T> = Result<T, CampError>;

/// Outcome of a service object call
///
/// Services that validate user input report every problem they found rather
/// than stopping at the first one; `ServiceResult` carries those errors next
/// to an optional value and converts into `CampResult` at the API edge.
#[derive(Debug)]
pub struct ServiceResult<T> {
    success: bool,
    result: Option<T>,
    errors: ValidationErrors,
    message: Option<String>,
}

impl<T> ServiceResult<T> {
    pub fn success(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
            errors: ValidationErrors::new(),
            message: None,
        }
    }

    pub fn failure(errors: ValidationErrors) -> Self {
        Self {
            success: false,
            result: None,
            errors,
            message: None,
        }
    }

    pub fn failure_with_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::failure(errors)
    }

    pub fn failure_with_base_error(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_base(message);
        Self::failure(errors)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ServiceResult<U> {
        ServiceResult {
            success: self.success,
            result: self.result.map(f),
            errors: self.errors,
            message: self.message,
        }
    }

    pub fn and_then<U, F: FnOnce(T) -> ServiceResult<U>>(self, f: F) -> ServiceResult<U> {
        match (self.success, self.result) {
            (true, Some(result)) => f(result),
            _ => ServiceResult {
                success: false,
                result: None,
                errors: self.errors,
                message: self.message,
            },
        }
    }

    pub fn into_result(self) -> CampResult<T> {
        if self.success {
            self.result.ok_or_else(|| {
                CampError::Internal("ServiceResult success but no result value".into())
            })
        } else {
            Err(CampError::Validation(self.errors))
        }
    }
}

impl<T> From<CampResult<T>> for ServiceResult<T> {
    fn from(result: CampResult<T>) -> Self {
        match result {
            Ok(value) => ServiceResult::success(value),
            Err(CampError::Validation(errors)) => ServiceResult::failure(errors),
            Err(e) => ServiceResult::failure_with_base_error(e.to_string()),
        }
    }
}

impl<T> From<Result<T, ValidationErrors>> for ServiceResult<T> {
    fn from(result: Result<T, ValidationErrors>) -> Self {
        match result {
            Ok(value) => ServiceResult::success(value),
            Err(errors) => ServiceResult::failure(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_into_result() {
        let result = ServiceResult::success(5).map(|v| v * 2);
        assert!(result.is_success());
        assert_eq!(result.into_result().unwrap(), 10);
    }

    #[test]
    fn test_failure_short_circuits() {
        let result: ServiceResult<i32> = ServiceResult::failure_with_error("name", "can't be blank");
        let chained = result.and_then(|v| ServiceResult::success(v + 1));
        assert!(chained.is_failure());
        assert!(chained.errors().has_error("name"));

        match chained.into_result() {
            Err(CampError::Validation(errors)) => assert!(errors.has_error("name")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_camp_result() {
        let ok: ServiceResult<u8> = CampResult::Ok(1).into();
        assert!(ok.is_success());

        let err: ServiceResult<u8> = CampResult::Err(CampError::bad_request("bad date")).into();
        assert_eq!(err.errors().base_errors, vec!["bad date".to_string()]);
    }
}
