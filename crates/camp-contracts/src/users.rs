//! User contracts

use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::Id;
use camp_models::Role;

use crate::base::{collect_derive_errors, Contract, UserContext, ValidationResult};

pub const MIN_PASSWORD_LENGTH: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginParams {
    pub email: String,
    pub password: String,
}

/// Parent self-signup under a tenant slug
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupParams {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 10, max = 256, message = "must be at least 10 characters"))]
    pub password: String,
}

/// Staff account created by HQ or a licensee owner
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserParams {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 10, max = 256, message = "must be at least 10 characters"))]
    pub password: String,
    pub role: Role,
    pub tenant_id: Option<Id>,
}

pub struct SignupContract;

impl Contract<SignupParams> for SignupContract {
    fn validate(&self, params: &SignupParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(params, &mut errors);
        errors.into_result()
    }
}

/// Who may create which account
pub struct CreateUserContract<'a, U: UserContext> {
    user: &'a U,
}

impl<'a, U: UserContext> CreateUserContract<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }

    /// Tenant the new account lands in
    pub fn target_tenant(&self, params: &CreateUserParams) -> Option<Id> {
        if self.user.is_hq() {
            params.tenant_id
        } else {
            self.user.tenant_id()
        }
    }

    fn validate_role_rules(&self, params: &CreateUserParams, errors: &mut ValidationErrors) {
        if self.user.is_hq() {
            match (params.role, params.tenant_id) {
                (Role::HqAdmin, Some(_)) => {
                    errors.add("tenant_id", "must be empty for HQ admins");
                }
                (Role::HqAdmin, None) => {}
                (_, None) => errors.add("tenant_id", "is required"),
                _ => {}
            }
        } else if !matches!(params.role, Role::Director | Role::Coach) {
            errors.add("role", "must be director or coach");
        } else if params.tenant_id.is_some() && params.tenant_id != self.user.tenant_id() {
            errors.add("tenant_id", "must be your own tenant");
        }
    }
}

impl<'a, U: UserContext> Contract<CreateUserParams> for CreateUserContract<'a, U> {
    fn validate(&self, params: &CreateUserParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(params, &mut errors);
        self.validate_role_rules(params, &mut errors);
        errors.into_result()
    }

    fn is_writable(&self, attribute: &str) -> bool {
        attribute != "tenant_id" || self.user.is_hq()
    }
}
