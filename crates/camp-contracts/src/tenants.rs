//! Tenant contracts

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::{CampError, CampResult, Id};
use camp_models::tenant::RESERVED_SLUGS;
use camp_models::TenantStatus;

use crate::base::{collect_derive_errors, Contract, UserContext, ValidationResult};

static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,62}[a-z0-9]$").expect("valid slug regex"));

/// Complete, writable tenant attributes
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TenantAttributes {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    pub slug: String,
    #[validate(range(max = 10000, message = "must not exceed 10000 basis points"))]
    pub royalty_rate: u32,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub minimum_royalty_cents: i64,
    #[validate(email(message = "is not a valid email address"))]
    pub contact_email: String,
    #[validate(length(max = 120, message = "is too long"))]
    pub territory: Option<String>,
}

/// Create payload; royalty terms default from configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenantParams {
    pub name: String,
    pub slug: String,
    pub royalty_rate: Option<u32>,
    pub minimum_royalty_cents: Option<i64>,
    pub contact_email: String,
    pub territory: Option<String>,
}

/// Patch payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenantParams {
    pub name: Option<String>,
    pub royalty_rate: Option<u32>,
    pub minimum_royalty_cents: Option<i64>,
    pub contact_email: Option<String>,
    pub territory: Option<String>,
}

impl UpdateTenantParams {
    pub fn touches_royalty_terms(&self) -> bool {
        self.royalty_rate.is_some() || self.minimum_royalty_cents.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeTenantStatusParams {
    pub status: TenantStatus,
}

pub fn validate_slug(slug: &str, errors: &mut ValidationErrors) {
    if !SLUG_REGEX.is_match(slug) {
        errors.add(
            "slug",
            "must be 3 to 64 lowercase letters, digits or dashes, not starting or ending with a dash",
        );
    } else if RESERVED_SLUGS.contains(&slug) {
        errors.add("slug", "is reserved");
    }
}

/// Shape rules for tenant attributes
pub struct TenantContract;

impl Contract<TenantAttributes> for TenantContract {
    fn validate(&self, attrs: &TenantAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);
        validate_slug(&attrs.slug, &mut errors);
        if attrs.name.trim().is_empty() && !errors.has_error("name") {
            errors.add("name", "can't be blank");
        }
        errors.into_result()
    }
}

/// Update rules: owners may only edit the profile of their own tenant
pub struct UpdateTenantContract<'a, U: UserContext> {
    user: &'a U,
    tenant_id: Id,
}

impl<'a, U: UserContext> UpdateTenantContract<'a, U> {
    pub fn new(user: &'a U, tenant_id: Id) -> Self {
        Self { user, tenant_id }
    }

    pub fn check_params(&self, params: &UpdateTenantParams) -> CampResult<()> {
        let mut errors = ValidationErrors::new();
        if !self.user.is_hq() {
            if self.user.tenant_id() != Some(self.tenant_id) {
                return Err(CampError::not_found("Tenant", self.tenant_id));
            }
            if params.royalty_rate.is_some() && !self.is_writable("royalty_rate") {
                errors.add("royalty_rate", "can only be changed by HQ");
            }
            if params.minimum_royalty_cents.is_some() && !self.is_writable("minimum_royalty_cents")
            {
                errors.add("minimum_royalty_cents", "can only be changed by HQ");
            }
        }
        errors.into_result().map_err(Into::into)
    }
}

impl<'a, U: UserContext> Contract<TenantAttributes> for UpdateTenantContract<'a, U> {
    fn validate(&self, attrs: &TenantAttributes) -> ValidationResult {
        TenantContract.validate(attrs)
    }

    fn is_writable(&self, attribute: &str) -> bool {
        if self.user.is_hq() {
            attribute != "slug"
        } else {
            matches!(attribute, "name" | "contact_email" | "territory")
        }
    }
}
