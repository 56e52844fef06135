//! Promo code contracts

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use camp_core::error::ValidationErrors;
use camp_core::Id;
use camp_models::DiscountKind;

use crate::base::{Contract, ValidationResult};

static CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").expect("valid promo code regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct PromoCodeParams {
    pub code: String,
    pub kind: DiscountKind,
    /// Basis points for `percent`, cents for `fixed`
    pub amount: i64,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub max_redemptions: Option<i32>,
    /// HQ creating for a tenant
    pub tenant_id: Option<Id>,
}

pub struct PromoCodeContract;

impl Contract<PromoCodeParams> for PromoCodeContract {
    fn validate(&self, params: &PromoCodeParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if !CODE_REGEX.is_match(params.code.trim()) {
            errors.add("code", "must be 3 to 32 letters, digits, dashes or underscores");
        }
        match params.kind {
            DiscountKind::Percent if !(1..=10_000).contains(&params.amount) => {
                errors.add("amount", "must be between 1 and 10000 basis points");
            }
            DiscountKind::Fixed if params.amount < 1 => {
                errors.add("amount", "must be at least 1 cent");
            }
            _ => {}
        }
        if let (Some(from), Some(until)) = (params.valid_from, params.valid_until) {
            if until < from {
                errors.add("valid_until", "must not be before valid_from");
            }
        }
        if matches!(params.max_redemptions, Some(max) if max < 1) {
            errors.add("max_redemptions", "must be at least 1");
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promo_rules() {
        let mut params = PromoCodeParams {
            code: "EARLY-BIRD".into(),
            kind: DiscountKind::Percent,
            amount: 1_500,
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            valid_until: NaiveDate::from_ymd_opt(2026, 2, 1),
            max_redemptions: Some(50),
            tenant_id: None,
        };
        assert!(PromoCodeContract.validate(&params).is_ok());

        params.amount = 10_001;
        params.code = "no spaces!".into();
        params.valid_until = NaiveDate::from_ymd_opt(2025, 12, 31);
        let errors = PromoCodeContract.validate(&params).unwrap_err();
        assert!(errors.has_error("amount"));
        assert!(errors.has_error("code"));
        assert!(errors.has_error("valid_until"));
    }
}
