//! Checkout contracts

use std::collections::HashSet;

use serde::Deserialize;

use camp_core::error::ValidationErrors;
use camp_core::Id;

use crate::base::{Contract, ValidationResult};

pub const MAX_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct CheckoutItem {
    pub camp_id: Id,
    pub athlete_id: Id,
}

/// Cart submitted for a quote or a checkout
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutParams {
    pub items: Vec<CheckoutItem>,
    pub promo_code: Option<String>,
    /// Required to check out, ignored by quotes
    pub payment_token: Option<String>,
    /// Staff checking out on behalf of a parent
    pub parent_id: Option<Id>,
}

/// Cart shape rules; `require_payment` is false for quotes
pub struct CheckoutContract {
    pub require_payment: bool,
}

impl Contract<CheckoutParams> for CheckoutContract {
    fn validate(&self, params: &CheckoutParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if params.items.is_empty() {
            errors.add("items", "must contain at least one camp");
        } else if params.items.len() > MAX_ITEMS {
            errors.add("items", format!("must contain at most {} camps", MAX_ITEMS));
        }

        let mut seen = HashSet::new();
        if params.items.iter().any(|item| !seen.insert(*item)) {
            errors.add("items", "contain the same athlete and camp twice");
        }

        if self.require_payment
            && params
                .payment_token
                .as_deref()
                .map_or(true, |token| token.trim().is_empty())
        {
            errors.add("payment_token", "can't be blank");
        }

        if let Some(code) = &params.promo_code {
            if code.trim().len() > 32 {
                errors.add("promo_code", "is too long");
            }
        }

        errors.into_result()
    }
}
