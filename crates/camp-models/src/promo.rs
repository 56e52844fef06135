//! Promo code model
//!
//! Table: promo_codes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{BasisPoints, Cents};

use crate::{Id, TenantScoped};

text_enum! {
    pub enum DiscountKind {
        Percent => "percent",
        Fixed => "fixed",
    }
}

/// Tenant-scoped discount code; codes match case-insensitively
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Id,
    pub tenant_id: Id,
    /// Stored uppercased
    pub code: String,
    pub kind: DiscountKind,
    /// Basis points for `percent`, cents for `fixed`
    pub amount: i64,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub max_redemptions: Option<i32>,
    pub redemptions: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Redeemable on `today`: active, inside the inclusive window, under the cap
    pub fn is_redeemable(&self, today: NaiveDate) -> bool {
        self.active
            && self.valid_from.map_or(true, |from| from <= today)
            && self.valid_until.map_or(true, |until| today <= until)
            && self.max_redemptions.map_or(true, |max| self.redemptions < max)
    }

    /// Discount on `subtotal`, never more than the subtotal
    pub fn discount_for(&self, subtotal: Cents) -> Cents {
        if !subtotal.is_positive() {
            return Cents::ZERO;
        }
        let discount = match self.kind {
            DiscountKind::Percent => {
                let rate = BasisPoints(u32::try_from(self.amount.clamp(0, 10_000)).unwrap_or(0));
                subtotal.apply_rate(rate)
            }
            DiscountKind::Fixed => Cents(self.amount.max(0)),
        };
        discount.min(subtotal)
    }
}

impl TenantScoped for PromoCode {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(kind: DiscountKind, amount: i64) -> PromoCode {
        PromoCode {
            id: 1,
            tenant_id: 1,
            code: "EARLY".into(),
            kind,
            amount,
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            valid_until: NaiveDate::from_ymd_opt(2026, 3, 31),
            max_redemptions: Some(2),
            redemptions: 0,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_window_is_inclusive() {
        let code = promo(DiscountKind::Percent, 1_000);
        assert!(code.is_redeemable(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        assert!(code.is_redeemable(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()));
        assert!(!code.is_redeemable(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));

        let mut used_up = promo(DiscountKind::Percent, 1_000);
        used_up.redemptions = 2;
        assert!(!used_up.is_redeemable(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        assert_eq!(promo(DiscountKind::Percent, 1_000).discount_for(Cents(29_900)), Cents(2_990));
        assert_eq!(promo(DiscountKind::Fixed, 5_000).discount_for(Cents(29_900)), Cents(5_000));
        assert_eq!(promo(DiscountKind::Fixed, 50_000).discount_for(Cents(29_900)), Cents(29_900));
        assert_eq!(promo(DiscountKind::Fixed, 5_000).discount_for(Cents::ZERO), Cents::ZERO);
        assert_eq!(PromoCode::normalize(" early "), "EARLY");
    }
}
