//! Promo code administration
//!
//! Redemption happens inside checkout under a row lock; this module only
//! creates codes and switches them on and off.

use serde::Deserialize;
use tracing::{info, instrument};

use camp_contracts::permissions::effective_tenant;
use camp_contracts::promo_codes::{PromoCodeContract, PromoCodeParams};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampResult, Id};
use camp_db::{NewPromoCode, Repository};
use camp_models::PromoCode;

use crate::base::scoped;
use crate::context::ServiceContext;
use crate::registrations::staff_tenant_filter;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoCodeListParams {
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveParams {
    pub active: bool,
}

fn new_promo_code(params: &PromoCodeParams) -> NewPromoCode {
    NewPromoCode {
        code: PromoCode::normalize(&params.code),
        kind: params.kind,
        amount: params.amount,
        valid_from: params.valid_from,
        valid_until: params.valid_until,
        max_redemptions: params.max_redemptions,
    }
}

pub struct PromoCodeService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> PromoCodeService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list(&self, params: PromoCodeListParams) -> CampResult<Vec<PromoCode>> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = staff_tenant_filter(self.user, params.tenant_id);
        Ok(self.ctx.promo_codes().list(tenant_id).await?)
    }

    /// Duplicate codes within a tenant surface as 400
    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn create(&self, params: PromoCodeParams) -> CampResult<PromoCode> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = effective_tenant(self.user, params.tenant_id)?;
        PromoCodeContract.validate(&params)?;

        let promo = self
            .ctx
            .promo_codes()
            .create(tenant_id, &new_promo_code(&params))
            .await?;
        info!(promo_code_id = promo.id, code = %promo.code, tenant_id, "Promo code created");
        Ok(promo)
    }

    pub async fn set_active(&self, id: Id, params: SetActiveParams) -> CampResult<PromoCode> {
        authorize(self.user, Action::ManageCamps)?;
        let promo = scoped(
            self.user,
            self.ctx.promo_codes().find_by_id(id).await?,
            "PromoCode",
            id,
        )?;
        if promo.active == params.active {
            return Ok(promo);
        }
        let updated = self.ctx.promo_codes().set_active(promo.id, params.active).await?;
        info!(promo_code_id = updated.id, active = updated.active, "Promo code toggled");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_models::DiscountKind;

    #[test]
    fn test_codes_are_stored_upper_case() {
        let params = PromoCodeParams {
            code: " early-bird ".into(),
            kind: DiscountKind::Fixed,
            amount: 2_500,
            valid_from: None,
            valid_until: None,
            max_redemptions: None,
            tenant_id: None,
        };
        assert!(PromoCodeContract.validate(&params).is_ok());
        let promo = new_promo_code(&params);
        assert_eq!(promo.code, "EARLY-BIRD");
        assert_eq!(promo.amount, 2_500);
    }
}
