//! Licensee (tenant) administration

use serde::Deserialize;
use tracing::{info, instrument};

use camp_contracts::tenants::{
    ChangeTenantStatusParams, CreateTenantParams, TenantAttributes, TenantContract,
    UpdateTenantContract, UpdateTenantParams,
};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{BasisPoints, CampError, CampResult, Cents, Id, Page, PaginationParams, StatusFlow};
use camp_db::{Repository, TenantValues};
use camp_models::{Tenant, TenantStatus};

use crate::base::scoped;
use crate::context::{ServiceContext, ServiceSettings};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantListParams {
    pub status: Option<TenantStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl TenantListParams {
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }
}

/// Fill unset royalty terms from configuration
pub fn creation_attributes(params: CreateTenantParams, settings: &ServiceSettings) -> TenantAttributes {
    TenantAttributes {
        name: params.name,
        slug: params.slug.trim().to_lowercase(),
        royalty_rate: params
            .royalty_rate
            .unwrap_or(settings.default_royalty_rate.value()),
        minimum_royalty_cents: params
            .minimum_royalty_cents
            .unwrap_or(settings.default_minimum_royalty.value()),
        contact_email: params.contact_email,
        territory: params.territory,
    }
}

fn tenant_attributes(tenant: &Tenant) -> TenantAttributes {
    TenantAttributes {
        name: tenant.name.clone(),
        slug: tenant.slug.clone(),
        royalty_rate: tenant.royalty_rate.value(),
        minimum_royalty_cents: tenant.minimum_royalty_cents.value(),
        contact_email: tenant.contact_email.clone(),
        territory: tenant.territory.clone(),
    }
}

fn apply_update(attrs: &mut TenantAttributes, params: UpdateTenantParams) {
    if let Some(name) = params.name {
        attrs.name = name;
    }
    if let Some(rate) = params.royalty_rate {
        attrs.royalty_rate = rate;
    }
    if let Some(minimum) = params.minimum_royalty_cents {
        attrs.minimum_royalty_cents = minimum;
    }
    if let Some(email) = params.contact_email {
        attrs.contact_email = email;
    }
    if params.territory.is_some() {
        attrs.territory = params.territory;
    }
}

fn tenant_values(attrs: &TenantAttributes) -> TenantValues {
    TenantValues {
        name: attrs.name.trim().to_string(),
        slug: attrs.slug.clone(),
        royalty_rate: BasisPoints(attrs.royalty_rate),
        minimum_royalty_cents: Cents(attrs.minimum_royalty_cents),
        contact_email: attrs.contact_email.trim().to_lowercase(),
        territory: attrs
            .territory
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
    }
}

pub struct TenantService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> TenantService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list(&self, params: TenantListParams) -> CampResult<Page<Tenant>> {
        authorize(self.user, Action::ManageTenants)?;
        Ok(self
            .ctx
            .tenants()
            .list(params.status, params.pagination())
            .await?)
    }

    pub async fn get(&self, id: Id) -> CampResult<Tenant> {
        authorize(self.user, Action::EditTenantProfile)?;
        scoped(self.user, self.ctx.tenants().find_by_id(id).await?, "Tenant", id)
    }

    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn create(&self, params: CreateTenantParams) -> CampResult<Tenant> {
        authorize(self.user, Action::ManageTenants)?;
        let attrs = creation_attributes(params, &self.ctx.settings);
        TenantContract.validate(&attrs)?;

        let repo = self.ctx.tenants();
        if repo.find_by_slug(&attrs.slug).await?.is_some() {
            return Err(CampError::invalid("slug", "has already been taken"));
        }
        let tenant = repo.create(&tenant_values(&attrs)).await?;
        info!(tenant_id = tenant.id, slug = %tenant.slug, "Tenant created");
        Ok(tenant)
    }

    /// HQ edits everything but the slug; owners edit their own profile
    pub async fn update(&self, id: Id, params: UpdateTenantParams) -> CampResult<Tenant> {
        authorize(self.user, Action::EditTenantProfile)?;
        let contract = UpdateTenantContract::new(self.user, id);
        contract.check_params(&params)?;
        let tenant = self.get(id).await?;

        let touches_terms = params.touches_royalty_terms();
        let mut attrs = tenant_attributes(&tenant);
        apply_update(&mut attrs, params);
        contract.validate(&attrs)?;

        let updated = self.ctx.tenants().update(tenant.id, &tenant_values(&attrs)).await?;
        info!(tenant_id = updated.id, royalty_terms = touches_terms, "Tenant updated");
        Ok(updated)
    }

    pub async fn change_status(&self, id: Id, params: ChangeTenantStatusParams) -> CampResult<Tenant> {
        authorize(self.user, Action::ManageTenants)?;
        let tenant = self.get(id).await?;
        let next = tenant.status.transition_to(params.status)?;

        let updated = self.ctx.tenants().set_status(tenant.id, next).await?;
        info!(
            tenant_id = updated.id,
            from = %tenant.status,
            to = %next,
            "Tenant status changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateTenantParams {
        CreateTenantParams {
            name: "Rocky Mountain Camps".into(),
            slug: " Rocky-Mtn ".into(),
            royalty_rate: None,
            minimum_royalty_cents: None,
            contact_email: "Owner@RMC.example".into(),
            territory: Some("  ".into()),
        }
    }

    #[test]
    fn test_creation_defaults_from_settings() {
        let settings = ServiceSettings {
            default_royalty_rate: BasisPoints::percent(7),
            default_minimum_royalty: Cents(50_000),
            ..Default::default()
        };
        let attrs = creation_attributes(params(), &settings);
        assert_eq!(attrs.slug, "rocky-mtn");
        assert_eq!(attrs.royalty_rate, 700);
        assert_eq!(attrs.minimum_royalty_cents, 50_000);
        assert!(TenantContract.validate(&attrs).is_ok());

        let values = tenant_values(&attrs);
        assert_eq!(values.contact_email, "owner@rmc.example");
        assert_eq!(values.territory, None);
    }

    #[test]
    fn test_list_pagination_is_clamped() {
        let params = TenantListParams {
            page: Some(0),
            per_page: Some(1_000),
            ..Default::default()
        };
        let page = params.pagination();
        assert_eq!((page.page, page.per_page), (1, 200));
        assert_eq!(TenantListParams::default().pagination().per_page, 25);
    }

    #[test]
    fn test_explicit_terms_win() {
        let mut p = params();
        p.royalty_rate = Some(1_000);
        let attrs = creation_attributes(p, &ServiceSettings::default());
        assert_eq!(attrs.royalty_rate, 1_000);
    }

    #[test]
    fn test_apply_update_keeps_unset_fields() {
        let mut attrs = creation_attributes(params(), &ServiceSettings::default());
        apply_update(
            &mut attrs,
            UpdateTenantParams {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        );
        assert_eq!(attrs.name, "Renamed");
        assert_eq!(attrs.slug, "rocky-mtn");
        assert_eq!(attrs.royalty_rate, 800);
    }
}
