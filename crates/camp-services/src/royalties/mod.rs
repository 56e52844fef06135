//! Royalty statements and invoices

pub mod statement;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, UserContext};
use camp_core::{CampError, CampResult, Id, ReportingPeriod, StatusFlow};
use camp_db::{NewInvoice, Repository, RoyaltyRepository};
use camp_models::{InvoiceStatus, RoyaltyInvoice, Tenant};
use camp_notifications::{EmailAddress, InvoiceIssued};

use crate::base::{commit, scoped};
use crate::context::ServiceContext;

pub use statement::{compute_statement, statement_for, RoyaltyStatement};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListParams {
    pub status: Option<InvoiceStatus>,
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceStatusParams {
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueOutcome {
    pub invoices: Vec<RoyaltyInvoice>,
    /// Invoices created by this call; the rest already existed
    pub created: usize,
}

pub struct RoyaltyService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> RoyaltyService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn statement(
        &self,
        tenant_id: Option<Id>,
        period: ReportingPeriod,
    ) -> CampResult<RoyaltyStatement> {
        authorize(self.user, Action::ViewRoyaltyStatement)?;
        let tenant_id = effective_tenant(self.user, tenant_id)?;
        let tenant = scoped(
            self.user,
            self.ctx.tenants().find_by_id(tenant_id).await?,
            "Tenant",
            tenant_id,
        )?;

        let totals = self.ctx.royalties().revenue_for_tenant(tenant.id, &period).await?;
        Ok(statement_for(&tenant, period, totals))
    }

    /// One invoice per active tenant; reissuing a period returns the
    /// existing invoices unchanged
    #[instrument(skip(self), fields(user_id = self.user.id(), from = %period.from, to = %period.to))]
    pub async fn issue_invoices(&self, period: ReportingPeriod) -> CampResult<IssueOutcome> {
        authorize(self.user, Action::ManageInvoices)?;

        let tenants = self.ctx.tenants().list_active().await?;
        let revenue = self.ctx.royalties().revenue_by_tenant(None, &period).await?;

        let mut tx = self.ctx.begin().await?;
        let mut invoices = Vec::with_capacity(tenants.len());
        let mut created: Vec<(RoyaltyInvoice, &Tenant)> = Vec::new();
        for tenant in &tenants {
            let totals = revenue
                .iter()
                .find(|(id, _)| *id == tenant.id)
                .map(|(_, totals)| *totals)
                .unwrap_or_default();
            let statement = statement_for(tenant, period, totals);

            let new = NewInvoice {
                tenant_id: tenant.id,
                period,
                gross_revenue_cents: statement.gross_revenue_cents,
                refunds_cents: statement.refunds_cents,
                net_revenue_cents: statement.net_revenue_cents,
                rate: statement.rate,
                royalty_due_cents: statement.royalty_due_cents,
            };
            let (invoice, inserted) = RoyaltyRepository::insert_invoice(&mut tx, &new).await?;
            if inserted {
                created.push((invoice.clone(), tenant));
            }
            invoices.push(invoice);
        }
        commit(tx).await?;

        info!(
            tenants = tenants.len(),
            created = created.len(),
            "Royalty invoices issued"
        );

        for (invoice, tenant) in &created {
            let data = InvoiceIssued {
                tenant_name: tenant.name.clone(),
                period: invoice.period(),
                net_revenue_cents: invoice.net_revenue_cents,
                rate: invoice.rate,
                royalty_due_cents: invoice.royalty_due_cents,
            };
            let to = EmailAddress::new(&tenant.contact_email).with_name(&tenant.name);
            if !self
                .ctx
                .send_email(self.ctx.mailer.royalty_invoice_issued(to, &data))
                .await
            {
                warn!(invoice_id = invoice.id, "Invoice email not delivered");
            }
        }

        Ok(IssueOutcome {
            created: created.len(),
            invoices,
        })
    }

    pub async fn list_invoices(&self, params: InvoiceListParams) -> CampResult<Vec<RoyaltyInvoice>> {
        authorize(self.user, Action::ViewInvoices)?;
        let tenant_id = match self.user.tenant_id() {
            Some(own) => Some(own),
            None => params.tenant_id,
        };
        Ok(self
            .ctx
            .royalties()
            .list_invoices(tenant_id, params.status)
            .await?)
    }

    /// `issued -> paid | void`
    #[instrument(skip(self), fields(user_id = self.user.id()))]
    pub async fn set_status(&self, id: Id, status: InvoiceStatus) -> CampResult<RoyaltyInvoice> {
        authorize(self.user, Action::ManageInvoices)?;
        let repo = self.ctx.royalties();
        let invoice = repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CampError::not_found("Invoice", id))?;
        invoice.status.transition_to(status)?;

        let updated = repo
            .set_invoice_status(id, invoice.status, status)
            .await?
            .ok_or_else(|| CampError::invalid_transition("invoice", invoice.status, status))?;
        info!(invoice_id = id, status = %status, "Invoice status changed");
        Ok(updated)
    }
}
