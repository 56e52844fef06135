//! HQ dashboard and licensee analytics
//!
//! Both views are built from the same three aggregates for a reporting
//! period: revenue, registrations created, and the load of camps running
//! in the period. Figures are assembled by pure functions so the roll-up
//! rules can be tested without a database.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, UserContext};
use camp_core::{BasisPoints, CampError, CampResult, Cents, Id, ReportingPeriod};
use camp_db::{CampLoad, Repository, RevenueTotals};
use camp_models::{CampStatus, RegistrationStatus, Tenant, TenantStatus};

use crate::base::scoped;
use crate::context::ServiceContext;
use crate::royalties::statement_for;

/// Query string of both dashboards; defaults to the current month
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub tenant_id: Option<Id>,
}

impl PeriodParams {
    pub fn period(&self, today: NaiveDate) -> CampResult<ReportingPeriod> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => ReportingPeriod::new(from, to),
            (None, None) => ReportingPeriod::month_of(today),
            _ => Err(CampError::bad_request(
                "from and to must be given together",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub waitlisted: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: RegistrationStatus, count: i64) {
        match status {
            RegistrationStatus::Pending => self.pending += count,
            RegistrationStatus::Confirmed => self.confirmed += count,
            RegistrationStatus::Waitlisted => self.waitlisted += count,
            RegistrationStatus::Cancelled => self.cancelled += count,
        }
        self.total += count;
    }

    fn merge(&mut self, other: &StatusCounts) {
        self.pending += other.pending;
        self.confirmed += other.confirmed;
        self.waitlisted += other.waitlisted;
        self.cancelled += other.cancelled;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampFigures {
    pub camp_id: Id,
    pub name: String,
    pub status: CampStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity: i64,
    pub enrollment: i64,
    pub fill_rate: BasisPoints,
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    pub net_revenue_cents: Cents,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantFigures {
    pub tenant_id: Id,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    pub net_revenue_cents: Cents,
    pub royalty_due_cents: Cents,
    pub registrations: StatusCounts,
    pub camps: usize,
    pub enrollment: i64,
    pub capacity: i64,
    pub fill_rate: BasisPoints,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardTotals {
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    pub net_revenue_cents: Cents,
    pub royalty_due_cents: Cents,
    pub registrations: StatusCounts,
    pub camps: usize,
    pub enrollment: i64,
    pub capacity: i64,
    pub fill_rate: BasisPoints,
    pub active_tenants: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HqDashboard {
    pub period: ReportingPeriod,
    pub tenants: Vec<TenantFigures>,
    pub totals: DashboardTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseeAnalytics {
    pub period: ReportingPeriod,
    pub tenant: TenantFigures,
    pub camps: Vec<CampFigures>,
}

/// Figures of one tenant; `loads` must already be filtered to the tenant
pub fn tenant_figures(
    tenant: &Tenant,
    period: ReportingPeriod,
    revenue: RevenueTotals,
    registrations: StatusCounts,
    loads: &[&CampLoad],
) -> TenantFigures {
    let statement = statement_for(tenant, period, revenue);
    let enrollment: i64 = loads.iter().map(|l| l.enrollment).sum();
    let capacity: i64 = loads.iter().map(|l| l.capacity).sum();
    TenantFigures {
        tenant_id: tenant.id,
        name: tenant.name.clone(),
        slug: tenant.slug.clone(),
        status: tenant.status,
        gross_revenue_cents: statement.gross_revenue_cents,
        refunds_cents: statement.refunds_cents,
        net_revenue_cents: statement.net_revenue_cents,
        royalty_due_cents: statement.royalty_due_cents,
        registrations,
        camps: loads.len(),
        enrollment,
        capacity,
        fill_rate: BasisPoints::ratio(enrollment, capacity),
    }
}

/// Per-tenant figures sorted by net revenue (highest first, then name)
/// and their totals
pub fn summarize(
    period: ReportingPeriod,
    tenants: &[Tenant],
    revenue: &[(Id, RevenueTotals)],
    created: &[(Id, RegistrationStatus, i64)],
    loads: &[CampLoad],
) -> HqDashboard {
    let revenue: HashMap<Id, RevenueTotals> = revenue.iter().copied().collect();
    let mut counts: HashMap<Id, StatusCounts> = HashMap::new();
    for (tenant_id, status, count) in created {
        counts.entry(*tenant_id).or_default().add(*status, *count);
    }

    let mut rows: Vec<TenantFigures> = tenants
        .iter()
        .map(|tenant| {
            let tenant_loads: Vec<&CampLoad> =
                loads.iter().filter(|l| l.tenant_id == tenant.id).collect();
            tenant_figures(
                tenant,
                period,
                revenue.get(&tenant.id).copied().unwrap_or_default(),
                counts.get(&tenant.id).copied().unwrap_or_default(),
                &tenant_loads,
            )
        })
        .collect();
    rows.sort_by(|a, b| {
        b.net_revenue_cents
            .cmp(&a.net_revenue_cents)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut totals = DashboardTotals {
        active_tenants: tenants.iter().filter(|t| t.is_active()).count(),
        ..Default::default()
    };
    for row in &rows {
        totals.gross_revenue_cents += row.gross_revenue_cents;
        totals.refunds_cents += row.refunds_cents;
        totals.net_revenue_cents += row.net_revenue_cents;
        totals.royalty_due_cents += row.royalty_due_cents;
        totals.registrations.merge(&row.registrations);
        totals.camps += row.camps;
        totals.enrollment += row.enrollment;
        totals.capacity += row.capacity;
    }
    totals.fill_rate = BasisPoints::ratio(totals.enrollment, totals.capacity);

    HqDashboard {
        period,
        tenants: rows,
        totals,
    }
}

pub fn camp_figures(loads: &[CampLoad], revenue: &[(Id, RevenueTotals)]) -> Vec<CampFigures> {
    let revenue: HashMap<Id, RevenueTotals> = revenue.iter().copied().collect();
    loads
        .iter()
        .map(|load| {
            let totals = revenue.get(&load.camp_id).copied().unwrap_or_default();
            CampFigures {
                camp_id: load.camp_id,
                name: load.name.clone(),
                status: load.status,
                start_date: load.start_date,
                end_date: load.end_date,
                capacity: load.capacity,
                enrollment: load.enrollment,
                fill_rate: BasisPoints::ratio(load.enrollment, load.capacity),
                gross_revenue_cents: totals.gross_cents,
                refunds_cents: totals.refunds_cents,
                net_revenue_cents: totals.net_cents(),
            }
        })
        .collect()
}

pub struct DashboardService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> DashboardService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    #[instrument(skip(self), fields(from = %period.from, to = %period.to))]
    pub async fn hq(&self, period: ReportingPeriod) -> CampResult<HqDashboard> {
        authorize(self.user, Action::ViewDashboard)?;

        let tenants = self.ctx.tenants().all().await?;
        let revenue = self.ctx.royalties().revenue_by_tenant(None, &period).await?;
        let created = self
            .ctx
            .registrations()
            .created_by_status(None, period.from_instant(), period.to_instant())
            .await?;
        let loads = self.ctx.dashboard().camp_load(None, &period).await?;

        Ok(summarize(period, &tenants, &revenue, &created, &loads))
    }

    pub async fn licensee(
        &self,
        tenant_id: Option<Id>,
        period: ReportingPeriod,
    ) -> CampResult<LicenseeAnalytics> {
        authorize(self.user, Action::ViewAnalytics)?;
        let tenant_id = effective_tenant(self.user, tenant_id)?;
        let tenant = scoped(
            self.user,
            self.ctx.tenants().find_by_id(tenant_id).await?,
            "Tenant",
            tenant_id,
        )?;

        let royalties = self.ctx.royalties();
        let revenue = royalties.revenue_for_tenant(tenant.id, &period).await?;
        let camp_revenue = royalties.revenue_by_camp(tenant.id, &period).await?;
        let created = self
            .ctx
            .registrations()
            .created_by_status(Some(tenant.id), period.from_instant(), period.to_instant())
            .await?;
        let loads = self.ctx.dashboard().camp_load(Some(tenant.id), &period).await?;

        let mut counts = StatusCounts::default();
        for (_, status, count) in &created {
            counts.add(*status, *count);
        }
        let load_refs: Vec<&CampLoad> = loads.iter().collect();
        Ok(LicenseeAnalytics {
            period,
            tenant: tenant_figures(&tenant, period, revenue, counts, &load_refs),
            camps: camp_figures(&loads, &camp_revenue),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenant(id: Id, name: &str, status: TenantStatus) -> Tenant {
        Tenant {
            id,
            name: name.into(),
            slug: name.to_lowercase(),
            status,
            royalty_rate: BasisPoints::percent(10),
            minimum_royalty_cents: Cents::ZERO,
            contact_email: format!("{}@example.com", name.to_lowercase()),
            territory: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn load(camp_id: Id, tenant_id: Id, capacity: i64, enrollment: i64) -> CampLoad {
        CampLoad {
            camp_id,
            tenant_id,
            name: format!("Camp {camp_id}"),
            status: CampStatus::Published,
            start_date: NaiveDate::from_ymd_opt(2026, 7, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
            capacity,
            enrollment,
        }
    }

    fn totals(gross: i64, refunds: i64) -> RevenueTotals {
        RevenueTotals {
            gross_cents: Cents(gross),
            refunds_cents: Cents(refunds),
        }
    }

    fn july() -> ReportingPeriod {
        ReportingPeriod::month(2026, 7).unwrap()
    }

    #[test]
    fn test_summarize_sorts_by_net_then_name() {
        let tenants = vec![
            tenant(1, "Bravo", TenantStatus::Active),
            tenant(2, "Alpha", TenantStatus::Active),
            tenant(3, "Charlie", TenantStatus::Suspended),
        ];
        let revenue = vec![(1, totals(50_000, 0)), (2, totals(60_000, 10_000)), (3, totals(90_000, 0))];
        let dashboard = summarize(july(), &tenants, &revenue, &[], &[]);

        let order: Vec<Id> = dashboard.tenants.iter().map(|t| t.tenant_id).collect();
        assert_eq!(order, vec![3, 2, 1]);
        assert_eq!(dashboard.totals.net_revenue_cents, Cents(190_000));
        assert_eq!(dashboard.totals.refunds_cents, Cents(10_000));
        assert_eq!(dashboard.totals.royalty_due_cents, Cents(19_000));
        assert_eq!(dashboard.totals.active_tenants, 2);
    }

    #[test]
    fn test_tenants_without_activity_are_listed_with_zeroes() {
        let tenants = vec![tenant(1, "Quiet", TenantStatus::Active)];
        let dashboard = summarize(july(), &tenants, &[], &[], &[]);
        let row = &dashboard.tenants[0];
        assert_eq!(row.net_revenue_cents, Cents::ZERO);
        assert_eq!(row.fill_rate, BasisPoints::ZERO);
        assert_eq!(row.registrations, StatusCounts::default());
        assert_eq!(dashboard.totals.fill_rate, BasisPoints::ZERO);
    }

    #[test]
    fn test_fill_rate_and_registration_counts() {
        let tenants = vec![tenant(1, "A", TenantStatus::Active), tenant(2, "B", TenantStatus::Active)];
        let loads = vec![load(10, 1, 20, 15), load(11, 1, 20, 5), load(12, 2, 10, 10)];
        let created = vec![
            (1, RegistrationStatus::Confirmed, 4),
            (1, RegistrationStatus::Cancelled, 1),
            (2, RegistrationStatus::Waitlisted, 2),
        ];
        let dashboard = summarize(july(), &tenants, &[], &created, &loads);

        let a = dashboard.tenants.iter().find(|t| t.tenant_id == 1).unwrap();
        assert_eq!(a.camps, 2);
        assert_eq!(a.fill_rate, BasisPoints(5_000));
        assert_eq!(a.registrations.total, 5);
        assert_eq!(a.registrations.cancelled, 1);

        // 30 of 50 seats
        assert_eq!(dashboard.totals.fill_rate, BasisPoints(6_000));
        assert_eq!(dashboard.totals.registrations.waitlisted, 2);
        assert_eq!(dashboard.totals.camps, 3);
    }

    #[test]
    fn test_camp_figures_join_revenue() {
        let loads = vec![load(10, 1, 20, 15), load(11, 1, 0, 0)];
        let figures = camp_figures(&loads, &[(10, totals(30_000, 5_000))]);
        assert_eq!(figures[0].net_revenue_cents, Cents(25_000));
        assert_eq!(figures[0].fill_rate, BasisPoints(7_500));
        assert_eq!(figures[1].gross_revenue_cents, Cents::ZERO);
        assert_eq!(figures[1].fill_rate, BasisPoints::ZERO);
    }

    #[test]
    fn test_period_params() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        assert_eq!(PeriodParams::default().period(today).unwrap(), july());

        let partial = PeriodParams {
            from: Some(today),
            ..Default::default()
        };
        assert_eq!(partial.period(today).unwrap_err().status_code(), 400);
    }
}
