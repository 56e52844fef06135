//! Revenue aggregation and royalty invoices
//!
//! Revenue is bucketed by timestamp: a registration counts as gross in the
//! period its `paid_at` falls in, a refund counts in the period of its
//! `refunded_at`. Both bounds come from a half-open `ReportingPeriod`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::{Cents, Id, ReportingPeriod};
use camp_models::{InvoiceStatus, RoyaltyInvoice};

use crate::repository::{
    bps_from_db, bps_to_db, convert_all, parse_column, Repository, RepositoryError,
    RepositoryResult,
};

const INVOICE_COLUMNS: &str = "id, tenant_id, period_from, period_to, gross_revenue_cents, \
                               refunds_cents, net_revenue_cents, rate, royalty_due_cents, status, \
                               issued_at, paid_at";

/// Gross and refunded money for one key (tenant or camp) in a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RevenueTotals {
    pub gross_cents: Cents,
    pub refunds_cents: Cents,
}

impl RevenueTotals {
    pub fn net_cents(&self) -> Cents {
        self.gross_cents - self.refunds_cents
    }
}

#[derive(Debug, Clone, FromRow)]
struct InvoiceRow {
    id: i64,
    tenant_id: i64,
    period_from: NaiveDate,
    period_to: NaiveDate,
    gross_revenue_cents: i64,
    refunds_cents: i64,
    net_revenue_cents: i64,
    rate: i32,
    royalty_due_cents: i64,
    status: String,
    issued_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for RoyaltyInvoice {
    type Error = RepositoryError;

    fn try_from(row: InvoiceRow) -> RepositoryResult<Self> {
        Ok(RoyaltyInvoice {
            id: row.id,
            tenant_id: row.tenant_id,
            period_from: row.period_from,
            period_to: row.period_to,
            gross_revenue_cents: Cents(row.gross_revenue_cents),
            refunds_cents: Cents(row.refunds_cents),
            net_revenue_cents: Cents(row.net_revenue_cents),
            rate: bps_from_db("royalty_invoices.rate", row.rate)?,
            royalty_due_cents: Cents(row.royalty_due_cents),
            status: parse_column("royalty_invoices.status", &row.status)?,
            issued_at: row.issued_at,
            paid_at: row.paid_at,
        })
    }
}

/// Figures frozen onto an invoice
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub tenant_id: Id,
    pub period: ReportingPeriod,
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    pub net_revenue_cents: Cents,
    pub rate: camp_core::BasisPoints,
    pub royalty_due_cents: Cents,
}

pub struct RoyaltyRepository {
    pool: PgPool,
}

impl RoyaltyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Revenue per tenant; tenants with no activity are absent
    pub async fn revenue_by_tenant(
        &self,
        tenant_id: Option<Id>,
        period: &ReportingPeriod,
    ) -> RepositoryResult<Vec<(Id, RevenueTotals)>> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "WITH gross AS ( \
                 SELECT tenant_id, SUM(total_cents)::bigint AS cents FROM registrations \
                 WHERE paid_at >= $2 AND paid_at < $3 AND ($1::bigint IS NULL OR tenant_id = $1) \
                 GROUP BY tenant_id), \
             refunded AS ( \
                 SELECT tenant_id, SUM(amount_cents)::bigint AS cents FROM refunds \
                 WHERE refunded_at >= $2 AND refunded_at < $3 AND ($1::bigint IS NULL OR tenant_id = $1) \
                 GROUP BY tenant_id) \
             SELECT COALESCE(g.tenant_id, r.tenant_id), COALESCE(g.cents, 0), COALESCE(r.cents, 0) \
             FROM gross g FULL OUTER JOIN refunded r ON r.tenant_id = g.tenant_id",
        )
        .bind(tenant_id)
        .bind(period.from_instant())
        .bind(period.to_instant())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tenant, gross, refunds)| {
                (
                    tenant,
                    RevenueTotals {
                        gross_cents: Cents(gross),
                        refunds_cents: Cents(refunds),
                    },
                )
            })
            .collect())
    }

    pub async fn revenue_for_tenant(
        &self,
        tenant_id: Id,
        period: &ReportingPeriod,
    ) -> RepositoryResult<RevenueTotals> {
        let totals = self.revenue_by_tenant(Some(tenant_id), period).await?;
        Ok(totals
            .into_iter()
            .find(|(tenant, _)| *tenant == tenant_id)
            .map(|(_, totals)| totals)
            .unwrap_or_default())
    }

    /// Revenue per camp of one tenant
    pub async fn revenue_by_camp(
        &self,
        tenant_id: Id,
        period: &ReportingPeriod,
    ) -> RepositoryResult<Vec<(Id, RevenueTotals)>> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "WITH gross AS ( \
                 SELECT camp_id, SUM(total_cents)::bigint AS cents FROM registrations \
                 WHERE tenant_id = $1 AND paid_at >= $2 AND paid_at < $3 GROUP BY camp_id), \
             refunded AS ( \
                 SELECT reg.camp_id, SUM(f.amount_cents)::bigint AS cents \
                 FROM refunds f JOIN registrations reg ON reg.id = f.registration_id \
                 WHERE f.tenant_id = $1 AND f.refunded_at >= $2 AND f.refunded_at < $3 \
                 GROUP BY reg.camp_id) \
             SELECT COALESCE(g.camp_id, r.camp_id), COALESCE(g.cents, 0), COALESCE(r.cents, 0) \
             FROM gross g FULL OUTER JOIN refunded r ON r.camp_id = g.camp_id",
        )
        .bind(tenant_id)
        .bind(period.from_instant())
        .bind(period.to_instant())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(camp, gross, refunds)| {
                (
                    camp,
                    RevenueTotals {
                        gross_cents: Cents(gross),
                        refunds_cents: Cents(refunds),
                    },
                )
            })
            .collect())
    }

    pub async fn list_invoices(
        &self,
        tenant_id: Option<Id>,
        status: Option<InvoiceStatus>,
    ) -> RepositoryResult<Vec<RoyaltyInvoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM royalty_invoices \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY period_from DESC, tenant_id ASC"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(tenant_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    /// Insert the invoice unless one exists for the same tenant and period;
    /// the flag is `true` when a row was created
    pub async fn insert_invoice(
        conn: &mut PgConnection,
        invoice: &NewInvoice,
    ) -> RepositoryResult<(RoyaltyInvoice, bool)> {
        let sql = format!(
            "INSERT INTO royalty_invoices (tenant_id, period_from, period_to, gross_revenue_cents, \
                                           refunds_cents, net_revenue_cents, rate, royalty_due_cents) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (tenant_id, period_from, period_to) DO NOTHING \
             RETURNING {INVOICE_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice.tenant_id)
            .bind(invoice.period.from)
            .bind(invoice.period.to)
            .bind(invoice.gross_revenue_cents.value())
            .bind(invoice.refunds_cents.value())
            .bind(invoice.net_revenue_cents.value())
            .bind(bps_to_db(invoice.rate.value()))
            .bind(invoice.royalty_due_cents.value())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }

        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM royalty_invoices \
             WHERE tenant_id = $1 AND period_from = $2 AND period_to = $3"
        );
        let existing = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(invoice.tenant_id)
            .bind(invoice.period.from)
            .bind(invoice.period.to)
            .fetch_one(&mut *conn)
            .await?;
        Ok((existing.try_into()?, false))
    }

    /// Move `from -> to`; `None` when the row was no longer in `from`
    pub async fn set_invoice_status(
        &self,
        id: Id,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> RepositoryResult<Option<RoyaltyInvoice>> {
        let sql = format!(
            "UPDATE royalty_invoices SET status = $3, \
                    paid_at = CASE WHEN $3 = 'paid' THEN now() ELSE paid_at END \
             WHERE id = $1 AND status = $2 RETURNING {INVOICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(RoyaltyInvoice::try_from).transpose()
    }
}

#[async_trait]
impl Repository<RoyaltyInvoice> for RoyaltyRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<RoyaltyInvoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM royalty_invoices WHERE id = $1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(RoyaltyInvoice::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_may_be_negative() {
        let totals = RevenueTotals {
            gross_cents: Cents(10_000),
            refunds_cents: Cents(25_000),
        };
        assert_eq!(totals.net_cents(), Cents(-15_000));
        assert_eq!(RevenueTotals::default().net_cents(), Cents::ZERO);
    }
}
