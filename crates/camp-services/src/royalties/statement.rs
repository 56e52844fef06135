//! Royalty arithmetic

use serde::Serialize;

use camp_core::{BasisPoints, Cents, Id, ReportingPeriod};
use camp_db::RevenueTotals;
use camp_models::Tenant;

/// What a tenant owes HQ for one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoyaltyStatement {
    pub tenant_id: Id,
    pub period: ReportingPeriod,
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    /// May be negative when refunds outweigh sales
    pub net_revenue_cents: Cents,
    pub rate: BasisPoints,
    pub computed_royalty_cents: Cents,
    pub minimum_royalty_cents: Cents,
    pub royalty_due_cents: Cents,
}

/// `due = max(net * rate, minimum, 0)`
pub fn compute_statement(
    tenant_id: Id,
    period: ReportingPeriod,
    totals: RevenueTotals,
    rate: BasisPoints,
    minimum: Cents,
) -> RoyaltyStatement {
    let net = totals.net_cents();
    let computed = net.apply_rate(rate);
    let due = computed.max(minimum).max(Cents::ZERO);

    RoyaltyStatement {
        tenant_id,
        period,
        gross_revenue_cents: totals.gross_cents,
        refunds_cents: totals.refunds_cents,
        net_revenue_cents: net,
        rate,
        computed_royalty_cents: computed,
        minimum_royalty_cents: minimum,
        royalty_due_cents: due,
    }
}

/// Statement using the tenant's own terms
pub fn statement_for(tenant: &Tenant, period: ReportingPeriod, totals: RevenueTotals) -> RoyaltyStatement {
    compute_statement(
        tenant.id,
        period,
        totals,
        tenant.royalty_rate,
        tenant.minimum_royalty_cents,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june() -> ReportingPeriod {
        ReportingPeriod::month(2026, 6).unwrap()
    }

    fn totals(gross: i64, refunds: i64) -> RevenueTotals {
        RevenueTotals {
            gross_cents: Cents(gross),
            refunds_cents: Cents(refunds),
        }
    }

    #[test]
    fn test_rate_applies_to_net_revenue() {
        let s = compute_statement(1, june(), totals(1_000_000, 100_000), BasisPoints(800), Cents::ZERO);
        assert_eq!(s.net_revenue_cents, Cents(900_000));
        assert_eq!(s.computed_royalty_cents, Cents(72_000));
        assert_eq!(s.royalty_due_cents, Cents(72_000));
    }

    #[test]
    fn test_minimum_royalty_wins_when_larger() {
        let s = compute_statement(1, june(), totals(100_000, 0), BasisPoints(800), Cents(50_000));
        assert_eq!(s.computed_royalty_cents, Cents(8_000));
        assert_eq!(s.royalty_due_cents, Cents(50_000));
    }

    #[test]
    fn test_negative_net_owes_nothing() {
        let s = compute_statement(1, june(), totals(10_000, 30_000), BasisPoints(800), Cents::ZERO);
        assert_eq!(s.net_revenue_cents, Cents(-20_000));
        assert_eq!(s.computed_royalty_cents, Cents(-1_600));
        assert_eq!(s.royalty_due_cents, Cents::ZERO);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // 8% of 12_345 = 987.6
        let s = compute_statement(1, june(), totals(12_345, 0), BasisPoints(800), Cents::ZERO);
        assert_eq!(s.computed_royalty_cents, Cents(988));
    }
}
