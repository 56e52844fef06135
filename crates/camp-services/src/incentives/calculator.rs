//! Payout arithmetic for one staff member on one camp

use serde::{Deserialize, Serialize};

use camp_core::Cents;
use camp_models::{Camp, CompensationPlan};

/// Camp figures a payout depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampMetrics {
    /// Confirmed registrations
    pub enrollment: i64,
    pub net_revenue_cents: Cents,
    pub satisfaction_score: Option<i32>,
    pub budget_cents: Option<Cents>,
    pub actual_expenses_cents: Option<Cents>,
}

impl CampMetrics {
    pub fn for_camp(camp: &Camp, enrollment: i64, net_revenue: Cents) -> Self {
        Self {
            enrollment,
            net_revenue_cents: net_revenue,
            satisfaction_score: camp.satisfaction_score,
            budget_cents: camp.budget_cents,
            actual_expenses_cents: camp.actual_expenses_cents,
        }
    }
}

/// Every component of a payout, stored with the payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub base_stipend_cents: Cents,
    pub enrollment_bonus_cents: Cents,
    pub per_camper_bonus_cents: Cents,
    pub revenue_share_cents: Cents,
    pub satisfaction_bonus_cents: Cents,
    pub budget_bonus_cents: Cents,
    /// Sum before the cap
    pub uncapped_cents: Cents,
    /// Set when the plan maximum cut the payout
    pub capped_at_cents: Option<Cents>,
    pub total_cents: Cents,
}

pub fn compute_payout(plan: &CompensationPlan, metrics: &CampMetrics) -> PayoutBreakdown {
    let (enrollment_bonus, per_camper_bonus) = match plan.enrollment_threshold {
        Some(threshold) if metrics.enrollment >= i64::from(threshold) => {
            let extra = metrics.enrollment - i64::from(threshold);
            let per_camper = plan
                .per_camper_bonus_cents
                .checked_mul(extra)
                .unwrap_or(Cents(i64::MAX));
            (plan.enrollment_bonus_cents, per_camper)
        }
        _ => (Cents::ZERO, Cents::ZERO),
    };

    let revenue_share = metrics
        .net_revenue_cents
        .apply_rate(plan.revenue_share)
        .max(Cents::ZERO);

    let satisfaction_bonus = match (plan.satisfaction_threshold, metrics.satisfaction_score) {
        (Some(threshold), Some(score)) if score >= threshold => plan.satisfaction_bonus_cents,
        _ => Cents::ZERO,
    };

    let budget_bonus = match (metrics.budget_cents, metrics.actual_expenses_cents) {
        (Some(budget), Some(spent)) if spent <= budget => plan.budget_bonus_cents,
        _ => Cents::ZERO,
    };

    let uncapped = [
        plan.base_stipend_cents,
        enrollment_bonus,
        per_camper_bonus,
        revenue_share,
        satisfaction_bonus,
        budget_bonus,
    ]
    .iter()
    .try_fold(Cents::ZERO, |acc, part| acc.checked_add(*part))
    .unwrap_or(Cents(i64::MAX));

    let (total, capped_at) = match plan.max_payout_cents {
        Some(max) if uncapped > max => (max, Some(max)),
        _ => (uncapped, None),
    };

    PayoutBreakdown {
        base_stipend_cents: plan.base_stipend_cents,
        enrollment_bonus_cents: enrollment_bonus,
        per_camper_bonus_cents: per_camper_bonus,
        revenue_share_cents: revenue_share,
        satisfaction_bonus_cents: satisfaction_bonus,
        budget_bonus_cents: budget_bonus,
        uncapped_cents: uncapped,
        capped_at_cents: capped_at,
        total_cents: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_core::BasisPoints;
    use camp_models::StaffRole;
    use chrono::Utc;

    fn plan() -> CompensationPlan {
        CompensationPlan {
            id: 1,
            tenant_id: 1,
            name: "Director 2026".into(),
            role: StaffRole::Director,
            base_stipend_cents: Cents(100_000),
            enrollment_threshold: Some(40),
            enrollment_bonus_cents: Cents(25_000),
            per_camper_bonus_cents: Cents(1_000),
            revenue_share: BasisPoints(200),
            satisfaction_threshold: Some(90),
            satisfaction_bonus_cents: Cents(10_000),
            budget_bonus_cents: Cents(5_000),
            max_payout_cents: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn metrics(enrollment: i64) -> CampMetrics {
        CampMetrics {
            enrollment,
            net_revenue_cents: Cents(1_000_000),
            satisfaction_score: Some(90),
            budget_cents: Some(Cents(50_000)),
            actual_expenses_cents: Some(Cents(50_000)),
        }
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let b = compute_payout(&plan(), &metrics(40));
        assert_eq!(b.enrollment_bonus_cents, Cents(25_000));
        assert_eq!(b.per_camper_bonus_cents, Cents::ZERO);
        assert_eq!(b.satisfaction_bonus_cents, Cents(10_000));
        assert_eq!(b.budget_bonus_cents, Cents(5_000));
        assert_eq!(b.revenue_share_cents, Cents(20_000));
        assert_eq!(b.total_cents, Cents(160_000));
    }

    #[test]
    fn test_per_camper_bonus_above_threshold() {
        let b = compute_payout(&plan(), &metrics(45));
        assert_eq!(b.per_camper_bonus_cents, Cents(5_000));
        assert_eq!(b.total_cents, Cents(165_000));
    }

    #[test]
    fn test_below_thresholds_and_over_budget() {
        let mut m = metrics(39);
        m.satisfaction_score = Some(89);
        m.actual_expenses_cents = Some(Cents(50_001));
        let b = compute_payout(&plan(), &m);
        assert_eq!(b.enrollment_bonus_cents, Cents::ZERO);
        assert_eq!(b.satisfaction_bonus_cents, Cents::ZERO);
        assert_eq!(b.budget_bonus_cents, Cents::ZERO);
        assert_eq!(b.total_cents, Cents(120_000));
    }

    #[test]
    fn test_missing_results_pay_no_result_bonuses() {
        let mut m = metrics(40);
        m.satisfaction_score = None;
        m.actual_expenses_cents = None;
        let b = compute_payout(&plan(), &m);
        assert_eq!(b.satisfaction_bonus_cents, Cents::ZERO);
        assert_eq!(b.budget_bonus_cents, Cents::ZERO);
    }

    #[test]
    fn test_negative_revenue_share_is_zero() {
        let mut m = metrics(10);
        m.net_revenue_cents = Cents(-50_000);
        let b = compute_payout(&plan(), &m);
        assert_eq!(b.revenue_share_cents, Cents::ZERO);
    }

    #[test]
    fn test_cap_is_recorded() {
        let mut p = plan();
        p.max_payout_cents = Some(Cents(150_000));
        let b = compute_payout(&p, &metrics(40));
        assert_eq!(b.uncapped_cents, Cents(160_000));
        assert_eq!(b.capped_at_cents, Some(Cents(150_000)));
        assert_eq!(b.total_cents, Cents(150_000));
    }
}
