//! Compensation plans, staff assignments and payouts

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::{BasisPoints, Cents, Id};
use camp_models::{CompensationPlan, StaffAssignment, StaffPayout, StaffRole};

use crate::repository::{
    bps_from_db, bps_to_db, convert_all, parse_column, RepositoryError, RepositoryResult,
};

const PLAN_COLUMNS: &str = "id, tenant_id, name, role, base_stipend_cents, enrollment_threshold, \
                            enrollment_bonus_cents, per_camper_bonus_cents, revenue_share, \
                            satisfaction_threshold, satisfaction_bonus_cents, budget_bonus_cents, \
                            max_payout_cents, active, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, tenant_id, camp_id, user_id, role, plan_id, created_at";

const PAYOUT_COLUMNS: &str = "id, tenant_id, camp_id, assignment_id, user_id, plan_id, \
                              amount_cents, breakdown, finalized_at";

#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub role: String,
    pub base_stipend_cents: i64,
    pub enrollment_threshold: Option<i32>,
    pub enrollment_bonus_cents: i64,
    pub per_camper_bonus_cents: i64,
    pub revenue_share: i32,
    pub satisfaction_threshold: Option<i32>,
    pub satisfaction_bonus_cents: i64,
    pub budget_bonus_cents: i64,
    pub max_payout_cents: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for CompensationPlan {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> RepositoryResult<Self> {
        Ok(CompensationPlan {
            id: row.id,
            tenant_id: row.tenant_id,
            role: parse_column("compensation_plans.role", &row.role)?,
            revenue_share: bps_from_db("compensation_plans.revenue_share", row.revenue_share)?,
            name: row.name,
            base_stipend_cents: Cents(row.base_stipend_cents),
            enrollment_threshold: row.enrollment_threshold,
            enrollment_bonus_cents: Cents(row.enrollment_bonus_cents),
            per_camper_bonus_cents: Cents(row.per_camper_bonus_cents),
            satisfaction_threshold: row.satisfaction_threshold,
            satisfaction_bonus_cents: Cents(row.satisfaction_bonus_cents),
            budget_bonus_cents: Cents(row.budget_bonus_cents),
            max_payout_cents: row.max_payout_cents.map(Cents),
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Plan fields written on create and update
#[derive(Debug, Clone)]
pub struct PlanValues {
    pub name: String,
    pub role: StaffRole,
    pub base_stipend_cents: Cents,
    pub enrollment_threshold: Option<i32>,
    pub enrollment_bonus_cents: Cents,
    pub per_camper_bonus_cents: Cents,
    pub revenue_share: BasisPoints,
    pub satisfaction_threshold: Option<i32>,
    pub satisfaction_bonus_cents: Cents,
    pub budget_bonus_cents: Cents,
    pub max_payout_cents: Option<Cents>,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow)]
struct AssignmentRow {
    id: i64,
    tenant_id: i64,
    camp_id: i64,
    user_id: i64,
    role: String,
    plan_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssignmentRow> for StaffAssignment {
    type Error = RepositoryError;

    fn try_from(row: AssignmentRow) -> RepositoryResult<Self> {
        Ok(StaffAssignment {
            id: row.id,
            tenant_id: row.tenant_id,
            camp_id: row.camp_id,
            user_id: row.user_id,
            role: parse_column("staff_assignments.role", &row.role)?,
            plan_id: row.plan_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct PayoutRow {
    id: i64,
    tenant_id: i64,
    camp_id: i64,
    assignment_id: i64,
    user_id: i64,
    plan_id: i64,
    amount_cents: i64,
    breakdown: serde_json::Value,
    finalized_at: DateTime<Utc>,
}

impl From<PayoutRow> for StaffPayout {
    fn from(row: PayoutRow) -> Self {
        StaffPayout {
            id: row.id,
            tenant_id: row.tenant_id,
            camp_id: row.camp_id,
            assignment_id: row.assignment_id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            amount_cents: Cents(row.amount_cents),
            breakdown: row.breakdown,
            finalized_at: row.finalized_at,
        }
    }
}

/// A payout computed for one assignment
#[derive(Debug, Clone)]
pub struct NewPayout {
    pub tenant_id: Id,
    pub camp_id: Id,
    pub assignment_id: Id,
    pub user_id: Id,
    pub plan_id: Id,
    pub amount_cents: Cents,
    pub breakdown: serde_json::Value,
}

pub struct IncentiveRepository {
    pool: PgPool,
}

impl IncentiveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_plans(&self, tenant_id: Option<Id>) -> RepositoryResult<Vec<CompensationPlan>> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM compensation_plans \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn find_plan(&self, id: Id) -> RepositoryResult<Option<CompensationPlan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM compensation_plans WHERE id = $1");
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CompensationPlan::try_from).transpose()
    }

    pub async fn find_plans(&self, ids: &[Id]) -> RepositoryResult<Vec<CompensationPlan>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PLAN_COLUMNS} FROM compensation_plans WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn create_plan(&self, tenant_id: Id, values: &PlanValues) -> RepositoryResult<CompensationPlan> {
        let sql = format!(
            "INSERT INTO compensation_plans (tenant_id, name, role, base_stipend_cents, \
                    enrollment_threshold, enrollment_bonus_cents, per_camper_bonus_cents, \
                    revenue_share, satisfaction_threshold, satisfaction_bonus_cents, \
                    budget_bonus_cents, max_payout_cents, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PLAN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(tenant_id)
            .bind(&values.name)
            .bind(values.role.as_str())
            .bind(values.base_stipend_cents.value())
            .bind(values.enrollment_threshold)
            .bind(values.enrollment_bonus_cents.value())
            .bind(values.per_camper_bonus_cents.value())
            .bind(bps_to_db(values.revenue_share.value()))
            .bind(values.satisfaction_threshold)
            .bind(values.satisfaction_bonus_cents.value())
            .bind(values.budget_bonus_cents.value())
            .bind(values.max_payout_cents.map(Cents::value))
            .bind(values.active)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    pub async fn update_plan(&self, id: Id, values: &PlanValues) -> RepositoryResult<CompensationPlan> {
        let sql = format!(
            "UPDATE compensation_plans SET name = $2, role = $3, base_stipend_cents = $4, \
                    enrollment_threshold = $5, enrollment_bonus_cents = $6, \
                    per_camper_bonus_cents = $7, revenue_share = $8, satisfaction_threshold = $9, \
                    satisfaction_bonus_cents = $10, budget_bonus_cents = $11, \
                    max_payout_cents = $12, active = $13, updated_at = now() \
             WHERE id = $1 RETURNING {PLAN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(&values.name)
            .bind(values.role.as_str())
            .bind(values.base_stipend_cents.value())
            .bind(values.enrollment_threshold)
            .bind(values.enrollment_bonus_cents.value())
            .bind(values.per_camper_bonus_cents.value())
            .bind(bps_to_db(values.revenue_share.value()))
            .bind(values.satisfaction_threshold)
            .bind(values.satisfaction_bonus_cents.value())
            .bind(values.budget_bonus_cents.value())
            .bind(values.max_payout_cents.map(Cents::value))
            .bind(values.active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("compensation plan {}", id)))?;
        row.try_into()
    }

    pub async fn list_assignments(&self, camp_id: Id) -> RepositoryResult<Vec<StaffAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM staff_assignments WHERE camp_id = $1 \
             ORDER BY role DESC, created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(camp_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn find_assignment(&self, id: Id) -> RepositoryResult<Option<StaffAssignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM staff_assignments WHERE id = $1");
        let row = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(StaffAssignment::try_from).transpose()
    }

    pub async fn assign(
        &self,
        tenant_id: Id,
        camp_id: Id,
        user_id: Id,
        role: StaffRole,
        plan_id: Option<Id>,
    ) -> RepositoryResult<StaffAssignment> {
        let sql = format!(
            "INSERT INTO staff_assignments (tenant_id, camp_id, user_id, role, plan_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(tenant_id)
            .bind(camp_id)
            .bind(user_id)
            .bind(role.as_str())
            .bind(plan_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::conflict_on_unique(
                    e,
                    format!("user {} is already assigned to camp {}", user_id, camp_id),
                )
            })?;
        row.try_into()
    }

    /// Removing an assignment that already has a payout is refused
    pub async fn remove_assignment(&self, id: Id) -> RepositoryResult<()> {
        let (paid,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM staff_payouts WHERE assignment_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if paid {
            return Err(RepositoryError::Conflict(
                "assignment has a finalized payout".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM staff_assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("staff assignment {}", id)));
        }
        Ok(())
    }

    pub async fn payouts_for_camp(&self, camp_id: Id) -> RepositoryResult<Vec<StaffPayout>> {
        let sql = format!(
            "SELECT {PAYOUT_COLUMNS} FROM staff_payouts WHERE camp_id = $1 ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, PayoutRow>(&sql)
            .bind(camp_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(StaffPayout::from).collect())
    }

    pub async fn payouts_for_user(&self, user_id: Id) -> RepositoryResult<Vec<StaffPayout>> {
        let sql = format!(
            "SELECT {PAYOUT_COLUMNS} FROM staff_payouts WHERE user_id = $1 \
             ORDER BY finalized_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PayoutRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(StaffPayout::from).collect())
    }

    /// Insert unless the assignment already has a payout; returns the stored row either way
    pub async fn insert_payout(conn: &mut PgConnection, payout: &NewPayout) -> RepositoryResult<StaffPayout> {
        sqlx::query(
            "INSERT INTO staff_payouts (tenant_id, camp_id, assignment_id, user_id, plan_id, \
                                        amount_cents, breakdown) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (assignment_id) DO NOTHING",
        )
        .bind(payout.tenant_id)
        .bind(payout.camp_id)
        .bind(payout.assignment_id)
        .bind(payout.user_id)
        .bind(payout.plan_id)
        .bind(payout.amount_cents.value())
        .bind(&payout.breakdown)
        .execute(&mut *conn)
        .await?;

        let sql = format!("SELECT {PAYOUT_COLUMNS} FROM staff_payouts WHERE assignment_id = $1");
        let row = sqlx::query_as::<_, PayoutRow>(&sql)
            .bind(payout.assignment_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.into())
    }
}
