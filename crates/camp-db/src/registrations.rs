//! Registration and refund repository
//!
//! Writes that touch capacity or the waitlist take a `&mut PgConnection` so
//! they run inside the caller's transaction, after the camp row is locked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::{Cents, Id};
use camp_models::{Athlete, PaymentStatus, Refund, Registration, RegistrationStatus};

use crate::athletes::{AthleteRow, COLUMNS as ATHLETE_COLUMNS};
use crate::repository::{
    convert_all, parse_column, prefixed, Repository, RepositoryError, RepositoryResult,
};

const COLUMNS: &str = "id, tenant_id, camp_id, athlete_id, parent_id, status, payment_status, \
                       price_cents, discount_cents, total_cents, refunded_cents, promo_code, \
                       payment_ref, waitlist_position, paid_at, cancelled_at, created_at, updated_at";

const REFUND_COLUMNS: &str = "id, tenant_id, registration_id, amount_cents, reason, payment_ref, \
                              refunded_by, refunded_at";

#[derive(Debug, Clone, FromRow)]
pub struct RegistrationRow {
    pub id: i64,
    pub tenant_id: i64,
    pub camp_id: i64,
    pub athlete_id: i64,
    pub parent_id: i64,
    pub status: String,
    pub payment_status: String,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub refunded_cents: i64,
    pub promo_code: Option<String>,
    pub payment_ref: Option<String>,
    pub waitlist_position: Option<i32>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = RepositoryError;

    fn try_from(row: RegistrationRow) -> RepositoryResult<Self> {
        Ok(Registration {
            id: row.id,
            tenant_id: row.tenant_id,
            camp_id: row.camp_id,
            athlete_id: row.athlete_id,
            parent_id: row.parent_id,
            status: parse_column("registrations.status", &row.status)?,
            payment_status: parse_column("registrations.payment_status", &row.payment_status)?,
            price_cents: Cents(row.price_cents),
            discount_cents: Cents(row.discount_cents),
            total_cents: Cents(row.total_cents),
            refunded_cents: Cents(row.refunded_cents),
            promo_code: row.promo_code,
            payment_ref: row.payment_ref,
            waitlist_position: row.waitlist_position,
            paid_at: row.paid_at,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct RefundRow {
    id: i64,
    tenant_id: i64,
    registration_id: i64,
    amount_cents: i64,
    reason: Option<String>,
    payment_ref: Option<String>,
    refunded_by: Option<i64>,
    refunded_at: DateTime<Utc>,
}

impl From<RefundRow> for Refund {
    fn from(row: RefundRow) -> Self {
        Refund {
            id: row.id,
            tenant_id: row.tenant_id,
            registration_id: row.registration_id,
            amount_cents: Cents(row.amount_cents),
            reason: row.reason,
            payment_ref: row.payment_ref,
            refunded_by: row.refunded_by,
            refunded_at: row.refunded_at,
        }
    }
}

/// A registration about to be written by checkout
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub tenant_id: Id,
    pub camp_id: Id,
    pub athlete_id: Id,
    pub parent_id: Id,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: Cents,
    pub discount_cents: Cents,
    pub promo_code: Option<String>,
    pub payment_ref: Option<String>,
    pub waitlist_position: Option<i32>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl NewRegistration {
    pub fn total_cents(&self) -> Cents {
        self.price_cents - self.discount_cents
    }
}

/// A refund about to be recorded
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub amount_cents: Cents,
    pub reason: Option<String>,
    pub payment_ref: Option<String>,
    pub refunded_by: Option<Id>,
}

/// Confirmed registration joined with its athlete
#[derive(Debug, Clone)]
pub struct Camper {
    pub registration_id: Id,
    pub athlete: Athlete,
}

#[derive(Debug, FromRow)]
struct CamperRow {
    registration_id: i64,
    #[sqlx(flatten)]
    athlete: AthleteRow,
}

/// Filters for registration listings
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub tenant_id: Option<Id>,
    pub camp_id: Option<Id>,
    pub parent_id: Option<Id>,
    pub status: Option<RegistrationStatus>,
}

pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &RegistrationFilter) -> RepositoryResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM registrations \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) \
               AND ($2::bigint IS NULL OR camp_id = $2) \
               AND ($3::bigint IS NULL OR parent_id = $3) \
               AND ($4::text IS NULL OR status = $4) \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(filter.tenant_id)
            .bind(filter.camp_id)
            .bind(filter.parent_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    /// Confirmed campers of a camp with their athlete records
    pub async fn confirmed_campers(&self, camp_id: Id) -> RepositoryResult<Vec<Camper>> {
        let sql = format!(
            "SELECT r.id AS registration_id, {} FROM registrations r \
             JOIN athletes a ON a.id = r.athlete_id \
             WHERE r.camp_id = $1 AND r.status = 'confirmed' \
             ORDER BY a.last_name ASC, a.first_name ASC, a.id ASC",
            prefixed(ATHLETE_COLUMNS, "a")
        );
        let rows = sqlx::query_as::<_, CamperRow>(&sql)
            .bind(camp_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Camper {
                registration_id: row.registration_id,
                athlete: row.athlete.into(),
            })
            .collect())
    }

    /// Registration counts for a camp keyed by status
    pub async fn counts_by_status(&self, camp_id: Id) -> RepositoryResult<Vec<(RegistrationStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM registrations WHERE camp_id = $1 GROUP BY status",
        )
        .bind(camp_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(status, count)| Ok((parse_column("registrations.status", &status)?, count)))
            .collect()
    }

    /// Money kept from paid registrations of a camp: total minus refunded
    pub async fn collected_for_camp(&self, camp_id: Id) -> RepositoryResult<Cents> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_cents - refunded_cents), 0)::bigint FROM registrations \
             WHERE camp_id = $1 AND payment_status IN ('paid', 'partially_refunded', 'refunded')",
        )
        .bind(camp_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Cents(sum))
    }

    pub async fn refunds_for(&self, registration_id: Id) -> RepositoryResult<Vec<Refund>> {
        let sql = format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE registration_id = $1 ORDER BY refunded_at ASC"
        );
        let rows = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(registration_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Refund::from).collect())
    }

    pub async fn lock(conn: &mut PgConnection, id: Id) -> RepositoryResult<Option<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        row.map(Registration::try_from).transpose()
    }

    /// Whether the athlete already has a non-cancelled registration for the camp
    pub async fn has_active(conn: &mut PgConnection, camp_id: Id, athlete_id: Id) -> RepositoryResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM registrations \
                            WHERE camp_id = $1 AND athlete_id = $2 AND status <> 'cancelled')",
        )
        .bind(camp_id)
        .bind(athlete_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// `confirmed + pending` registrations of a camp
    pub async fn count_holding_spots(conn: &mut PgConnection, camp_id: Id) -> RepositoryResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations \
             WHERE camp_id = $1 AND status IN ('confirmed', 'pending')",
        )
        .bind(camp_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    pub async fn next_waitlist_position(conn: &mut PgConnection, camp_id: Id) -> RepositoryResult<i32> {
        let (max,): (Option<i32>,) = sqlx::query_as(
            "SELECT MAX(waitlist_position) FROM registrations WHERE camp_id = $1",
        )
        .bind(camp_id)
        .fetch_one(conn)
        .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    pub async fn insert(conn: &mut PgConnection, new: &NewRegistration) -> RepositoryResult<Registration> {
        let sql = format!(
            "INSERT INTO registrations (tenant_id, camp_id, athlete_id, parent_id, status, \
                                        payment_status, price_cents, discount_cents, total_cents, \
                                        promo_code, payment_ref, waitlist_position, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(new.tenant_id)
            .bind(new.camp_id)
            .bind(new.athlete_id)
            .bind(new.parent_id)
            .bind(new.status.as_str())
            .bind(new.payment_status.as_str())
            .bind(new.price_cents.value())
            .bind(new.discount_cents.value())
            .bind(new.total_cents().value())
            .bind(&new.promo_code)
            .bind(&new.payment_ref)
            .bind(new.waitlist_position)
            .bind(new.paid_at)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                RepositoryError::conflict_on_unique(
                    e,
                    format!("athlete {} is already registered for camp {}", new.athlete_id, new.camp_id),
                )
            })?;
        row.try_into()
    }

    pub async fn cancel(conn: &mut PgConnection, id: Id) -> RepositoryResult<Registration> {
        let sql = format!(
            "UPDATE registrations SET status = 'cancelled', waitlist_position = NULL, \
                    cancelled_at = now(), updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("registration {}", id)))?;
        row.try_into()
    }

    /// Paid in full: confirms a pending registration
    pub async fn mark_paid(conn: &mut PgConnection, id: Id, payment_ref: Option<&str>) -> RepositoryResult<Registration> {
        let sql = format!(
            "UPDATE registrations SET status = 'confirmed', payment_status = 'paid', \
                    payment_ref = $2, paid_at = now(), updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .bind(payment_ref)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("registration {}", id)))?;
        row.try_into()
    }

    pub async fn mark_payment_failed(conn: &mut PgConnection, id: Id) -> RepositoryResult<()> {
        sqlx::query("UPDATE registrations SET payment_status = 'failed', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Add `refund` to the running total and append the refund row
    pub async fn record_refund(
        conn: &mut PgConnection,
        registration: &Registration,
        refund: &NewRefund,
        payment_status: PaymentStatus,
    ) -> RepositoryResult<(Registration, Refund)> {
        let sql = format!(
            "UPDATE registrations SET refunded_cents = refunded_cents + $2, payment_status = $3, \
                    updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration.id)
            .bind(refund.amount_cents.value())
            .bind(payment_status.as_str())
            .fetch_one(&mut *conn)
            .await?;

        let sql = format!(
            "INSERT INTO refunds (tenant_id, registration_id, amount_cents, reason, payment_ref, \
                                  refunded_by) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REFUND_COLUMNS}"
        );
        let refund_row = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(registration.tenant_id)
            .bind(registration.id)
            .bind(refund.amount_cents.value())
            .bind(&refund.reason)
            .bind(&refund.payment_ref)
            .bind(refund.refunded_by)
            .fetch_one(&mut *conn)
            .await?;

        Ok((updated.try_into()?, refund_row.into()))
    }

    /// Gateway reference of a refund issued after its row was written
    pub async fn set_refund_reference(
        conn: &mut PgConnection,
        refund_id: Id,
        payment_ref: &str,
    ) -> RepositoryResult<Refund> {
        let sql = format!("UPDATE refunds SET payment_ref = $2 WHERE id = $1 RETURNING {REFUND_COLUMNS}");
        let row = sqlx::query_as::<_, RefundRow>(&sql)
            .bind(refund_id)
            .bind(payment_ref)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("refund {}", refund_id)))?;
        Ok(row.into())
    }

    /// Waitlist of a camp in queue order, locked
    pub async fn waitlist_locked(conn: &mut PgConnection, camp_id: Id) -> RepositoryResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM registrations \
             WHERE camp_id = $1 AND status = 'waitlisted' \
             ORDER BY waitlist_position ASC NULLS LAST, created_at ASC, id ASC \
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(camp_id)
            .fetch_all(conn)
            .await?;
        rows.into_iter().map(Registration::try_from).collect()
    }

    /// `waitlisted -> pending/unpaid`, leaving the waitlist
    pub async fn promote(conn: &mut PgConnection, id: Id) -> RepositoryResult<Registration> {
        let sql = format!(
            "UPDATE registrations SET status = 'pending', payment_status = 'unpaid', \
                    waitlist_position = NULL, updated_at = now() \
             WHERE id = $1 AND status = 'waitlisted' RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("waitlisted registration {}", id)))?;
        row.try_into()
    }

    /// Confirmed registration of an athlete for a camp, if any
    pub async fn find_confirmed(
        &self,
        camp_id: Id,
        registration_id: Id,
    ) -> RepositoryResult<Option<Registration>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM registrations \
             WHERE camp_id = $1 AND id = $2 AND status = 'confirmed'"
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(camp_id)
            .bind(registration_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Registration::try_from).transpose()
    }

    /// Registrations created in `[from, to)` per tenant and status
    pub async fn created_by_status(
        &self,
        tenant_id: Option<Id>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<(Id, RegistrationStatus, i64)>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT tenant_id, status, COUNT(*) FROM registrations \
             WHERE created_at >= $2 AND created_at < $3 AND ($1::bigint IS NULL OR tenant_id = $1) \
             GROUP BY tenant_id, status",
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(tenant, status, count)| {
                Ok((tenant, parse_column("registrations.status", &status)?, count))
            })
            .collect()
    }
}

#[async_trait]
impl Repository<Registration> for RegistrationRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Registration>> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE id = $1");
        let row = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Registration::try_from).transpose()
    }
}
