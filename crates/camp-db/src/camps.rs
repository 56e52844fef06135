//! Camp repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::{Cents, Id, Page, PaginationParams};
use camp_models::{Camp, CampStatus};

use crate::repository::{
    convert_all, parse_column, prefixed, Repository, RepositoryError, RepositoryResult,
};

const COLUMNS: &str = "id, tenant_id, venue_id, name, sport, start_date, end_date, daily_start, \
                       daily_end, capacity, price_cents, min_age, max_age, status, director_id, \
                       budget_cents, satisfaction_score, actual_expenses_cents, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct CampRow {
    pub id: i64,
    pub tenant_id: i64,
    pub venue_id: Option<i64>,
    pub name: String,
    pub sport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub capacity: i32,
    pub price_cents: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub status: String,
    pub director_id: Option<i64>,
    pub budget_cents: Option<i64>,
    pub satisfaction_score: Option<i32>,
    pub actual_expenses_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CampRow> for Camp {
    type Error = RepositoryError;

    fn try_from(row: CampRow) -> RepositoryResult<Self> {
        Ok(Camp {
            id: row.id,
            tenant_id: row.tenant_id,
            venue_id: row.venue_id,
            status: parse_column("camps.status", &row.status)?,
            name: row.name,
            sport: row.sport,
            start_date: row.start_date,
            end_date: row.end_date,
            daily_start: row.daily_start,
            daily_end: row.daily_end,
            capacity: row.capacity,
            price_cents: Cents(row.price_cents),
            min_age: row.min_age,
            max_age: row.max_age,
            director_id: row.director_id,
            budget_cents: row.budget_cents.map(Cents),
            satisfaction_score: row.satisfaction_score,
            actual_expenses_cents: row.actual_expenses_cents.map(Cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Values written on create and update
#[derive(Debug, Clone)]
pub struct CampValues {
    pub venue_id: Option<Id>,
    pub name: String,
    pub sport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub capacity: i32,
    pub price_cents: Cents,
    pub min_age: i32,
    pub max_age: i32,
    pub director_id: Option<Id>,
    pub budget_cents: Option<Cents>,
}

/// A camp with its confirmed + pending count
#[derive(Debug, Clone)]
pub struct CampWithEnrollment {
    pub camp: Camp,
    pub active_registrations: i64,
}

#[derive(FromRow)]
struct CampEnrollmentRow {
    #[sqlx(flatten)]
    camp: CampRow,
    active_registrations: i64,
}

pub struct CampRepository {
    pool: PgPool,
}

impl CampRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        tenant_id: Option<Id>,
        status: Option<CampStatus>,
        params: PaginationParams,
    ) -> RepositoryResult<Page<Camp>> {
        let status = status.map(|s| s.as_str());
        let sql = format!(
            "SELECT {COLUMNS} FROM camps \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY start_date ASC, id ASC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, CampRow>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM camps \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(convert_all(rows)?, total, params))
    }

    /// Published camps of a tenant with their enrollment, soonest first
    pub async fn list_public(&self, tenant_id: Id) -> RepositoryResult<Vec<CampWithEnrollment>> {
        let columns = prefixed(COLUMNS, "c");
        let sql = format!(
            "SELECT {columns}, \
                    (SELECT COUNT(*) FROM registrations r \
                      WHERE r.camp_id = c.id AND r.status IN ('confirmed', 'pending')) \
                    AS active_registrations \
             FROM camps c \
             WHERE c.tenant_id = $1 AND c.status = 'published' \
             ORDER BY c.start_date ASC, c.id ASC"
        );
        let rows = sqlx::query_as::<_, CampEnrollmentRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(CampWithEnrollment {
                    camp: row.camp.try_into()?,
                    active_registrations: row.active_registrations,
                })
            })
            .collect()
    }

    /// Camps of a tenant whose inclusive dates overlap `[from, to)`
    pub async fn overlapping(
        &self,
        tenant_id: Id,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<Camp>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM camps \
             WHERE tenant_id = $1 AND start_date < $3 AND end_date >= $2 \
             ORDER BY start_date ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, CampRow>(&sql)
            .bind(tenant_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn create(&self, tenant_id: Id, values: &CampValues) -> RepositoryResult<Camp> {
        let sql = format!(
            "INSERT INTO camps (tenant_id, venue_id, name, sport, start_date, end_date, daily_start, \
                                daily_end, capacity, price_cents, min_age, max_age, director_id, budget_cents) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(tenant_id)
            .bind(values.venue_id)
            .bind(&values.name)
            .bind(&values.sport)
            .bind(values.start_date)
            .bind(values.end_date)
            .bind(values.daily_start)
            .bind(values.daily_end)
            .bind(values.capacity)
            .bind(values.price_cents.value())
            .bind(values.min_age)
            .bind(values.max_age)
            .bind(values.director_id)
            .bind(values.budget_cents.map(Cents::value))
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    pub async fn update(&self, id: Id, values: &CampValues) -> RepositoryResult<Camp> {
        let sql = format!(
            "UPDATE camps SET venue_id = $2, name = $3, sport = $4, start_date = $5, end_date = $6, \
                    daily_start = $7, daily_end = $8, capacity = $9, price_cents = $10, \
                    min_age = $11, max_age = $12, director_id = $13, budget_cents = $14, \
                    updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(id)
            .bind(values.venue_id)
            .bind(&values.name)
            .bind(&values.sport)
            .bind(values.start_date)
            .bind(values.end_date)
            .bind(values.daily_start)
            .bind(values.daily_end)
            .bind(values.capacity)
            .bind(values.price_cents.value())
            .bind(values.min_age)
            .bind(values.max_age)
            .bind(values.director_id)
            .bind(values.budget_cents.map(Cents::value))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("camp {}", id)))?;
        row.try_into()
    }

    pub async fn set_status(&self, id: Id, status: CampStatus) -> RepositoryResult<Camp> {
        let sql = format!(
            "UPDATE camps SET status = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("camp {}", id)))?;
        row.try_into()
    }

    /// Store post-camp figures; `None` keeps the current value
    pub async fn record_results(
        &self,
        id: Id,
        satisfaction_score: Option<i32>,
        actual_expenses: Option<Cents>,
    ) -> RepositoryResult<Camp> {
        let sql = format!(
            "UPDATE camps SET satisfaction_score = COALESCE($2, satisfaction_score), \
                    actual_expenses_cents = COALESCE($3, actual_expenses_cents), updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(id)
            .bind(satisfaction_score)
            .bind(actual_expenses.map(Cents::value))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("camp {}", id)))?;
        row.try_into()
    }

    pub async fn count_for_venue(&self, venue_id: Id) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM camps WHERE venue_id = $1")
            .bind(venue_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lock the camp row for the rest of the transaction
    pub async fn lock(conn: &mut PgConnection, id: Id) -> RepositoryResult<Option<Camp>> {
        let sql = format!("SELECT {COLUMNS} FROM camps WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        row.map(Camp::try_from).transpose()
    }
}

#[async_trait]
impl Repository<Camp> for CampRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Camp>> {
        let sql = format!("SELECT {COLUMNS} FROM camps WHERE id = $1");
        let row = sqlx::query_as::<_, CampRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Camp::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_columns() {
        let columns = prefixed(COLUMNS, "c");
        assert!(columns.starts_with("c.id, c.tenant_id"));
        assert!(columns.ends_with("c.updated_at"));
        assert_eq!(columns.matches("c.").count(), COLUMNS.split(',').count());
    }
}
