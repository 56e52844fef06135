//! Attendance repository

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use camp_core::Id;
use camp_models::AttendanceRecord;

use crate::repository::{RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, tenant_id, camp_id, registration_id, athlete_id, date, checked_in_at, \
                       checked_in_by, checked_out_at, checked_out_by, pickup_name";

#[derive(Debug, Clone, FromRow)]
struct AttendanceRow {
    id: i64,
    tenant_id: i64,
    camp_id: i64,
    registration_id: i64,
    athlete_id: i64,
    date: NaiveDate,
    checked_in_at: DateTime<Utc>,
    checked_in_by: i64,
    checked_out_at: Option<DateTime<Utc>>,
    checked_out_by: Option<i64>,
    pickup_name: Option<String>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            id: row.id,
            tenant_id: row.tenant_id,
            camp_id: row.camp_id,
            registration_id: row.registration_id,
            athlete_id: row.athlete_id,
            date: row.date,
            checked_in_at: row.checked_in_at,
            checked_in_by: row.checked_in_by,
            checked_out_at: row.checked_out_at,
            checked_out_by: row.checked_out_by,
            pickup_name: row.pickup_name,
        }
    }
}

/// Identifies the camper being checked in
#[derive(Debug, Clone, Copy)]
pub struct CheckInTarget {
    pub tenant_id: Id,
    pub camp_id: Id,
    pub registration_id: Id,
    pub athlete_id: Id,
    pub date: NaiveDate,
}

pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_day(&self, camp_id: Id, date: NaiveDate) -> RepositoryResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM attendance_records WHERE camp_id = $1 AND date = $2 ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(camp_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    pub async fn find(&self, registration_id: Id, date: NaiveDate) -> RepositoryResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM attendance_records WHERE registration_id = $1 AND date = $2"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(registration_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::from))
    }

    /// Insert the check-in, or return the record already there for that day
    pub async fn check_in(&self, target: CheckInTarget, by: Id) -> RepositoryResult<(AttendanceRecord, bool)> {
        let sql = format!(
            "INSERT INTO attendance_records (tenant_id, camp_id, registration_id, athlete_id, date, \
                                             checked_in_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (registration_id, date) DO NOTHING RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(target.tenant_id)
            .bind(target.camp_id)
            .bind(target.registration_id)
            .bind(target.athlete_id)
            .bind(target.date)
            .bind(by)
            .fetch_optional(&self.pool)
            .await?;

        match inserted {
            Some(row) => Ok((row.into(), true)),
            None => {
                let existing = self
                    .find(target.registration_id, target.date)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::NotFound(format!(
                            "attendance for registration {}",
                            target.registration_id
                        ))
                    })?;
                Ok((existing, false))
            }
        }
    }

    /// `None` when there is no open check-in for that day
    pub async fn check_out(
        &self,
        registration_id: Id,
        date: NaiveDate,
        by: Id,
        pickup_name: &str,
    ) -> RepositoryResult<Option<AttendanceRecord>> {
        let sql = format!(
            "UPDATE attendance_records SET checked_out_at = now(), checked_out_by = $3, \
                    pickup_name = $4 \
             WHERE registration_id = $1 AND date = $2 AND checked_out_at IS NULL \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(registration_id)
            .bind(date)
            .bind(by)
            .bind(pickup_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AttendanceRecord::from))
    }

    pub async fn count_checked_in(&self, camp_id: Id, date: NaiveDate) -> RepositoryResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attendance_records WHERE camp_id = $1 AND date = $2",
        )
        .bind(camp_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
