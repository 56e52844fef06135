//! Aggregate queries behind the HQ dashboard and licensee analytics

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use camp_core::{Id, ReportingPeriod};
use camp_models::CampStatus;

use crate::repository::{parse_column, RepositoryError, RepositoryResult};

/// Capacity and confirmed enrollment of a camp running in the period
#[derive(Debug, Clone)]
pub struct CampLoad {
    pub camp_id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub status: CampStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capacity: i64,
    pub enrollment: i64,
}

#[derive(Debug, FromRow)]
struct CampLoadRow {
    camp_id: i64,
    tenant_id: i64,
    name: String,
    status: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    capacity: i32,
    enrollment: i64,
}

impl TryFrom<CampLoadRow> for CampLoad {
    type Error = RepositoryError;

    fn try_from(row: CampLoadRow) -> Result<Self, RepositoryError> {
        Ok(CampLoad {
            camp_id: row.camp_id,
            tenant_id: row.tenant_id,
            status: parse_column("camps.status", &row.status)?,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            capacity: i64::from(row.capacity),
            enrollment: row.enrollment,
        })
    }
}

pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Non-cancelled camps whose inclusive dates touch the half-open period
    pub async fn camp_load(
        &self,
        tenant_id: Option<Id>,
        period: &ReportingPeriod,
    ) -> RepositoryResult<Vec<CampLoad>> {
        let rows = sqlx::query_as::<_, CampLoadRow>(
            "SELECT c.id AS camp_id, c.tenant_id, c.name, c.status, c.start_date, c.end_date, \
                    c.capacity, COUNT(r.id) FILTER (WHERE r.status = 'confirmed') AS enrollment \
             FROM camps c LEFT JOIN registrations r ON r.camp_id = c.id \
             WHERE c.start_date < $3 AND c.end_date >= $2 AND c.status <> 'cancelled' \
               AND ($1::bigint IS NULL OR c.tenant_id = $1) \
             GROUP BY c.id ORDER BY c.start_date ASC, c.id ASC",
        )
        .bind(tenant_id)
        .bind(period.from)
        .bind(period.to)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CampLoad::try_from).collect()
    }
}
