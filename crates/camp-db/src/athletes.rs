//! Athlete repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use camp_core::Id;
use camp_models::Athlete;

use crate::repository::{Repository, RepositoryError, RepositoryResult};

pub(crate) const COLUMNS: &str = "id, tenant_id, parent_id, first_name, last_name, birth_date, grade, \
                       shirt_size, medical_notes, emergency_contact_name, \
                       emergency_contact_phone, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct AthleteRow {
    pub id: i64,
    pub tenant_id: i64,
    pub parent_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub grade: Option<i32>,
    pub shirt_size: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AthleteRow> for Athlete {
    fn from(row: AthleteRow) -> Self {
        Athlete {
            id: row.id,
            tenant_id: row.tenant_id,
            parent_id: row.parent_id,
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            grade: row.grade,
            shirt_size: row.shirt_size,
            medical_notes: row.medical_notes,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AthleteValues {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub grade: Option<i32>,
    pub shirt_size: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
}

pub struct AthleteRepository {
    pool: PgPool,
}

impl AthleteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A parent's athletes, or every athlete of a tenant when `parent_id` is `None`
    pub async fn list(&self, tenant_id: Option<Id>, parent_id: Option<Id>) -> RepositoryResult<Vec<Athlete>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM athletes \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) AND ($2::bigint IS NULL OR parent_id = $2) \
             ORDER BY last_name ASC, first_name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, AthleteRow>(&sql)
            .bind(tenant_id)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Athlete::from).collect())
    }

    pub async fn find_many(&self, ids: &[Id]) -> RepositoryResult<Vec<Athlete>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {COLUMNS} FROM athletes WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, AthleteRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Athlete::from).collect())
    }

    pub async fn create(
        &self,
        tenant_id: Id,
        parent_id: Id,
        values: &AthleteValues,
    ) -> RepositoryResult<Athlete> {
        let sql = format!(
            "INSERT INTO athletes (tenant_id, parent_id, first_name, last_name, birth_date, grade, \
                                   shirt_size, medical_notes, emergency_contact_name, \
                                   emergency_contact_phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AthleteRow>(&sql)
            .bind(tenant_id)
            .bind(parent_id)
            .bind(&values.first_name)
            .bind(&values.last_name)
            .bind(values.birth_date)
            .bind(values.grade)
            .bind(&values.shirt_size)
            .bind(&values.medical_notes)
            .bind(&values.emergency_contact_name)
            .bind(&values.emergency_contact_phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn update(&self, id: Id, values: &AthleteValues) -> RepositoryResult<Athlete> {
        let sql = format!(
            "UPDATE athletes SET first_name = $2, last_name = $3, birth_date = $4, grade = $5, \
                    shirt_size = $6, medical_notes = $7, emergency_contact_name = $8, \
                    emergency_contact_phone = $9, updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AthleteRow>(&sql)
            .bind(id)
            .bind(&values.first_name)
            .bind(&values.last_name)
            .bind(values.birth_date)
            .bind(values.grade)
            .bind(&values.shirt_size)
            .bind(&values.medical_notes)
            .bind(&values.emergency_contact_name)
            .bind(&values.emergency_contact_phone)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("athlete {}", id)))?;
        Ok(row.into())
    }
}

#[async_trait]
impl Repository<Athlete> for AthleteRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Athlete>> {
        let sql = format!("SELECT {COLUMNS} FROM athletes WHERE id = $1");
        let row = sqlx::query_as::<_, AthleteRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Athlete::from))
    }
}
