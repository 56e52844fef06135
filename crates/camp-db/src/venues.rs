//! Venue and venue contract repositories

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use camp_core::{Cents, Id};
use camp_models::{ContractStatus, Venue, VenueContract};

use crate::repository::{convert_all, parse_column, Repository, RepositoryError, RepositoryResult};

const VENUE_COLUMNS: &str = "id, tenant_id, name, address, city, region, postal_code, capacity, \
                             contact_name, contact_email, daily_rate_cents, notes, active, \
                             created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct VenueRow {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub capacity: Option<i32>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VenueRow> for Venue {
    fn from(row: VenueRow) -> Self {
        Venue {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            address: row.address,
            city: row.city,
            region: row.region,
            postal_code: row.postal_code,
            capacity: row.capacity,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            daily_rate_cents: row.daily_rate_cents.map(Cents),
            notes: row.notes,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VenueValues {
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub capacity: Option<i32>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub daily_rate_cents: Option<Cents>,
    pub notes: Option<String>,
    pub active: bool,
}

pub struct VenueRepository {
    pool: PgPool,
}

impl VenueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_tenant(&self, tenant_id: Option<Id>) -> RepositoryResult<Vec<Venue>> {
        let sql = format!(
            "SELECT {VENUE_COLUMNS} FROM venues WHERE ($1::bigint IS NULL OR tenant_id = $1) \
             ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, VenueRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Venue::from).collect())
    }

    pub async fn create(&self, tenant_id: Id, values: &VenueValues) -> RepositoryResult<Venue> {
        let sql = format!(
            "INSERT INTO venues (tenant_id, name, address, city, region, postal_code, capacity, \
                                 contact_name, contact_email, daily_rate_cents, notes, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {VENUE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VenueRow>(&sql)
            .bind(tenant_id)
            .bind(&values.name)
            .bind(&values.address)
            .bind(&values.city)
            .bind(&values.region)
            .bind(&values.postal_code)
            .bind(values.capacity)
            .bind(&values.contact_name)
            .bind(&values.contact_email)
            .bind(values.daily_rate_cents.map(Cents::value))
            .bind(&values.notes)
            .bind(values.active)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn update(&self, id: Id, values: &VenueValues) -> RepositoryResult<Venue> {
        let sql = format!(
            "UPDATE venues SET name = $2, address = $3, city = $4, region = $5, postal_code = $6, \
                    capacity = $7, contact_name = $8, contact_email = $9, daily_rate_cents = $10, \
                    notes = $11, active = $12, updated_at = now() \
             WHERE id = $1 RETURNING {VENUE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VenueRow>(&sql)
            .bind(id)
            .bind(&values.name)
            .bind(&values.address)
            .bind(&values.city)
            .bind(&values.region)
            .bind(&values.postal_code)
            .bind(values.capacity)
            .bind(&values.contact_name)
            .bind(&values.contact_email)
            .bind(values.daily_rate_cents.map(Cents::value))
            .bind(&values.notes)
            .bind(values.active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("venue {}", id)))?;
        Ok(row.into())
    }
}

#[async_trait]
impl Repository<Venue> for VenueRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Venue>> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = $1");
        let row = sqlx::query_as::<_, VenueRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Venue::from))
    }
}

const CONTRACT_COLUMNS: &str = "id, tenant_id, venue_id, camp_id, title, term_start, term_end, \
                                fee_cents, deposit_cents, status, document_key, sent_at, signed_at, \
                                signed_by, cancelled_at, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct ContractRow {
    pub id: i64,
    pub tenant_id: i64,
    pub venue_id: i64,
    pub camp_id: Option<i64>,
    pub title: String,
    pub term_start: NaiveDate,
    pub term_end: NaiveDate,
    pub fee_cents: i64,
    pub deposit_cents: i64,
    pub status: String,
    pub document_key: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for VenueContract {
    type Error = RepositoryError;

    fn try_from(row: ContractRow) -> RepositoryResult<Self> {
        Ok(VenueContract {
            id: row.id,
            tenant_id: row.tenant_id,
            venue_id: row.venue_id,
            camp_id: row.camp_id,
            status: parse_column("venue_contracts.status", &row.status)?,
            title: row.title,
            term_start: row.term_start,
            term_end: row.term_end,
            fee_cents: Cents(row.fee_cents),
            deposit_cents: Cents(row.deposit_cents),
            document_key: row.document_key,
            sent_at: row.sent_at,
            signed_at: row.signed_at,
            signed_by: row.signed_by,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ContractValues {
    pub venue_id: Id,
    pub camp_id: Option<Id>,
    pub title: String,
    pub term_start: NaiveDate,
    pub term_end: NaiveDate,
    pub fee_cents: Cents,
    pub deposit_cents: Cents,
}

pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        tenant_id: Option<Id>,
        status: Option<ContractStatus>,
    ) -> RepositoryResult<Vec<VenueContract>> {
        let sql = format!(
            "SELECT {CONTRACT_COLUMNS} FROM venue_contracts \
             WHERE ($1::bigint IS NULL OR tenant_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY term_start ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(tenant_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn create(&self, tenant_id: Id, values: &ContractValues) -> RepositoryResult<VenueContract> {
        let sql = format!(
            "INSERT INTO venue_contracts (tenant_id, venue_id, camp_id, title, term_start, term_end, \
                                          fee_cents, deposit_cents) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {CONTRACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(tenant_id)
            .bind(values.venue_id)
            .bind(values.camp_id)
            .bind(&values.title)
            .bind(values.term_start)
            .bind(values.term_end)
            .bind(values.fee_cents.value())
            .bind(values.deposit_cents.value())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    /// Only drafts are editable; a non-draft row is left alone and `None` returned
    pub async fn update_draft(
        &self,
        id: Id,
        values: &ContractValues,
    ) -> RepositoryResult<Option<VenueContract>> {
        let sql = format!(
            "UPDATE venue_contracts SET camp_id = $2, title = $3, term_start = $4, term_end = $5, \
                    fee_cents = $6, deposit_cents = $7, updated_at = now() \
             WHERE id = $1 AND status = 'draft' RETURNING {CONTRACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(values.camp_id)
            .bind(&values.title)
            .bind(values.term_start)
            .bind(values.term_end)
            .bind(values.fee_cents.value())
            .bind(values.deposit_cents.value())
            .fetch_optional(&self.pool)
            .await?;
        row.map(VenueContract::try_from).transpose()
    }

    /// Move `from -> to`, stamping the matching timestamp; `None` when the
    /// row was no longer in `from`
    pub async fn transition(
        &self,
        id: Id,
        from: ContractStatus,
        to: ContractStatus,
        signed_by: Option<&str>,
    ) -> RepositoryResult<Option<VenueContract>> {
        let sql = format!(
            "UPDATE venue_contracts SET status = $3, \
                    sent_at = CASE WHEN $3 = 'sent' THEN now() ELSE sent_at END, \
                    signed_at = CASE WHEN $3 = 'signed' THEN now() ELSE signed_at END, \
                    signed_by = COALESCE($4, signed_by), \
                    cancelled_at = CASE WHEN $3 = 'cancelled' THEN now() ELSE cancelled_at END, \
                    updated_at = now() \
             WHERE id = $1 AND status = $2 RETURNING {CONTRACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(signed_by)
            .fetch_optional(&self.pool)
            .await?;
        row.map(VenueContract::try_from).transpose()
    }

    /// Expire every signed contract whose last term day is before `today`
    pub async fn expire_overdue(
        &self,
        tenant_id: Option<Id>,
        today: NaiveDate,
    ) -> RepositoryResult<Vec<VenueContract>> {
        let sql = format!(
            "UPDATE venue_contracts SET status = 'expired', updated_at = now() \
             WHERE status = 'signed' AND term_end < $2 AND ($1::bigint IS NULL OR tenant_id = $1) \
             RETURNING {CONTRACT_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(tenant_id)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn set_document(&self, id: Id, key: &str) -> RepositoryResult<VenueContract> {
        let sql = format!(
            "UPDATE venue_contracts SET document_key = $2, updated_at = now() \
             WHERE id = $1 RETURNING {CONTRACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("contract {}", id)))?;
        row.try_into()
    }
}

#[async_trait]
impl Repository<VenueContract> for ContractRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<VenueContract>> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM venue_contracts WHERE id = $1");
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(VenueContract::try_from).transpose()
    }
}
