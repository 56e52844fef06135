//! Tenant repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use camp_core::{BasisPoints, Cents, Id, Page, PaginationParams};
use camp_models::{Tenant, TenantStatus};

use crate::repository::{
    bps_from_db, bps_to_db, convert_all, parse_column, Repository, RepositoryError,
    RepositoryResult,
};

const COLUMNS: &str = "id, name, slug, status, royalty_rate, minimum_royalty_cents, \
                       contact_email, territory, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct TenantRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub royalty_rate: i32,
    pub minimum_royalty_cents: i64,
    pub contact_email: String,
    pub territory: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = RepositoryError;

    fn try_from(row: TenantRow) -> RepositoryResult<Self> {
        Ok(Tenant {
            id: row.id,
            status: parse_column("tenants.status", &row.status)?,
            royalty_rate: bps_from_db("tenants.royalty_rate", row.royalty_rate)?,
            minimum_royalty_cents: Cents(row.minimum_royalty_cents),
            name: row.name,
            slug: row.slug,
            contact_email: row.contact_email,
            territory: row.territory,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Values written on create and update
#[derive(Debug, Clone)]
pub struct TenantValues {
    pub name: String,
    pub slug: String,
    pub royalty_rate: BasisPoints,
    pub minimum_royalty_cents: Cents,
    pub contact_email: String,
    pub territory: Option<String>,
}

pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Tenant>> {
        let sql = format!("SELECT {COLUMNS} FROM tenants WHERE slug = $1");
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }

    pub async fn list(
        &self,
        status: Option<TenantStatus>,
        params: PaginationParams,
    ) -> RepositoryResult<Page<Tenant>> {
        let status = status.map(|s| s.as_str());
        let sql = format!(
            "SELECT {COLUMNS} FROM tenants \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(status)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tenants WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(convert_all(rows)?, total, params))
    }

    /// Every tenant, ordered by name
    pub async fn all(&self) -> RepositoryResult<Vec<Tenant>> {
        let sql = format!("SELECT {COLUMNS} FROM tenants ORDER BY name ASC, id ASC");
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn list_active(&self) -> RepositoryResult<Vec<Tenant>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM tenants WHERE status = 'active' ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn create(&self, values: &TenantValues) -> RepositoryResult<Tenant> {
        let sql = format!(
            "INSERT INTO tenants (name, slug, royalty_rate, minimum_royalty_cents, contact_email, territory) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(&values.name)
            .bind(&values.slug)
            .bind(bps_to_db(values.royalty_rate.value()))
            .bind(values.minimum_royalty_cents.value())
            .bind(&values.contact_email)
            .bind(&values.territory)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::conflict_on_unique(e, "slug has already been taken"))?;
        row.try_into()
    }

    /// Slug is immutable; every other value is overwritten
    pub async fn update(&self, id: Id, values: &TenantValues) -> RepositoryResult<Tenant> {
        let sql = format!(
            "UPDATE tenants SET name = $2, royalty_rate = $3, minimum_royalty_cents = $4, \
             contact_email = $5, territory = $6, updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(&values.name)
            .bind(bps_to_db(values.royalty_rate.value()))
            .bind(values.minimum_royalty_cents.value())
            .bind(&values.contact_email)
            .bind(&values.territory)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("tenant {}", id)))?;
        row.try_into()
    }

    pub async fn set_status(&self, id: Id, status: TenantStatus) -> RepositoryResult<Tenant> {
        let sql = format!(
            "UPDATE tenants SET status = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("tenant {}", id)))?;
        row.try_into()
    }
}

#[async_trait]
impl Repository<Tenant> for TenantRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Tenant>> {
        let sql = format!("SELECT {COLUMNS} FROM tenants WHERE id = $1");
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion() {
        let row = TenantRow {
            id: 1,
            name: "Rocky".into(),
            slug: "rocky".into(),
            status: "suspended".into(),
            royalty_rate: 750,
            minimum_royalty_cents: 10_000,
            contact_email: "x@y.test".into(),
            territory: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let tenant = Tenant::try_from(row.clone()).unwrap();
        assert_eq!(tenant.status, TenantStatus::Suspended);
        assert_eq!(tenant.royalty_rate, BasisPoints(750));

        let bad = TenantRow {
            status: "closed".into(),
            ..row
        };
        assert!(Tenant::try_from(bad).is_err());
    }
}
