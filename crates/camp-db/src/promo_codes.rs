//! Promo code repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::Id;
use camp_models::{DiscountKind, PromoCode};

use crate::repository::{convert_all, parse_column, Repository, RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, tenant_id, code, kind, amount, valid_from, valid_until, \
                       max_redemptions, redemptions, active, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct PromoCodeRow {
    pub id: i64,
    pub tenant_id: i64,
    pub code: String,
    pub kind: String,
    pub amount: i64,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub max_redemptions: Option<i32>,
    pub redemptions: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = RepositoryError;

    fn try_from(row: PromoCodeRow) -> RepositoryResult<Self> {
        Ok(PromoCode {
            id: row.id,
            tenant_id: row.tenant_id,
            kind: parse_column("promo_codes.kind", &row.kind)?,
            code: row.code,
            amount: row.amount,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            max_redemptions: row.max_redemptions,
            redemptions: row.redemptions,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub kind: DiscountKind,
    pub amount: i64,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub max_redemptions: Option<i32>,
}

pub struct PromoCodeRepository {
    pool: PgPool,
}

impl PromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, tenant_id: Option<Id>) -> RepositoryResult<Vec<PromoCode>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM promo_codes WHERE ($1::bigint IS NULL OR tenant_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    /// Codes are stored upper-case; `code` must already be normalized
    pub async fn find_by_code(&self, tenant_id: Id, code: &str) -> RepositoryResult<Option<PromoCode>> {
        let sql = format!("SELECT {COLUMNS} FROM promo_codes WHERE tenant_id = $1 AND code = $2");
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(tenant_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PromoCode::try_from).transpose()
    }

    pub async fn create(&self, tenant_id: Id, promo: &NewPromoCode) -> RepositoryResult<PromoCode> {
        let sql = format!(
            "INSERT INTO promo_codes (tenant_id, code, kind, amount, valid_from, valid_until, \
                                      max_redemptions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(tenant_id)
            .bind(&promo.code)
            .bind(promo.kind.as_str())
            .bind(promo.amount)
            .bind(promo.valid_from)
            .bind(promo.valid_until)
            .bind(promo.max_redemptions)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::conflict_on_unique(e, format!("promo code {} already exists", promo.code))
            })?;
        row.try_into()
    }

    pub async fn set_active(&self, id: Id, active: bool) -> RepositoryResult<PromoCode> {
        let sql = format!("UPDATE promo_codes SET active = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("promo code {}", id)))?;
        row.try_into()
    }

    /// Lock the code row so concurrent checkouts cannot over-redeem it
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        tenant_id: Id,
        code: &str,
    ) -> RepositoryResult<Option<PromoCode>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM promo_codes WHERE tenant_id = $1 AND code = $2 FOR UPDATE"
        );
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(tenant_id)
            .bind(code)
            .fetch_optional(conn)
            .await?;
        row.map(PromoCode::try_from).transpose()
    }

    pub async fn redeem(conn: &mut PgConnection, id: Id) -> RepositoryResult<()> {
        sqlx::query("UPDATE promo_codes SET redemptions = redemptions + 1 WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<PromoCode> for PromoCodeRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<PromoCode>> {
        let sql = format!("SELECT {COLUMNS} FROM promo_codes WHERE id = $1");
        let row = sqlx::query_as::<_, PromoCodeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PromoCode::try_from).transpose()
    }
}
