//! User repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use camp_core::Id;
use camp_models::{Role, User};

use crate::repository::{convert_all, parse_column, Repository, RepositoryError, RepositoryResult};

const COLUMNS: &str =
    "id, tenant_id, email, name, role, password_hash, active, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub tenant_id: Option<i64>,
    pub email: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> RepositoryResult<Self> {
        Ok(User {
            id: row.id,
            tenant_id: row.tenant_id,
            role: parse_column("users.role", &row.role)?,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub tenant_id: Option<Id>,
    /// Already normalized
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn create(&self, new: &NewUser) -> RepositoryResult<User> {
        let sql = format!(
            "INSERT INTO users (tenant_id, email, name, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new.tenant_id)
            .bind(&new.email)
            .bind(&new.name)
            .bind(new.role.as_str())
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::conflict_on_unique(e, "email has already been taken"))?;
        row.try_into()
    }

    /// Users of a tenant holding one of `roles`
    pub async fn list_by_tenant(&self, tenant_id: Id, roles: &[Role]) -> RepositoryResult<Vec<User>> {
        let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        let sql = format!(
            "SELECT {COLUMNS} FROM users WHERE tenant_id = $1 AND role = ANY($2) ORDER BY name ASC"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(tenant_id)
            .bind(roles)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    /// Names for display, keyed by id
    pub async fn names(&self, ids: &[Id]) -> RepositoryResult<Vec<(Id, String)>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, name FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }
}
