//! Camper group repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use camp_core::Id;
use camp_models::{CamperGroup, GroupStrategy};

use crate::repository::{convert_all, parse_column, RepositoryError, RepositoryResult};

const COLUMNS: &str = "id, tenant_id, camp_id, name, position, coach_id, strategy, created_at";

#[derive(Debug, Clone, FromRow)]
struct GroupRow {
    id: i64,
    tenant_id: i64,
    camp_id: i64,
    name: String,
    position: i32,
    coach_id: Option<i64>,
    strategy: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GroupRow> for CamperGroup {
    type Error = RepositoryError;

    fn try_from(row: GroupRow) -> RepositoryResult<Self> {
        Ok(CamperGroup {
            id: row.id,
            tenant_id: row.tenant_id,
            camp_id: row.camp_id,
            strategy: parse_column("camper_groups.strategy", &row.strategy)?,
            name: row.name,
            position: row.position,
            coach_id: row.coach_id,
            created_at: row.created_at,
        })
    }
}

/// A camper placed in a group, with enough of the athlete to print a list
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupMember {
    pub group_id: Id,
    pub athlete_id: Id,
    pub registration_id: Id,
    pub position: i32,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub grade: Option<i32>,
}

/// A group about to be written, members in placement order
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub position: i32,
    pub coach_id: Option<Id>,
    /// `(registration_id, athlete_id)`
    pub members: Vec<(Id, Id)>,
}

pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, camp_id: Id) -> RepositoryResult<Vec<CamperGroup>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM camper_groups WHERE camp_id = $1 ORDER BY position ASC"
        );
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(camp_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    pub async fn members(&self, camp_id: Id) -> RepositoryResult<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT m.group_id, m.athlete_id, m.registration_id, m.position, \
                    a.first_name, a.last_name, a.birth_date, a.grade \
             FROM camper_group_members m JOIN athletes a ON a.id = m.athlete_id \
             WHERE m.camp_id = $1 ORDER BY m.group_id ASC, m.position ASC",
        )
        .bind(camp_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn count(&self, camp_id: Id) -> RepositoryResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM camper_groups WHERE camp_id = $1")
            .bind(camp_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Drop the camp's groups and write `groups` in their place
    pub async fn replace(
        conn: &mut PgConnection,
        tenant_id: Id,
        camp_id: Id,
        strategy: GroupStrategy,
        groups: &[NewGroup],
    ) -> RepositoryResult<Vec<CamperGroup>> {
        sqlx::query("DELETE FROM camper_groups WHERE camp_id = $1")
            .bind(camp_id)
            .execute(&mut *conn)
            .await?;

        let insert_group = format!(
            "INSERT INTO camper_groups (tenant_id, camp_id, name, position, coach_id, strategy) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(groups.len());
        for group in groups {
            let row = sqlx::query_as::<_, GroupRow>(&insert_group)
                .bind(tenant_id)
                .bind(camp_id)
                .bind(&group.name)
                .bind(group.position)
                .bind(group.coach_id)
                .bind(strategy.as_str())
                .fetch_one(&mut *conn)
                .await?;
            let stored = CamperGroup::try_from(row)?;

            for (position, (registration_id, athlete_id)) in group.members.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO camper_group_members (group_id, camp_id, athlete_id, \
                                                       registration_id, position) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(stored.id)
                .bind(camp_id)
                .bind(athlete_id)
                .bind(registration_id)
                .bind(i32::try_from(position).unwrap_or(i32::MAX))
                .execute(&mut *conn)
                .await?;
            }
            created.push(stored);
        }
        Ok(created)
    }

    /// Move a camper to `group_id`, appended at the end; `false` when the
    /// camper is not grouped in that camp
    pub async fn move_member(
        conn: &mut PgConnection,
        camp_id: Id,
        athlete_id: Id,
        group_id: Id,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE camper_group_members SET group_id = $3, \
                    position = (SELECT COALESCE(MAX(position), -1) + 1 \
                                FROM camper_group_members WHERE group_id = $3) \
             WHERE camp_id = $1 AND athlete_id = $2",
        )
        .bind(camp_id)
        .bind(athlete_id)
        .bind(group_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(&self, id: Id) -> RepositoryResult<Option<CamperGroup>> {
        let sql = format!("SELECT {COLUMNS} FROM camper_groups WHERE id = $1");
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CamperGroup::try_from).transpose()
    }
}
