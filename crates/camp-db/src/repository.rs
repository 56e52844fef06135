//! Repository errors and shared helpers

use async_trait::async_trait;
use std::str::FromStr;

use camp_core::{CampError, Id};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value no longer parses into its domain type
    #[error("Invalid data in {column}: {value}")]
    InvalidData { column: &'static str, value: String },
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Turn unique-constraint violations into `Conflict`
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            RepositoryError::Conflict(message.into())
        } else {
            RepositoryError::Database(err)
        }
    }
}

/// Postgres `unique_violation`
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}

impl From<RepositoryError> for CampError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => CampError::NotFound {
                entity: "Record",
                id: what,
            },
            RepositoryError::Conflict(message) => CampError::BadRequest(message),
            RepositoryError::Database(e) => CampError::Database(e.to_string()),
            RepositoryError::InvalidData { column, value } => {
                CampError::Internal(format!("invalid stored value for {}: {}", column, value))
            }
        }
    }
}

/// Lookup by primary key
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    /// Like `find_by_id`, failing with `NotFound`
    async fn get(&self, id: Id) -> RepositoryResult<T> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    /// Check if an entity exists
    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

/// Parse a TEXT status column
pub(crate) fn parse_column<T: FromStr>(column: &'static str, value: &str) -> RepositoryResult<T> {
    value.parse().map_err(|_| RepositoryError::InvalidData {
        column,
        value: value.to_string(),
    })
}

/// Convert every row, failing on the first bad one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> RepositoryResult<Vec<T>>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Stored basis points are INTEGER
pub(crate) fn bps_from_db(column: &'static str, value: i32) -> RepositoryResult<camp_core::BasisPoints> {
    u32::try_from(value)
        .map(camp_core::BasisPoints)
        .map_err(|_| RepositoryError::InvalidData {
            column,
            value: value.to_string(),
        })
}

pub(crate) fn bps_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Column list qualified with a table alias
pub(crate) fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{}.{}", alias, column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
