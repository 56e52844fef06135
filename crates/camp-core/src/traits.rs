//! Core traits shared by models, contracts and services

use chrono::{DateTime, Utc};

/// Primary key type
pub type Id = i64;

/// Entities that have a primary key once persisted
pub trait Identifiable {
    fn id(&self) -> Option<Id>;

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// Entities with created/updated timestamps
pub trait Timestamped {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;
}

/// Entities that belong to a single licensee
///
/// Every query issued on behalf of a non-HQ user is filtered by this key.
pub trait TenantScoped {
    fn tenant_id(&self) -> Id;

    fn belongs_to(&self, tenant_id: Id) -> bool {
        self.tenant_id() == tenant_id
    }
}

/// Base trait for persisted domain entities
pub trait Entity: Identifiable + Send + Sync {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}

/// Status enums stored as text and moved through explicit transitions
pub trait StatusFlow: Copy + Eq + std::fmt::Display + 'static {
    /// Entity name used in transition errors
    const ENTITY: &'static str;

    /// Whether `self -> next` is an allowed move
    fn can_transition_to(&self, next: Self) -> bool;

    /// Checked transition
    fn transition_to(self, next: Self) -> crate::CampResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::CampError::invalid_transition(Self::ENTITY, self, next))
        }
    }
}
