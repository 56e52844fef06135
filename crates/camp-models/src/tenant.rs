//! Tenant (licensee) model
//!
//! Table: tenants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{BasisPoints, Cents};

use crate::{Entity, Id, Identifiable, StatusFlow, TenantScoped, Timestamped};

/// Slugs that collide with top-level routes
pub const RESERVED_SLUGS: &[&str] = &["admin", "api", "hq", "login", "logout", "new"];

text_enum! {
    /// Lifecycle of a licensee
    pub enum TenantStatus {
        Active => "active",
        Suspended => "suspended",
        Terminated => "terminated",
    }
}

impl StatusFlow for TenantStatus {
    const ENTITY: &'static str = "tenant";

    fn can_transition_to(&self, next: Self) -> bool {
        use TenantStatus::*;
        matches!(
            (*self, next),
            (Active, Suspended) | (Suspended, Active) | (Active, Terminated) | (Suspended, Terminated)
        )
    }
}

/// A licensee operating camps under the CampHQ brand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    /// Share of net revenue owed to HQ
    pub royalty_rate: BasisPoints,
    pub minimum_royalty_cents: Cents,
    pub contact_email: String,
    pub territory: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

impl Identifiable for Tenant {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Tenant {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

/// A tenant is its own scope
impl TenantScoped for Tenant {
    fn tenant_id(&self) -> Id {
        self.id
    }
}

impl Entity for Tenant {
    const TABLE_NAME: &'static str = "tenants";
    const TYPE_NAME: &'static str = "Tenant";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_transitions() {
        use TenantStatus::*;
        assert!(Active.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Active));
        assert!(Suspended.can_transition_to(Terminated));
        assert!(!Terminated.can_transition_to(Active));
        assert!(!Active.can_transition_to(Active));
        assert!(Terminated.transition_to(Suspended).is_err());
    }

    #[test]
    fn test_tenant_is_its_own_scope() {
        let tenant = Tenant {
            id: 7,
            name: "North Shore Soccer".to_string(),
            slug: "north-shore".to_string(),
            status: TenantStatus::Active,
            royalty_rate: BasisPoints(800),
            minimum_royalty_cents: Cents(50_000),
            contact_email: "owner@northshore.example".to_string(),
            territory: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(tenant.tenant_id(), 7);
        assert!(tenant.belongs_to(7));
        assert!(!tenant.belongs_to(8));
    }

    #[test]
    fn test_status_text() {
        assert_eq!("suspended".parse::<TenantStatus>().unwrap(), TenantStatus::Suspended);
        assert_eq!(TenantStatus::Terminated.to_string(), "terminated");
        assert!("closed".parse::<TenantStatus>().is_err());
    }
}
