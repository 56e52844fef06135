//! User model
//!
//! Table: users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Entity, Id, Identifiable, TenantScoped, Timestamped};

text_enum! {
    /// Account role; HQ admins have no tenant, everyone else has exactly one
    pub enum Role {
        HqAdmin => "hq_admin",
        LicenseeOwner => "licensee_owner",
        Director => "director",
        Coach => "coach",
        Parent => "parent",
    }
}

impl Role {
    pub fn is_hq(&self) -> bool {
        *self == Role::HqAdmin
    }

    /// Tenant staff: owner, director, coach
    pub fn is_tenant_staff(&self) -> bool {
        matches!(self, Role::LicenseeOwner | Role::Director | Role::Coach)
    }

    /// Roles that can be assigned to work a camp
    pub fn is_camp_staff(&self) -> bool {
        matches!(self, Role::Director | Role::Coach)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    /// `None` only for HQ admins
    pub tenant_id: Option<Id>,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Emails are unique case-insensitively and stored lowercased
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

impl Identifiable for User {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for User {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for User {
    const TABLE_NAME: &'static str = "users";
    const TYPE_NAME: &'static str = "User";
}

impl TenantScoped for User {
    /// HQ admins report tenant 0, which no tenant row uses
    fn tenant_id(&self) -> Id {
        self.tenant_id.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_groups() {
        assert!(Role::HqAdmin.is_hq());
        assert!(Role::LicenseeOwner.is_tenant_staff());
        assert!(!Role::Parent.is_tenant_staff());
        assert!(Role::Coach.is_camp_staff());
        assert!(!Role::LicenseeOwner.is_camp_staff());
        assert_eq!("licensee_owner".parse::<Role>().unwrap(), Role::LicenseeOwner);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            tenant_id: Some(2),
            email: "a@b.test".into(),
            name: "A".into(),
            role: Role::Parent,
            password_hash: "secret-hash".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert_eq!(User::normalize_email("  Mom@Example.COM "), "mom@example.com");
    }
}
